//! External collaborators of the vault workflow
//!
//! Each seam is an `async_trait` so the engine can be driven by HTTP clients in
//! production and by in-process doubles in tests.

pub mod asset_directory;
pub mod ledger;
pub mod verification_client;

pub use asset_directory::{AssetDirectory, DirectoryError, HttpAssetDirectory, NullAssetDirectory};
pub use ledger::{LedgerError, LedgerWriter, MintReceipt, PendingRef, SimulatedLedger, SIMULATED_FIRST_TOKEN_ID};
pub use verification_client::{
    HttpVerificationClient, VerificationContext, VerificationError, VerificationReport,
    VerificationService, MAX_SCORE,
};
