//! Data models for the vault creation service
//!
//! - Session state machine (DETAILS → EVIDENCE → REVIEW → COMPLETE)
//! - Asset type catalog
//! - Ledger and directory records

pub mod asset_type;
pub mod session;
pub mod vault_record;

pub use asset_type::{asset_type_by_id, asset_type_name, is_known_asset_type, AssetType, ASSET_TYPES};
pub use session::{
    AssetDetails, AttachedFile, CandidateFile, DetailField, FieldErrors, FileVerdict,
    FileVerification, MimeClass, MintResult, Session, Stage, StageTransition, VerificationState,
    VerificationStatus, WalletAddress, MINT_ERROR_KEY, VERIFICATION_ERROR_KEY,
};
pub use vault_record::{AssetMetadata, AssetRecord, TokenMetadata, ACTIVE_STATUS};
