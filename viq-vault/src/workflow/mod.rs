//! Vault creation workflow
//!
//! - [`validation_gate`]: stage-local input checks
//! - [`evidence_store`]: filtered, ordered evidence list
//! - [`verification_aggregator`]: concurrent per-file verification
//! - [`mint_sequencer`]: prepare → submit → confirm
//! - [`engine`]: session state machine tying the above together

pub mod engine;
pub mod events;
pub mod evidence_store;
pub mod mint_sequencer;
pub mod validation_gate;
pub mod verification_aggregator;

pub use engine::{EngineError, WorkflowEngine};
pub use events::VaultEvent;
pub use evidence_store::{EvidenceStore, MAX_FILE_BYTES};
pub use mint_sequencer::{MintError, MintOutcome, MintSequencer};
pub use validation_gate::{check_field, validate, FILES_ERROR_KEY};
pub use verification_aggregator::{aggregate_score, VerificationAggregator};
