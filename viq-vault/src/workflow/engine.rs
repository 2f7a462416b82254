//! Vault creation workflow engine
//!
//! Owns one [`Session`] and drives it through
//! DETAILS → EVIDENCE → REVIEW → COMPLETE.
//!
//! # Concurrency
//! The session sits behind a `tokio::sync::RwLock`. Asynchronous transitions
//! (`verify`, `mint`) set `busy` under the write lock, then hand the external
//! calls to a spawned task that reacquires the lock to record the outcome and
//! clear `busy`. The caller awaits that task, but dropping the caller does not
//! cancel it. Every operation that finds `busy == true` is rejected with
//! [`EngineError::Busy`]; nothing is queued.
//!
//! # Errors
//! `Err` means the operation was refused before anything changed (wrong stage,
//! invalid input, busy). Failures of the external calls themselves are
//! recorded in the session (`field_errors["verification"]`,
//! `field_errors["mint"]`) and the operation returns `Ok(snapshot)`.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use viq_common::events::EventBus;

use super::events::VaultEvent;
use super::mint_sequencer::{MintError, MintOutcome, MintSequencer};
use super::validation_gate::{check_field, validate, FILES_ERROR_KEY};
use super::verification_aggregator::VerificationAggregator;
use crate::models::{
    CandidateFile, DetailField, FieldErrors, FileVerdict, Session, Stage, VerificationState,
    VerificationStatus, WalletAddress, MINT_ERROR_KEY, VERIFICATION_ERROR_KEY,
};
use crate::services::{AssetDirectory, LedgerWriter, VerificationService};

/// Refused operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An asynchronous transition is outstanding
    #[error("Session is busy; wait for the current operation to finish")]
    Busy,

    #[error("Cannot {operation} from stage {stage}")]
    InvalidStage {
        operation: &'static str,
        stage: Stage,
    },

    /// Stage inputs failed validation (also recorded in `field_errors`)
    #[error("Validation failed: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
    Validation(FieldErrors),

    #[error("Evidence has not been successfully verified")]
    VerificationIncomplete,

    #[error("No wallet connected")]
    WalletNotConnected,

    #[error("Invalid wallet address: {0}")]
    InvalidWallet(String),
}

/// Workflow engine for one vault creation session
pub struct WorkflowEngine {
    session_id: Uuid,
    session: Arc<RwLock<Session>>,
    aggregator: VerificationAggregator,
    sequencer: MintSequencer,
    reporter: Reporter,
}

impl WorkflowEngine {
    /// Create an engine with a fresh session at `Details`
    pub fn new(
        verification: Arc<dyn VerificationService>,
        ledger: Arc<dyn LedgerWriter>,
        directory: Arc<dyn AssetDirectory>,
    ) -> Self {
        let session = Session::new();
        let session_id = session.session_id;
        Self {
            session_id,
            session: Arc::new(RwLock::new(session)),
            aggregator: VerificationAggregator::new(verification),
            sequencer: MintSequencer::new(ledger, directory),
            reporter: Reporter {
                session_id,
                events: None,
            },
        }
    }

    /// Attach an event bus for progress reporting
    pub fn with_events(mut self, events: EventBus<VaultEvent>) -> Self {
        events.emit_lossy(VaultEvent::SessionCreated {
            session_id: self.session_id,
        });
        self.reporter.events = Some(events);
        self
    }

    /// Stable session id (kept across `reset`)
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Immutable copy of the current session
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Whether an asynchronous transition is outstanding
    pub async fn is_busy(&self) -> bool {
        self.session.read().await.busy
    }

    /// Time of the last change, or `None` while busy
    pub async fn idle_since(&self) -> Option<DateTime<Utc>> {
        let session = self.session.read().await;
        (!session.busy).then_some(session.updated_at)
    }

    /// Edit one asset detail field (DETAILS stage only)
    ///
    /// Clears the field's error when the new value is valid.
    pub async fn update_details(&self, field: DetailField, value: String) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;
        ensure_stage(&session, Stage::Details, "edit asset details")?;

        session.asset_details.set(field, value);
        if check_field(&session.asset_details, field).is_none() {
            session.field_errors.remove(field.error_key());
        }
        session.invalidate_verification();
        session.touch();

        Ok(session.clone())
    }

    /// Attach evidence files (EVIDENCE stage only)
    ///
    /// Unsupported or oversized candidates are dropped without an error.
    pub async fn add_files(&self, candidates: Vec<CandidateFile>) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;
        ensure_stage(&session, Stage::Evidence, "add evidence")?;

        let offered = candidates.len();
        let accepted = session.evidence.add(candidates);
        debug!(
            session_id = %self.session_id,
            offered,
            accepted = accepted.len(),
            "Evidence added"
        );

        if !accepted.is_empty() {
            session.field_errors.remove(FILES_ERROR_KEY);
            session.invalidate_verification();
        }
        session.touch();

        Ok(session.clone())
    }

    /// Remove the evidence file at `index` (EVIDENCE stage only)
    pub async fn remove_file(&self, index: usize) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;
        ensure_stage(&session, Stage::Evidence, "remove evidence")?;

        if session.evidence.remove(index).is_some() {
            session.invalidate_verification();
            session.touch();
        }

        Ok(session.clone())
    }

    /// Record the connected wallet
    pub async fn connect_wallet(&self, address: &str) -> Result<Session, EngineError> {
        let wallet =
            WalletAddress::parse(address).ok_or_else(|| EngineError::InvalidWallet(address.to_string()))?;

        let mut session = self.session.write().await;
        ensure_idle(&session)?;
        info!(session_id = %self.session_id, wallet = %wallet, "Wallet connected");
        session.requester = Some(wallet);
        session.touch();

        Ok(session.clone())
    }

    pub async fn disconnect_wallet(&self) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;
        session.requester = None;
        session.touch();

        Ok(session.clone())
    }

    /// Advance one stage
    ///
    /// - DETAILS → EVIDENCE when the details pass validation
    /// - EVIDENCE → REVIEW when evidence is present and verification completed
    ///   (re-entering review after `back`; first entry happens through `verify`)
    pub async fn next(&self) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;

        let stage = session.stage;
        match stage {
            Stage::Details | Stage::Evidence => {
                let errors = validate(stage, &session);
                if !errors.is_empty() {
                    debug!(session_id = %self.session_id, ?errors, "Stage validation failed");
                    session.field_errors.extend(errors.clone());
                    session.touch();
                    return Err(EngineError::Validation(errors));
                }
            }
            Stage::Review | Stage::Complete => {
                return Err(EngineError::InvalidStage {
                    operation: "advance",
                    stage,
                });
            }
        }

        let target = if stage == Stage::Details {
            for field in [DetailField::AssetType, DetailField::Name, DetailField::Description] {
                session.field_errors.remove(field.error_key());
            }
            Stage::Evidence
        } else {
            if session.verification.status != VerificationStatus::Completed {
                return Err(EngineError::VerificationIncomplete);
            }
            session.field_errors.remove(FILES_ERROR_KEY);
            Stage::Review
        };

        self.reporter.transition(&mut session, target);
        Ok(session.clone())
    }

    /// Move one stage back within DETAILS..=REVIEW
    ///
    /// A no-op at DETAILS; refused at COMPLETE.
    pub async fn back(&self) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;

        if session.stage.is_terminal() {
            return Err(EngineError::InvalidStage {
                operation: "go back",
                stage: session.stage,
            });
        }

        if let Some(previous) = session.stage.previous() {
            self.reporter.transition(&mut session, previous);
        }
        Ok(session.clone())
    }

    /// Verify all evidence and advance to REVIEW when every file is accepted
    ///
    /// On failure the session stays at EVIDENCE with `verification.status ==
    /// Failed` and `field_errors["verification"]` set; calling `verify` again
    /// retries with the current evidence.
    pub async fn verify(&self) -> Result<Session, EngineError> {
        let (files, details, owner) = {
            let mut session = self.session.write().await;
            ensure_idle(&session)?;
            ensure_stage(&session, Stage::Evidence, "verify")?;

            let errors = validate(Stage::Evidence, &session);
            if !errors.is_empty() {
                session.field_errors.extend(errors.clone());
                session.touch();
                return Err(EngineError::Validation(errors));
            }

            session.busy = true;
            session.verification = VerificationState {
                status: VerificationStatus::Processing,
                ..VerificationState::default()
            };
            session.field_errors.remove(VERIFICATION_ERROR_KEY);
            session.touch();

            (
                session.evidence.files().to_vec(),
                session.asset_details.clone(),
                session.requester.clone(),
            )
        };

        info!(session_id = %self.session_id, file_count = files.len(), "Verification started");
        self.reporter.emit(VaultEvent::VerificationStarted {
            session_id: self.session_id,
            file_count: files.len(),
        });

        // Runs detached so the outcome is recorded even if the caller goes away
        let session = Arc::clone(&self.session);
        let aggregator = self.aggregator.clone();
        let reporter = self.reporter.clone();
        let task = tokio::spawn(async move {
            let outcome = aggregator.verify(&files, &details, owner).await;
            let mut session = session.write().await;
            reporter.record_verification(&mut session, outcome);
            session.clone()
        });

        match task.await {
            Ok(session) => Ok(session),
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Verification task aborted");
                let mut session = self.session.write().await;
                session.busy = false;
                session.verification.status = VerificationStatus::Failed;
                session.field_errors.insert(
                    VERIFICATION_ERROR_KEY.to_string(),
                    format!("Verification aborted: {}", e),
                );
                session.touch();
                Ok(session.clone())
            }
        }
    }

    /// Mint the vault and advance to COMPLETE
    ///
    /// Requires a completed verification and a connected wallet. On failure
    /// the session stays at REVIEW with `field_errors["mint"]` set, and `mint`
    /// may be called again.
    pub async fn mint(&self) -> Result<Session, EngineError> {
        let snapshot = {
            let mut session = self.session.write().await;
            ensure_idle(&session)?;
            ensure_stage(&session, Stage::Review, "mint")?;

            if session.verification.status != VerificationStatus::Completed {
                return Err(EngineError::VerificationIncomplete);
            }
            if session.requester.is_none() {
                return Err(EngineError::WalletNotConnected);
            }

            session.busy = true;
            session.field_errors.remove(MINT_ERROR_KEY);
            session.touch();
            session.clone()
        };

        info!(session_id = %self.session_id, "Mint started");
        self.reporter.emit(VaultEvent::MintStarted {
            session_id: self.session_id,
        });

        // A submitted transaction must be confirmed and recorded even if the
        // caller goes away
        let session = Arc::clone(&self.session);
        let sequencer = self.sequencer.clone();
        let reporter = self.reporter.clone();
        let task = tokio::spawn(async move {
            let outcome = sequencer.mint(&snapshot).await;
            let mut session = session.write().await;
            reporter.record_mint(&mut session, outcome);
            session.clone()
        });

        match task.await {
            Ok(session) => Ok(session),
            Err(e) => {
                error!(session_id = %self.session_id, error = %e, "Mint task aborted");
                let mut session = self.session.write().await;
                session.busy = false;
                session
                    .field_errors
                    .insert(MINT_ERROR_KEY.to_string(), format!("Mint aborted: {}", e));
                session.touch();
                Ok(session.clone())
            }
        }
    }

    /// Discard all session data and return to DETAILS
    ///
    /// The session id and the wallet connection survive.
    pub async fn reset(&self) -> Result<Session, EngineError> {
        let mut session = self.session.write().await;
        ensure_idle(&session)?;

        let old_stage = session.stage;
        let mut fresh = Session::new();
        fresh.session_id = self.session_id;
        fresh.requester = session.requester.take();
        *session = fresh;

        info!(session_id = %self.session_id, from = %old_stage, "Session reset");
        if old_stage != Stage::Details {
            self.reporter.emit(VaultEvent::StageChanged {
                session_id: self.session_id,
                old_stage,
                new_stage: Stage::Details,
            });
        }

        Ok(session.clone())
    }
}

/// Session id plus optional event bus, shared with spawned transition tasks
#[derive(Clone)]
struct Reporter {
    session_id: Uuid,
    events: Option<EventBus<VaultEvent>>,
}

impl Reporter {
    fn record_verification(&self, session: &mut Session, outcome: VerificationState) {
        session.busy = false;

        if outcome.status == VerificationStatus::Completed {
            info!(
                session_id = %self.session_id,
                aggregate_score = outcome.aggregate_score,
                "Verification completed"
            );
            self.emit(VaultEvent::VerificationCompleted {
                session_id: self.session_id,
                aggregate_score: outcome.aggregate_score,
            });
            session.verification = outcome;
            self.transition(session, Stage::Review);
        } else {
            let rejected_files: Vec<String> = outcome
                .per_file_results
                .iter()
                .filter(|r| r.status == FileVerdict::Rejected)
                .map(|r| r.file_name.clone())
                .collect();
            warn!(
                session_id = %self.session_id,
                aggregate_score = outcome.aggregate_score,
                ?rejected_files,
                "Verification failed"
            );
            session.field_errors.insert(
                VERIFICATION_ERROR_KEY.to_string(),
                verification_failure_message(&rejected_files),
            );
            self.emit(VaultEvent::VerificationFailed {
                session_id: self.session_id,
                aggregate_score: outcome.aggregate_score,
                rejected_files,
            });
            session.verification = outcome;
            session.touch();
        }
    }

    fn record_mint(&self, session: &mut Session, outcome: Result<MintOutcome, MintError>) {
        session.busy = false;

        match outcome {
            Ok(outcome) => {
                info!(
                    session_id = %self.session_id,
                    token_id = %outcome.result.token_id,
                    "Vault minted"
                );
                self.emit(VaultEvent::MintCompleted {
                    session_id: self.session_id,
                    token_id: outcome.result.token_id.clone(),
                    transaction_ref: outcome.result.transaction_ref.clone(),
                });
                for message in &outcome.warnings {
                    self.emit(VaultEvent::DirectoryWarning {
                        session_id: self.session_id,
                        message: message.clone(),
                    });
                }
                session.warnings.extend(outcome.warnings);
                session.mint_result = Some(outcome.result);
                // Evidence bytes are no longer needed once the vault exists
                session.evidence.release_content();
                self.transition(session, Stage::Complete);
            }
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "Mint failed");
                session
                    .field_errors
                    .insert(MINT_ERROR_KEY.to_string(), e.to_string());
                self.emit(VaultEvent::MintFailed {
                    session_id: self.session_id,
                    message: e.to_string(),
                });
                session.touch();
            }
        }
    }

    fn transition(&self, session: &mut Session, new_stage: Stage) {
        let transition = session.transition_to(new_stage);
        info!(
            session_id = %self.session_id,
            from = %transition.old_stage,
            to = %transition.new_stage,
            "Stage transition"
        );
        self.emit(VaultEvent::StageChanged {
            session_id: self.session_id,
            old_stage: transition.old_stage,
            new_stage: transition.new_stage,
        });
    }

    fn emit(&self, event: VaultEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }
}

fn ensure_idle(session: &Session) -> Result<(), EngineError> {
    if session.busy {
        Err(EngineError::Busy)
    } else {
        Ok(())
    }
}

fn ensure_stage(session: &Session, expected: Stage, operation: &'static str) -> Result<(), EngineError> {
    if session.stage == expected {
        Ok(())
    } else {
        Err(EngineError::InvalidStage {
            operation,
            stage: session.stage,
        })
    }
}

fn verification_failure_message(rejected_files: &[String]) -> String {
    if rejected_files.is_empty() {
        "Verification failed: no evidence could be verified".to_string()
    } else {
        format!(
            "Verification failed for: {}. Replace or remove these files and verify again.",
            rejected_files.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        NullAssetDirectory, SimulatedLedger, VerificationContext, VerificationError,
        VerificationReport,
    };
    use crate::models::AttachedFile;
    use async_trait::async_trait;

    struct AcceptAll;

    #[async_trait]
    impl VerificationService for AcceptAll {
        async fn verify(
            &self,
            _file: &AttachedFile,
            _context: &VerificationContext,
        ) -> Result<VerificationReport, VerificationError> {
            Ok(VerificationReport {
                status: FileVerdict::Accepted,
                score: 90,
            })
        }
    }

    fn engine() -> WorkflowEngine {
        WorkflowEngine::new(
            Arc::new(AcceptAll),
            Arc::new(SimulatedLedger::default()),
            Arc::new(NullAssetDirectory),
        )
    }

    async fn fill_details(engine: &WorkflowEngine) {
        engine
            .update_details(DetailField::AssetType, "vehicle".to_string())
            .await
            .unwrap();
        engine
            .update_details(DetailField::Name, "1967 Mustang".to_string())
            .await
            .unwrap();
        engine
            .update_details(DetailField::Description, "Fastback, restored".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_next_blocked_by_validation() {
        let engine = engine();
        let err = engine.next().await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref e) if e.len() == 3));

        let session = engine.snapshot().await;
        assert_eq!(session.stage, Stage::Details);
        assert_eq!(session.field_errors.len(), 3);
    }

    #[tokio::test]
    async fn test_valid_edit_clears_field_error() {
        let engine = engine();
        let _ = engine.next().await;

        let session = engine
            .update_details(DetailField::Name, "Mustang".to_string())
            .await
            .unwrap();
        assert!(!session.field_errors.contains_key("assetName"));
        assert!(session.field_errors.contains_key("assetType"));

        let session = engine
            .update_details(DetailField::Description, "   ".to_string())
            .await
            .unwrap();
        assert!(session.field_errors.contains_key("assetDescription"));
    }

    #[tokio::test]
    async fn test_happy_path_to_complete() {
        let engine = engine();
        fill_details(&engine).await;
        assert_eq!(engine.next().await.unwrap().stage, Stage::Evidence);

        engine
            .add_files(vec![CandidateFile::new("title.pdf", "application/pdf", vec![1u8; 32])])
            .await
            .unwrap();
        let session = engine.verify().await.unwrap();
        assert_eq!(session.stage, Stage::Review);
        assert_eq!(session.verification.status, VerificationStatus::Completed);
        assert_eq!(session.verification.aggregate_score, 90);

        assert_eq!(engine.mint().await.unwrap_err(), EngineError::WalletNotConnected);

        engine
            .connect_wallet("0x2222222222222222222222222222222222222222")
            .await
            .unwrap();
        let session = engine.mint().await.unwrap();
        assert_eq!(session.stage, Stage::Complete);
        assert!(!session.busy);
        assert_eq!(session.evidence.manifest(), vec!["title.pdf"]);
        assert_eq!(session.evidence.files()[0].byte_size, 32);
        assert!(session.evidence.files()[0].content.is_empty());
        assert_eq!(session.mint_result.unwrap().token_id, "1000");
    }

    #[tokio::test]
    async fn test_back_and_reset() {
        let engine = engine();
        assert_eq!(engine.back().await.unwrap().stage, Stage::Details);

        fill_details(&engine).await;
        engine.next().await.unwrap();
        assert_eq!(engine.back().await.unwrap().stage, Stage::Details);

        engine
            .connect_wallet("0x3333333333333333333333333333333333333333")
            .await
            .unwrap();
        let session = engine.reset().await.unwrap();
        assert_eq!(session.stage, Stage::Details);
        assert_eq!(session.session_id, engine.session_id());
        assert!(session.asset_details.name.is_empty());
        assert!(session.requester.is_some());
    }

    #[tokio::test]
    async fn test_edits_refused_in_wrong_stage() {
        let engine = engine();
        let err = engine
            .add_files(vec![CandidateFile::new("a.png", "image/png", vec![0u8; 1])])
            .await
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidStage {
                operation: "add evidence",
                stage: Stage::Details
            }
        );
        assert!(matches!(
            engine.connect_wallet("not-a-wallet").await,
            Err(EngineError::InvalidWallet(_))
        ));
    }
}
