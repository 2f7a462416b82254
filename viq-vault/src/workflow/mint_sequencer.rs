//! Three-phase mint: prepare → submit → confirm
//!
//! Phases run strictly in order and any failure ends the attempt. The Ledger
//! Writer allocates the token id; nothing here guesses one. After a confirmed
//! mint the vault is mirrored to the Asset Directory on a best-effort basis.

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{AssetRecord, MintResult, Session, TokenMetadata, VerificationStatus};
use crate::services::{AssetDirectory, LedgerError, LedgerWriter};

/// Fatal mint failure
#[derive(Debug, Error)]
pub enum MintError {
    #[error("No wallet connected")]
    MissingRequester,

    #[error("Failed to prepare token metadata: {0}")]
    Prepare(String),

    #[error("Ledger submission failed: {0}")]
    Submit(#[source] LedgerError),

    #[error("Ledger confirmation failed: {0}")]
    Confirm(#[source] LedgerError),
}

/// Successful mint
#[derive(Debug, Clone)]
pub struct MintOutcome {
    pub result: MintResult,
    /// Metadata submitted to the ledger
    pub metadata: TokenMetadata,
    /// Non-fatal problems (directory mirror failures)
    pub warnings: Vec<String>,
}

/// Drives a single mint attempt against the Ledger Writer
#[derive(Clone)]
pub struct MintSequencer {
    ledger: Arc<dyn LedgerWriter>,
    directory: Arc<dyn AssetDirectory>,
}

impl MintSequencer {
    pub fn new(ledger: Arc<dyn LedgerWriter>, directory: Arc<dyn AssetDirectory>) -> Self {
        Self { ledger, directory }
    }

    /// Mint the session's vault
    ///
    /// Each call builds fresh metadata and a fresh submission, so a retry after
    /// a failure never reuses a pending reference.
    pub async fn mint(&self, session: &Session) -> Result<MintOutcome, MintError> {
        let metadata = prepare(session)?;
        info!(
            session_id = %session.session_id,
            owner = %metadata.owner,
            "Mint phase 1/3: metadata prepared"
        );

        let pending = self
            .ledger
            .submit(&metadata)
            .await
            .map_err(MintError::Submit)?;
        info!(
            session_id = %session.session_id,
            pending_ref = %pending.0,
            "Mint phase 2/3: submitted to ledger"
        );

        let receipt = self
            .ledger
            .confirm(&pending)
            .await
            .map_err(MintError::Confirm)?;
        info!(
            session_id = %session.session_id,
            token_id = %receipt.token_id,
            transaction_ref = %receipt.transaction_ref,
            "Mint phase 3/3: confirmed"
        );

        let result = MintResult {
            token_id: receipt.token_id,
            transaction_ref: receipt.transaction_ref,
        };

        let mut warnings = Vec::new();
        let record = AssetRecord::from_mint(&metadata, &result);
        if let Err(e) = self.directory.create(&record).await {
            warn!(
                session_id = %session.session_id,
                token_id = %result.token_id,
                error = %e,
                "Vault minted but asset directory mirror failed"
            );
            warnings.push(format!(
                "Vault {} minted, but the asset directory could not be updated: {}",
                result.token_id, e
            ));
        }

        Ok(MintOutcome {
            result,
            metadata,
            warnings,
        })
    }
}

/// Phase 1: build immutable token metadata from the session
pub fn prepare(session: &Session) -> Result<TokenMetadata, MintError> {
    let owner = session
        .requester
        .clone()
        .ok_or(MintError::MissingRequester)?;

    if session.verification.status != VerificationStatus::Completed {
        return Err(MintError::Prepare(format!(
            "verification is {:?}, expected Completed",
            session.verification.status
        )));
    }

    let metadata = TokenMetadata {
        name: session.asset_details.name.trim().to_string(),
        description: session.asset_details.description.trim().to_string(),
        asset_type: session.asset_details.asset_type.clone(),
        verification_score: session.verification.aggregate_score,
        verification_status: session.verification.status,
        files: session.evidence.manifest(),
        submitted_assets: session.verification.per_file_results.clone(),
        created_at: Utc::now(),
        owner,
    };

    // The token URI must encode before anything reaches the ledger
    metadata
        .token_uri()
        .map_err(|e| MintError::Prepare(e.to_string()))?;

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateFile, FileVerdict, FileVerification, WalletAddress};
    use crate::services::{DirectoryError, MintReceipt, NullAssetDirectory, PendingRef, SimulatedLedger};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn verified_session() -> Session {
        let mut session = Session::new();
        session.asset_details.asset_type = "art".to_string();
        session.asset_details.name = "Blue Vase".to_string();
        session.asset_details.description = "Ming dynasty".to_string();
        session
            .evidence
            .add(vec![CandidateFile::new("vase.jpg", "image/jpeg", vec![0u8; 4])]);
        session.verification.status = VerificationStatus::Completed;
        session.verification.aggregate_score = 91;
        session.verification.per_file_results = vec![FileVerification {
            file_name: "vase.jpg".to_string(),
            status: FileVerdict::Accepted,
            score: 91,
            detail: None,
        }];
        session.requester = WalletAddress::parse("0x1111111111111111111111111111111111111111");
        session
    }

    struct FailingDirectory;

    #[async_trait]
    impl AssetDirectory for FailingDirectory {
        async fn create(&self, _record: &AssetRecord) -> Result<(), DirectoryError> {
            Err(DirectoryError::Status(503))
        }

        async fn list(&self, _owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError> {
            Ok(Vec::new())
        }
    }

    /// Ledger that fails confirm and counts calls
    #[derive(Default)]
    struct UnconfirmedLedger {
        submits: AtomicUsize,
    }

    #[async_trait]
    impl LedgerWriter for UnconfirmedLedger {
        async fn submit(&self, _record: &TokenMetadata) -> Result<PendingRef, LedgerError> {
            let n = self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(PendingRef(format!("0xpending{}", n)))
        }

        async fn confirm(&self, _pending: &PendingRef) -> Result<MintReceipt, LedgerError> {
            Err(LedgerError::Unavailable("timeout".to_string()))
        }
    }

    #[test]
    fn test_prepare_builds_metadata() {
        let metadata = prepare(&verified_session()).unwrap();
        assert_eq!(metadata.name, "Blue Vase");
        assert_eq!(metadata.asset_type, "art");
        assert_eq!(metadata.verification_score, 91);
        assert_eq!(metadata.files, vec!["vase.jpg".to_string()]);
        assert_eq!(metadata.owner.as_str(), "0x1111111111111111111111111111111111111111");

        let uri: serde_json::Value = serde_json::from_str(&metadata.token_uri().unwrap()).unwrap();
        assert_eq!(uri["verificationScore"], 91);
        assert_eq!(uri["type"], "art");
    }

    #[test]
    fn test_prepare_requires_requester() {
        let mut session = verified_session();
        session.requester = None;
        assert!(matches!(prepare(&session), Err(MintError::MissingRequester)));
    }

    #[tokio::test]
    async fn test_mint_with_simulated_ledger() {
        let sequencer = MintSequencer::new(
            Arc::new(SimulatedLedger::default()),
            Arc::new(NullAssetDirectory),
        );
        let outcome = sequencer.mint(&verified_session()).await.unwrap();
        assert_eq!(outcome.result.token_id, "1000");
        assert!(outcome.result.transaction_ref.starts_with("0x"));
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_is_warning() {
        let sequencer = MintSequencer::new(
            Arc::new(SimulatedLedger::default()),
            Arc::new(FailingDirectory),
        );
        let outcome = sequencer.mint(&verified_session()).await.unwrap();
        assert_eq!(outcome.result.token_id, "1000");
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("503"));
    }

    #[tokio::test]
    async fn test_confirm_failure_is_fatal_and_retry_resubmits() {
        let ledger = Arc::new(UnconfirmedLedger::default());
        let sequencer = MintSequencer::new(ledger.clone(), Arc::new(NullAssetDirectory));

        let session = verified_session();
        assert!(matches!(sequencer.mint(&session).await, Err(MintError::Confirm(_))));
        assert!(matches!(sequencer.mint(&session).await, Err(MintError::Confirm(_))));
        assert_eq!(ledger.submits.load(Ordering::SeqCst), 2);
    }
}
