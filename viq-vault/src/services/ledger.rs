//! Ledger Writer seam and simulated ledger
//!
//! The Ledger Writer owns token allocation. `submit` hands over prepared token
//! metadata and returns a pending transaction reference; `confirm` blocks until
//! the transaction is final and returns the allocated token id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::models::TokenMetadata;

/// Ledger failure
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Ledger refused the transaction
    #[error("Transaction rejected: {0}")]
    Rejected(String),

    /// Ledger could not be reached
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),

    /// Confirm called with a reference the ledger never issued
    #[error("Unknown pending reference: {0}")]
    UnknownReference(String),
}

/// Pending transaction reference returned by `submit`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingRef(pub String);

/// Final confirmation returned by `confirm`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub token_id: String,
    pub transaction_ref: String,
}

/// Ledger Writer seam
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Submit prepared token metadata, returning a pending reference
    async fn submit(&self, record: &TokenMetadata) -> Result<PendingRef, LedgerError>;

    /// Wait for finality of a pending reference
    async fn confirm(&self, pending: &PendingRef) -> Result<MintReceipt, LedgerError>;
}

/// First token id allocated by the simulated ledger
pub const SIMULATED_FIRST_TOKEN_ID: u64 = 1000;

/// In-process ledger for development and tests
///
/// Token ids are allocated sequentially from [`SIMULATED_FIRST_TOKEN_ID`].
/// Transaction references are `0x` + SHA-256 of the token URI and a nonce, so
/// resubmitting identical metadata still yields a distinct reference. This
/// ledger performs no consensus; production deployments supply their own
/// [`LedgerWriter`].
pub struct SimulatedLedger {
    next_token_id: AtomicU64,
    nonce: AtomicU64,
    pending: Mutex<HashSet<String>>,
    submit_latency: Duration,
    confirm_latency: Duration,
}

impl Default for SimulatedLedger {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

impl SimulatedLedger {
    pub fn new(submit_latency: Duration, confirm_latency: Duration) -> Self {
        Self {
            next_token_id: AtomicU64::new(SIMULATED_FIRST_TOKEN_ID),
            nonce: AtomicU64::new(0),
            pending: Mutex::new(HashSet::new()),
            submit_latency,
            confirm_latency,
        }
    }

    fn lock_pending(&self) -> Result<std::sync::MutexGuard<'_, HashSet<String>>, LedgerError> {
        self.pending
            .lock()
            .map_err(|_| LedgerError::Unavailable("pending set poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerWriter for SimulatedLedger {
    async fn submit(&self, record: &TokenMetadata) -> Result<PendingRef, LedgerError> {
        let token_uri = record
            .token_uri()
            .map_err(|e| LedgerError::Rejected(format!("unencodable token URI: {}", e)))?;

        if !self.submit_latency.is_zero() {
            tokio::time::sleep(self.submit_latency).await;
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(token_uri.as_bytes());
        hasher.update(nonce.to_be_bytes());
        let transaction_ref = format!("0x{:x}", hasher.finalize());

        self.lock_pending()?.insert(transaction_ref.clone());
        tracing::debug!(transaction_ref = %transaction_ref, "Simulated ledger accepted submission");

        Ok(PendingRef(transaction_ref))
    }

    async fn confirm(&self, pending: &PendingRef) -> Result<MintReceipt, LedgerError> {
        if !self.confirm_latency.is_zero() {
            tokio::time::sleep(self.confirm_latency).await;
        }

        if !self.lock_pending()?.remove(&pending.0) {
            return Err(LedgerError::UnknownReference(pending.0.clone()));
        }

        let token_id = self.next_token_id.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(token_id, transaction_ref = %pending.0, "Simulated ledger confirmed mint");

        Ok(MintReceipt {
            token_id: token_id.to_string(),
            transaction_ref: pending.0.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{VerificationStatus, WalletAddress};
    use chrono::Utc;

    fn record() -> TokenMetadata {
        TokenMetadata {
            name: "Vintage Watch".to_string(),
            description: "1960s chronograph".to_string(),
            asset_type: "other".to_string(),
            verification_score: 88,
            verification_status: VerificationStatus::Completed,
            files: vec!["watch.jpg".to_string()],
            submitted_assets: Vec::new(),
            created_at: Utc::now(),
            owner: WalletAddress::parse("0x00000000000000000000000000000000000000aa").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_submit_then_confirm_allocates_sequential_ids() {
        let ledger = SimulatedLedger::default();

        let first = ledger.submit(&record()).await.unwrap();
        assert!(first.0.starts_with("0x"));
        assert_eq!(first.0.len(), 66);
        assert!(first.0[2..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));

        let receipt = ledger.confirm(&first).await.unwrap();
        assert_eq!(receipt.token_id, "1000");
        assert_eq!(receipt.transaction_ref, first.0);

        let second = ledger.submit(&record()).await.unwrap();
        assert_ne!(second, first);
        assert_eq!(ledger.confirm(&second).await.unwrap().token_id, "1001");
    }

    #[tokio::test]
    async fn test_confirm_unknown_or_repeated_reference() {
        let ledger = SimulatedLedger::default();
        let bogus = PendingRef("0xdeadbeef".to_string());
        assert!(matches!(
            ledger.confirm(&bogus).await,
            Err(LedgerError::UnknownReference(_))
        ));

        let pending = ledger.submit(&record()).await.unwrap();
        ledger.confirm(&pending).await.unwrap();
        assert!(matches!(
            ledger.confirm(&pending).await,
            Err(LedgerError::UnknownReference(_))
        ));
    }
}
