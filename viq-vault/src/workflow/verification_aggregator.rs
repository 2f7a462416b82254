//! Concurrent per-file verification and score aggregation
//!
//! Every evidence file is sent to the Verification Service at once and all calls
//! settle before the session-level verdict is reduced. A failed call is never
//! dropped from the mean: it counts as a rejection with score 0.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    AssetDetails, AttachedFile, FileVerdict, FileVerification, VerificationState,
    VerificationStatus, WalletAddress,
};
use crate::services::{VerificationContext, VerificationService};

/// Fans evidence out to a [`VerificationService`] and reduces the verdicts
#[derive(Clone)]
pub struct VerificationAggregator {
    service: Arc<dyn VerificationService>,
}

impl VerificationAggregator {
    pub fn new(service: Arc<dyn VerificationService>) -> Self {
        Self { service }
    }

    /// Verify all files against the asset context
    ///
    /// Per-file results keep evidence order. Empty evidence yields `Failed`.
    pub async fn verify(
        &self,
        files: &[AttachedFile],
        details: &AssetDetails,
        owner: Option<WalletAddress>,
    ) -> VerificationState {
        let context = VerificationContext::from_details(details, owner);

        info!(file_count = files.len(), "Dispatching evidence for verification");

        let calls = files.iter().map(|file| {
            let service = Arc::clone(&self.service);
            let context = &context;
            async move {
                match service.verify(file, context).await {
                    Ok(report) => {
                        debug!(
                            file = %file.display_name,
                            status = ?report.status,
                            score = report.score,
                            "File verified"
                        );
                        FileVerification {
                            file_name: file.display_name.clone(),
                            status: report.status,
                            score: report.score,
                            detail: None,
                        }
                    }
                    Err(e) => {
                        warn!(file = %file.display_name, error = %e, "Verification call failed, recording rejection");
                        FileVerification {
                            file_name: file.display_name.clone(),
                            status: FileVerdict::Rejected,
                            score: 0,
                            detail: Some(e.to_string()),
                        }
                    }
                }
            }
        });

        let per_file_results = join_all(calls).await;
        reduce(per_file_results)
    }
}

/// Reduce per-file results into the session-level verdict
pub fn reduce(per_file_results: Vec<FileVerification>) -> VerificationState {
    let all_accepted = !per_file_results.is_empty()
        && per_file_results
            .iter()
            .all(|r| r.status == FileVerdict::Accepted);

    let scores: Vec<u8> = per_file_results.iter().map(|r| r.score).collect();
    let aggregate_score = aggregate_score(&scores);

    let status = if all_accepted {
        VerificationStatus::Completed
    } else {
        VerificationStatus::Failed
    };

    info!(
        status = ?status,
        aggregate_score,
        files = per_file_results.len(),
        "Verification aggregated"
    );

    VerificationState {
        status,
        aggregate_score,
        per_file_results,
    }
}

/// Arithmetic mean rounded half up; 0 for no scores
pub fn aggregate_score(scores: &[u8]) -> u8 {
    if scores.is_empty() {
        return 0;
    }
    let n = scores.len() as u64;
    let sum: u64 = scores.iter().map(|&s| s as u64).sum();
    // floor((sum / n) + 1/2) in integers
    ((2 * sum + n) / (2 * n)) as u8
}
