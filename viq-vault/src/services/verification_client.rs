//! Verification Service client
//!
//! Concept: Submit one evidence file plus asset context and receive an
//! accept/reject verdict with a 0..=100 confidence score.
//!
//! The response contract is strict: `{"status": "Accepted"|"Rejected", "score": 0..=100}`.
//! Anything else is a `VerificationError`, which the aggregator records as a
//! rejection. No free-text extraction is attempted.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AssetDetails, AssetMetadata, AttachedFile, FileVerdict, WalletAddress};

/// Verification failure for a single file
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Transport failure (connection refused, DNS, reset)
    #[error("Verification request failed: {0}")]
    Request(String),

    /// Non-success HTTP status
    #[error("Verification service returned status {0}")]
    Status(u16),

    /// Response did not match the expected schema
    #[error("Malformed verification response: {0}")]
    Malformed(String),
}

/// Asset context sent with every file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationContext {
    #[serde(flatten)]
    pub metadata: AssetMetadata,
    /// Prompt forwarded to the vision model behind the service
    pub prompt: String,
    #[serde(skip)]
    pub owner: Option<WalletAddress>,
}

impl VerificationContext {
    pub fn from_details(details: &AssetDetails, owner: Option<WalletAddress>) -> Self {
        Self {
            metadata: AssetMetadata::from(details),
            prompt: format!(
                "This document is a \"{}\". Describe it, and assign a verification status and confidence score.",
                details.name.trim()
            ),
            owner,
        }
    }
}

/// Verdict for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct VerificationReport {
    pub status: FileVerdict,
    pub score: u8,
}

/// Highest valid score
pub const MAX_SCORE: u8 = 100;

impl VerificationReport {
    /// Parse and validate a response body
    pub fn parse(body: &str) -> Result<Self, VerificationError> {
        let report: VerificationReport = serde_json::from_str(body)
            .map_err(|e| VerificationError::Malformed(e.to_string()))?;
        if report.score > MAX_SCORE {
            return Err(VerificationError::Malformed(format!(
                "score {} out of range 0..={}",
                report.score, MAX_SCORE
            )));
        }
        Ok(report)
    }
}

/// Document verification seam
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Verify one evidence file against the asset context
    async fn verify(
        &self,
        file: &AttachedFile,
        context: &VerificationContext,
    ) -> Result<VerificationReport, VerificationError>;
}

/// HTTP Verification Service client
///
/// `POST {base_url}/api/assets/submit` with a multipart body:
/// - `document`: file bytes
/// - `metadata`: JSON asset context
/// - `owner`: wallet address, when connected
pub struct HttpVerificationClient {
    client: Client,
    endpoint: String,
}

impl HttpVerificationClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/assets/submit", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl VerificationService for HttpVerificationClient {
    async fn verify(
        &self,
        file: &AttachedFile,
        context: &VerificationContext,
    ) -> Result<VerificationReport, VerificationError> {
        let metadata = serde_json::to_string(context)
            .map_err(|e| VerificationError::Request(format!("Failed to encode metadata: {}", e)))?;

        let document = Part::bytes(file.content.to_vec())
            .file_name(file.display_name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| VerificationError::Request(format!("Invalid MIME type: {}", e)))?;

        let mut form = Form::new().part("document", document).text("metadata", metadata);
        if let Some(owner) = &context.owner {
            form = form.text("owner", owner.to_string());
        }

        tracing::debug!(
            file = %file.display_name,
            byte_size = file.byte_size,
            endpoint = %self.endpoint,
            "Submitting evidence for verification"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| VerificationError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VerificationError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VerificationError::Request(format!("Failed to read response: {}", e)))?;

        VerificationReport::parse(&body)
    }
}
