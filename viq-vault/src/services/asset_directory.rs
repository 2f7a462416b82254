//! Asset Directory seam
//!
//! The directory is a read-optimized mirror of minted vaults. The ledger stays
//! authoritative, so callers treat `create` failures as warnings.

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::models::AssetRecord;

/// Directory failure
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory request failed: {0}")]
    Request(String),

    #[error("Directory returned status {0}")]
    Status(u16),

    #[error("Directory database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Directory record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Asset Directory seam
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// Persist a minted vault record
    async fn create(&self, record: &AssetRecord) -> Result<(), DirectoryError>;

    /// List records, optionally restricted to one owner, newest first
    async fn list(&self, owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError>;
}

/// Directory that stores nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAssetDirectory;

#[async_trait]
impl AssetDirectory for NullAssetDirectory {
    async fn create(&self, record: &AssetRecord) -> Result<(), DirectoryError> {
        tracing::debug!(token_id = %record.token_id, "Asset directory disabled, skipping mirror");
        Ok(())
    }

    async fn list(&self, _owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError> {
        Ok(Vec::new())
    }
}

/// Remote HTTP directory (`POST/GET {base_url}/assets`)
pub struct HttpAssetDirectory {
    client: Client,
    endpoint: String,
}

impl HttpAssetDirectory {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/assets", base_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AssetDirectory for HttpAssetDirectory {
    async fn create(&self, record: &AssetRecord) -> Result<(), DirectoryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        Ok(())
    }

    async fn list(&self, owner: Option<&str>) -> Result<Vec<AssetRecord>, DirectoryError> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(owner) = owner {
            request = request.query(&[("owner", owner)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }

        response
            .json::<Vec<AssetRecord>>()
            .await
            .map_err(|e| DirectoryError::Request(format!("Failed to parse directory listing: {}", e)))
    }
}
