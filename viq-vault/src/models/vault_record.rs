//! Records handed to the Ledger Writer and the Asset Directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AssetDetails, FileVerification, MintResult, VerificationStatus, WalletAddress};

/// Immutable token metadata prepared for minting
///
/// Serialized as JSON it forms the token URI stored on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub verification_score: u8,
    pub verification_status: VerificationStatus,
    /// Evidence manifest (display names in stored order)
    pub files: Vec<String>,
    pub submitted_assets: Vec<FileVerification>,
    pub created_at: DateTime<Utc>,
    pub owner: WalletAddress,
}

impl TokenMetadata {
    /// JSON token URI for the ledger
    pub fn token_uri(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Asset metadata as stored by the Asset Directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    /// Market value; "0" until priced
    pub value: String,
}

/// Asset Directory entry mirroring a minted vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: Uuid,
    pub metadata: AssetMetadata,
    pub status: String,
    pub score: u8,
    pub owner: String,
    pub token_id: String,
    pub transaction_ref: String,
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Status recorded for freshly minted vaults
pub const ACTIVE_STATUS: &str = "Active";

impl AssetRecord {
    /// Build the directory mirror of a confirmed mint
    pub fn from_mint(record: &TokenMetadata, mint: &MintResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            metadata: AssetMetadata {
                name: record.name.clone(),
                description: record.description.clone(),
                asset_type: record.asset_type.clone(),
                value: "0".to_string(),
            },
            status: ACTIVE_STATUS.to_string(),
            score: record.verification_score,
            owner: record.owner.to_string(),
            token_id: mint.token_id.clone(),
            transaction_ref: mint.transaction_ref.clone(),
            files: record.files.clone(),
            created_at: record.created_at,
        }
    }
}

impl From<&AssetDetails> for AssetMetadata {
    fn from(details: &AssetDetails) -> Self {
        Self {
            name: details.name.clone(),
            description: details.description.clone(),
            asset_type: details.asset_type.clone(),
            value: "0".to_string(),
        }
    }
}
