//! Vault creation session state machine
//!
//! A session progresses through 4 stages:
//! DETAILS → EVIDENCE → REVIEW → COMPLETE
//!
//! Back transitions only move within DETAILS..=REVIEW. COMPLETE is terminal.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::workflow::EvidenceStore;

/// Field name → user-facing message
pub type FieldErrors = BTreeMap<String, String>;

/// Position of a session in the vault creation flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    /// Asset type, name and description entry
    Details,
    /// Evidence upload and AI verification
    Evidence,
    /// Verification review and mint
    Review,
    /// Vault minted
    Complete,
}

impl Stage {
    /// 1-based step number shown by the presentation layer
    pub fn number(self) -> u8 {
        match self {
            Self::Details => 1,
            Self::Evidence => 2,
            Self::Review => 3,
            Self::Complete => 4,
        }
    }

    /// Stage reached by a back transition, if any
    pub fn previous(self) -> Option<Stage> {
        match self {
            Self::Evidence => Some(Self::Details),
            Self::Review => Some(Self::Evidence),
            Self::Details | Self::Complete => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Details => "DETAILS",
            Self::Evidence => "EVIDENCE",
            Self::Review => "REVIEW",
            Self::Complete => "COMPLETE",
        };
        f.write_str(name)
    }
}

/// Asset details entered on the first stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDetails {
    /// Asset type catalog id (e.g. "real-estate")
    #[serde(rename = "type")]
    pub asset_type: String,
    pub name: String,
    pub description: String,
}

/// Editable asset detail field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailField {
    #[serde(alias = "type")]
    AssetType,
    Name,
    Description,
}

impl DetailField {
    /// Key used in `Session::field_errors`
    pub fn error_key(self) -> &'static str {
        match self {
            Self::AssetType => "assetType",
            Self::Name => "assetName",
            Self::Description => "assetDescription",
        }
    }
}

impl AssetDetails {
    pub fn get(&self, field: DetailField) -> &str {
        match field {
            DetailField::AssetType => &self.asset_type,
            DetailField::Name => &self.name,
            DetailField::Description => &self.description,
        }
    }

    pub fn set(&mut self, field: DetailField, value: String) {
        match field {
            DetailField::AssetType => self.asset_type = value,
            DetailField::Name => self.name = value,
            DetailField::Description => self.description = value,
        }
    }
}

/// Coarse file classification used for evidence filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeClass {
    Image,
    Pdf,
    Document,
    Rejected,
}

impl MimeClass {
    /// Classify a MIME type string
    ///
    /// `image/*` → image, `application/pdf` → pdf, anything mentioning
    /// "document" (e.g. DOCX, ODT) → document, everything else is rejected.
    pub fn classify(mime_type: &str) -> Self {
        let mime = mime_type.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime == "application/pdf" {
            Self::Pdf
        } else if mime.contains("document") {
            Self::Document
        } else {
            Self::Rejected
        }
    }

    pub fn is_accepted(self) -> bool {
        !matches!(self, Self::Rejected)
    }
}

/// File offered for attachment, before filtering
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub display_name: String,
    pub mime_type: String,
    pub content: Bytes,
}

impl CandidateFile {
    pub fn new(display_name: impl Into<String>, mime_type: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: mime_type.into(),
            content: content.into(),
        }
    }
}

/// Evidence file attached to a session
#[derive(Debug, Clone, Serialize)]
pub struct AttachedFile {
    pub display_name: String,
    pub byte_size: u64,
    pub mime_class: MimeClass,
    pub mime_type: String,
    /// Raw file content (not part of JSON snapshots)
    #[serde(skip)]
    pub content: Bytes,
}

/// Status of the session-level verification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerificationStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

/// Per-file verdict reported by the Verification Service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileVerdict {
    #[serde(alias = "Verified")]
    Accepted,
    Rejected,
}

/// Verification result for one evidence file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileVerification {
    pub file_name: String,
    pub status: FileVerdict,
    /// Confidence score 0..=100
    pub score: u8,
    /// Reason for a forced rejection (unreachable service, malformed response)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Session-level verification state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerificationState {
    pub status: VerificationStatus,
    /// Rounded mean of per-file scores, 0..=100
    pub aggregate_score: u8,
    pub per_file_results: Vec<FileVerification>,
}

/// Terminal mint confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResult {
    pub token_id: String,
    pub transaction_ref: String,
}

/// Connected wallet address (`0x` + 40 hex digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize a wallet address to lowercase
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let hex = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
        if hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            Some(Self(format!("0x{}", hex.to_ascii_lowercase())))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stage transition record
#[derive(Debug, Clone, Serialize)]
pub struct StageTransition {
    pub session_id: Uuid,
    pub old_stage: Stage,
    pub new_stage: Stage,
    pub transitioned_at: DateTime<Utc>,
}

/// One vault creation attempt
///
/// Snapshots handed to the presentation layer are clones of this struct.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub session_id: Uuid,
    pub stage: Stage,
    pub asset_details: AssetDetails,
    pub evidence: EvidenceStore,
    pub verification: VerificationState,
    pub mint_result: Option<MintResult>,
    pub field_errors: FieldErrors,
    /// True exactly while an asynchronous transition is outstanding
    pub busy: bool,
    /// Connected wallet (requester identity for minting)
    pub requester: Option<WalletAddress>,
    /// Non-fatal warnings (e.g. asset directory mirror failures)
    pub warnings: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session at the `Details` stage
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            stage: Stage::Details,
            asset_details: AssetDetails::default(),
            evidence: EvidenceStore::default(),
            verification: VerificationState::default(),
            mint_result: None,
            field_errors: FieldErrors::new(),
            busy: false,
            requester: None,
            warnings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition to a new stage
    pub fn transition_to(&mut self, new_stage: Stage) -> StageTransition {
        let transition = StageTransition {
            session_id: self.session_id,
            old_stage: self.stage,
            new_stage,
            transitioned_at: Utc::now(),
        };
        self.stage = new_stage;
        self.touch();
        transition
    }

    /// Discard a previous verification outcome
    ///
    /// Called whenever evidence or asset details change, since the old outcome
    /// no longer describes the session.
    pub fn invalidate_verification(&mut self) {
        if self.verification.status != VerificationStatus::Idle {
            self.verification = VerificationState::default();
            self.field_errors.remove(VERIFICATION_ERROR_KEY);
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Field error key for a failed verification
pub const VERIFICATION_ERROR_KEY: &str = "verification";

/// Field error key for a failed mint
pub const MINT_ERROR_KEY: &str = "mint";
