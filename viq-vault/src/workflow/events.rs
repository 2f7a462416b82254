//! Vault workflow events for SSE broadcasting

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use viq_common::events::NamedEvent;

use crate::models::Stage;

/// Events emitted by workflow engines on the shared bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VaultEvent {
    /// Session created
    SessionCreated { session_id: Uuid },

    /// Stage changed (forward, back or reset)
    StageChanged {
        session_id: Uuid,
        old_stage: Stage,
        new_stage: Stage,
    },

    /// Evidence dispatched to the Verification Service
    VerificationStarted { session_id: Uuid, file_count: usize },

    /// Every file accepted
    VerificationCompleted { session_id: Uuid, aggregate_score: u8 },

    /// At least one file rejected or unverifiable
    VerificationFailed {
        session_id: Uuid,
        aggregate_score: u8,
        rejected_files: Vec<String>,
    },

    /// Mint attempt started
    MintStarted { session_id: Uuid },

    /// Ledger confirmed the vault
    MintCompleted {
        session_id: Uuid,
        token_id: String,
        transaction_ref: String,
    },

    /// Mint attempt failed in one of its phases
    MintFailed { session_id: Uuid, message: String },

    /// Vault minted but the Asset Directory mirror failed
    DirectoryWarning { session_id: Uuid, message: String },
}

impl VaultEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionCreated { session_id }
            | Self::StageChanged { session_id, .. }
            | Self::VerificationStarted { session_id, .. }
            | Self::VerificationCompleted { session_id, .. }
            | Self::VerificationFailed { session_id, .. }
            | Self::MintStarted { session_id }
            | Self::MintCompleted { session_id, .. }
            | Self::MintFailed { session_id, .. }
            | Self::DirectoryWarning { session_id, .. } => *session_id,
        }
    }
}

impl NamedEvent for VaultEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "SessionCreated",
            Self::StageChanged { .. } => "StageChanged",
            Self::VerificationStarted { .. } => "VerificationStarted",
            Self::VerificationCompleted { .. } => "VerificationCompleted",
            Self::VerificationFailed { .. } => "VerificationFailed",
            Self::MintStarted { .. } => "MintStarted",
            Self::MintCompleted { .. } => "MintCompleted",
            Self::MintFailed { .. } => "MintFailed",
            Self::DirectoryWarning { .. } => "DirectoryWarning",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let id = Uuid::new_v4();
        let event = VaultEvent::StageChanged {
            session_id: id,
            old_stage: Stage::Evidence,
            new_stage: Stage::Review,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "stage_changed");
        assert_eq!(json["new_stage"], "REVIEW");
        assert_eq!(event.event_type(), "StageChanged");
        assert_eq!(event.session_id(), id);
    }
}
