//! Stage-local input validation
//!
//! Pure predicates over a session. A non-empty result blocks the transition:
//! no stage advance and no external calls.

use crate::models::{is_known_asset_type, AssetDetails, DetailField, FieldErrors, Session, Stage};

/// Field error key for an empty evidence list
pub const FILES_ERROR_KEY: &str = "files";

/// Validate the inputs required to leave `stage`
pub fn validate(stage: Stage, session: &Session) -> FieldErrors {
    let mut errors = FieldErrors::new();

    match stage {
        Stage::Details => {
            for field in [DetailField::AssetType, DetailField::Name, DetailField::Description] {
                if let Some(message) = check_field(&session.asset_details, field) {
                    errors.insert(field.error_key().to_string(), message.to_string());
                }
            }
        }
        Stage::Evidence => {
            if session.evidence.is_empty() {
                errors.insert(
                    FILES_ERROR_KEY.to_string(),
                    "Please upload at least one file".to_string(),
                );
            }
        }
        Stage::Review | Stage::Complete => {}
    }

    errors
}

/// Check a single detail field, returning the error message if invalid
pub fn check_field(details: &AssetDetails, field: DetailField) -> Option<&'static str> {
    let value = details.get(field);
    match field {
        DetailField::AssetType if !is_known_asset_type(value) => Some("Please select an asset type"),
        DetailField::Name if value.trim().is_empty() => Some("Asset name is required"),
        DetailField::Description if value.trim().is_empty() => {
            Some("Asset description is required")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateFile;

    fn session_with(asset_type: &str, name: &str, description: &str) -> Session {
        let mut session = Session::new();
        session.asset_details = AssetDetails {
            asset_type: asset_type.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        };
        session
    }

    #[test]
    fn test_valid_details_pass() {
        let session = session_with("real-estate", "Manhattan Apartment", "Two bedrooms");
        assert!(validate(Stage::Details, &session).is_empty());
    }

    #[test]
    fn test_all_details_missing() {
        let session = session_with("", "  ", "\n\t");
        let errors = validate(Stage::Details, &session);
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["assetType"], "Please select an asset type");
        assert_eq!(errors["assetName"], "Asset name is required");
        assert_eq!(errors["assetDescription"], "Asset description is required");
    }

    #[test]
    fn test_unknown_asset_type_rejected() {
        let session = session_with("spaceship", "Name", "Description");
        let errors = validate(Stage::Details, &session);
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("assetType"));
    }

    #[test]
    fn test_evidence_requires_a_file() {
        let mut session = Session::new();
        let errors = validate(Stage::Evidence, &session);
        assert_eq!(errors[FILES_ERROR_KEY], "Please upload at least one file");

        session
            .evidence
            .add(vec![CandidateFile::new("photo.jpg", "image/jpeg", vec![0u8; 16])]);
        assert!(validate(Stage::Evidence, &session).is_empty());
    }

    #[test]
    fn test_later_stages_have_no_local_checks() {
        let session = Session::new();
        assert!(validate(Stage::Review, &session).is_empty());
        assert!(validate(Stage::Complete, &session).is_empty());
    }
}
