//! Input validation for counter configuration and requests

use crate::contract::{CounterSettings, DocumentsError, NewCounter};
use uuid::Uuid;

/// Allowed zero-padding widths
pub const PADDING_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// Validate the zero-padding width of a counter
pub fn validate_padding_length(padding_length: u8) -> Result<(), DocumentsError> {
    if !PADDING_RANGE.contains(&padding_length) {
        return Err(DocumentsError::validation(format!(
            "padding_length must be between {} and {}, got {}",
            PADDING_RANGE.start(),
            PADDING_RANGE.end(),
            padding_length
        )));
    }
    Ok(())
}

/// Validate a required document type identifier
pub fn validate_document_type_id(document_type_id: Uuid) -> Result<(), DocumentsError> {
    if document_type_id.is_nil() {
        return Err(DocumentsError::validation("document_type_id is required"));
    }
    Ok(())
}

/// Validate counter configuration
pub fn validate_settings(settings: &CounterSettings) -> Result<(), DocumentsError> {
    validate_padding_length(settings.padding_length)?;

    if let Some(pattern) = &settings.format_pattern {
        if !pattern.contains("{NUMBER}") {
            return Err(DocumentsError::validation(format!(
                "format_pattern '{}' must contain the {{NUMBER}} placeholder",
                pattern
            )));
        }
    }

    Ok(())
}

/// Validate an explicit counter creation request
pub fn validate_new_counter(counter: &NewCounter) -> Result<(), DocumentsError> {
    validate_document_type_id(counter.key.document_type_id)?;
    validate_settings(&counter.settings)?;

    if counter.starting_value < 0 {
        return Err(DocumentsError::validation(format!(
            "starting_value must not be negative, got {}",
            counter.starting_value
        )));
    }

    if let Some(year) = counter.key.year {
        if year <= 0 {
            return Err(DocumentsError::validation(format!(
                "year must be positive, got {}",
                year
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::CounterKey;

    #[test]
    fn test_padding_bounds() {
        assert!(validate_padding_length(0).is_err());
        assert!(validate_padding_length(1).is_ok());
        assert!(validate_padding_length(10).is_ok());
        assert!(validate_padding_length(11).is_err());
    }

    #[test]
    fn test_nil_document_type_is_rejected() {
        assert!(validate_document_type_id(Uuid::nil()).is_err());
        assert!(validate_document_type_id(Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_pattern_requires_number_placeholder() {
        let settings = CounterSettings {
            format_pattern: Some("{PREFIX}/{YEAR}".to_string()),
            ..Default::default()
        };
        match validate_settings(&settings) {
            Err(DocumentsError::Validation { message }) => assert!(message.contains("{NUMBER}")),
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    #[test]
    fn test_new_counter_validation() {
        let valid = NewCounter {
            key: CounterKey::new(Uuid::new_v4(), "", Some(2024)),
            starting_value: 0,
            settings: CounterSettings::default(),
        };
        assert!(validate_new_counter(&valid).is_ok());

        let negative = NewCounter {
            starting_value: -1,
            ..valid.clone()
        };
        assert!(validate_new_counter(&negative).is_err());

        let bad_year = NewCounter {
            key: CounterKey::new(Uuid::new_v4(), "A", Some(0)),
            ..valid
        };
        assert!(validate_new_counter(&bad_year).is_err());
    }
}
