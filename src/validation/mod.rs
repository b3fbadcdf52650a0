//! # Validation
//!
//! Name rules shared by project groups, projects and secrets. A name starts
//! with a letter, contains only letters, digits and single dashes, does not
//! end with a dash and is at least two characters long. Anything that parses
//! as a UUID is reserved for IDs, so it is never a valid name.

use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;
use validator::ValidationError;

use crate::errors::{CanopyError, Result};

/// Upper bound on a single name segment
pub const MAX_NAME_LENGTH: usize = 255;

lazy_static! {
    /// Object and secret names
    static ref NAME_REGEX: Regex =
        Regex::new(r"^[a-zA-Z][a-zA-Z0-9]*([-]?[a-zA-Z0-9]+)+$").unwrap();
}

/// Validate a name; usable as a `validator` custom function
pub fn validate_name(name: &str) -> std::result::Result<(), ValidationError> {
    if name.len() > MAX_NAME_LENGTH || !NAME_REGEX.is_match(name) {
        return Err(ValidationError::new("invalid_name"));
    }
    if Uuid::try_parse(name).is_ok() {
        return Err(ValidationError::new("name_is_uuid"));
    }
    Ok(())
}

/// Validate a name and report a `BadRequest` carrying the offending field
pub fn ensure_valid_name(name: &str, field: &str) -> Result<()> {
    validate_name(name).map_err(|_| {
        CanopyError::bad_request_field(format!("invalid {} {:?}", field, name), field)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["ab", "acme", "deploy-key", "a1-b2-c3", "TokenV2"] {
            assert!(validate_name(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "a", "1abc", "-abc", "abc-", "ab--cd", "ab_cd", "ab/cd", "ab cd"] {
            assert!(validate_name(name).is_err(), "{:?} should be invalid", name);
        }
    }

    #[test]
    fn test_uuid_shaped_names_are_reserved() {
        for name in [
            "deadbeefdeadbeefdeadbeefdeadbeef",
            "a0000000-0000-0000-0000-000000000000",
            "DEADBEEF-DEAD-BEEF-DEAD-BEEFDEADBEEF",
        ] {
            assert!(validate_name(name).is_err(), "{:?} should be reserved", name);
        }
        assert!(validate_name("deadbeef").is_ok());
    }

    #[test]
    fn test_too_long_name() {
        let name = format!("a{}", "b".repeat(MAX_NAME_LENGTH));
        assert!(validate_name(&name).is_err());
    }

    #[test]
    fn test_ensure_valid_name_reports_field() {
        let err = ensure_valid_name("1bad", "secret name").unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::BadRequest);
    }
}
