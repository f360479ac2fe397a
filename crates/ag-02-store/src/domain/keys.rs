//! Key string validation and data-type prefix extraction (spec section 4.2).

use crate::domain::errors::StoreError;

pub const MAX_KEY_LEN: usize = 1024;

/// Validate a store key: printable, length-bounded, restricted to
/// `[A-Za-z0-9 _ \- . :]` (spec section 4.2).
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidInput("key must not be empty".into()));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StoreError::InvalidInput(format!("key exceeds {MAX_KEY_LEN} bytes")));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-' | '.' | ':')) {
        return Err(StoreError::InvalidInput("key contains characters outside [A-Za-z0-9 _-.:]".into()));
    }
    Ok(())
}

/// The logical data-type prefix used for access-control decisions: the
/// substring before the first `:`, or the whole key if there is none.
#[must_use]
pub fn data_type_prefix(key: &str) -> &str {
    key.split_once(':').map_or(key, |(prefix, _)| prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_keys() {
        assert!(validate_key("token:abc-123.v1").is_ok());
        assert!(validate_key("node:state:validator-1").is_ok());
    }

    #[test]
    fn rejects_disallowed_characters() {
        assert!(validate_key("token:abc/123").is_err());
        assert!(validate_key("token:abc@123").is_err());
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(validate_key("").is_err());
        let long = "a".repeat(MAX_KEY_LEN + 1);
        assert!(validate_key(&long).is_err());
    }

    #[test]
    fn prefix_is_substring_before_first_colon() {
        assert_eq!(data_type_prefix("node:state:validator-1"), "node");
        assert_eq!(data_type_prefix("balance:acct1"), "balance");
        assert_eq!(data_type_prefix("no-colon"), "no-colon");
    }
}
