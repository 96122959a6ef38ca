//! Normalization and validation of user-entered identity data. Everything here is
//! pure; a value that passes these checks can still be rejected by the backend.

use crate::auth::{error::ValidationError, types::NormalizedPhone};
use regex::Regex;

/// Prefix `raw` with the country code unless it already carries it, then check
/// the total length.
///
/// Separators are the caller's to strip; a longer number is rejected, never truncated.
///
/// # Errors
/// Returns [`ValidationError::InvalidPhoneLength`] unless the result is exactly
/// `country_prefix` plus `required_digits` characters long.
pub fn normalize_phone(
    raw: &str,
    country_prefix: &str,
    required_digits: usize,
) -> Result<NormalizedPhone, ValidationError> {
    let with_prefix = if raw.starts_with(country_prefix) {
        raw.to_string()
    } else {
        format!("{country_prefix}{raw}")
    };

    if with_prefix.chars().count() == country_prefix.chars().count() + required_digits {
        Ok(NormalizedPhone::new_unchecked(with_prefix))
    } else {
        Err(ValidationError::InvalidPhoneLength {
            expected_digits: required_digits,
        })
    }
}

/// Length and charset check for a one-time code.
#[must_use]
pub fn is_well_formed_code(code: &str, required_length: usize) -> bool {
    code.len() == required_length && code.chars().all(|c| c.is_ascii_digit())
}

/// Trim surrounding whitespace; the identity service matches addresses itself.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_string()
}

/// Basic `local@domain.tld` shape check on already-normalized input.
#[must_use]
pub fn is_well_formed_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}
