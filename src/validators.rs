/// Input validators for account identities.
///
/// Enforces length limits (DoS protection), format rules, and rejects
/// control characters before anything reaches the credential store.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_NAME_LENGTH: usize = 100;
const MIN_NAME_LENGTH: usize = 1;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).unwrap();

    // E.164-style phone number: optional +, 8 to 15 digits
    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?[0-9]{8,15}$").unwrap();
}

/// Validates an email address and returns its canonical (trimmed,
/// lowercased) form. Stored emails are always canonical, so lookups and
/// uniqueness checks are case-insensitive.
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort(
            "email".to_string(),
            MIN_EMAIL_LENGTH,
        ));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong(
            "email".to_string(),
            MAX_EMAIL_LENGTH,
        ));
    }

    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    // Local part over 64 characters is outside RFC 5321 limits.
    if let Some(at_pos) = trimmed.find('@') {
        if trimmed[..at_pos].len() > 64 {
            return Err(ValidationError::InvalidFormat("email".to_string()));
        }
    }

    Ok(trimmed.to_lowercase())
}

/// Canonical phone form: whitespace and separator characters removed.
/// Stored numbers use this form, and lookups must apply it too.
pub fn canonical_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
        .collect()
}

/// Validates a phone number and returns its canonical form.
pub fn is_valid_phone(phone: &str) -> Result<String, ValidationError> {
    let compact = canonical_phone(phone);

    if compact.is_empty() {
        return Err(ValidationError::EmptyField("phone number".to_string()));
    }

    if !PHONE_REGEX.is_match(&compact) {
        return Err(ValidationError::InvalidFormat("phone number".to_string()));
    }

    Ok(compact)
}

/// Validates a person name: non-empty, bounded length, no control characters.
pub fn is_valid_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() < MIN_NAME_LENGTH {
        return Err(ValidationError::TooShort(field.to_string(), MIN_NAME_LENGTH));
    }

    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }

    if trimmed.contains('\0') || trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}
