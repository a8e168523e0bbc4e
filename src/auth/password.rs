/// Password Hashing and Verification
///
/// bcrypt with cost 12: slow enough that verification takes tens of
/// milliseconds. The async wrappers run the CPU-bound work on the blocking
/// pool so it never stalls the request-handling threads.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 128;

/// Hash a password after validating the strength policy.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    validate_password_strength(password)?;

    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a candidate password against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Off-thread variant of [`hash_password`] for request handlers.
pub async fn hash_password_async(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Off-thread variant of [`verify_password`] for request handlers.
pub async fn verify_password_async(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))?
}

/// Password policy: 8-128 characters with at least one digit, one
/// lowercase and one uppercase letter.
fn validate_password_strength(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        )));
    }

    // bcrypt truncates long inputs; also a DoS guard.
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(AppError::Validation(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_LENGTH,
        )));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(AppError::Validation(ValidationError::InvalidFormat(
            "password must contain at least one digit, one lowercase letter, and one uppercase letter"
                .to_string(),
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_plaintext() {
        let password = "Str0ng!Password";
        let hash = hash_password(password).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn correct_password_verifies() {
        let password = "Str0ng!Password";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash).expect("Failed to verify"));
    }

    #[test]
    fn wrong_password_fails_verification() {
        let hash = hash_password("Str0ng!Password").expect("Failed to hash password");

        assert!(!verify_password("Wr0ng!Password", &hash).expect("Failed to verify"));
    }

    #[test]
    fn same_password_yields_distinct_hashes() {
        // Salted hashing: direct hash comparison must never be used.
        let h1 = hash_password("Str0ng!Password").unwrap();
        let h2 = hash_password("Str0ng!Password").unwrap();
        assert_ne!(h1, h2);
        assert!(verify_password("Str0ng!Password", &h1).unwrap());
        assert!(verify_password("Str0ng!Password", &h2).unwrap());
    }

    #[test]
    fn too_short_password_rejected() {
        assert!(hash_password("Sh0rt").is_err());
    }

    #[test]
    fn too_long_password_rejected() {
        let long_password = format!("A1{}", "a".repeat(MAX_PASSWORD_LENGTH));
        assert!(hash_password(&long_password).is_err());
    }

    #[test]
    fn weak_passwords_rejected() {
        assert!(hash_password("nodigitshere").is_err());
        assert!(hash_password("NOLOWERCASE1").is_err());
        assert!(hash_password("nouppercase1").is_err());
    }

    #[tokio::test]
    async fn async_wrappers_round_trip() {
        let hash = hash_password_async("Str0ng!Password".to_string())
            .await
            .expect("hash failed");
        assert!(
            verify_password_async("Str0ng!Password".to_string(), hash)
                .await
                .expect("verify failed")
        );
    }
}
