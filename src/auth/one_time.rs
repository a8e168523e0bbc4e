/// Single-use token generation: email verification tokens, phone
/// verification codes, and password-reset tokens. All are cleared the
/// moment they are consumed; reset tokens additionally expire.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Opaque email-verification token.
pub fn new_verification_token() -> String {
    Uuid::new_v4().to_string()
}

/// Six-digit phone verification code.
pub fn new_phone_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

/// Password-reset token with its absolute expiry.
pub fn new_reset_token(ttl_seconds: i64) -> (String, DateTime<Utc>) {
    (
        Uuid::new_v4().to_string(),
        Utc::now() + Duration::seconds(ttl_seconds),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_tokens_are_unique_uuids() {
        let a = new_verification_token();
        let b = new_verification_token();

        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn phone_code_is_six_digits() {
        for _ in 0..50 {
            let code = new_phone_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert!(!code.starts_with('0'));
        }
    }

    #[test]
    fn reset_token_expiry_honors_ttl() {
        let (token, expires_at) = new_reset_token(600);

        assert!(Uuid::parse_str(&token).is_ok());
        let remaining = expires_at - Utc::now();
        assert!(remaining > Duration::seconds(590));
        assert!(remaining <= Duration::seconds(600));
    }
}
