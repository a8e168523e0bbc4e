/// Token Issuer
///
/// Mints and verifies the signed access/refresh tokens. Tokens are
/// stateless and self-describing; refresh-token persistence belongs to
/// the registry, never here.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::store::model::Role;

/// A freshly minted access/refresh pair sharing one session id.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
}

/// Issue an access/refresh pair bound to a fresh random session id.
pub fn issue_token_pair(
    user_id: &Uuid,
    role: Role,
    config: &JwtSettings,
) -> Result<TokenPair, AppError> {
    let session_id = Uuid::new_v4().to_string();

    let access_token = sign(Claims::new(
        *user_id,
        role,
        session_id.clone(),
        config.access_token_expiry,
        config.issuer.clone(),
    ), config)?;
    let refresh_token = sign(Claims::new(
        *user_id,
        role,
        session_id.clone(),
        config.refresh_token_expiry,
        config.issuer.clone(),
    ), config)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        session_id,
    })
}

/// Issue a new access token reusing an existing session id (refresh path;
/// the refresh token itself is not rotated).
pub fn issue_access_token(
    user_id: &Uuid,
    role: Role,
    session_id: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    sign(
        Claims::new(
            *user_id,
            role,
            session_id.to_string(),
            config.access_token_expiry,
            config.issuer.clone(),
        ),
        config,
    )
}

fn sign(claims: Claims, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate a token's signature, expiry and issuer, and extract its claims.
///
/// # Errors
/// `AuthError::TokenExpired` when only the expiry failed;
/// `AuthError::TokenInvalid` for signature or structural problems.
pub fn verify_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Auth(AuthError::TokenExpired)
            }
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            issuer: "mentwel-test".to_string(),
        }
    }

    #[test]
    fn issue_pair_then_verify_round_trips() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let pair = issue_token_pair(&user_id, Role::User, &config).expect("Failed to issue pair");

        let access = verify_token(&pair.access_token, &config).expect("access invalid");
        let refresh = verify_token(&pair.refresh_token, &config).expect("refresh invalid");

        assert_eq!(access.user_id().unwrap(), user_id);
        assert_eq!(access.role, Role::User);
        assert_eq!(access.sid, pair.session_id);
        assert_eq!(refresh.sid, pair.session_id);
        assert!(access.exp > chrono::Utc::now().timestamp());
        assert!(refresh.exp > access.exp);
    }

    #[test]
    fn access_token_reuses_session_id() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = issue_access_token(&user_id, Role::Therapist, "existing-session", &config)
            .expect("Failed to issue token");
        let claims = verify_token(&token, &config).expect("Failed to verify");

        assert_eq!(claims.sid, "existing-session");
        assert_eq!(claims.role, Role::Therapist);
    }

    #[test]
    fn garbage_token_is_invalid() {
        let config = get_test_config();
        let result = verify_token("invalid.token.here", &config);

        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::TokenInvalid))
        ));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let config = get_test_config();
        let pair = issue_token_pair(&Uuid::new_v4(), Role::User, &config).unwrap();

        let tampered = format!("{}X", pair.access_token);
        assert!(verify_token(&tampered, &config).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut config = get_test_config();
        let pair = issue_token_pair(&Uuid::new_v4(), Role::User, &config).unwrap();

        config.issuer = "someone-else".to_string();
        assert!(verify_token(&pair.access_token, &config).is_err());
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let config = get_test_config();
        // Validation leeway is 60s, so back-date well past it.
        let claims = Claims::new(
            Uuid::new_v4(),
            Role::User,
            "session-1".to_string(),
            -300,
            config.issuer.clone(),
        );
        let token = sign(claims, &config).unwrap();

        assert!(matches!(
            verify_token(&token, &config),
            Err(AppError::Auth(AuthError::TokenExpired))
        ));
    }
}
