/// JWT claims for access and refresh tokens.
///
/// Both token kinds carry the same payload (account id, role and the
/// session id binding an access/refresh pair) plus standard RFC 7519
/// claims. They differ only in expiry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::store::model::Role;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account id as UUID string)
    pub sub: String,
    /// Account role
    pub role: Role,
    /// Session id binding an access/refresh pair
    pub sid: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        role: Role,
        session_id: String,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            role,
            sid: session_id,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the account id from the claims.
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::Internal("Invalid account id in token".to_string()))
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            Role::Therapist,
            "session-1".to_string(),
            3600,
            "mentwel".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, Role::Therapist);
        assert_eq!(claims.sid, "session-1");
        assert_eq!(claims.iss, "mentwel");
        assert!(!claims.is_expired());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            Role::User,
            "session-1".to_string(),
            3600,
            "mentwel".to_string(),
        );

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn invalid_user_id() {
        let mut claims = Claims::new(
            Uuid::new_v4(),
            Role::User,
            "session-1".to_string(),
            3600,
            "mentwel".to_string(),
        );
        claims.sub = "not-a-uuid".to_string();

        assert!(claims.user_id().is_err());
    }
}
