/// Session lifecycle: login, refresh, logout.
///
/// Refresh tokens are dual-checked: the signature must verify AND a live
/// registry record must exist, so a leaked-but-revoked token cannot be
/// replayed before its embedded expiry elapses.

use super::{AuthService, IssuedSession};
use crate::auth::{issue_access_token, verify_password_async, verify_token};
use crate::error::{AppError, AuthError};
use crate::validators::canonical_phone;

#[derive(Debug, Clone)]
pub struct LoginCommand {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

/// Outcome of a refresh: a new access token bound to the existing session
/// id. The refresh token itself is not rotated.
#[derive(Debug)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub session_id: String,
}

impl AuthService {
    pub async fn login(&self, cmd: LoginCommand) -> Result<IssuedSession, AppError> {
        // Canonicalize the way registration stores identities (lowercased
        // email, separator-free phone); anything that fails lookup falls
        // through to the uniform credentials error.
        let email = cmd.email.as_deref().map(|e| e.trim().to_lowercase());
        let phone = cmd.phone_number.as_deref().map(canonical_phone);

        let user = self
            .users
            .find_by_identity(email.as_deref(), phone.as_deref())
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        let password_valid =
            verify_password_async(cmd.password, user.password_hash.clone()).await?;
        if !password_valid {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        if user.status != crate::store::model::UserStatus::Active {
            return Err(AppError::Auth(AuthError::AccountNotActive));
        }

        // Phone-only accounts are exempt: no flow consumes phone codes.
        if self.policy.require_verified_email && user.email.is_some() && !user.email_verified {
            return Err(AppError::Auth(AuthError::VerificationRequired));
        }

        let pair = self.open_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in successfully");

        Ok(IssuedSession {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            session_id: pair.session_id,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AppError> {
        let claims = verify_token(refresh_token, &self.jwt)?;
        let user_id = claims.user_id()?;

        if !self.tokens.is_live(refresh_token, user_id).await? {
            tracing::warn!(user_id = %user_id, "Refresh attempt with revoked or unknown token");
            return Err(AppError::Auth(AuthError::TokenRevoked));
        }

        let access_token = issue_access_token(&user_id, claims.role, &claims.sid, &self.jwt)?;

        Ok(RefreshedAccess {
            access_token,
            session_id: claims.sid,
        })
    }

    /// Idempotent: revoking a token that was never recorded (or already
    /// revoked) is a successful no-op.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        self.tokens.revoke(refresh_token).await
    }
}
