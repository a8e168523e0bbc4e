/// Password recovery: reset-link issuance and consumption.
///
/// Forgot-password never reveals whether an address exists. A consumed
/// reset token revokes every live session for the account.

use super::AuthService;
use crate::auth::{hash_password_async, new_reset_token};
use crate::email::{send_best_effort, templates};
use crate::error::{AppError, ValidationError};

#[derive(Debug, Clone)]
pub struct ForgotPasswordCommand {
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct ResetPasswordCommand {
    pub token: String,
    pub new_password: String,
}

impl AuthService {
    /// Succeeds whether or not the address is registered. Issuing a new
    /// token invalidates any earlier one for the same account.
    pub async fn forgot_password(&self, cmd: ForgotPasswordCommand) -> Result<(), AppError> {
        let email = cmd.email.trim().to_lowercase();

        let mut user = match self.users.find_by_identity(Some(&email), None).await? {
            Some(user) => user,
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let (token, expires_at) = new_reset_token(self.policy.reset_token_ttl);
        user.reset_password_token = Some(token.clone());
        user.reset_password_expires = Some(expires_at);
        self.users.save(&user).await?;

        let tpl = templates::reset_password(&self.client_url, &token, &user.first_name);
        send_best_effort(
            self.mailer.clone(),
            email,
            tpl.subject,
            tpl.html,
            tpl.text,
        );

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    pub async fn reset_password(&self, cmd: ResetPasswordCommand) -> Result<(), AppError> {
        // The store only returns accounts whose token is unexpired, so a
        // stale link and a bogus token are indistinguishable here.
        let mut user = self
            .users
            .find_by_reset_token(&cmd.token)
            .await?
            .ok_or(AppError::Validation(ValidationError::InvalidToken))?;

        user.password_hash = hash_password_async(cmd.new_password).await?;
        user.reset_password_token = None;
        user.reset_password_expires = None;
        self.users.save(&user).await?;

        let revoked = self.tokens.revoke_all(user.id).await?;
        tracing::info!(
            user_id = %user.id,
            sessions_revoked = revoked,
            "Password reset completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::flows::registration::RegisterCommand;
    use crate::flows::session::LoginCommand;
    use crate::flows::test_support::{harness, settle, TestHarness};
    use crate::store::UserStore;

    async fn registered_verified(h: &TestHarness, email: &str) -> crate::flows::IssuedSession {
        let session = h
            .service
            .register(RegisterCommand {
                email: Some(email.to_string()),
                phone_number: None,
                password: "Str0ng!Pass1".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Obi".to_string(),
                date_of_birth: "1990-01-01".to_string(),
                gender: None,
                country: None,
                accept_terms: true,
                role: None,
            })
            .await
            .unwrap();

        let mut user = h.users.find_by_id(session.user.id).await.unwrap().unwrap();
        user.email_verified = true;
        user.verification_token = None;
        h.users.save(&user).await.unwrap();
        session
    }

    async fn reset_token_of(h: &TestHarness, email: &str) -> String {
        h.users
            .find_by_identity(Some(email), None)
            .await
            .unwrap()
            .unwrap()
            .reset_password_token
            .expect("no reset token set")
    }

    #[tokio::test]
    async fn forgot_password_sets_token_and_sends_email() {
        let h = harness();
        registered_verified(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        settle().await;

        let token = reset_token_of(&h, "a@x.com").await;
        let sent = h.mailer.last().expect("no reset email captured");
        assert_eq!(sent.to, "a@x.com");
        assert!(sent.html.contains(&token));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_is_silent_success() {
        let h = harness();

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "nobody@x.com".to_string(),
            })
            .await
            .unwrap();
        settle().await;

        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn new_reset_token_replaces_the_old_one() {
        let h = harness();
        registered_verified(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let first = reset_token_of(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let second = reset_token_of(&h, "a@x.com").await;
        assert_ne!(first, second);

        let err = h
            .service
            .reset_password(ResetPasswordCommand {
                token: first,
                new_password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reset_changes_password_and_clears_token() {
        let h = harness();
        registered_verified(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let token = reset_token_of(&h, "a@x.com").await;

        h.service
            .reset_password(ResetPasswordCommand {
                token: token.clone(),
                new_password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap();

        // Old password no longer authenticates, new one does.
        let old = h
            .service
            .login(LoginCommand {
                email: Some("a@x.com".to_string()),
                phone_number: None,
                password: "Str0ng!Pass1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(old, AppError::Auth(AuthError::InvalidCredentials)));

        h.service
            .login(LoginCommand {
                email: Some("a@x.com".to_string()),
                phone_number: None,
                password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap();

        // Single-use: the same token cannot be consumed twice.
        let replay = h
            .service
            .reset_password(ResetPasswordCommand {
                token,
                new_password: "An0ther!Pass1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            replay,
            AppError::Validation(ValidationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reset_revokes_every_live_session() {
        let h = harness();
        let first = registered_verified(&h, "a@x.com").await;
        let second = h
            .service
            .login(LoginCommand {
                email: Some("a@x.com".to_string()),
                phone_number: None,
                password: "Str0ng!Pass1".to_string(),
            })
            .await
            .unwrap();

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let token = reset_token_of(&h, "a@x.com").await;

        h.service
            .reset_password(ResetPasswordCommand {
                token,
                new_password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap();

        for refresh_token in [&first.refresh_token, &second.refresh_token] {
            let err = h.service.refresh(refresh_token).await.unwrap_err();
            assert!(matches!(err, AppError::Auth(AuthError::TokenRevoked)));
        }
        assert_eq!(h.tokens.live_count(first.user.id), 0);
    }

    #[tokio::test]
    async fn expired_reset_token_is_rejected() {
        let h = harness();
        registered_verified(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();

        // Age the token past its window.
        let mut user = h
            .users
            .find_by_identity(Some("a@x.com"), None)
            .await
            .unwrap()
            .unwrap();
        let token = user.reset_password_token.clone().unwrap();
        user.reset_password_expires =
            Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        h.users.save(&user).await.unwrap();

        let err = h
            .service
            .reset_password(ResetPasswordCommand {
                token,
                new_password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reset_enforces_password_strength() {
        let h = harness();
        registered_verified(&h, "a@x.com").await;

        h.service
            .forgot_password(ForgotPasswordCommand {
                email: "a@x.com".to_string(),
            })
            .await
            .unwrap();
        let token = reset_token_of(&h, "a@x.com").await;

        let err = h
            .service
            .reset_password(ResetPasswordCommand {
                token: token.clone(),
                new_password: "weak".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // The failed attempt did not consume the token.
        h.service
            .reset_password(ResetPasswordCommand {
                token,
                new_password: "N3w!Password1".to_string(),
            })
            .await
            .unwrap();
    }
}
