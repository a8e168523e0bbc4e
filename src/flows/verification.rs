/// Email verification: token consumption and resend.

use super::AuthService;
use crate::auth::new_verification_token;
use crate::email::{send_best_effort, templates};
use crate::error::{AppError, ValidationError};
use crate::store::model::User;

/// What a resend request produced. `Suppressed` covers unknown addresses,
/// which must be indistinguishable from `Sent` at the HTTP surface.
#[derive(Debug, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    Suppressed,
}

impl AuthService {
    /// Consumes a verification token. Tokens are single-use: the matched
    /// account's token is cleared before the welcome email goes out.
    pub async fn verify_email(&self, token: &str) -> Result<User, AppError> {
        let mut user = self
            .users
            .find_by_verification_token(token)
            .await?
            .ok_or(AppError::Validation(ValidationError::InvalidToken))?;

        user.email_verified = true;
        user.verification_token = None;
        self.users.save(&user).await?;

        if let Some(to) = &user.email {
            let tpl = templates::welcome(&user.first_name);
            send_best_effort(
                self.mailer.clone(),
                to.clone(),
                tpl.subject,
                tpl.html,
                tpl.text,
            );
        }

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user)
    }

    /// Regenerates the token and sends synchronously: the caller asked
    /// for this email specifically, so a provider outage is surfaced.
    pub async fn resend_verification(&self, email: &str) -> Result<ResendOutcome, AppError> {
        let email = email.trim().to_lowercase();

        let mut user = match self.users.find_by_identity(Some(&email), None).await? {
            Some(user) => user,
            None => {
                tracing::info!("Verification resend requested for unknown email");
                return Ok(ResendOutcome::Suppressed);
            }
        };

        if user.email_verified {
            return Err(AppError::Validation(ValidationError::AlreadyVerified));
        }

        user.verification_token = Some(new_verification_token());
        self.users.save(&user).await?;

        let token = user.verification_token.as_deref().unwrap_or_default();
        let tpl = templates::verify_email(&self.client_url, token, &user.first_name);
        self.mailer
            .send(&email, &tpl.subject, &tpl.html, &tpl.text)
            .await?;

        tracing::info!(user_id = %user.id, "Verification email resent");
        Ok(ResendOutcome::Sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::registration::RegisterCommand;
    use crate::flows::session::LoginCommand;
    use crate::flows::test_support::{harness, settle, TestHarness};
    use crate::store::UserStore;

    async fn registered(h: &TestHarness, email: &str) -> crate::flows::IssuedSession {
        h.service
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
            .unwrap()
    }

    #[tokio::test]
    async fn verify_marks_account_and_clears_token() {
        let h = harness();
        let session = registered(&h, "a@x.com").await;
        let token = session.user.verification_token.clone().unwrap();

        let user = h.service.verify_email(&token).await.unwrap();
        assert!(user.email_verified);
        assert!(user.verification_token.is_none());

        // The token is single-use.
        let err = h.service.verify_email(&token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn verification_unblocks_login() {
        let h = harness();
        let session = registered(&h, "a@x.com").await;
        let token = session.user.verification_token.clone().unwrap();

        h.service.verify_email(&token).await.unwrap();

        h.service
            .login(LoginCommand {
                email: Some("a@x.com".to_string()),
                phone_number: None,
                password: "Str0ng!Pass1".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_sends_welcome_email() {
        let h = harness();
        let session = registered(&h, "a@x.com").await;
        settle().await;
        let before = h.mailer.sent_count();

        let token = session.user.verification_token.clone().unwrap();
        h.service.verify_email(&token).await.unwrap();
        settle().await;

        assert_eq!(h.mailer.sent_count(), before + 1);
        let sent = h.mailer.last().unwrap();
        assert_eq!(sent.to, "a@x.com");
        assert!(sent.subject.contains("Welcome"));
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let h = harness();
        let err = h.service.verify_email("no-such-token").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn resend_regenerates_token() {
        let h = harness();
        let session = registered(&h, "a@x.com").await;
        let original = session.user.verification_token.clone().unwrap();

        let outcome = h.service.resend_verification("a@x.com").await.unwrap();
        assert_eq!(outcome, ResendOutcome::Sent);

        let current = h
            .users
            .find_by_id(session.user.id)
            .await
            .unwrap()
            .unwrap()
            .verification_token
            .unwrap();
        assert_ne!(original, current);

        // The old token no longer verifies; the new one does.
        assert!(h.service.verify_email(&original).await.is_err());
        assert!(h.service.verify_email(&current).await.is_ok());
    }

    #[tokio::test]
    async fn resend_for_unknown_email_is_suppressed() {
        let h = harness();
        let outcome = h
            .service
            .resend_verification("nobody@x.com")
            .await
            .unwrap();
        assert_eq!(outcome, ResendOutcome::Suppressed);
        assert_eq!(h.mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn resend_for_verified_account_rejected() {
        let h = harness();
        let session = registered(&h, "a@x.com").await;
        let token = session.user.verification_token.clone().unwrap();
        h.service.verify_email(&token).await.unwrap();

        let err = h.service.resend_verification("a@x.com").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::AlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn resend_surfaces_mailer_failure() {
        let h = harness();
        registered(&h, "a@x.com").await;
        settle().await;
        h.mailer.set_failing(true);

        let err = h.service.resend_verification("a@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::Email(_)));
    }
}
