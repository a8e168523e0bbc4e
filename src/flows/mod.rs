/// Authentication Flow Controller
///
/// Drives the per-account state machine: registration, login, token
/// refresh, logout, password recovery and email verification. All
/// collaborators (stores, mail dispatcher) are injected at construction,
/// so tests run the full state machine against in-memory fakes.

mod recovery;
mod registration;
mod session;
mod verification;

pub use recovery::{ForgotPasswordCommand, ResetPasswordCommand};
pub use registration::RegisterCommand;
pub use session::{LoginCommand, RefreshedAccess};
pub use verification::ResendOutcome;

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::auth::{issue_token_pair, TokenPair};
use crate::configuration::{AuthSettings, JwtSettings, Settings};
use crate::email::MessageDispatcher;
use crate::error::AppError;
use crate::store::model::User;
use crate::store::{TokenStore, UserStore};

#[derive(Clone)]
pub struct AuthService {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub mailer: Arc<dyn MessageDispatcher>,
    pub jwt: JwtSettings,
    pub policy: AuthSettings,
    pub client_url: String,
}

/// Result of an operation that opened a session: the account plus its
/// freshly issued token pair.
#[derive(Debug)]
pub struct IssuedSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
    pub session_id: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        mailer: Arc<dyn MessageDispatcher>,
        settings: &Settings,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            jwt: settings.jwt.clone(),
            policy: settings.auth.clone(),
            client_url: settings.application.client_url.clone(),
        }
    }

    /// Mints an access/refresh pair and records the refresh token in the
    /// registry. Shared by registration and login.
    async fn open_session(&self, user: &User) -> Result<TokenPair, AppError> {
        let pair = issue_token_pair(&user.id, user.role, &self.jwt)?;
        let expires_at = Utc::now() + Duration::seconds(self.jwt.refresh_token_expiry);
        self.tokens
            .record(&pair.refresh_token, user.id, expires_at)
            .await?;
        Ok(pair)
    }
}
