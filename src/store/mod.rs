/// Persistence layer: credential store and refresh token registry.
///
/// Both stores are trait objects injected into the flow controller, so the
/// Postgres implementations can be swapped for the in-memory ones in tests
/// and database-less local runs.

pub mod memory;
pub mod model;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;
use model::{NewUser, User};

/// Credential store: account identity, hashed secret and
/// verification/reset state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Looks up an account by either unique identity. Returns `None` when
    /// neither identity is supplied or no account matches.
    async fn find_by_identity(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Creates an account. Fails with a conflict when the identity already
    /// exists; under concurrent duplicate attempts the store's uniqueness
    /// invariant guarantees exactly one winner.
    async fn create(&self, new_user: NewUser) -> Result<User, AppError>;

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError>;

    /// Looks up an account by reset token, ignoring expired tokens.
    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError>;

    /// Persists mutations of a single account. Optimistic; no locking.
    async fn save(&self, user: &User) -> Result<(), AppError>;
}

/// Refresh token registry. A refresh token is only accepted when its
/// signature verifies AND a live record exists here, so revocation wins
/// over the token's embedded expiry.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn record(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// True iff a matching, unexpired record exists for this token/account.
    async fn is_live(&self, token: &str, user_id: Uuid) -> Result<bool, AppError>;

    /// Deletes one record (logout). Idempotent.
    async fn revoke(&self, token: &str) -> Result<(), AppError>;

    /// Deletes all records for an account (password reset).
    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError>;

    /// Removes expired records; lookups already ignore them, this reclaims
    /// storage in lieu of a native TTL.
    async fn purge_expired(&self) -> Result<u64, AppError>;
}

/// Refresh tokens are stored by SHA-256 hash; a database leak must not
/// hand out usable tokens.
pub(crate) fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hashing_is_deterministic() {
        let hash1 = hash_token("some-refresh-token");
        let hash2 = hash_token("some-refresh-token");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "some-refresh-token");
        assert_eq!(hash1.len(), 64); // SHA-256 hex
    }

    #[test]
    fn different_tokens_different_hashes() {
        assert_ne!(hash_token("token-a"), hash_token("token-b"));
    }
}
