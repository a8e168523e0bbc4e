/// In-memory stores mirroring the Postgres implementations. Used by the
/// test suite and by local runs without a database; they uphold the same
/// uniqueness and expiry semantics as the SQL schema.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{NewUser, User};
use super::{hash_token, TokenStore, UserStore};
use crate::error::AppError;

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_identity(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| {
                (email.is_some() && u.email.as_deref() == email)
                    || (phone.is_some() && u.phone_number.as_deref() == phone)
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.lock().unwrap();

        // Uniqueness check and insert happen under one lock, matching the
        // atomicity of the SQL unique indexes.
        let duplicate = users.values().any(|u| {
            (new_user.email.is_some() && u.email == new_user.email)
                || (new_user.phone_number.is_some() && u.phone_number == new_user.phone_number)
        });
        if duplicate {
            return Err(AppError::Conflict(
                "Account with provided email or phone already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            phone_number: new_user.phone_number,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            status: new_user.status,
            email_verified: false,
            phone_verified: false,
            verification_token: new_user.verification_token,
            phone_verification_code: new_user.phone_verification_code,
            reset_password_token: None,
            reset_password_expires: None,
            date_of_birth: new_user.date_of_birth,
            gender: new_user.gender,
            country: new_user.country,
            accepted_terms_at: new_user.accepted_terms_at,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| u.verification_token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let now = Utc::now();
        let users = self.users.lock().unwrap();
        Ok(users
            .values()
            .find(|u| {
                u.reset_password_token.as_deref() == Some(token)
                    && u.reset_password_expires.map_or(false, |exp| exp > now)
            })
            .cloned())
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        self.users.lock().unwrap().insert(user.id, updated);
        Ok(())
    }
}

struct SessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records for an account; test observability helper.
    pub fn live_count(&self, user_id: Uuid) -> usize {
        let now = Utc::now();
        self.records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.user_id == user_id && r.expires_at > now)
            .count()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn record(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.records.lock().unwrap().insert(
            hash_token(token),
            SessionRecord {
                user_id,
                expires_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn is_live(&self, token: &str, user_id: Uuid) -> Result<bool, AppError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .get(&hash_token(token))
            .map_or(false, |r| r.user_id == user_id && r.expires_at > Utc::now()))
    }

    async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.records.lock().unwrap().remove(&hash_token(token));
        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.user_id != user_id);
        Ok((before - records.len()) as u64)
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| r.expires_at > now);
        Ok((before - records.len()) as u64)
    }
}
