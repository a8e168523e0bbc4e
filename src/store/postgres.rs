/// Postgres-backed stores. Single-document reads and writes only; account
/// uniqueness is enforced by partial unique indexes on email and phone.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{Gender, NewUser, Role, User, UserStatus};
use super::{hash_token, TokenStore, UserStore};
use crate::error::{AppError, DatabaseError};

const USER_COLUMNS: &str = "id, email, phone_number, password_hash, first_name, last_name, \
     role, status, email_verified, phone_verified, verification_token, \
     phone_verification_code, reset_password_token, reset_password_expires, \
     date_of_birth, gender, country, accepted_terms_at, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: Option<String>,
    phone_number: Option<String>,
    password_hash: String,
    first_name: String,
    last_name: String,
    role: String,
    status: String,
    email_verified: bool,
    phone_verified: bool,
    verification_token: Option<String>,
    phone_verification_code: Option<String>,
    reset_password_token: Option<String>,
    reset_password_expires: Option<DateTime<Utc>>,
    date_of_birth: NaiveDate,
    gender: Option<String>,
    country: String,
    accepted_terms_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            AppError::Database(DatabaseError::UnexpectedError(format!(
                "unknown role '{}' for user {}",
                row.role, row.id
            )))
        })?;
        let status = UserStatus::parse(&row.status).ok_or_else(|| {
            AppError::Database(DatabaseError::UnexpectedError(format!(
                "unknown status '{}' for user {}",
                row.status, row.id
            )))
        })?;
        let gender = match row.gender.as_deref() {
            None => None,
            Some(g) => Some(Gender::parse(g).ok_or_else(|| {
                AppError::Database(DatabaseError::UnexpectedError(format!(
                    "unknown gender '{}' for user {}",
                    g, row.id
                )))
            })?),
        };

        Ok(User {
            id: row.id,
            email: row.email,
            phone_number: row.phone_number,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            role,
            status,
            email_verified: row.email_verified,
            phone_verified: row.phone_verified,
            verification_token: row.verification_token,
            phone_verification_code: row.phone_verification_code,
            reset_password_token: row.reset_password_token,
            reset_password_expires: row.reset_password_expires,
            date_of_birth: row.date_of_birth,
            gender,
            country: row.country,
            accepted_terms_at: row.accepted_terms_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        clause: &str,
        token: &str,
    ) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_identity(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        if email.is_none() && phone.is_none() {
            return Ok(None);
        }

        let query = format!(
            "SELECT {} FROM users \
             WHERE ($1::text IS NOT NULL AND email = $1) \
                OR ($2::text IS NOT NULL AND phone_number = $2) \
             LIMIT 1",
            USER_COLUMNS
        );
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        // A concurrent duplicate registration loses here with a 23505,
        // which From<sqlx::Error> maps to a conflict.
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, phone_number, password_hash, first_name, last_name,
                role, status, email_verified, phone_verified, verification_token,
                phone_verification_code, reset_password_token, reset_password_expires,
                date_of_birth, gender, country, accepted_terms_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, false, false, $9, $10,
                    NULL, NULL, $11, $12, $13, $14, $15, $15)
            "#,
        )
        .bind(id)
        .bind(&new_user.email)
        .bind(&new_user.phone_number)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .bind(new_user.status.as_str())
        .bind(&new_user.verification_token)
        .bind(&new_user.phone_verification_code)
        .bind(new_user.date_of_birth)
        .bind(new_user.gender.map(|g| g.as_str()))
        .bind(&new_user.country)
        .bind(new_user.accepted_terms_at)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
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
        })
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_where("verification_token = $1", token).await
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, AppError> {
        self.fetch_one_where(
            "reset_password_token = $1 AND reset_password_expires > NOW()",
            token,
        )
        .await
    }

    async fn save(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                status = $3,
                email_verified = $4,
                phone_verified = $5,
                verification_token = $6,
                phone_verification_code = $7,
                reset_password_token = $8,
                reset_password_expires = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.password_hash)
        .bind(user.status.as_str())
        .bind(user.email_verified)
        .bind(user.phone_verified)
        .bind(&user.verification_token)
        .bind(&user.phone_verification_code)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_expires)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn record(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO session_tokens (id, token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(hash_token(token))
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn is_live(&self, token: &str, user_id: Uuid) -> Result<bool, AppError> {
        let live = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM session_tokens
                WHERE token_hash = $1 AND user_id = $2 AND expires_at > NOW()
            )
            "#,
        )
        .bind(hash_token(token))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(live)
    }

    async fn revoke(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM session_tokens WHERE token_hash = $1")
            .bind(hash_token(token))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = %user_id, revoked = result.rows_affected(), "All sessions revoked");
        Ok(result.rows_affected())
    }

    async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
