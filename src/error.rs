/// Error Handling Module
///
/// Unified error handling for the authentication subsystem:
/// 1. Control flow errors (Result-based) raised by the flow controller
/// 2. HTTP responses with structured context for the routing layer
/// 3. Domain-specific error types mapped onto the status-code taxonomy:
///    validation -> 400, conflict -> 409, unauthorized -> 401,
///    forbidden -> 403, not-found -> 404, infrastructure -> 5xx
/// 4. Structured error logging

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
    /// Neither email nor phone number was supplied at registration.
    MissingIdentity,
    /// Date of birth puts the applicant under the minimum age.
    Underage,
    TermsNotAccepted,
    /// A single-use token (verification or reset) did not match any
    /// account, or matched one whose token already expired.
    InvalidToken,
    AlreadyVerified,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MissingIdentity => {
                write!(f, "Either email or phone number is required")
            }
            ValidationError::Underage => write!(f, "You must be at least 18 years old"),
            ValidationError::TermsNotAccepted => {
                write!(f, "You must accept the Terms of Service and Privacy Policy")
            }
            ValidationError::InvalidToken => write!(f, "Invalid or expired token"),
            ValidationError::AlreadyVerified => write!(f, "Email already verified"),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    TokenExpired,
    TokenInvalid,
    /// The token's signature still verifies but the registry no longer
    /// holds a live record for it.
    TokenRevoked,
    MissingToken,
    /// Email verification is required before login.
    VerificationRequired,
    AccountNotActive,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::TokenRevoked => write!(f, "Invalid refresh token"),
            AuthError::MissingToken => write!(f, "Missing authentication token"),
            AuthError::VerificationRequired => write!(f, "Please verify your email first"),
            AuthError::AccountNotActive => write!(f, "Account is not active"),
        }
    }
}

impl StdError for AuthError {}

/// Database operation errors.
#[derive(Debug)]
pub enum DatabaseError {
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Email dispatch errors.
#[derive(Debug, Clone)]
pub enum EmailError {
    SendFailed(String),
    ServiceUnavailable(String),
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailError::SendFailed(msg) => write!(f, "Failed to send email: {}", msg),
            EmailError::ServiceUnavailable(msg) => {
                write!(f, "Email service unavailable: {}", msg)
            }
        }
    }
}

impl StdError for EmailError {}

/// Central error type that all application errors map to.
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    /// Duplicate identity: the store's uniqueness invariant rejected
    /// an account creation.
    Conflict(String),
    Auth(AuthError),
    /// Internal lookups only; enumeration-sensitive paths never surface it.
    NotFound(String),
    Database(DatabaseError),
    Email(EmailError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Conflict(msg) => write!(f, "{}", msg),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Email(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        AppError::Email(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-constraint violations are how concurrent duplicate
        // registrations lose the race; surface them as conflicts.
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23505") {
                return AppError::Conflict(
                    "Account with provided email or phone already exists".to_string(),
                );
            }
        }

        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                AppError::Database(DatabaseError::ConnectionPool(err.to_string()))
            }
            sqlx::Error::Database(e) => {
                AppError::Database(DatabaseError::QueryExecution(e.to_string()))
            }
            other => AppError::Database(DatabaseError::UnexpectedError(other.to_string())),
        }
    }
}

/// Error response body returned by the HTTP layer.
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Unique error ID for correlating with logs.
    pub error_id: String,
    /// Human-readable error message.
    pub message: String,
    /// Error code for client-side handling.
    pub code: String,
    /// HTTP status code.
    pub status: u16,
    /// Timestamp when the error occurred.
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, message: String, code: String, status: u16) -> Self {
        Self {
            error_id,
            message,
            code,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Status code, machine-readable code and client-safe message for this
    /// error. Infrastructure errors are reported generically so internals
    /// never leak to callers.
    fn response_parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg.clone()),
            AppError::Auth(e) => match e {
                AuthError::VerificationRequired | AuthError::AccountNotActive => {
                    (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
                }
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "INVALID_CREDENTIALS",
                    e.to_string(),
                ),
                AuthError::MissingToken => {
                    (StatusCode::UNAUTHORIZED, "MISSING_TOKEN", e.to_string())
                }
                _ => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                ),
            },
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Database(e) => match e {
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },
            AppError::Email(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "EMAIL_SERVICE_ERROR",
                "Email service temporarily unavailable".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Conflict(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Duplicate identity attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::NotFound(msg) => {
                tracing::warn!(error_id = error_id, error = %msg, "Not found");
            }
            AppError::Database(e) => {
                tracing::error!(error_id = error_id, error = %e, "Database error");
            }
            AppError::Email(e) => {
                tracing::error!(error_id = error_id, error = %e, "Email service error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.response_parts();
        let body = ErrorResponse::new(error_id, message, code.to_string(), status.as_u16());

        HttpResponse::build(status).json(body)
    }

    fn status_code(&self) -> StatusCode {
        self.response_parts().0
    }
}
