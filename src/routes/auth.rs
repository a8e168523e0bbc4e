/// Authentication Routes
///
/// HTTP surface over the flow controller: registration, login, token
/// refresh, logout, password recovery, email verification and current
/// user lookup. Handlers translate between wire shapes and flow
/// commands; all policy lives in the flows.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::Claims;
use crate::error::AppError;
use crate::flows::{
    AuthService, ForgotPasswordCommand, IssuedSession, LoginCommand, RegisterCommand,
    ResendOutcome, ResetPasswordCommand,
};
use crate::store::model::{Gender, Role, User};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    pub country: Option<String>,
    pub accept_terms: bool,
    pub role: Option<Role>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Logout tolerates an absent token, so the field is optional here even
/// though refresh requires it.
#[derive(Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Authentication response with access and refresh tokens
#[derive(Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Account information safe to return to clients. Password hashes and
/// one-time tokens never leave the server.
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: String,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub country: String,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: user.role,
            status: user.status.as_str().to_string(),
            email_verified: user.email_verified,
            phone_verified: user.phone_verified,
            country: user.country.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

fn auth_response(session: &IssuedSession, expires_in: i64) -> AuthResponse {
    AuthResponse {
        access_token: session.access_token.clone(),
        refresh_token: session.refresh_token.clone(),
        token_type: "Bearer".to_string(),
        expires_in,
        user: UserResponse::from(&session.user),
    }
}

/// Uniform success body shared by the anti-enumeration endpoints. Both
/// the found and not-found paths MUST go through this helper so the
/// responses are byte-identical.
fn uniform_ok(message: &str) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": message,
    }))
}

/// POST /auth/register
///
/// Create an account with an email and/or phone identity.
/// Returns tokens and the sanitized account on success.
///
/// # Errors
/// - 400: Validation errors (identity, password strength, age, terms)
/// - 409: Email or phone already registered
/// - 500: Internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let session = service
        .register(RegisterCommand {
            email: form.email,
            phone_number: form.phone_number,
            password: form.password,
            first_name: form.first_name,
            last_name: form.last_name,
            date_of_birth: form.date_of_birth,
            gender: form.gender,
            country: form.country,
            accept_terms: form.accept_terms,
            role: form.role,
        })
        .await?;

    Ok(HttpResponse::Created().json(auth_response(&session, service.jwt.access_token_expiry)))
}

/// POST /auth/login
///
/// Authenticate with email or phone plus password.
///
/// # Errors
/// - 401: Invalid credentials (identity not found or wrong password,
///   deliberately indistinguishable)
/// - 403: Account not active, or email not yet verified
/// - 500: Internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let session = service
        .login(LoginCommand {
            email: form.email,
            phone_number: form.phone_number,
            password: form.password,
        })
        .await?;

    Ok(HttpResponse::Ok().json(auth_response(&session, service.jwt.access_token_expiry)))
}

/// POST /auth/refresh
///
/// Exchange a live refresh token for a new access token. The refresh
/// token is not rotated; it stays valid until logout, revocation or
/// expiry.
///
/// # Errors
/// - 401: Invalid, expired, or revoked refresh token
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let refreshed = service.refresh(&form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(RefreshResponse {
        access_token: refreshed.access_token,
        token_type: "Bearer".to_string(),
        expires_in: service.jwt.access_token_expiry,
    }))
}

/// POST /auth/logout
///
/// Revoke a refresh token. Succeeds even if the token was never issued,
/// is already revoked, or was omitted from the request entirely.
pub async fn logout(
    form: web::Json<LogoutRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    if let Some(token) = &form.refresh_token {
        service.logout(token).await?;
    }
    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/forgot-password
///
/// Request a password reset link. Responds identically whether or not
/// the email is registered.
pub async fn forgot_password(
    form: web::Json<ForgotPasswordRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service
        .forgot_password(ForgotPasswordCommand {
            email: form.into_inner().email,
        })
        .await?;

    Ok(uniform_ok(
        "If your email is registered, you will receive a password reset link",
    ))
}

/// POST /auth/reset-password
///
/// Consume a reset token and set a new password. Revokes every live
/// session for the account.
///
/// # Errors
/// - 400: Invalid or expired token, or weak password
pub async fn reset_password(
    form: web::Json<ResetPasswordRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    service
        .reset_password(ResetPasswordCommand {
            token: form.token,
            new_password: form.new_password,
        })
        .await?;

    Ok(uniform_ok("Password reset successful"))
}

/// GET /auth/verify-email/{token}
///
/// Browser-facing: consumes the emailed verification link and redirects
/// to the client app. Never renders an error body; a bad token redirects
/// to the client's error page instead.
pub async fn verify_email(
    path: web::Path<String>,
    service: web::Data<AuthService>,
) -> HttpResponse {
    let token = path.into_inner();
    let location = match service.verify_email(&token).await {
        Ok(_) => format!("{}/email-verified", service.client_url),
        Err(e) => {
            tracing::warn!(error = %e, "Email verification failed");
            format!("{}/verification-error", service.client_url)
        }
    };

    HttpResponse::Found()
        .insert_header(("Location", location))
        .finish()
}

/// POST /auth/resend-verification
///
/// Re-send the verification email with a fresh token. Unknown addresses
/// get the same response as successful sends.
///
/// # Errors
/// - 400: Email already verified
/// - 503: Mail provider failure
pub async fn resend_verification(
    form: web::Json<ResendVerificationRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    match service
        .resend_verification(&form.into_inner().email)
        .await?
    {
        ResendOutcome::Sent | ResendOutcome::Suppressed => Ok(uniform_ok(
            "If your email is registered, you will receive a verification email",
        )),
    }
}

/// GET /auth/me
///
/// Current authenticated account. Claims are injected by the JWT
/// middleware.
///
/// # Errors
/// - 401: Missing or invalid token (handled by middleware)
/// - 404: Account no longer exists
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = service
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
