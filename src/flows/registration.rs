/// Registration: identity, age and terms checks, account creation with
/// single-use verification tokens, session issuance, and best-effort
/// verification dispatch.

use chrono::{NaiveDate, Utc};

use super::{AuthService, IssuedSession};
use crate::auth::{hash_password_async, new_phone_code, new_verification_token};
use crate::email::{send_best_effort, templates};
use crate::error::{AppError, ValidationError};
use crate::store::model::{age_on, Gender, NewUser, Role, UserStatus};
use crate::validators::{is_valid_email, is_valid_name, is_valid_phone};

const MINIMUM_AGE: i32 = 18;
const DEFAULT_COUNTRY: &str = "Nigeria";

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    /// ISO date, e.g. "1990-01-31".
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    pub country: Option<String>,
    pub accept_terms: bool,
    pub role: Option<Role>,
}

impl AuthService {
    pub async fn register(&self, cmd: RegisterCommand) -> Result<IssuedSession, AppError> {
        tracing::info!(
            by_email = cmd.email.is_some(),
            by_phone = cmd.phone_number.is_some(),
            "Registration attempt"
        );

        if cmd.email.is_none() && cmd.phone_number.is_none() {
            return Err(AppError::Validation(ValidationError::MissingIdentity));
        }

        let email = cmd.email.as_deref().map(is_valid_email).transpose()?;
        let phone_number = cmd.phone_number.as_deref().map(is_valid_phone).transpose()?;
        let first_name = is_valid_name("first name", &cmd.first_name)?;
        let last_name = is_valid_name("last name", &cmd.last_name)?;

        let date_of_birth = NaiveDate::parse_from_str(&cmd.date_of_birth, "%Y-%m-%d")
            .map_err(|_| {
                AppError::Validation(ValidationError::InvalidFormat(
                    "date of birth".to_string(),
                ))
            })?;
        if age_on(date_of_birth, Utc::now().date_naive()) < MINIMUM_AGE {
            return Err(AppError::Validation(ValidationError::Underage));
        }

        if !cmd.accept_terms {
            return Err(AppError::Validation(ValidationError::TermsNotAccepted));
        }

        let password_hash = hash_password_async(cmd.password).await?;

        let verification_token = email.as_ref().map(|_| new_verification_token());
        let phone_verification_code = phone_number.as_ref().map(|_| new_phone_code());

        // The store's uniqueness invariant decides duplicate races: no
        // pre-flight existence check is relied upon for correctness.
        let user = self
            .users
            .create(NewUser {
                email,
                phone_number,
                password_hash,
                first_name,
                last_name,
                role: cmd.role.unwrap_or(Role::User),
                status: UserStatus::Active,
                verification_token,
                phone_verification_code,
                date_of_birth,
                gender: cmd.gender,
                country: cmd.country.unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
                // Set only because acceptance was checked above.
                accepted_terms_at: Some(Utc::now()),
            })
            .await?;

        let pair = self.open_session(&user).await?;

        // Account and tokens are durable at this point; message dispatch
        // is best-effort and must not fail the registration.
        match (&user.email, &user.verification_token) {
            (Some(to), Some(token)) => {
                let tpl = templates::verify_email(&self.client_url, token, &user.first_name);
                send_best_effort(
                    self.mailer.clone(),
                    to.clone(),
                    tpl.subject,
                    tpl.html,
                    tpl.text,
                );
            }
            _ => {
                if user.phone_verification_code.is_some() {
                    // SMS provider integration would go here.
                    tracing::info!(user_id = %user.id, "SMS verification code generated");
                }
            }
        }

        tracing::info!(user_id = %user.id, "User registered successfully");

        Ok(IssuedSession {
            user,
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            session_id: pair.session_id,
        })
    }
}
