use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub auth: AuthSettings,
    pub email: EmailSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
    /// Base URL of the client application, used for links embedded in
    /// verification/reset emails and for post-verification redirects.
    pub client_url: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT signing settings. Access and refresh tokens share the secret but
/// carry independent expiries.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,  // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64, // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

/// Account verification and recovery policy.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// When true, accounts registered with an email address must verify it
    /// before they can log in. Phone-only accounts are exempt.
    pub require_verified_email: bool,
    /// Lifetime of a password-reset token, in seconds.
    pub reset_token_ttl: i64,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailSettings {
    /// Base URL of the mail provider's HTTP API. When absent, outgoing
    /// messages are logged instead of sent.
    pub base_url: Option<String>,
    pub sender: String,
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .build()?;
    settings.try_deserialize::<Settings>()
}
