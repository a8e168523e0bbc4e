use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use mentwel_auth::configuration::get_configuration;
use mentwel_auth::email::EmailClient;
use mentwel_auth::flows::AuthService;
use mentwel_auth::startup::run;
use mentwel_auth::store::postgres::{PgTokenStore, PgUserStore};
use mentwel_auth::store::TokenStore;
use mentwel_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let connection_string = configuration.database.connection_string();
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&connection_string)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "Database connection error",
            )
        })?;

    tracing::info!("Database connection pool created successfully");

    let users = Arc::new(PgUserStore::new(pool.clone()));
    let tokens = Arc::new(PgTokenStore::new(pool.clone()));
    let mailer = Arc::new(EmailClient::new(&configuration.email));

    let service = AuthService::new(users, tokens.clone(), mailer, &configuration);

    // Hourly sweep of expired refresh-token records. Liveness checks
    // filter on expiry anyway; this keeps the registry small.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match tokens.purge_expired().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "Purged expired session tokens");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Session token purge failed"),
            }
        }
    });

    let address = format!("127.0.0.1:{}", configuration.application.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, service)?;
    tracing::info!("Server started successfully");

    let _ = server.await;

    Ok(())
}
