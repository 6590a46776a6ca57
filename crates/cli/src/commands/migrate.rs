//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! garagem-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `GARAGEM_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Application tables: `crates/server/migrations/`. The session table
//! (`garagem.session`) is created by the session store itself.

use garagem_server::config::ConfigError;
use garagem_server::db;
use garagem_server::middleware::postgres_session_store;
use thiserror::Error;

use super::database_url;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration failed to apply.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The session store rejected its settings.
    #[error("Session store error: {0}")]
    SessionStore(#[from] ConfigError),
}

/// Run the application migrations, then create the session table.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let database_url =
        database_url().ok_or(MigrationError::MissingEnvVar("GARAGEM_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    postgres_session_store(&pool)?.migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
