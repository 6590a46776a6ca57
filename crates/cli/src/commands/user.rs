//! User account commands.
//!
//! # Usage
//!
//! ```bash
//! garagem-cli user create -e ana@garagem.app -n "Ana Souza" -p 's3nh4-f0rte'
//! GARAGEM_USER_PASSWORD='s3nh4-f0rte' garagem-cli user create -e ana@garagem.app -n "Ana"
//! ```
//!
//! Accounts created here have accepted the terms on the user's behalf.

use garagem_server::clock::SystemClock;
use garagem_server::db::{self, PgRecordStore};
use garagem_server::services::{AuthError, AuthService, Registration};
use thiserror::Error;

use super::database_url;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Registration was rejected.
    #[error("Could not create user: {0}")]
    Auth(#[from] AuthError),
}

/// Create a new user.
///
/// # Errors
///
/// Returns an error if the email is taken or invalid, the password is too
/// short, or the database is unreachable.
pub async fn create(
    email: &str,
    name: &str,
    password: &str,
    phone: Option<String>,
    document: Option<String>,
) -> Result<(), UserError> {
    let database_url = database_url().ok_or(UserError::MissingEnvVar("GARAGEM_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let store = PgRecordStore::new(db::create_pool(&database_url).await?);
    let auth = AuthService::new(&store, &SystemClock);

    let user = auth
        .register(&Registration {
            full_name: name.to_owned(),
            email: email.to_owned(),
            password: password.to_owned(),
            phone,
            document,
            accepted_terms: true,
        })
        .await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(())
}
