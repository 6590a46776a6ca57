//! Session middleware configuration.
//!
//! Sessions live in any `tower-sessions` store: `PostgreSQL` in the server
//! binary, in-memory in tests. The session cookie is signed with
//! `GARAGEM_SESSION_SECRET`.

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::{ConfigError, ServerConfig};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "garagem_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Schema holding the session table, next to the application tables.
const SESSION_SCHEMA: &str = "garagem";
const SESSION_TABLE: &str = "session";

/// `PostgreSQL` session store in `garagem.session`.
///
/// The table is created by `garagem-cli migrate`.
///
/// # Errors
///
/// Returns `ConfigError::SessionStore` if the schema or table name is
/// rejected.
pub fn postgres_session_store(pool: &PgPool) -> Result<PostgresStore, ConfigError> {
    PostgresStore::new(pool.clone())
        .with_schema_name(SESSION_SCHEMA)
        .and_then(|store| store.with_table_name(SESSION_TABLE))
        .map_err(ConfigError::SessionStore)
}

/// Create the session layer over `store`.
///
/// # Arguments
///
/// * `store` - Session store (e.g. `PostgresStore`)
/// * `config` - Server configuration (for the signing secret and HTTPS flag)
///
/// # Errors
///
/// Returns `ConfigError::InsecureSecret` if the secret is too short to be
/// used as a signing key.
pub fn create_session_layer<S>(
    store: S,
    config: &ServerConfig,
) -> Result<SessionManagerLayer<S, SignedCookie>, ConfigError>
where
    S: SessionStore + Clone,
{
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes()).map_err(|e| {
        ConfigError::InsecureSecret("GARAGEM_SESSION_SECRET".to_string(), e.to_string())
    })?;

    Ok(SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}
