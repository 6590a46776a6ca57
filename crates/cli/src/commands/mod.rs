//! CLI subcommands.

pub mod migrate;
pub mod report;
pub mod user;

use secrecy::SecretString;

/// `GARAGEM_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("GARAGEM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
