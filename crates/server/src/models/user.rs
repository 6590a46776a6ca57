//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use garagem_core::{Email, UserId};

/// A registered user and their profile.
///
/// The password hash lives only in the record store and is never part of
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Full name shown on reports ("Gerado por").
    pub full_name: String,
    /// Login email, also the key other users share lots with.
    pub email: Email,
    /// Phone, stored masked as `(XX) XXXXX-XXXX`.
    pub phone: Option<String>,
    /// CPF or CNPJ, stored masked.
    pub document: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name printed as the report generator: the full name, else the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            self.email.as_str()
        } else {
            name
        }
    }
}

/// A user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub document: Option<String>,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Editable profile fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub phone: Option<String>,
    pub document: Option<String>,
    pub updated_at: DateTime<Utc>,
}
