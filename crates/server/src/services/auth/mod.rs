//! Authentication and profile service.
//!
//! Email + password accounts with Argon2id hashes. Sessions are handled by
//! the HTTP layer; this service only verifies credentials and edits
//! profiles.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::{info, instrument};

use garagem_core::{Email, UserId, format_document, format_phone};

use crate::clock::Clock;
use crate::db::{RecordStore, RepositoryError};
use crate::models::{NewUser, ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Sign-up form.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub accepted_terms: bool,
}

/// Editable profile fields as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileChanges {
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

/// Authentication service.
///
/// Handles user registration, login, profile edits and password changes.
pub struct AuthService<'a> {
    store: &'a dyn RecordStore,
    clock: &'a dyn Clock,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: &'a dyn RecordStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    // =========================================================================
    // Password Authentication
    // =========================================================================

    /// Register a new user.
    ///
    /// Phone and document are stored masked; blank values are dropped.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TermsNotAccepted` unless the terms were accepted.
    /// Returns `AuthError::MissingName` if the full name is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        if !form.accepted_terms {
            return Err(AuthError::TermsNotAccepted);
        }
        let full_name = required_name(&form.full_name)?;
        let email = Email::parse(&form.email)?;
        validate_password(&form.password)?;

        let password_hash = hash_password(&form.password)?;

        let user = self
            .store
            .insert_user(&NewUser {
                id: UserId::generate(),
                full_name,
                email,
                phone: masked(form.phone.as_deref(), format_phone),
                document: masked(form.document.as_deref(), format_document),
                password_hash,
                created_at: self.clock.now(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .user_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Change the password after re-authenticating with the current one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if `current` is wrong.
    /// Returns `AuthError::WeakPassword` if `new` doesn't meet requirements.
    #[instrument(skip(self, current, new), fields(user_id = %user_id))]
    pub async fn change_password(
        &self,
        user_id: UserId,
        current: &str,
        new: &str,
    ) -> Result<(), AuthError> {
        let stored = self
            .store
            .password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        verify_password(current, &stored)?;
        validate_password(new)?;

        let password_hash = hash_password(new)?;
        if !self
            .store
            .update_password_hash(user_id, &password_hash, self.clock.now())
            .await?
        {
            return Err(AuthError::UserNotFound);
        }

        info!("Password changed");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_profile(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Update name, phone and document.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` if the full name is blank.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    #[instrument(skip(self, changes), fields(user_id = %user_id))]
    pub async fn update_profile(
        &self,
        user_id: UserId,
        changes: &ProfileChanges,
    ) -> Result<User, AuthError> {
        let update = ProfileUpdate {
            full_name: required_name(&changes.full_name)?,
            phone: masked(changes.phone.as_deref(), format_phone),
            document: masked(changes.document.as_deref(), format_document),
            updated_at: self.clock.now(),
        };

        self.store
            .update_profile(user_id, &update)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

fn required_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        Err(AuthError::MissingName)
    } else {
        Ok(name.to_owned())
    }
}

/// Format an optional contact field, treating blank input as absent.
fn masked(value: Option<&str>, format: fn(&str) -> String) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(format)
        .filter(|v| !v.is_empty())
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryRecordStore;

    fn form(email: &str) -> Registration {
        Registration {
            full_name: " Ana Souza ".to_string(),
            email: email.to_string(),
            password: "segredo1".to_string(),
            phone: Some("11987654321".to_string()),
            document: Some("123.456.789-09".to_string()),
            accepted_terms: true,
        }
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc::now());
        let auth = AuthService::new(&store, &clock);

        let user = auth.register(&form("Ana@Garagem.app")).await.unwrap();
        assert_eq!(user.full_name, "Ana Souza");
        assert_eq!(user.email.as_str(), "ana@garagem.app");
        assert_eq!(user.phone.as_deref(), Some("(11) 98765-4321"));
        assert_eq!(user.document.as_deref(), Some("123.456.789-09"));

        let logged = auth.login("ana@garagem.app", "segredo1").await.unwrap();
        assert_eq!(logged.id, user.id);
        assert!(matches!(
            auth.login("ana@garagem.app", "errada").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.login("ninguem@garagem.app", "segredo1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc::now());
        let auth = AuthService::new(&store, &clock);

        let mut no_terms = form("a@garagem.app");
        no_terms.accepted_terms = false;
        assert!(matches!(
            auth.register(&no_terms).await,
            Err(AuthError::TermsNotAccepted)
        ));

        let mut short = form("a@garagem.app");
        short.password = "12345".to_string();
        assert!(matches!(
            auth.register(&short).await,
            Err(AuthError::WeakPassword(_))
        ));

        let mut nameless = form("a@garagem.app");
        nameless.full_name = "  ".to_string();
        assert!(matches!(
            auth.register(&nameless).await,
            Err(AuthError::MissingName)
        ));

        auth.register(&form("a@garagem.app")).await.unwrap();
        assert!(matches!(
            auth.register(&form("A@garagem.app")).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc::now());
        let auth = AuthService::new(&store, &clock);
        let user = auth.register(&form("b@garagem.app")).await.unwrap();

        assert!(matches!(
            auth.change_password(user.id, "errada", "nova-senha").await,
            Err(AuthError::InvalidCredentials)
        ));
        auth.change_password(user.id, "segredo1", "nova-senha")
            .await
            .unwrap();

        assert!(auth.login("b@garagem.app", "segredo1").await.is_err());
        assert!(auth.login("b@garagem.app", "nova-senha").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_profile_masks_contacts() {
        let store = MemoryRecordStore::new();
        let clock = FixedClock::new(Utc::now());
        let auth = AuthService::new(&store, &clock);
        let user = auth.register(&form("c@garagem.app")).await.unwrap();

        let updated = auth
            .update_profile(
                user.id,
                &ProfileChanges {
                    full_name: "Carla".to_string(),
                    phone: Some(String::new()),
                    document: Some("12345678000195".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.full_name, "Carla");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.document.as_deref(), Some("12.345.678/0001-95"));
        assert_eq!(auth.get_profile(user.id).await.unwrap(), updated);
    }
}
