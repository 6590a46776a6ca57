//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`; the body is always `{"error": "<pt-BR message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, ServiceError};

/// Application-level error type for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Lot, vehicle, report or analytics operation failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Authentication or profile operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Service(ServiceError::BackendUnavailable(err))
    }
}

impl AppError {
    /// Whether the failure is ours rather than the client's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Service(ServiceError::BackendUnavailable(_) | ServiceError::Export(_))
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
                | Self::Session(_)
                | Self::Internal(_)
        )
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Service(err) => match err {
                ServiceError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
                ServiceError::DuplicateEntry(_)
                | ServiceError::SelfShareRejected
                | ServiceError::AlreadyShared(_) => StatusCode::CONFLICT,
                ServiceError::UnknownUser(_) | ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
                ServiceError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::TermsNotAccepted
                | AuthError::MissingName => StatusCode::BAD_REQUEST,
                AuthError::Repository(_) => StatusCode::SERVICE_UNAVAILABLE,
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the client. Internal details are never exposed.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Service(ServiceError::BackendUnavailable(_)) => {
                "Serviço temporariamente indisponível. Tente novamente.".to_string()
            }
            Self::Service(ServiceError::Export(_)) => "Erro ao gerar relatório".to_string(),
            Self::Service(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    "Erro ao fazer login. Verifique suas credenciais.".to_string()
                }
                AuthError::UserNotFound => "Usuário não encontrado".to_string(),
                AuthError::UserAlreadyExists => "Este email já está cadastrado".to_string(),
                AuthError::WeakPassword(_) => {
                    "A senha deve ter pelo menos 6 caracteres".to_string()
                }
                AuthError::InvalidEmail(_) => "Email inválido".to_string(),
                AuthError::TermsNotAccepted => {
                    "Você precisa aceitar os termos de uso para continuar".to_string()
                }
                AuthError::MissingName => "Informe seu nome completo".to_string(),
                AuthError::Repository(_) => {
                    "Serviço temporariamente indisponível. Tente novamente.".to_string()
                }
                AuthError::PasswordHash => "Erro interno do servidor".to_string(),
            },
            Self::Session(_) | Self::Internal(_) => "Erro interno do servidor".to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (
            self.status(),
            Json(json!({ "error": self.client_message() })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractor so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("ledger", "Vehicle entry", Some(&[("plate", "ABC1D23")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
