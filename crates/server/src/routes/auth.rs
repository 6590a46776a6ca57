//! Authentication route handlers.
//!
//! Handles registration, login and logout with email + password. On success
//! the session holds a [`CurrentUser`] and the session ID is rotated.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb, clear_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthService, Registration};
use crate::state::AppState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Create an account and log it in.
///
/// # Errors
///
/// Returns an error if validation fails or the email is taken.
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let auth = AuthService::new(state.store(), state.clock());
    let user = auth.register(&form).await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    add_breadcrumb("auth", "User registered", None);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns `401` for unknown emails and wrong passwords alike.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    let auth = AuthService::new(state.store(), state.clock());
    let user = auth.login(&form.email, &form.password).await?;

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    add_breadcrumb("auth", "User logged in", None);
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(user))
}

/// Log out, destroying the session. Succeeds without a session too.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(session, user))]
pub async fn logout(
    OptionalAuth(user): OptionalAuth,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "User logged out");
    }
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
