//! Profile route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::services::{AuthError, AuthService, ProfileChanges};
use crate::state::AppState;

/// Password change request body.
#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

/// The logged-in user's profile.
///
/// # Errors
///
/// Returns `404` if the account was removed since login.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<User>, AppError> {
    let auth = AuthService::new(state.store(), state.clock());
    Ok(Json(auth.get_profile(user.id).await?))
}

/// Update name, phone and document.
///
/// # Errors
///
/// Returns `400` for a blank name.
#[instrument(skip(state, user, changes), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(changes): Json<ProfileChanges>,
) -> Result<Json<User>, AppError> {
    let auth = AuthService::new(state.store(), state.clock());
    Ok(Json(auth.update_profile(user.id, &changes).await?))
}

/// Change the password after checking the current one.
///
/// # Errors
///
/// Returns `400` if the current password is wrong or the new one is weak.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(form): Json<PasswordChange>,
) -> Result<StatusCode, AppError> {
    let auth = AuthService::new(state.store(), state.clock());
    match auth
        .change_password(user.id, &form.current_password, &form.new_password)
        .await
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        // 401 means "no session" to clients.
        Err(AuthError::InvalidCredentials) => Err(AppError::BadRequest(
            "Erro ao alterar senha. Verifique sua senha atual.".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
