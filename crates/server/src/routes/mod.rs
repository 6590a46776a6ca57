//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! # Auth (rate limited)
//! POST   /api/auth/register               - Create account and log in
//! POST   /api/auth/login                  - Log in
//! POST   /api/auth/logout                 - Log out
//!
//! # Profile (requires auth)
//! GET    /api/profile                     - Current profile
//! PUT    /api/profile                     - Update name, phone, document
//! POST   /api/profile/password            - Change password
//!
//! # Parking lots (requires auth)
//! GET    /api/lots                        - Owned and shared lots
//! POST   /api/lots                        - Create a lot
//! DELETE /api/lots/{id}                   - Delete a lot (owner)
//! POST   /api/lots/{id}/shares            - Share with an email (owner)
//! DELETE /api/lots/{id}/shares/{email}    - Remove a shared email (owner)
//! DELETE /api/lots/{id}/access            - Leave a shared lot
//!
//! # Vehicles (requires lot access)
//! GET    /api/lots/{id}/vehicles          - Vehicles currently parked
//! POST   /api/lots/{id}/vehicles          - Register an entry
//! POST   /api/vehicles/{id}/exit          - Register an exit
//! GET    /api/lots/{id}/plates?prefix=    - Plate autocomplete
//!
//! # Reports and analytics (requires lot access)
//! GET    /api/lots/{id}/report            - JSON, xlsx or pdf report
//! GET    /api/analytics                   - Dashboard views
//! ```

pub mod analytics;
pub mod auth;
pub mod lots;
pub mod profile;
pub mod reports;
pub mod vehicles;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Create the auth routes router (nested under `/api/auth`).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the authenticated API router (nested under `/api`).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(profile::show).put(profile::update))
        .route("/profile/password", post(profile::change_password))
        .route("/lots", get(lots::index).post(lots::create))
        .route("/lots/{id}", delete(lots::destroy))
        .route("/lots/{id}/shares", post(lots::share))
        .route("/lots/{id}/shares/{email}", delete(lots::unshare))
        .route("/lots/{id}/access", delete(lots::leave))
        .route(
            "/lots/{id}/vehicles",
            get(vehicles::parked).post(vehicles::entry),
        )
        .route("/lots/{id}/plates", get(vehicles::plates))
        .route("/vehicles/{id}/exit", post(vehicles::exit))
        .route("/lots/{id}/report", get(reports::show))
        .route("/analytics", get(analytics::dashboard))
}
