//! Domain models for the server.
//!
//! These types represent validated domain objects separate from database row
//! types; the record store adapters convert rows into them.

pub mod parking_lot;
pub mod session;
pub mod user;
pub mod vehicle;

pub use parking_lot::ParkingLot;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NewUser, ProfileUpdate, User};
pub use vehicle::{PlateSuggestion, Vehicle, VehicleReport};
