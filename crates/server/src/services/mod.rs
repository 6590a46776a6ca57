//! Business logic services.
//!
//! Each service borrows the record store (and the clock where "now" matters)
//! for the duration of a request.
//!
//! # Services
//!
//! - [`auth`] - Registration, login, profile and password changes
//! - [`ledger`] - Vehicle entries, exits, plate suggestions, parked list
//! - [`registry`] - Parking lots, sharing and access checks
//! - [`reports`] - Vehicle movement reports for a date range
//! - [`analytics`] - Dashboard aggregations

pub mod analytics;
pub mod auth;
mod error;
pub mod ledger;
pub mod registry;
pub mod reports;

pub use analytics::{AnalyticsAggregator, Dashboard};
pub use auth::{AuthError, AuthService, ProfileChanges, Registration};
pub use error::ServiceError;
pub use ledger::VehicleLedger;
pub use registry::ParkingLotRegistry;
pub use reports::{Report, ReportAggregator};
