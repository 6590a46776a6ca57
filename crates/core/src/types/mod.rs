//! Core types for Garagem.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod contact;
pub mod duration;
pub mod email;
pub mod id;
pub mod period;
pub mod plate;
pub mod time;

pub use contact::{format_document, format_phone};
pub use duration::StayDuration;
pub use email::{Email, EmailError};
pub use id::*;
pub use period::{Period, PeriodError};
pub use plate::{Plate, PlateError};
pub use time::{WEEKDAY_LABELS, end_of_day, local_midnight, start_of_day, weekday_index};
