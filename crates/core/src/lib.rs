//! Garagem Core - Shared domain types.
//!
//! This crate provides the types used across all Garagem components:
//! - `server` - JSON API for lots, vehicles, reports and analytics
//! - `cli` - Command-line tools for migrations, users and offline exports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything that needs "now" takes it as an argument.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, plates, periods, stay durations and
//!   local-time helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
