//! Request/response boundary for the group calendar.
//!
//! Callers build a `CalendarApi`, pass the authenticated `Session` and a
//! plain request record, and receive an `ApiResponse` envelope.

pub mod api;
pub mod dto;
pub mod envelope;

pub use api::{core_version, init_logging, ping, CalendarApi};
pub use envelope::{ApiError, ApiResponse};
pub use groupcal_core::Session;
