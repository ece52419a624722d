//! Scheduling engine and its client operations.
//!
//! # Responsibility
//! - Compose the task store, reaction ledger, membership registry and
//!   authorization gate into atomic use-case operations.
//! - Keep API layers decoupled from storage details.
//!
//! Operations are grouped by concern (`task_ops`, `reaction_ops`,
//! `membership_ops`, `template_ops`), each adding methods to
//! [`engine::SchedulingEngine`].

pub mod engine;
pub mod error;
pub mod membership_ops;
pub mod reaction_ops;
pub mod session;
pub mod task_ops;
pub mod template_ops;
