//! Core domain logic for the group calendar.
//!
//! This crate is the single source of truth for scheduling and membership
//! invariants: the task store, reaction ledger, membership registry,
//! authorization gate and the scheduling engine that composes them.

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use auth::{authorize, AccessDecision, Operation, Relation, Requirement, RoleFacts, Target};
pub use config::{ConfigError, GroupcalConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::group::{Group, GroupView, Membership, MembershipStatus};
pub use model::patch::FieldUpdate;
pub use model::reaction::{Reaction, ReactionState};
pub use model::schedule::{DateRange, Schedule, ScheduleError, TimeSpan};
pub use model::task::{NewTask, Task, TaskContent, TaskPatch, TaskStatus};
pub use model::template::{NewTemplate, TaskTemplate};
pub use model::{EntityKind, GroupId, TaskId, TemplateId, UserId, ValidationError};
pub use repo::task_repo::{TaskFilter, TaskOrder, TaskQuery};
pub use repo::{RepoError, RepoResult};
pub use service::engine::SchedulingEngine;
pub use service::error::{ConflictReason, EngineError, EngineResult, ErrorKind};
pub use service::membership_ops::JoinDecision;
pub use service::reaction_ops::{ReactionRoster, RosterBucket};
pub use service::session::Session;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
