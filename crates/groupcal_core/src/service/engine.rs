//! Scheduling engine composition root.
//!
//! # Responsibility
//! - Expose client operations over tasks, reactions, memberships and
//!   templates.
//! - Run each operation as one atomic unit: role facts are read, the gate is
//!   consulted and stores are mutated inside a single transaction.
//!
//! # Invariants
//! - Mutations use `BEGIN IMMEDIATE`; SQLite's reserved lock serializes
//!   writers, so role facts cannot change between the check and the write.
//! - Reads use a deferred transaction for a consistent snapshot.
//! - Any error rolls the transaction back; nothing is partially applied.
//! - The engine keeps no state between calls.

use crate::auth::{authorize, AccessDecision, Operation, RoleFacts, Target};
use crate::model::group::{Group, Membership};
use crate::model::task::Task;
use crate::model::template::TaskTemplate;
use crate::model::{EntityKind, GroupId, TaskId, TemplateId, UserId};
use crate::repo::ensure_schema_ready;
use crate::repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
use crate::service::error::{ConflictReason, EngineError, EngineResult};
use crate::service::session::Session;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::Instant;

/// Scheduling engine bound to one connection.
///
/// The API layer opens one connection per request; concurrent requests
/// therefore hold independent engines and are serialized by SQLite.
pub struct SchedulingEngine<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SchedulingEngine<'conn> {
    /// Creates an engine after verifying the connection schema.
    ///
    /// # Errors
    /// - `Storage` when the connection is not migrated to the latest
    ///   version or required tables are missing.
    pub fn try_new(conn: &'conn mut Connection) -> EngineResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside an immediate (write) transaction.
    pub(crate) fn write<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.run(op, TransactionBehavior::Immediate, f)
    }

    /// Runs `f` inside a deferred (read) transaction.
    pub(crate) fn read<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        self.run(op, TransactionBehavior::Deferred, f)
    }

    fn run<T>(
        &mut self,
        op: &'static str,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Transaction<'_>) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let started_at = Instant::now();
        let is_write = matches!(behavior, TransactionBehavior::Immediate);
        let result = self
            .conn
            .transaction_with_behavior(behavior)
            .map_err(EngineError::from)
            .and_then(|tx| {
                let value = f(&tx)?;
                tx.commit()?;
                Ok(value)
            });

        let duration_ms = started_at.elapsed().as_millis();
        match &result {
            Ok(_) if is_write => info!(
                "event=engine_write module=engine status=ok op={op} duration_ms={duration_ms}"
            ),
            Ok(_) => {}
            Err(err @ (EngineError::Storage(_) | EngineError::Conflict(ConflictReason::Contention))) => error!(
                "event=engine_call module=engine status=error op={op} duration_ms={duration_ms} error_kind={} error={err}",
                err.kind().as_str()
            ),
            Err(err) => info!(
                "event=engine_call module=engine status=rejected op={op} duration_ms={duration_ms} error_kind={}",
                err.kind().as_str()
            ),
        }
        result
    }
}

/// Reads the actor's role facts for `group_id` and consults the gate.
///
/// Must be called with the connection of the transaction that performs the
/// guarded work.
pub(crate) fn guard(
    conn: &Connection,
    session: &Session,
    group_id: GroupId,
    operation: Operation,
    target: Target,
) -> EngineResult<RoleFacts> {
    let membership =
        SqliteMembershipRepository::new(conn).get_membership(group_id, session.user_id())?;
    admit(
        session,
        group_id,
        RoleFacts::from_membership(membership.as_ref()),
        operation,
        target,
    )
}

/// Consults the gate with role facts the caller already holds.
pub(crate) fn admit(
    session: &Session,
    group_id: GroupId,
    facts: RoleFacts,
    operation: Operation,
    target: Target,
) -> EngineResult<RoleFacts> {
    let actor = session.user_id();
    match authorize(actor, &facts, operation, &target) {
        AccessDecision::Allow => Ok(facts),
        AccessDecision::Deny(requirement) => {
            warn!(
                "event=authorize module=auth status=denied op={} requirement={} actor={} group={}",
                operation.as_str(),
                requirement.as_str(),
                actor,
                group_id
            );
            Err(EngineError::Forbidden {
                operation,
                requirement,
            })
        }
    }
}

pub(crate) fn require_group(conn: &Connection, group_id: GroupId) -> EngineResult<Group> {
    SqliteMembershipRepository::new(conn)
        .get_group(group_id)?
        .ok_or_else(|| EngineError::not_found(EntityKind::Group, group_id))
}

pub(crate) fn require_task(conn: &Connection, task_id: TaskId) -> EngineResult<Task> {
    SqliteTaskRepository::new(conn)
        .get_task(task_id)?
        .ok_or_else(|| EngineError::not_found(EntityKind::Task, task_id))
}

pub(crate) fn require_template(
    conn: &Connection,
    template_id: TemplateId,
) -> EngineResult<TaskTemplate> {
    SqliteTemplateRepository::new(conn)
        .get_template(template_id)?
        .ok_or_else(|| EngineError::not_found(EntityKind::Template, template_id))
}

/// Loads an accepted membership, reporting pending or missing records as
/// not found.
pub(crate) fn require_accepted_member(
    conn: &Connection,
    group_id: GroupId,
    user_id: UserId,
) -> EngineResult<Membership> {
    match SqliteMembershipRepository::new(conn).get_membership(group_id, user_id)? {
        Some(membership) if membership.accepted => Ok(membership),
        _ => Err(EngineError::not_found(EntityKind::Membership, user_id)),
    }
}
