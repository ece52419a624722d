//! Reaction ledger persistence.
//!
//! # Invariants
//! - One row per (task, user), enforced by the table primary key.
//! - Default records (undecided, no comment, not assigned) are deleted
//!   instead of stored; a missing row reads as `Reaction::undecided`.
//! - `updated_at` moves only when the answer or comment changes, so
//!   assignment toggles keep a responder's place in the roster.
//! - A member who leaves a group takes their records on its tasks along.

use crate::model::reaction::{Reaction, ReactionState};
use crate::model::{GroupId, TaskId, UserId};
use crate::repo::{bool_to_int, now_ms, parse_flag, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const REACTION_SELECT_SQL: &str = "SELECT
    task_id,
    user_id,
    state,
    comment,
    is_assigned
FROM reactions";

/// Repository interface for reaction records.
pub trait ReactionRepository {
    /// Returns the stored record, or `None` when the user never reacted.
    fn get_reaction(&self, task_id: TaskId, user_id: UserId) -> RepoResult<Option<Reaction>>;
    /// Upserts `reaction`, or deletes the row when it is a default record.
    fn save_reaction(&self, reaction: &Reaction) -> RepoResult<()>;
    /// Returns stored records, earliest responder first.
    fn list_reactions(&self, task_id: TaskId) -> RepoResult<Vec<Reaction>>;
    /// Deletes `user_id`'s records on every task of `group_id`; returns the
    /// number removed.
    fn delete_member_reactions(&self, group_id: GroupId, user_id: UserId) -> RepoResult<usize>;
}

/// SQLite-backed reaction repository.
pub struct SqliteReactionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReactionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReactionRepository for SqliteReactionRepository<'_> {
    fn get_reaction(&self, task_id: TaskId, user_id: UserId) -> RepoResult<Option<Reaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REACTION_SELECT_SQL} WHERE task_id = ?1 AND user_id = ?2;"
        ))?;
        let mut rows = stmt.query([task_id.to_string(), user_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_reaction_row(row)?));
        }
        Ok(None)
    }

    fn save_reaction(&self, reaction: &Reaction) -> RepoResult<()> {
        if reaction.is_default() {
            self.conn.execute(
                "DELETE FROM reactions WHERE task_id = ?1 AND user_id = ?2;",
                [reaction.task_id.to_string(), reaction.user_id.to_string()],
            )?;
            return Ok(());
        }

        self.conn.execute(
            "INSERT INTO reactions (task_id, user_id, state, comment, is_assigned, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (task_id, user_id) DO UPDATE SET
                state = excluded.state,
                comment = excluded.comment,
                is_assigned = excluded.is_assigned,
                updated_at = CASE
                    WHEN reactions.state = excluded.state
                        AND reactions.comment IS excluded.comment
                    THEN reactions.updated_at
                    ELSE excluded.updated_at
                END;",
            params![
                reaction.task_id.to_string(),
                reaction.user_id.to_string(),
                reaction.state.as_str(),
                reaction.comment.as_deref(),
                bool_to_int(reaction.is_assigned),
                now_ms(),
            ],
        )?;
        Ok(())
    }

    fn list_reactions(&self, task_id: TaskId) -> RepoResult<Vec<Reaction>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REACTION_SELECT_SQL} WHERE task_id = ?1 ORDER BY updated_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([task_id.to_string()])?;
        let mut reactions = Vec::new();
        while let Some(row) = rows.next()? {
            reactions.push(parse_reaction_row(row)?);
        }
        Ok(reactions)
    }

    fn delete_member_reactions(&self, group_id: GroupId, user_id: UserId) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM reactions
             WHERE user_id = ?1
               AND task_id IN (SELECT task_id FROM tasks WHERE group_id = ?2);",
            [user_id.to_string(), group_id.to_string()],
        )?)
    }
}

fn parse_reaction_row(row: &Row<'_>) -> RepoResult<Reaction> {
    let task_id: String = row.get("task_id")?;
    let user_id: String = row.get("user_id")?;
    let state_text: String = row.get("state")?;
    let state = ReactionState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid reaction state `{state_text}` in reactions.state"
        ))
    })?;

    Ok(Reaction {
        task_id: parse_uuid("reactions.task_id", &task_id)?,
        user_id: parse_uuid("reactions.user_id", &user_id)?,
        state,
        comment: row.get("comment")?,
        is_assigned: parse_flag("reactions.is_assigned", row.get("is_assigned")?)?,
    })
}
