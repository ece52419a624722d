//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist task records and their schedule columns.
//! - Serve range/filter/order list queries for group and member calendars.
//!
//! # Invariants
//! - Write paths call `TaskContent::validate()` before SQL mutations.
//! - Exactly one of `date` / `time_span_begin` is stored (backed by a
//!   table `CHECK`).
//! - Read paths re-validate rows and reject invalid persisted state.

use crate::model::schedule::{format_date, format_timestamp, DateRange, Schedule, TimeSpan};
use crate::model::task::{Task, TaskContent, TaskStatus};
use crate::model::{EntityKind, GroupId, TaskId, UserId};
use crate::repo::{
    bool_to_int, now_ms, parse_db_date, parse_db_timestamp, parse_flag, parse_uuid, RepoError,
    RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

const TASK_SELECT_SQL: &str = "SELECT
    t.task_id,
    t.group_id,
    t.title,
    t.location,
    t.description,
    t.date,
    t.time_span_begin,
    t.time_span_end,
    t.status,
    t.is_task,
    t.created_at,
    t.updated_at
FROM tasks t";

const TASKS_LIMIT_MAX: u32 = 500;

/// Which calendar a list query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    /// One group's calendar.
    Group(GroupId),
    /// Every group the user is an accepted member of.
    MemberOf(UserId),
}

/// Viewer-relative list filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFilter {
    #[default]
    All,
    /// Tasks the viewer is assigned to or reacted `join` on.
    MyRelated,
    /// Tasks the viewer has not answered yet.
    Undecided,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOrder {
    /// Start instant ascending; all-day tasks lead their day.
    #[default]
    Start,
    /// Newest first.
    RecentlyCreated,
}

/// Caller-facing list options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub range: DateRange,
    pub filter: TaskFilter,
    pub order: TaskOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for task persistence.
pub trait TaskRepository {
    fn create_task(&self, task_id: TaskId, group_id: GroupId, content: &TaskContent)
        -> RepoResult<Task>;
    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>>;
    fn update_task(&self, task_id: TaskId, content: &TaskContent) -> RepoResult<Task>;
    fn delete_task(&self, task_id: TaskId) -> RepoResult<()>;
    fn list_tasks(&self, scope: TaskScope, viewer: UserId, query: &TaskQuery)
        -> RepoResult<Vec<Task>>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn require_task(&self, task_id: TaskId) -> RepoResult<Task> {
        self.get_task(task_id)?
            .ok_or_else(|| RepoError::not_found(EntityKind::Task, task_id))
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn create_task(
        &self,
        task_id: TaskId,
        group_id: GroupId,
        content: &TaskContent,
    ) -> RepoResult<Task> {
        content.validate()?;
        let columns = ScheduleColumns::from(&content.schedule);
        let now = now_ms();

        self.conn.execute(
            "INSERT INTO tasks (
                task_id,
                group_id,
                title,
                location,
                description,
                date,
                time_span_begin,
                time_span_end,
                status,
                is_task,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11);",
            params![
                task_id.to_string(),
                group_id.to_string(),
                content.title.as_str(),
                content.location.as_deref(),
                content.description.as_deref(),
                columns.date,
                columns.begin,
                columns.end,
                content.status.as_str(),
                bool_to_int(content.is_task),
                now,
            ],
        )?;

        self.require_task(task_id)
    }

    fn get_task(&self, task_id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE t.task_id = ?1;"))?;
        let mut rows = stmt.query([task_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_task(&self, task_id: TaskId, content: &TaskContent) -> RepoResult<Task> {
        content.validate()?;
        let columns = ScheduleColumns::from(&content.schedule);

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                title = ?1,
                location = ?2,
                description = ?3,
                date = ?4,
                time_span_begin = ?5,
                time_span_end = ?6,
                status = ?7,
                is_task = ?8,
                updated_at = ?9
             WHERE task_id = ?10;",
            params![
                content.title.as_str(),
                content.location.as_deref(),
                content.description.as_deref(),
                columns.date,
                columns.begin,
                columns.end,
                content.status.as_str(),
                bool_to_int(content.is_task),
                now_ms(),
                task_id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Task, task_id));
        }

        self.require_task(task_id)
    }

    fn delete_task(&self, task_id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE task_id = ?1;", [task_id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Task, task_id));
        }
        Ok(())
    }

    fn list_tasks(
        &self,
        scope: TaskScope,
        viewer: UserId,
        query: &TaskQuery,
    ) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE");
        let mut bind_values: Vec<Value> = Vec::new();

        match scope {
            TaskScope::Group(group_id) => {
                sql.push_str(" t.group_id = ?");
                bind_values.push(Value::Text(group_id.to_string()));
            }
            TaskScope::MemberOf(user_id) => {
                sql.push_str(
                    " t.group_id IN (
                        SELECT m.group_id
                        FROM memberships m
                        WHERE m.user_id = ? AND m.accepted = 1
                    )",
                );
                bind_values.push(Value::Text(user_id.to_string()));
            }
        }

        // Day-granular overlap: stored dates and timestamps share the
        // `YYYY-MM-DD` prefix.
        if let Some(from) = query.range.from {
            sql.push_str(
                " AND COALESCE(
                    substr(t.time_span_end, 1, 10),
                    substr(t.time_span_begin, 1, 10),
                    t.date
                ) >= ?",
            );
            bind_values.push(Value::Text(format_date(from)));
        }
        if let Some(to) = query.range.to {
            sql.push_str(" AND COALESCE(substr(t.time_span_begin, 1, 10), t.date) <= ?");
            bind_values.push(Value::Text(format_date(to)));
        }

        match query.filter {
            TaskFilter::All => {}
            TaskFilter::MyRelated => {
                sql.push_str(
                    " AND EXISTS (
                        SELECT 1 FROM reactions r
                        WHERE r.task_id = t.task_id
                          AND r.user_id = ?
                          AND (r.is_assigned = 1 OR r.state = 'join')
                    )",
                );
                bind_values.push(Value::Text(viewer.to_string()));
            }
            TaskFilter::Undecided => {
                sql.push_str(
                    " AND NOT EXISTS (
                        SELECT 1 FROM reactions r
                        WHERE r.task_id = t.task_id
                          AND r.user_id = ?
                          AND r.state <> 'undecided'
                    )",
                );
                bind_values.push(Value::Text(viewer.to_string()));
            }
        }

        match query.order {
            TaskOrder::Start => {
                sql.push_str(" ORDER BY COALESCE(t.time_span_begin, t.date) ASC, t.task_id ASC")
            }
            TaskOrder::RecentlyCreated => {
                sql.push_str(" ORDER BY t.created_at DESC, t.rowid DESC")
            }
        }

        match normalize_task_limit(query.limit) {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                bind_values.push(Value::Integer(i64::from(limit)));
            }
            // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded.
            None if query.offset > 0 => sql.push_str(" LIMIT -1"),
            None => {}
        }
        if query.offset > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }
}

/// Normalizes a requested page size: `None`/`0` mean no paging (every
/// matching task), larger pages are capped.
pub fn normalize_task_limit(limit: Option<u32>) -> Option<u32> {
    match limit {
        Some(0) | None => None,
        Some(value) if value > TASKS_LIMIT_MAX => Some(TASKS_LIMIT_MAX),
        Some(value) => Some(value),
    }
}

struct ScheduleColumns {
    date: Option<String>,
    begin: Option<String>,
    end: Option<String>,
}

impl From<&Schedule> for ScheduleColumns {
    fn from(schedule: &Schedule) -> Self {
        match schedule {
            Schedule::AllDay(date) => Self {
                date: Some(format_date(*date)),
                begin: None,
                end: None,
            },
            Schedule::Timed(span) => Self {
                date: None,
                begin: Some(format_timestamp(span.begin)),
                end: span.end.map(format_timestamp),
            },
        }
    }
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let task_id: String = row.get("task_id")?;
    let group_id: String = row.get("group_id")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;

    let date = row.get::<_, Option<String>>("date")?;
    let begin = row.get::<_, Option<String>>("time_span_begin")?;
    let end = row.get::<_, Option<String>>("time_span_end")?;
    let schedule = match (date, begin) {
        (Some(date), None) => Schedule::AllDay(parse_db_date("tasks.date", &date)?),
        (None, Some(begin)) => Schedule::Timed(TimeSpan {
            begin: parse_db_timestamp("tasks.time_span_begin", &begin)?,
            end: end
                .map(|value| parse_db_timestamp("tasks.time_span_end", &value))
                .transpose()?,
        }),
        _ => {
            return Err(RepoError::InvalidData(format!(
                "task {task_id} must store exactly one of date/time_span"
            )))
        }
    };

    let content = TaskContent {
        title: row.get("title")?,
        location: row.get("location")?,
        description: row.get("description")?,
        schedule,
        status,
        is_task: parse_flag("tasks.is_task", row.get("is_task")?)?,
    };
    content.validate()?;

    Ok(Task {
        task_id: parse_uuid("tasks.task_id", &task_id)?,
        group_id: parse_uuid("tasks.group_id", &group_id)?,
        content,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::normalize_task_limit;

    #[test]
    fn missing_limit_is_unbounded_and_pages_are_capped() {
        assert_eq!(normalize_task_limit(None), None);
        assert_eq!(normalize_task_limit(Some(0)), None);
        assert_eq!(normalize_task_limit(Some(20)), Some(20));
        assert_eq!(normalize_task_limit(Some(5000)), Some(500));
    }
}
