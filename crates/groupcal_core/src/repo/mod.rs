//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define store-oriented data access contracts (tasks, reactions,
//!   memberships, templates).
//! - Isolate SQLite query details from engine orchestration.
//!
//! # Invariants
//! - Write paths validate domain records before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories never open transactions themselves; the engine hands them
//!   a connection that is already inside one, so several stores can be
//!   mutated as one atomic unit.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::schedule::{DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::model::{EntityKind, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod membership_repo;
pub mod reaction_repo;
pub mod task_repo;
pub mod template_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all stores.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Domain record failed validation before write.
    Validation(ValidationError),
    /// Write targeted a row that does not exist.
    NotFound { entity: EntityKind, id: String },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid domain record.
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Tables and columns the repositories depend on.
const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("groups", &["group_id", "name", "created_at"]),
    (
        "memberships",
        &[
            "group_id",
            "user_id",
            "accepted",
            "is_representative",
            "joined_at",
        ],
    ),
    (
        "tasks",
        &[
            "task_id",
            "group_id",
            "title",
            "location",
            "description",
            "date",
            "time_span_begin",
            "time_span_end",
            "status",
            "is_task",
            "created_at",
            "updated_at",
        ],
    ),
    (
        "reactions",
        &[
            "task_id",
            "user_id",
            "state",
            "comment",
            "is_assigned",
            "updated_at",
        ],
    ),
    (
        "task_templates",
        &[
            "template_id",
            "group_id",
            "name",
            "title",
            "location",
            "description",
            "created_at",
        ],
    ),
];

/// Verifies the connection is migrated and carries every table/column the
/// stores read or write.
pub fn ensure_schema_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub(crate) fn parse_uuid(column: &str, value: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn parse_flag(column: &str, value: i64) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_db_date(column: &str, value: &str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn parse_db_timestamp(column: &str, value: &str) -> RepoResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

/// Wall-clock epoch milliseconds used for `created_at`/`updated_at` columns.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
