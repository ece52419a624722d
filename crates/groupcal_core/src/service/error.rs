//! Engine error taxonomy.
//!
//! Every variant is recoverable by the caller: composed operations never
//! partially apply, so an error always means "nothing changed".

use crate::auth::{Operation, Requirement};
use crate::db::DbError;
use crate::model::schedule::ScheduleError;
use crate::model::{EntityKind, GroupId, UserId, ValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type EngineResult<T> = Result<T, EngineError>;

/// Boundary-level error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidSchedule,
    InvalidInput,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::InvalidSchedule => "invalid_schedule",
            Self::InvalidInput => "invalid_input",
            Self::Conflict => "conflict",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// The user already has a membership record for the group.
    DuplicateMembership {
        group_id: GroupId,
        user_id: UserId,
        pending: bool,
    },
    /// The change would leave the group without a representative.
    SoleRepresentative { group_id: GroupId },
    /// Another writer held the database past the busy timeout.
    Contention,
}

#[derive(Debug)]
pub enum EngineError {
    NotFound { entity: EntityKind, id: String },
    Forbidden {
        operation: Operation,
        requirement: Requirement,
    },
    InvalidSchedule(ScheduleError),
    InvalidInput(ValidationError),
    Conflict(ConflictReason),
    /// Unexpected persistence failure.
    Storage(RepoError),
}

impl EngineError {
    pub(crate) fn not_found(entity: EntityKind, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidSchedule(_) => ErrorKind::InvalidSchedule,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns whether repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(ConflictReason::Contention))
    }

    /// Offending entity and its id, when the error names one.
    pub fn entity(&self) -> Option<(EntityKind, String)> {
        match self {
            Self::NotFound { entity, id } => Some((*entity, id.clone())),
            Self::Conflict(ConflictReason::DuplicateMembership { user_id, .. }) => {
                Some((EntityKind::Membership, user_id.to_string()))
            }
            Self::Conflict(ConflictReason::SoleRepresentative { group_id }) => {
                Some((EntityKind::Group, group_id.to_string()))
            }
            _ => None,
        }
    }

    /// Offending input field, when the error names one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidSchedule(err) => Some(err.field()),
            Self::InvalidInput(err) => Some(err.field()),
            _ => None,
        }
    }
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{} not found: {id}", entity.as_str()),
            Self::Forbidden {
                operation,
                requirement,
            } => write!(f, "{operation} requires {requirement}"),
            Self::InvalidSchedule(err) => write!(f, "invalid schedule: {err}"),
            Self::InvalidInput(err) => write!(f, "invalid input: {err}"),
            Self::Conflict(ConflictReason::DuplicateMembership { pending, .. }) => {
                if *pending {
                    write!(f, "join request already pending")
                } else {
                    write!(f, "already a member of this group")
                }
            }
            Self::Conflict(ConflictReason::SoleRepresentative { .. }) => write!(
                f,
                "group must keep at least one representative; promote another member or dissolve the group"
            ),
            Self::Conflict(ConflictReason::Contention) => {
                write!(f, "concurrent mutation retry exhausted")
            }
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSchedule(err) => Some(err),
            Self::InvalidInput(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ScheduleError> for EngineError {
    fn from(value: ScheduleError) -> Self {
        Self::InvalidSchedule(value)
    }
}

impl From<ValidationError> for EngineError {
    fn from(value: ValidationError) -> Self {
        match value {
            ValidationError::Schedule(err) => Self::InvalidSchedule(err),
            other => Self::InvalidInput(other),
        }
    }
}

impl From<RepoError> for EngineError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::Validation(err) => err.into(),
            RepoError::Db(err) if err.is_lock_contention() => {
                Self::Conflict(ConflictReason::Contention)
            }
            other => Self::Storage(other),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(value: DbError) -> Self {
        RepoError::Db(value).into()
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(value: rusqlite::Error) -> Self {
        RepoError::from(value).into()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictReason, EngineError, ErrorKind};
    use crate::model::schedule::ScheduleError;
    use crate::model::{EntityKind, ValidationError};
    use crate::repo::RepoError;
    use rusqlite::ffi;

    #[test]
    fn validation_errors_split_into_schedule_and_input() {
        let schedule: EngineError =
            ValidationError::Schedule(ScheduleError::BothRepresentations).into();
        assert_eq!(schedule.kind(), ErrorKind::InvalidSchedule);
        assert_eq!(schedule.field(), Some("schedule"));

        let input: EngineError = ValidationError::Blank { field: "title" }.into();
        assert_eq!(input.kind(), ErrorKind::InvalidInput);
        assert_eq!(input.field(), Some("title"));
    }

    #[test]
    fn repo_not_found_keeps_entity_and_id() {
        let err: EngineError = RepoError::not_found(EntityKind::Task, "abc").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.entity(), Some((EntityKind::Task, "abc".to_string())));
        assert!(!err.is_retryable());
    }

    #[test]
    fn busy_database_maps_to_retryable_conflict() {
        let busy = rusqlite::Error::SqliteFailure(ffi::Error::new(ffi::SQLITE_BUSY), None);
        let err: EngineError = busy.into();
        assert!(matches!(
            err,
            EngineError::Conflict(ConflictReason::Contention)
        ));
        assert!(err.is_retryable());
        assert_eq!(err.kind().as_str(), "conflict");
    }

    #[test]
    fn other_sqlite_failures_are_internal() {
        let err: EngineError = rusqlite::Error::InvalidQuery.into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
