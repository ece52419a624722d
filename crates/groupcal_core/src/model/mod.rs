//! Domain model for the group scheduling core.
//!
//! # Responsibility
//! - Define canonical records for groups, memberships, tasks, reactions and
//!   task templates.
//! - Own field-level validation so every write path shares one rule set.
//!
//! # Invariants
//! - Every record is identified by a stable UUID that is never reused.
//! - A task's schedule is exactly one of all-day date or time span; the
//!   type system makes "both" and "neither" unrepresentable.

use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod group;
pub mod patch;
pub mod reaction;
pub mod schedule;
pub mod task;
pub mod template;

/// Stable identifier of a group.
pub type GroupId = Uuid;
/// Stable identifier of a task.
pub type TaskId = Uuid;
/// Opaque identifier of an authenticated user.
pub type UserId = Uuid;
/// Stable identifier of a task template.
pub type TemplateId = Uuid;

/// Kinds of entities referenced by not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Group,
    Membership,
    Task,
    Reaction,
    Template,
}

impl EntityKind {
    /// Stable lowercase label used in logs and at the API boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Membership => "membership",
            Self::Task => "task",
            Self::Reaction => "reaction",
            Self::Template => "template",
        }
    }
}

/// Field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    Blank { field: &'static str },
    /// Text field exceeds its maximum length in characters.
    TooLong {
        field: &'static str,
        max_chars: usize,
    },
    /// Date/time-span exclusivity or range shape violated.
    Schedule(schedule::ScheduleError),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Blank { field } | Self::TooLong { field, .. } => field,
            Self::Schedule(err) => err.field(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::Schedule(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schedule(err) => Some(err),
            _ => None,
        }
    }
}

impl From<schedule::ScheduleError> for ValidationError {
    fn from(value: schedule::ScheduleError) -> Self {
        Self::Schedule(value)
    }
}

/// Trims a required text value, rejecting blanks and over-long input.
pub(crate) fn normalize_required(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text value; blank input collapses to `None`.
pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{normalize_optional, normalize_required, ValidationError};

    #[test]
    fn normalize_required_trims_and_rejects_blank() {
        assert_eq!(
            normalize_required("title", "  standup ", 10).expect("valid title"),
            "standup"
        );
        assert_eq!(
            normalize_required("title", " \t", 10).expect_err("blank title"),
            ValidationError::Blank { field: "title" }
        );
    }

    #[test]
    fn normalize_required_counts_chars_not_bytes() {
        assert!(normalize_required("name", "会議会議会議", 6).is_ok());
        assert_eq!(
            normalize_required("name", "会議会議会議会", 6).expect_err("too long"),
            ValidationError::TooLong {
                field: "name",
                max_chars: 6
            }
        );
    }

    #[test]
    fn normalize_optional_collapses_blank_to_none() {
        assert_eq!(normalize_optional(Some("   ")), None);
        assert_eq!(normalize_optional(Some(" room 4 ")).as_deref(), Some("room 4"));
        assert_eq!(normalize_optional(None), None);
    }
}
