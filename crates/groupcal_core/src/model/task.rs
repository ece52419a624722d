//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its mutable content.
//! - Resolve creation input and carry-forward updates into valid content.
//!
//! # Invariants
//! - `title` is non-blank after trim.
//! - `schedule` holds exactly one representation (see `model::schedule`).
//! - Updates never reset unspecified fields to defaults; they carry the
//!   stored value forward.

use crate::model::patch::FieldUpdate;
use crate::model::schedule::{Schedule, ScheduleError, TimeSpan};
use crate::model::{normalize_optional, normalize_required, GroupId, TaskId, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub(crate) const TITLE_MAX_CHARS: usize = 255;

/// Progress state of a task-like item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    NotStarted,
    /// Work is in progress.
    InProgress,
    /// Completed.
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not_started" => Some(Self::NotStarted),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Caller-editable part of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskContent {
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub schedule: Schedule,
    pub status: TaskStatus,
    /// Distinguishes task-like items from plain events.
    pub is_task: bool,
}

impl TaskContent {
    /// Re-checks field rules; used on every write path and on read-back.
    pub fn validate(&self) -> Result<(), ValidationError> {
        normalize_required("title", &self.title, TITLE_MAX_CHARS)?;
        self.schedule.validate()?;
        Ok(())
    }

    /// Produces the content after applying `patch` over `self`.
    ///
    /// # Schedule resolution
    /// - Setting one representation while leaving the other as `Keep`
    ///   switches representation; the other one is cleared.
    /// - Setting both is `BothRepresentations`.
    /// - Clearing the current representation without setting the other is
    ///   `MissingRepresentation`.
    pub fn merged(&self, patch: &TaskPatch) -> Result<Self, ValidationError> {
        let title = match patch.title.as_deref() {
            Some(title) => normalize_required("title", title, TITLE_MAX_CHARS)?,
            None => self.title.clone(),
        };
        let location = patch
            .location
            .clone()
            .apply(self.location.clone())
            .and_then(|value| normalize_optional(Some(&value)));
        let description = patch
            .description
            .clone()
            .apply(self.description.clone())
            .and_then(|value| normalize_optional(Some(&value)));

        Ok(Self {
            title,
            location,
            description,
            schedule: merge_schedule(&self.schedule, &patch.date, &patch.time_span)?,
            status: patch.status.unwrap_or(self.status),
            is_task: patch.is_task.unwrap_or(self.is_task),
        })
    }
}

fn merge_schedule(
    current: &Schedule,
    date: &FieldUpdate<NaiveDate>,
    time_span: &FieldUpdate<TimeSpan>,
) -> Result<Schedule, ScheduleError> {
    use FieldUpdate::{Clear, Keep, Set};

    let merged = match (date, time_span) {
        (Set(_), Set(_)) => return Err(ScheduleError::BothRepresentations),
        (Set(date), Keep | Clear) => Schedule::AllDay(*date),
        (Keep | Clear, Set(span)) => Schedule::Timed(*span),
        (Keep, Keep) => *current,
        (Clear, Keep) if current.is_all_day() => {
            return Err(ScheduleError::MissingRepresentation)
        }
        (Keep, Clear) if !current.is_all_day() => {
            return Err(ScheduleError::MissingRepresentation)
        }
        (Clear, Keep) | (Keep, Clear) => *current,
        (Clear, Clear) => return Err(ScheduleError::MissingRepresentation),
    };
    merged.validate()?;
    Ok(merged)
}

/// Canonical task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    /// Owning group; never changes after creation.
    pub group_id: GroupId,
    #[serde(flatten)]
    pub content: TaskContent,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Task {
    /// All-day date, `None` for timed tasks.
    pub fn date(&self) -> Option<NaiveDate> {
        self.content.schedule.date()
    }

    /// Time span, `None` for all-day tasks.
    pub fn time_span(&self) -> Option<&TimeSpan> {
        self.content.schedule.time_span()
    }
}

/// Creation input for a task.
///
/// `date` and `time_span` arrive as a loose pair so that "both" and
/// "neither" can be reported as `InvalidSchedule` instead of being
/// unrepresentable at the boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub time_span: Option<TimeSpan>,
    /// Defaults to `TaskStatus::NotStarted`.
    pub status: Option<TaskStatus>,
    /// Defaults to `true`.
    pub is_task: Option<bool>,
}

impl NewTask {
    pub fn all_day(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            date: Some(date),
            ..Self::default()
        }
    }

    pub fn timed(title: impl Into<String>, time_span: TimeSpan) -> Self {
        Self {
            title: title.into(),
            time_span: Some(time_span),
            ..Self::default()
        }
    }

    /// Validates and normalizes into storable content.
    pub fn to_content(&self) -> Result<TaskContent, ValidationError> {
        let schedule = Schedule::from_parts(self.date, self.time_span)?;
        Ok(TaskContent {
            title: normalize_required("title", &self.title, TITLE_MAX_CHARS)?,
            location: normalize_optional(self.location.as_deref()),
            description: normalize_optional(self.description.as_deref()),
            schedule,
            status: self.status.unwrap_or_default(),
            is_task: self.is_task.unwrap_or(true),
        })
    }
}

/// Carry-forward update for a task.
///
/// Non-nullable fields use `Option` (`None` keeps the stored value);
/// nullable fields use `FieldUpdate` so "not supplied" and "null" differ.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub location: FieldUpdate<String>,
    pub description: FieldUpdate<String>,
    pub date: FieldUpdate<NaiveDate>,
    pub time_span: FieldUpdate<TimeSpan>,
    pub status: Option<TaskStatus>,
    pub is_task: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::{NewTask, TaskContent, TaskPatch, TaskStatus};
    use crate::model::patch::FieldUpdate;
    use crate::model::schedule::{parse_timestamp, Schedule, ScheduleError, TimeSpan};
    use crate::model::ValidationError;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).expect("valid date")
    }

    fn span(begin: &str, end: &str) -> TimeSpan {
        TimeSpan::new(
            parse_timestamp("begin", begin).expect("begin"),
            Some(parse_timestamp("end", end).expect("end")),
        )
        .expect("valid span")
    }

    fn base() -> TaskContent {
        NewTask::all_day("Cleanup", day(10))
            .to_content()
            .expect("valid content")
    }

    #[test]
    fn new_task_applies_defaults() {
        let content = base();
        assert_eq!(content.status, TaskStatus::NotStarted);
        assert!(content.is_task);
        assert_eq!(content.schedule, Schedule::AllDay(day(10)));
    }

    #[test]
    fn new_task_rejects_both_and_neither_schedule() {
        let mut both = NewTask::all_day("x", day(10));
        both.time_span = Some(span("2026-01-10T09:00", "2026-01-10T10:00"));
        assert_eq!(
            both.to_content(),
            Err(ValidationError::Schedule(ScheduleError::BothRepresentations))
        );

        let neither = NewTask {
            title: "x".to_string(),
            ..NewTask::default()
        };
        assert_eq!(
            neither.to_content(),
            Err(ValidationError::Schedule(
                ScheduleError::MissingRepresentation
            ))
        );
    }

    #[test]
    fn empty_patch_preserves_everything() {
        let mut content = base();
        content.status = TaskStatus::Done;
        content.is_task = false;
        content.location = Some("hall".to_string());

        let merged = content.merged(&TaskPatch::default()).expect("merge");
        assert_eq!(merged, content);
    }

    #[test]
    fn setting_time_span_switches_off_date() {
        let timed = span("2026-01-10T09:00", "2026-01-10T10:00");
        let patch = TaskPatch {
            time_span: FieldUpdate::Set(timed),
            ..TaskPatch::default()
        };
        let merged = base().merged(&patch).expect("merge");
        assert_eq!(merged.schedule, Schedule::Timed(timed));
        assert_eq!(merged.schedule.date(), None);
    }

    #[test]
    fn clearing_the_only_representation_is_rejected() {
        let patch = TaskPatch {
            date: FieldUpdate::Clear,
            ..TaskPatch::default()
        };
        assert_eq!(
            base().merged(&patch),
            Err(ValidationError::Schedule(
                ScheduleError::MissingRepresentation
            ))
        );
    }

    #[test]
    fn clearing_absent_time_span_is_a_no_op() {
        let patch = TaskPatch {
            time_span: FieldUpdate::Clear,
            ..TaskPatch::default()
        };
        assert_eq!(base().merged(&patch).expect("merge"), base());
    }

    #[test]
    fn explicit_null_clears_optional_text() {
        let mut content = base();
        content.description = Some("bring gloves".to_string());
        let patch = TaskPatch {
            description: FieldUpdate::Clear,
            title: Some("  Park cleanup ".to_string()),
            ..TaskPatch::default()
        };
        let merged = content.merged(&patch).expect("merge");
        assert_eq!(merged.description, None);
        assert_eq!(merged.title, "Park cleanup");
    }

    #[test]
    fn blank_title_in_patch_is_rejected() {
        let patch = TaskPatch {
            title: Some("   ".to_string()),
            ..TaskPatch::default()
        };
        assert_eq!(
            base().merged(&patch),
            Err(ValidationError::Blank { field: "title" })
        );
    }

    #[test]
    fn status_round_trips_through_storage_label() {
        for status in [
            TaskStatus::NotStarted,
            TaskStatus::InProgress,
            TaskStatus::Done,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("archived"), None);
    }
}
