//! Per-(task, user) reaction records.
//!
//! # Invariants
//! - At most one record per (task, user).
//! - A missing record reads as `undecided`, no comment, not assigned; such
//!   default records are never persisted.
//! - Task content edits never touch reactions.

use crate::model::{normalize_optional, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// A member's stated intent toward a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
    #[default]
    Undecided,
    Join,
    Absent,
}

impl ReactionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undecided => "undecided",
            Self::Join => "join",
            Self::Absent => "absent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "undecided" => Some(Self::Undecided),
            "join" => Some(Self::Join),
            "absent" => Some(Self::Absent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub state: ReactionState,
    pub comment: Option<String>,
    /// Set by representatives only; independent of `state`.
    pub is_assigned: bool,
}

impl Reaction {
    /// The implicit record for a user who never reacted.
    pub fn undecided(task_id: TaskId, user_id: UserId) -> Self {
        Self {
            task_id,
            user_id,
            state: ReactionState::Undecided,
            comment: None,
            is_assigned: false,
        }
    }

    /// Returns a copy with the subject's own answer replaced.
    ///
    /// Assignment is carried forward; blank comments collapse to `None`.
    pub fn answered(&self, state: ReactionState, comment: Option<&str>) -> Self {
        Self {
            state,
            comment: normalize_optional(comment),
            ..self.clone()
        }
    }

    /// Returns whether this record carries no information beyond absence.
    pub fn is_default(&self) -> bool {
        self.state == ReactionState::Undecided && self.comment.is_none() && !self.is_assigned
    }
}

#[cfg(test)]
mod tests {
    use super::{Reaction, ReactionState};
    use uuid::Uuid;

    #[test]
    fn answered_keeps_assignment_and_normalizes_comment() {
        let mut record = Reaction::undecided(Uuid::new_v4(), Uuid::new_v4());
        record.is_assigned = true;

        let answered = record.answered(ReactionState::Join, Some("  bringing snacks "));
        assert!(answered.is_assigned);
        assert_eq!(answered.state, ReactionState::Join);
        assert_eq!(answered.comment.as_deref(), Some("bringing snacks"));

        let blank = record.answered(ReactionState::Absent, Some("   "));
        assert_eq!(blank.comment, None);
    }

    #[test]
    fn only_fully_empty_records_are_default() {
        let record = Reaction::undecided(Uuid::new_v4(), Uuid::new_v4());
        assert!(record.is_default());
        assert!(!record.answered(ReactionState::Undecided, Some("maybe")).is_default());
        assert!(!record.answered(ReactionState::Absent, None).is_default());
    }
}
