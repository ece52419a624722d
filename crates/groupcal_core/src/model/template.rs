//! Reusable task templates ("regular meeting" and the like).
//!
//! A template pre-fills title, location and description of a new task; the
//! schedule is always supplied when the task is created from it.

use crate::model::schedule::Schedule;
use crate::model::task::{TaskContent, TaskStatus, TITLE_MAX_CHARS};
use crate::model::{normalize_optional, normalize_required, GroupId, TemplateId, ValidationError};
use serde::{Deserialize, Serialize};

const TEMPLATE_NAME_MAX_CHARS: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub template_id: TemplateId,
    pub group_id: GroupId,
    /// Management label shown in the template picker.
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl TaskTemplate {
    /// Builds task content from this template placed at `schedule`.
    pub fn instantiate(&self, schedule: Schedule) -> Result<TaskContent, ValidationError> {
        schedule.validate()?;
        Ok(TaskContent {
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            schedule,
            status: TaskStatus::default(),
            is_task: true,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTemplate {
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

/// Normalized template fields ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContent {
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl NewTemplate {
    pub fn to_content(&self) -> Result<TemplateContent, ValidationError> {
        Ok(TemplateContent {
            name: normalize_required("name", &self.name, TEMPLATE_NAME_MAX_CHARS)?,
            title: normalize_required("title", &self.title, TITLE_MAX_CHARS)?,
            location: normalize_optional(self.location.as_deref()),
            description: normalize_optional(self.description.as_deref()),
        })
    }
}
