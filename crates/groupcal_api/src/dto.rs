//! Request and response records.
//!
//! Ids travel as strings, dates as `YYYY-MM-DD` and timestamps as
//! `YYYY-MM-DDTHH:MM[:SS]`. No payload carries the acting user; the actor
//! always comes from the `Session`.

use crate::envelope::ApiError;
use chrono::NaiveDate;
use groupcal_core::model::schedule::{format_date, format_timestamp, parse_date, parse_timestamp};
use groupcal_core::{
    DateRange, FieldUpdate, GroupView, JoinDecision, Membership, MembershipStatus, NewTask,
    NewTemplate, Reaction, ReactionRoster, ReactionState, RosterBucket, Task, TaskFilter,
    TaskOrder, TaskPatch, TaskQuery, TaskStatus, TaskTemplate, TimeSpan,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub(crate) fn parse_id(field: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::invalid_input(field, format!("{field} is not a valid id: `{raw}`")))
}

fn parse_optional_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(|value| parse_date(field, value))
        .transpose()
        .map_err(ApiError::from)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpanDto {
    pub begin: String,
    pub end: Option<String>,
}

impl TimeSpanDto {
    /// Parses both ends; range shape is left to the engine so that
    /// authorization is still reported first.
    pub fn parse(&self) -> Result<TimeSpan, ApiError> {
        let begin = parse_timestamp("time_span.begin", &self.begin)?;
        let end = self
            .end
            .as_deref()
            .map(|raw| parse_timestamp("time_span.end", raw))
            .transpose()?;
        Ok(TimeSpan { begin, end })
    }
}

impl From<&TimeSpan> for TimeSpanDto {
    fn from(value: &TimeSpan) -> Self {
        Self {
            begin: format_timestamp(value.begin),
            end: value.end.map(format_timestamp),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDto {
    pub date: Option<String>,
    pub time_span: Option<TimeSpanDto>,
}

impl ScheduleDto {
    pub(crate) fn parse(&self) -> Result<(Option<NaiveDate>, Option<TimeSpan>), ApiError> {
        let date = parse_optional_date("date", self.date.as_deref())?;
        let time_span = self.time_span.as_ref().map(TimeSpanDto::parse).transpose()?;
        Ok((date, time_span))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time_span: Option<TimeSpanDto>,
    pub status: Option<TaskStatus>,
    pub is_task: Option<bool>,
}

impl CreateTaskRequest {
    pub(crate) fn to_new_task(&self) -> Result<NewTask, ApiError> {
        Ok(NewTask {
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            date: parse_optional_date("date", self.date.as_deref())?,
            time_span: self.time_span.as_ref().map(TimeSpanDto::parse).transpose()?,
            status: self.status,
            is_task: self.is_task,
        })
    }
}

/// Partial update: a missing key keeps the stored value, `null` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub location: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub description: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub date: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub time_span: FieldUpdate<TimeSpanDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_task: Option<bool>,
}

impl UpdateTaskRequest {
    pub(crate) fn to_patch(&self) -> Result<TaskPatch, ApiError> {
        Ok(TaskPatch {
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            date: self
                .date
                .as_ref()
                .try_map(|raw| parse_date("date", raw))?,
            time_span: self.time_span.as_ref().try_map(TimeSpanDto::parse)?,
            status: self.status,
            is_task: self.is_task,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListTasksRequest {
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(default)]
    pub filter: TaskFilter,
    #[serde(default)]
    pub order: TaskOrder,
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

impl ListTasksRequest {
    pub(crate) fn to_query(&self) -> Result<TaskQuery, ApiError> {
        let range = DateRange::new(
            parse_optional_date("from", self.from.as_deref())?,
            parse_optional_date("to", self.to.as_deref())?,
        )?;
        Ok(TaskQuery {
            range,
            filter: self.filter,
            order: self.order,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDto {
    pub task_id: String,
    pub group_id: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub time_span: Option<TimeSpanDto>,
    pub status: TaskStatus,
    pub is_task: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&Task> for TaskDto {
    fn from(value: &Task) -> Self {
        Self {
            task_id: value.task_id.to_string(),
            group_id: value.group_id.to_string(),
            title: value.content.title.clone(),
            location: value.content.location.clone(),
            description: value.content.description.clone(),
            date: value.date().map(format_date),
            time_span: value.time_span().map(TimeSpanDto::from),
            status: value.content.status,
            is_task: value.content.is_task,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReactionRequest {
    pub state: ReactionState,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionDto {
    pub task_id: String,
    pub user_id: String,
    pub state: ReactionState,
    pub comment: Option<String>,
    pub is_assigned: bool,
}

impl From<&Reaction> for ReactionDto {
    fn from(value: &Reaction) -> Self {
        Self {
            task_id: value.task_id.to_string(),
            user_id: value.user_id.to_string(),
            state: value.state,
            comment: value.comment.clone(),
            is_assigned: value.is_assigned,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterBucketDto {
    pub user_ids: Vec<String>,
    /// Count behind "+N more".
    pub remaining: u32,
    pub total: u32,
}

impl From<&RosterBucket> for RosterBucketDto {
    fn from(value: &RosterBucket) -> Self {
        Self {
            user_ids: value.shown.iter().map(Uuid::to_string).collect(),
            remaining: value.remaining,
            total: value.total(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterDto {
    pub task_id: String,
    pub join: RosterBucketDto,
    pub absent: RosterBucketDto,
    pub undecided: RosterBucketDto,
    pub assigned: Vec<String>,
}

impl From<&ReactionRoster> for RosterDto {
    fn from(value: &ReactionRoster) -> Self {
        Self {
            task_id: value.task_id.to_string(),
            join: (&value.join).into(),
            absent: (&value.absent).into(),
            undecided: (&value.undecided).into(),
            assigned: value.assigned.iter().map(Uuid::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipDto {
    pub group_id: String,
    pub user_id: String,
    pub status: MembershipStatus,
    pub is_representative: bool,
    pub joined_at: i64,
}

impl From<&Membership> for MembershipDto {
    fn from(value: &Membership) -> Self {
        Self {
            group_id: value.group_id.to_string(),
            user_id: value.user_id.to_string(),
            status: value.status(),
            is_representative: value.is_representative,
            joined_at: value.joined_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDto {
    pub group_id: String,
    pub name: String,
    pub created_at: i64,
    pub my_membership: MembershipDto,
}

impl From<&GroupView> for GroupDto {
    fn from(value: &GroupView) -> Self {
        Self {
            group_id: value.group.group_id.to_string(),
            name: value.group.name.clone(),
            created_at: value.group.created_at,
            my_membership: (&value.my_membership).into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGroupRequest {
    /// Must equal the group's display name.
    pub group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideJoinRequest {
    pub user_id: String,
    pub accept: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionDto {
    pub accepted: bool,
    /// The accepted membership; absent on rejection.
    pub membership: Option<MembershipDto>,
}

impl From<&JoinDecision> for DecisionDto {
    fn from(value: &JoinDecision) -> Self {
        match value {
            JoinDecision::Accepted(membership) => Self {
                accepted: true,
                membership: Some(membership.into()),
            },
            JoinDecision::Rejected => Self {
                accepted: false,
                membership: None,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

impl From<&TemplateRequest> for NewTemplate {
    fn from(value: &TemplateRequest) -> Self {
        Self {
            name: value.name.clone(),
            title: value.title.clone(),
            location: value.location.clone(),
            description: value.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDto {
    pub template_id: String,
    pub group_id: String,
    pub name: String,
    pub title: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: i64,
}

impl From<&TaskTemplate> for TemplateDto {
    fn from(value: &TaskTemplate) -> Self {
        Self {
            template_id: value.template_id.to_string(),
            group_id: value.group_id.to_string(),
            name: value.name.clone(),
            title: value.title.clone(),
            location: value.location.clone(),
            description: value.description.clone(),
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFromTemplateRequest {
    pub template_id: String,
    #[serde(flatten)]
    pub schedule: ScheduleDto,
}

#[cfg(test)]
mod tests {
    use super::{ListTasksRequest, UpdateTaskRequest};
    use groupcal_core::{ErrorKind, FieldUpdate, TaskFilter};

    #[test]
    fn update_request_distinguishes_missing_from_null() {
        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"location":null,"date":"2026-07-01"}"#).expect("decode");
        assert_eq!(request.location, FieldUpdate::Clear);
        assert_eq!(request.description, FieldUpdate::Keep);

        let patch = request.to_patch().expect("valid patch");
        assert_eq!(patch.location, FieldUpdate::Clear);
        assert!(patch.time_span.is_keep());
        assert!(matches!(patch.date, FieldUpdate::Set(_)));
        assert_eq!(patch.status, None);
    }

    #[test]
    fn malformed_date_names_the_field() {
        let request: UpdateTaskRequest =
            serde_json::from_str(r#"{"date":"07/01/2026"}"#).expect("decode");
        let err = request.to_patch().expect_err("malformed date");
        assert!(err.is_kind(ErrorKind::InvalidInput));
        assert_eq!(err.field.as_deref(), Some("date"));
    }

    #[test]
    fn list_request_defaults_and_reversed_range() {
        let request: ListTasksRequest =
            serde_json::from_str(r#"{"filter":"my_related"}"#).expect("decode");
        let query = request.to_query().expect("valid query");
        assert_eq!(query.filter, TaskFilter::MyRelated);
        assert_eq!(query.offset, 0);

        let reversed = ListTasksRequest {
            from: Some("2026-07-10".to_string()),
            to: Some("2026-07-01".to_string()),
            ..ListTasksRequest::default()
        };
        let err = reversed.to_query().expect_err("reversed range");
        assert!(err.is_kind(ErrorKind::InvalidSchedule));
    }
}
