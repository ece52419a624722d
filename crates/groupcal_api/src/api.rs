//! Use-case API over the scheduling engine.
//!
//! # Responsibility
//! - Decode request records, run one engine operation, encode the result.
//! - Map every failure into the `ApiResponse` envelope.
//!
//! # Invariants
//! - Each call opens its own connection; no state is shared between calls.
//! - Calls never panic; all failures are returned as `ApiError`.
//! - The acting user is always the `Session`, never a payload field.

use crate::dto::{
    parse_id, CreateGroupRequest, CreateTaskRequest, DecideJoinRequest, DecisionDto, GroupDto,
    JoinGroupRequest, ListTasksRequest, MembershipDto, ReactionDto, RosterDto, ScheduleDto,
    SetReactionRequest, TaskDto, TaskFromTemplateRequest, TemplateDto, TemplateRequest,
    UpdateTaskRequest,
};
use crate::envelope::{ApiError, ApiResponse};
use groupcal_core::db::open_db_with_options;
use groupcal_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    DbOptions, ErrorKind, GroupcalConfig, NewTemplate, SchedulingEngine, Session,
};
use log::error;
use std::path::{Path, PathBuf};

/// Health check.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Safe to repeat with the same `level` and `log_dir`; a different
/// configuration is returned as an `internal` error.
pub fn init_logging(level: &str, log_dir: &str) -> ApiResponse<()> {
    init_logging_inner(level, log_dir)
        .map_err(|err| ApiError::internal(err.to_string()))
        .into()
}

/// Entry point for all calendar use cases.
#[derive(Debug, Clone)]
pub struct CalendarApi {
    db_path: PathBuf,
    options: DbOptions,
    roster_limit: usize,
}

impl CalendarApi {
    pub fn new(db_path: impl Into<PathBuf>, options: DbOptions, roster_limit: usize) -> Self {
        Self {
            db_path: db_path.into(),
            options,
            roster_limit,
        }
    }

    pub fn from_config(config: &GroupcalConfig) -> Self {
        Self::new(
            config.db_path.clone(),
            config.db_options(),
            config.roster_limit,
        )
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Opens a connection, builds an engine and runs `f` against it.
    fn call<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut SchedulingEngine<'_>) -> Result<T, ApiError>,
    ) -> ApiResponse<T> {
        let result = open_db_with_options(&self.db_path, &self.options)
            .map_err(ApiError::from)
            .and_then(|mut conn| {
                let mut engine = SchedulingEngine::try_new(&mut conn)?;
                f(&mut engine)
            });
        if let Err(err) = &result {
            if err.is_kind(ErrorKind::Internal) {
                error!("event=api_call module=api status=error op={op} error={}", err.message);
            }
        }
        result.into()
    }

    // Groups and membership

    pub fn create_group(
        &self,
        session: &Session,
        request: &CreateGroupRequest,
    ) -> ApiResponse<GroupDto> {
        self.call("create_group", |engine| {
            Ok(GroupDto::from(&engine.create_group(session, &request.name)?))
        })
    }

    pub fn get_group(&self, session: &Session, group_id: &str) -> ApiResponse<GroupDto> {
        self.call("get_group", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            Ok(GroupDto::from(&engine.get_group(session, group_id)?))
        })
    }

    /// Groups the caller belongs to, by name.
    pub fn list_my_groups(&self, session: &Session) -> ApiResponse<Vec<GroupDto>> {
        self.call("list_my_groups", |engine| {
            Ok(engine
                .list_groups_for_user(session)?
                .iter()
                .map(GroupDto::from)
                .collect())
        })
    }

    pub fn request_join(
        &self,
        session: &Session,
        group_id: &str,
        request: &JoinGroupRequest,
    ) -> ApiResponse<MembershipDto> {
        self.call("request_join", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let membership = engine.request_join(session, group_id, &request.group_name)?;
            Ok(MembershipDto::from(&membership))
        })
    }

    pub fn decide_join(
        &self,
        session: &Session,
        group_id: &str,
        request: &DecideJoinRequest,
    ) -> ApiResponse<DecisionDto> {
        self.call("decide_join", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let target = parse_id("user_id", &request.user_id)?;
            let decision = engine.decide(session, group_id, target, request.accept)?;
            Ok(DecisionDto::from(&decision))
        })
    }

    pub fn leave_group(&self, session: &Session, group_id: &str) -> ApiResponse<()> {
        self.call("leave_group", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            Ok(engine.leave(session, group_id)?)
        })
    }

    pub fn remove_member(
        &self,
        session: &Session,
        group_id: &str,
        user_id: &str,
    ) -> ApiResponse<()> {
        self.call("remove_member", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let target = parse_id("user_id", user_id)?;
            Ok(engine.remove_member(session, group_id, target)?)
        })
    }

    pub fn set_representative(
        &self,
        session: &Session,
        group_id: &str,
        user_id: &str,
        is_representative: bool,
    ) -> ApiResponse<MembershipDto> {
        self.call("set_representative", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let target = parse_id("user_id", user_id)?;
            let membership =
                engine.set_representative(session, group_id, target, is_representative)?;
            Ok(MembershipDto::from(&membership))
        })
    }

    /// Accepted members, or every record including pending requests when
    /// `accepted_only` is `false` (representatives only).
    pub fn list_members(
        &self,
        session: &Session,
        group_id: &str,
        accepted_only: bool,
    ) -> ApiResponse<Vec<MembershipDto>> {
        self.call("list_members", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            Ok(engine
                .list_members(session, group_id, accepted_only)?
                .iter()
                .map(MembershipDto::from)
                .collect())
        })
    }

    pub fn dissolve_group(&self, session: &Session, group_id: &str) -> ApiResponse<()> {
        self.call("dissolve_group", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            Ok(engine.dissolve(session, group_id)?)
        })
    }

    // Tasks

    pub fn create_task(
        &self,
        session: &Session,
        group_id: &str,
        request: &CreateTaskRequest,
    ) -> ApiResponse<TaskDto> {
        self.call("create_task", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let input = request.to_new_task()?;
            Ok(TaskDto::from(&engine.create_task(session, group_id, &input)?))
        })
    }

    pub fn update_task(
        &self,
        session: &Session,
        task_id: &str,
        request: &UpdateTaskRequest,
    ) -> ApiResponse<TaskDto> {
        self.call("update_task", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            let patch = request.to_patch()?;
            Ok(TaskDto::from(&engine.update_task(session, task_id, &patch)?))
        })
    }

    /// Drag/resize on the calendar.
    pub fn move_task(
        &self,
        session: &Session,
        task_id: &str,
        request: &ScheduleDto,
    ) -> ApiResponse<TaskDto> {
        self.call("move_task", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            let (date, time_span) = request.parse()?;
            Ok(TaskDto::from(
                &engine.move_task(session, task_id, date, time_span)?,
            ))
        })
    }

    pub fn delete_task(&self, session: &Session, task_id: &str) -> ApiResponse<()> {
        self.call("delete_task", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            Ok(engine.delete_task(session, task_id)?)
        })
    }

    pub fn get_task(&self, session: &Session, task_id: &str) -> ApiResponse<TaskDto> {
        self.call("get_task", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            Ok(TaskDto::from(&engine.get_task(session, task_id)?))
        })
    }

    pub fn list_group_tasks(
        &self,
        session: &Session,
        group_id: &str,
        request: &ListTasksRequest,
    ) -> ApiResponse<Vec<TaskDto>> {
        self.call("list_group_tasks", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let query = request.to_query()?;
            Ok(engine
                .list_group_tasks(session, group_id, &query)?
                .iter()
                .map(TaskDto::from)
                .collect())
        })
    }

    /// The caller's calendar across all groups they belong to.
    pub fn list_my_tasks(
        &self,
        session: &Session,
        request: &ListTasksRequest,
    ) -> ApiResponse<Vec<TaskDto>> {
        self.call("list_my_tasks", |engine| {
            let query = request.to_query()?;
            Ok(engine
                .list_my_tasks(session, &query)?
                .iter()
                .map(TaskDto::from)
                .collect())
        })
    }

    // Reactions

    /// Records the caller's own answer on a task.
    pub fn set_reaction(
        &self,
        session: &Session,
        task_id: &str,
        request: &SetReactionRequest,
    ) -> ApiResponse<ReactionDto> {
        self.call("set_reaction", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            let reaction = engine.set_reaction(
                session,
                task_id,
                session.user_id(),
                request.state,
                request.comment.as_deref(),
            )?;
            Ok(ReactionDto::from(&reaction))
        })
    }

    pub fn list_reactions(&self, session: &Session, task_id: &str) -> ApiResponse<Vec<ReactionDto>> {
        self.call("list_reactions", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            Ok(engine
                .list_reactions(session, task_id)?
                .iter()
                .map(ReactionDto::from)
                .collect())
        })
    }

    /// Roster for a task card; `limit` falls back to the configured size.
    pub fn reaction_roster(
        &self,
        session: &Session,
        task_id: &str,
        limit: Option<usize>,
    ) -> ApiResponse<RosterDto> {
        let limit = limit.unwrap_or(self.roster_limit);
        self.call("reaction_roster", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            Ok(RosterDto::from(
                &engine.reaction_roster(session, task_id, limit)?,
            ))
        })
    }

    pub fn set_assignment(
        &self,
        session: &Session,
        task_id: &str,
        user_id: &str,
        assigned: bool,
    ) -> ApiResponse<ReactionDto> {
        self.call("set_assignment", |engine| {
            let task_id = parse_id("task_id", task_id)?;
            let target = parse_id("user_id", user_id)?;
            Ok(ReactionDto::from(
                &engine.set_assignment(session, task_id, target, assigned)?,
            ))
        })
    }

    // Templates

    pub fn create_template(
        &self,
        session: &Session,
        group_id: &str,
        request: &TemplateRequest,
    ) -> ApiResponse<TemplateDto> {
        self.call("create_template", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let template =
                engine.create_template(session, group_id, &NewTemplate::from(request))?;
            Ok(TemplateDto::from(&template))
        })
    }

    pub fn list_templates(&self, session: &Session, group_id: &str) -> ApiResponse<Vec<TemplateDto>> {
        self.call("list_templates", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            Ok(engine
                .list_templates(session, group_id)?
                .iter()
                .map(TemplateDto::from)
                .collect())
        })
    }

    pub fn delete_template(&self, session: &Session, template_id: &str) -> ApiResponse<()> {
        self.call("delete_template", |engine| {
            let template_id = parse_id("template_id", template_id)?;
            Ok(engine.delete_template(session, template_id)?)
        })
    }

    pub fn create_task_from_template(
        &self,
        session: &Session,
        group_id: &str,
        request: &TaskFromTemplateRequest,
    ) -> ApiResponse<TaskDto> {
        self.call("create_task_from_template", |engine| {
            let group_id = parse_id("group_id", group_id)?;
            let template_id = parse_id("template_id", &request.template_id)?;
            let (date, time_span) = request.schedule.parse()?;
            let task = engine.create_task_from_template(
                session,
                group_id,
                template_id,
                date,
                time_span,
            )?;
            Ok(TaskDto::from(&task))
        })
    }
}
