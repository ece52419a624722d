//! Task operations: create, update, move, delete and calendar listings.
//!
//! Check order for every call: target exists (`NotFound`), gate
//! (`Forbidden`), then input validation (`InvalidSchedule`/`InvalidInput`).

use crate::auth::{Operation, Target};
use crate::model::schedule::{Schedule, TimeSpan};
use crate::model::task::{NewTask, Task, TaskContent, TaskPatch};
use crate::model::{GroupId, TaskId};
use crate::repo::task_repo::{SqliteTaskRepository, TaskQuery, TaskRepository, TaskScope};
use crate::service::engine::{guard, require_group, require_task, SchedulingEngine};
use crate::service::error::EngineResult;
use crate::service::session::Session;
use chrono::NaiveDate;
use log::info;
use uuid::Uuid;

impl SchedulingEngine<'_> {
    /// Creates a task in `group_id`; every call allocates a new id.
    ///
    /// # Errors
    /// - `NotFound` when the group does not exist.
    /// - `Forbidden` unless the actor is a representative of the group.
    /// - `InvalidSchedule` when both or neither of `date`/`time_span` are
    ///   supplied, or the span is reversed.
    pub fn create_task(
        &mut self,
        session: &Session,
        group_id: GroupId,
        input: &NewTask,
    ) -> EngineResult<Task> {
        let task = self.write("create_task", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::CreateTask,
                Target::Group(group_id),
            )?;
            let content = input.to_content()?;
            Ok(SqliteTaskRepository::new(tx).create_task(Uuid::new_v4(), group_id, &content)?)
        })?;

        info!(
            "event=task_create module=engine status=ok task_id={} group_id={}",
            task.task_id, group_id
        );
        Ok(task)
    }

    /// Applies `patch` over the stored content.
    ///
    /// Unspecified fields carry forward; reactions are never touched.
    pub fn update_task(
        &mut self,
        session: &Session,
        task_id: TaskId,
        patch: &TaskPatch,
    ) -> EngineResult<Task> {
        let task = self.write("update_task", |tx| {
            let current = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                current.group_id,
                Operation::UpdateTask,
                Target::Task(task_id),
            )?;
            let content = current.content.merged(patch)?;
            Ok(SqliteTaskRepository::new(tx).update_task(task_id, &content)?)
        })?;

        info!("event=task_update module=engine status=ok task_id={task_id}");
        Ok(task)
    }

    /// Reschedules a task (drag/resize).
    ///
    /// Exactly one of `date` / `time_span` must be supplied. Moving to the
    /// stored schedule writes nothing, so retries are safe.
    pub fn move_task(
        &mut self,
        session: &Session,
        task_id: TaskId,
        date: Option<NaiveDate>,
        time_span: Option<TimeSpan>,
    ) -> EngineResult<Task> {
        self.write("move_task", |tx| {
            let current = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                current.group_id,
                Operation::MoveTask,
                Target::Task(task_id),
            )?;
            let schedule = Schedule::from_parts(date, time_span)?;
            if schedule == current.content.schedule {
                return Ok(current);
            }

            let content = TaskContent {
                schedule,
                ..current.content.clone()
            };
            let moved = SqliteTaskRepository::new(tx).update_task(task_id, &content)?;
            info!(
                "event=task_move module=engine status=ok task_id={task_id} all_day={}",
                schedule.is_all_day()
            );
            Ok(moved)
        })
    }

    /// Deletes a task together with its reactions.
    pub fn delete_task(&mut self, session: &Session, task_id: TaskId) -> EngineResult<()> {
        self.write("delete_task", |tx| {
            let current = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                current.group_id,
                Operation::DeleteTask,
                Target::Task(task_id),
            )?;
            Ok(SqliteTaskRepository::new(tx).delete_task(task_id)?)
        })?;

        info!("event=task_delete module=engine status=ok task_id={task_id}");
        Ok(())
    }

    pub fn get_task(&mut self, session: &Session, task_id: TaskId) -> EngineResult<Task> {
        self.read("get_task", |tx| {
            let task = require_task(tx, task_id)?;
            guard(
                tx,
                session,
                task.group_id,
                Operation::ViewGroupContent,
                Target::Task(task_id),
            )?;
            Ok(task)
        })
    }

    /// Lists one group's calendar; requires accepted membership.
    pub fn list_group_tasks(
        &mut self,
        session: &Session,
        group_id: GroupId,
        query: &TaskQuery,
    ) -> EngineResult<Vec<Task>> {
        self.read("list_group_tasks", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::ViewGroupContent,
                Target::Group(group_id),
            )?;
            Ok(SqliteTaskRepository::new(tx).list_tasks(
                TaskScope::Group(group_id),
                session.user_id(),
                query,
            )?)
        })
    }

    /// Lists the caller's personal calendar across all accepted groups.
    pub fn list_my_tasks(&mut self, session: &Session, query: &TaskQuery) -> EngineResult<Vec<Task>> {
        self.read("list_my_tasks", |tx| {
            Ok(SqliteTaskRepository::new(tx).list_tasks(
                TaskScope::MemberOf(session.user_id()),
                session.user_id(),
                query,
            )?)
        })
    }
}
