//! Task template management and template-based task creation.

use crate::auth::{Operation, Target};
use crate::model::schedule::{Schedule, TimeSpan};
use crate::model::task::Task;
use crate::model::template::{NewTemplate, TaskTemplate};
use crate::model::{EntityKind, GroupId, TemplateId};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
use crate::service::engine::{guard, require_group, require_template, SchedulingEngine};
use crate::service::error::{EngineError, EngineResult};
use crate::service::session::Session;
use chrono::NaiveDate;
use log::info;
use uuid::Uuid;

impl SchedulingEngine<'_> {
    pub fn create_template(
        &mut self,
        session: &Session,
        group_id: GroupId,
        input: &NewTemplate,
    ) -> EngineResult<TaskTemplate> {
        let template = self.write("create_template", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::ManageTemplates,
                Target::Group(group_id),
            )?;
            let content = input.to_content()?;
            Ok(SqliteTemplateRepository::new(tx).insert_template(
                Uuid::new_v4(),
                group_id,
                &content,
            )?)
        })?;

        info!(
            "event=template_create module=engine status=ok template_id={} group_id={group_id}",
            template.template_id
        );
        Ok(template)
    }

    pub fn list_templates(
        &mut self,
        session: &Session,
        group_id: GroupId,
    ) -> EngineResult<Vec<TaskTemplate>> {
        self.read("list_templates", |tx| {
            require_group(tx, group_id)?;
            guard(
                tx,
                session,
                group_id,
                Operation::ViewGroupContent,
                Target::Group(group_id),
            )?;
            Ok(SqliteTemplateRepository::new(tx).list_templates(group_id)?)
        })
    }

    pub fn delete_template(
        &mut self,
        session: &Session,
        template_id: TemplateId,
    ) -> EngineResult<()> {
        self.write("delete_template", |tx| {
            let template = require_template(tx, template_id)?;
            guard(
                tx,
                session,
                template.group_id,
                Operation::ManageTemplates,
                Target::Template(template_id),
            )?;
            Ok(SqliteTemplateRepository::new(tx).delete_template(template_id)?)
        })?;

        info!("event=template_delete module=engine status=ok template_id={template_id}");
        Ok(())
    }

    /// Creates a task in `group_id` pre-filled from a template.
    ///
    /// The template must belong to `group_id`; the schedule follows the same
    /// exactly-one rule as `create_task`.
    pub fn create_task_from_template(
        &mut self,
        session: &Session,
        group_id: GroupId,
        template_id: TemplateId,
        date: Option<NaiveDate>,
        time_span: Option<TimeSpan>,
    ) -> EngineResult<Task> {
        let task = self.write("create_task_from_template", |tx| {
            let template = require_template(tx, template_id)?;
            if template.group_id != group_id {
                return Err(EngineError::not_found(EntityKind::Template, template_id));
            }
            guard(
                tx,
                session,
                group_id,
                Operation::CreateTask,
                Target::Template(template_id),
            )?;
            let content = template.instantiate(Schedule::from_parts(date, time_span)?)?;
            Ok(SqliteTaskRepository::new(tx).create_task(Uuid::new_v4(), group_id, &content)?)
        })?;

        info!(
            "event=task_create module=engine status=ok task_id={} group_id={group_id} template_id={template_id}",
            task.task_id
        );
        Ok(task)
    }
}
