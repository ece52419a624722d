//! Task template persistence.

use crate::model::template::{TaskTemplate, TemplateContent};
use crate::model::{EntityKind, GroupId, TemplateId};
use crate::repo::{now_ms, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    template_id,
    group_id,
    name,
    title,
    location,
    description,
    created_at
FROM task_templates";

pub trait TemplateRepository {
    fn insert_template(
        &self,
        template_id: TemplateId,
        group_id: GroupId,
        content: &TemplateContent,
    ) -> RepoResult<TaskTemplate>;
    fn get_template(&self, template_id: TemplateId) -> RepoResult<Option<TaskTemplate>>;
    /// Templates of one group, oldest first.
    fn list_templates(&self, group_id: GroupId) -> RepoResult<Vec<TaskTemplate>>;
    fn delete_template(&self, template_id: TemplateId) -> RepoResult<()>;
}

/// SQLite-backed template repository.
pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn insert_template(
        &self,
        template_id: TemplateId,
        group_id: GroupId,
        content: &TemplateContent,
    ) -> RepoResult<TaskTemplate> {
        let created_at = now_ms();
        self.conn.execute(
            "INSERT INTO task_templates (
                template_id,
                group_id,
                name,
                title,
                location,
                description,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                template_id.to_string(),
                group_id.to_string(),
                content.name.as_str(),
                content.title.as_str(),
                content.location.as_deref(),
                content.description.as_deref(),
                created_at,
            ],
        )?;

        Ok(TaskTemplate {
            template_id,
            group_id,
            name: content.name.clone(),
            title: content.title.clone(),
            location: content.location.clone(),
            description: content.description.clone(),
            created_at,
        })
    }

    fn get_template(&self, template_id: TemplateId) -> RepoResult<Option<TaskTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE template_id = ?1;"))?;
        let mut rows = stmt.query([template_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_template_row(row)?));
        }
        Ok(None)
    }

    fn list_templates(&self, group_id: GroupId) -> RepoResult<Vec<TaskTemplate>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TEMPLATE_SELECT_SQL} WHERE group_id = ?1 ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([group_id.to_string()])?;
        let mut templates = Vec::new();
        while let Some(row) = rows.next()? {
            templates.push(parse_template_row(row)?);
        }
        Ok(templates)
    }

    fn delete_template(&self, template_id: TemplateId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM task_templates WHERE template_id = ?1;",
            [template_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found(EntityKind::Template, template_id));
        }
        Ok(())
    }
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<TaskTemplate> {
    let template_id: String = row.get("template_id")?;
    let group_id: String = row.get("group_id")?;
    Ok(TaskTemplate {
        template_id: parse_uuid("task_templates.template_id", &template_id)?,
        group_id: parse_uuid("task_templates.group_id", &group_id)?,
        name: row.get("name")?,
        title: row.get("title")?,
        location: row.get("location")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}
