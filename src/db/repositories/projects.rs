use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_optional_datetime},
    models::Project,
};

fn row_to_project(row: &Row) -> Result<Project> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
        deleted_at: parse_optional_datetime(deleted_at, "deleted_at")?,
    })
}

impl Database {
    /// Create a new project. Names are unique among non-deleted projects;
    /// the check runs within the same DB task to avoid races.
    pub async fn create_project(&self, name: String, color: String) -> Result<Project> {
        self.execute(move |conn| {
            let name = name.trim().to_string();
            if name.is_empty() {
                bail!("project name must not be empty");
            }

            let existing: Option<i64> = conn
                .query_row(
                    "SELECT id FROM projects WHERE name = ?1 AND deleted_at IS NULL",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                bail!("a project named '{name}' already exists");
            }

            let now = Utc::now();
            conn.execute(
                "INSERT INTO projects (name, color, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, color, now.to_rfc3339(), now.to_rfc3339()],
            )?;

            let project_id = conn.last_insert_rowid();

            let mut stmt = conn.prepare(
                "SELECT id, name, color, created_at, updated_at, deleted_at
                 FROM projects
                 WHERE id = ?1",
            )?;
            let mut rows = stmt.query(params![project_id])?;
            let project = match rows.next()? {
                Some(row) => row_to_project(row)?,
                None => return Err(anyhow!("project not found after insert")),
            };

            Ok(project)
        })
        .await
    }

    /// All non-deleted projects, ordered by name.
    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, color, created_at, updated_at, deleted_at
                 FROM projects
                 WHERE deleted_at IS NULL
                 ORDER BY name ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut projects = Vec::new();
            while let Some(row) = rows.next()? {
                projects.push(row_to_project(row)?);
            }

            Ok(projects)
        })
        .await
    }

    /// Update name and/or color; omitted fields keep their current value.
    pub async fn update_project(
        &self,
        project_id: i64,
        name: Option<String>,
        color: Option<String>,
    ) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE projects
                 SET name = COALESCE(?1, name),
                     color = COALESCE(?2, color),
                     updated_at = ?3
                 WHERE id = ?4 AND deleted_at IS NULL",
                params![name, color, Utc::now().to_rfc3339(), project_id],
            )?;

            if rows_affected == 0 {
                bail!("project not found or has been deleted");
            }
            Ok(())
        })
        .await
    }

    /// Soft delete. Sessions keep their project_id so history stays intact.
    pub async fn delete_project(&self, project_id: i64) -> Result<()> {
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE projects
                 SET deleted_at = ?1,
                     updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![Utc::now().to_rfc3339(), project_id],
            )?;

            if rows_affected == 0 {
                bail!("project not found or has been deleted");
            }
            Ok(())
        })
        .await
    }
}
