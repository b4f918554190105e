//! Project store contract and SQLite implementation.
//!
//! # Invariants
//! - `id` is the primary key; a duplicate insert surfaces as
//!   `RepoError::AlreadyExists` even when callers raced past a pre-check.
//! - `created_at` is written once at insert and never updated.

use crate::model::project::Project;
use crate::repo::{ensure_tables, is_constraint_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ENTITY: &str = "project";

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    description,
    created_at
FROM projects";

/// Persistence contract for projects.
pub trait ProjectRepository {
    /// Lists every project ordered by id.
    fn get_all(&self) -> RepoResult<Vec<Project>>;
    /// Loads one project.
    fn get(&self, id: &str) -> RepoResult<Option<Project>>;
    /// Returns whether a project with `id` exists.
    fn has_project(&self, id: &str) -> RepoResult<bool>;
    fn create(&self, project: &Project) -> RepoResult<()>;
    /// Replaces name and description; fails with `NotFound` for unknown ids.
    fn update(&self, project: &Project) -> RepoResult<()>;
    fn delete(&self, id: &str) -> RepoResult<()>;
    /// Stores the latest computed health rating.
    fn set_health_rating(&self, id: &str, rating: u8) -> RepoResult<()>;
    /// Returns the last stored health rating, if any was computed.
    fn get_health_rating(&self, id: &str) -> RepoResult<Option<u8>>;
}

/// SQLite-backed project store.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["projects"])?;
        Ok(Self { conn })
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn get_all(&self) -> RepoResult<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn get(&self, id: &str) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn has_project(&self, id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create(&self, project: &Project) -> RepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO projects (id, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                project.id.as_str(),
                project.name.as_str(),
                project.description.as_deref(),
                project.created_at,
            ],
        );

        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::AlreadyExists {
                entity: ENTITY,
                id: project.id.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn update(&self, project: &Project) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects
             SET
                name = ?2,
                description = ?3
             WHERE id = ?1;",
            params![
                project.id.as_str(),
                project.name.as_str(),
                project.description.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(&project.id));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn set_health_rating(&self, id: &str, rating: u8) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET health = ?2 WHERE id = ?1;",
            params![id, i64::from(rating)],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn get_health_rating(&self, id: &str) -> RepoResult<Option<u8>> {
        let health: Option<Option<i64>> = self
            .conn
            .query_row("SELECT health FROM projects WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;

        match health {
            None => Err(not_found(id)),
            Some(None) => Ok(None),
            Some(Some(value)) => u8::try_from(value).map(Some).map_err(|_| {
                RepoError::InvalidData(format!("invalid health value `{value}` in projects.health"))
            }),
        }
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn not_found(id: &str) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY,
        id: id.to_string(),
    }
}
