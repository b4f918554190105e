//! Feature toggle and feature type stores.
//!
//! Core reads toggles through `FeatureToggleRepository`; the write helpers on
//! `SqliteFeatureToggleRepository` exist for the surrounding system and for
//! seeding fixtures.

use crate::model::feature::{FeatureFilter, FeatureToggle, FeatureType};
use crate::repo::{ensure_tables, int_to_bool, is_constraint_violation, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Read contract for feature toggles.
pub trait FeatureToggleRepository {
    /// Lists toggles matching `filter`, ordered by name.
    fn get_features_by(&self, filter: &FeatureFilter) -> RepoResult<Vec<FeatureToggle>>;
}

/// Read contract for feature types.
pub trait FeatureTypeRepository {
    fn get_all(&self) -> RepoResult<Vec<FeatureType>>;
}

/// SQLite-backed feature toggle store.
pub struct SqliteFeatureToggleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeatureToggleRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["features"])?;
        Ok(Self { conn })
    }

    /// Inserts one toggle.
    pub fn create_feature(&self, toggle: &FeatureToggle) -> RepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO features (name, project, type, stale, archived, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                toggle.name.as_str(),
                toggle.project.as_str(),
                toggle.feature_type.as_str(),
                toggle.stale,
                toggle.archived,
                toggle.created_at,
            ],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => Err(RepoError::AlreadyExists {
                entity: "feature",
                id: toggle.name.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn set_archived(&self, name: &str, archived: bool) -> RepoResult<()> {
        self.update_flag("archived", name, archived)
    }

    pub fn set_stale(&self, name: &str, stale: bool) -> RepoResult<()> {
        self.update_flag("stale", name, stale)
    }

    fn update_flag(&self, column: &'static str, name: &str, value: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("UPDATE features SET {column} = ?2 WHERE name = ?1;"),
            params![name, value],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "feature",
                id: name.to_string(),
            });
        }
        Ok(())
    }
}

impl FeatureToggleRepository for SqliteFeatureToggleRepository<'_> {
    fn get_features_by(&self, filter: &FeatureFilter) -> RepoResult<Vec<FeatureToggle>> {
        let mut sql = String::from(
            "SELECT name, project, type, stale, archived, created_at
             FROM features
             WHERE project = ?",
        );
        let mut bind_values = vec![Value::Text(filter.project.clone())];

        if let Some(archived) = filter.archived {
            sql.push_str(" AND archived = ?");
            bind_values.push(Value::Integer(i64::from(archived)));
        }
        sql.push_str(" ORDER BY name ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut toggles = Vec::new();
        while let Some(row) = rows.next()? {
            toggles.push(parse_feature_row(row)?);
        }
        Ok(toggles)
    }
}

/// SQLite-backed feature type store.
pub struct SqliteFeatureTypeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeatureTypeRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["feature_types"])?;
        Ok(Self { conn })
    }
}

impl FeatureTypeRepository for SqliteFeatureTypeRepository<'_> {
    fn get_all(&self) -> RepoResult<Vec<FeatureType>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, lifetime_days
             FROM feature_types
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut types = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let lifetime_days = match row.get::<_, Option<i64>>("lifetime_days")? {
                Some(days) => Some(u32::try_from(days).map_err(|_| {
                    RepoError::InvalidData(format!(
                        "invalid lifetime `{days}` for feature type `{id}`"
                    ))
                })?),
                None => None,
            };
            types.push(FeatureType {
                name: row.get("name")?,
                id,
                lifetime_days,
            });
        }
        Ok(types)
    }
}

fn parse_feature_row(row: &Row<'_>) -> RepoResult<FeatureToggle> {
    Ok(FeatureToggle {
        name: row.get("name")?,
        project: row.get("project")?,
        feature_type: row.get("type")?,
        stale: int_to_bool(row.get("stale")?, "features.stale")?,
        archived: int_to_bool(row.get("archived")?, "features.archived")?,
        created_at: row.get("created_at")?,
    })
}
