//! Explicit wiring for project orchestration.
//!
//! Services receive their settings and store handles through these structs;
//! nothing is looked up from process-global state.

use crate::model::project::{ProjectId, DEFAULT_PROJECT_ID};
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::feature_repo::{
    FeatureToggleRepository, FeatureTypeRepository, SqliteFeatureToggleRepository,
    SqliteFeatureTypeRepository,
};
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;
use std::time::{SystemTime, UNIX_EPOCH};

/// Settings for `ProjectService`.
#[derive(Debug, Clone)]
pub struct ProjectServiceConfig {
    /// Project that can never be deleted.
    pub default_project: ProjectId,
    /// Source of "now" in epoch milliseconds.
    pub clock: fn() -> i64,
}

impl Default for ProjectServiceConfig {
    fn default() -> Self {
        Self {
            default_project: DEFAULT_PROJECT_ID.to_string(),
            clock: now_epoch_ms,
        }
    }
}

impl ProjectServiceConfig {
    pub fn with_default_project(mut self, project: impl Into<ProjectId>) -> Self {
        self.default_project = project.into();
        self
    }

    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }
}

/// Store handles consumed by `ProjectService`.
pub struct ProjectStores<'a> {
    pub projects: Box<dyn ProjectRepository + 'a>,
    pub features: Box<dyn FeatureToggleRepository + 'a>,
    pub feature_types: Box<dyn FeatureTypeRepository + 'a>,
    pub events: Box<dyn EventRepository + 'a>,
}

impl<'a> ProjectStores<'a> {
    /// Wires every SQLite store onto one migrated connection.
    pub fn sqlite(conn: &'a Connection) -> RepoResult<Self> {
        Ok(Self {
            projects: Box::new(SqliteProjectRepository::try_new(conn)?),
            features: Box::new(SqliteFeatureToggleRepository::try_new(conn)?),
            feature_types: Box::new(SqliteFeatureTypeRepository::try_new(conn)?),
            events: Box::new(SqliteEventRepository::try_new(conn)?),
        })
    }
}

/// Wall-clock time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
