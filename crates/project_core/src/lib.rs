//! Core orchestration for feature-toggle projects.
//! This crate owns project lifecycle, project RBAC and health-rating rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{now_epoch_ms, ProjectServiceConfig, ProjectStores};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::access::{Permission, Role, RoleId, RoleName, User, UserId, UserRoleAssignment};
pub use model::event::{NewEvent, ProjectDeleted, ProjectEvent, StoredEvent};
pub use model::feature::{FeatureFilter, FeatureToggle, FeatureType};
pub use model::project::{
    Project, ProjectId, ProjectInput, ProjectValidationError, DEFAULT_PROJECT_ID,
};
pub use repo::access_repo::{AccessRepository, SqliteAccessRepository};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use repo::feature_repo::{
    FeatureToggleRepository, FeatureTypeRepository, SqliteFeatureToggleRepository,
    SqliteFeatureTypeRepository,
};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::{RepoError, RepoResult};
pub use service::access_service::{AccessService, AccessServiceError, UsersWithRoles};
pub use service::health::{calculate_health_rating, HealthReport};
pub use service::project_service::{
    ErrorKind, ProjectService, ProjectServiceError, ProjectServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
