//! Project lifecycle use-case service.
//!
//! # Responsibility
//! - Validate, persist and audit project create/update/delete.
//! - Coordinate project RBAC through `AccessService`.
//! - Compute and store project health ratings.
//!
//! # Invariants
//! - Schema validation runs before the uniqueness round-trip.
//! - Rejected operations perform no mutation.
//! - Every successful create/update/delete appends exactly one event, after
//!   the store mutation returned.
//! - The default project and projects with active toggles are never deleted.
//! - Role release after a delete is best-effort and never undoes the delete.

use crate::config::{ProjectServiceConfig, ProjectStores};
use crate::model::access::{Permission, RoleId, User, UserId};
use crate::model::event::{NewEvent, ProjectDeleted, ProjectEvent, StoredEvent};
use crate::model::feature::FeatureFilter;
use crate::model::project::{
    validate_project_id_format, Project, ProjectInput, ProjectValidationError,
};
use crate::repo::access_repo::{AccessRepository, SqliteAccessRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::access_service::{AccessService, AccessServiceError, UsersWithRoles};
use crate::service::health::{calculate_health_rating, HealthReport};
use log::{error, info, warn};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error categories surfaced to transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NameExists,
    NotFound,
    InvalidOperation,
    Conflict,
    Storage,
}

/// Errors from project lifecycle operations.
#[derive(Debug)]
pub enum ProjectServiceError {
    /// Candidate violates the project schema.
    Validation(ProjectValidationError),
    /// Project id is already taken.
    NameExists(String),
    /// Referenced project or role is absent.
    NotFound(String),
    /// Operation violates a domain precondition.
    InvalidOperation(String),
    /// User already holds the target role.
    Conflict(String),
    Repo(RepoError),
}

impl ProjectServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NameExists(_) => ErrorKind::NameExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NameExists(id) => write!(f, "a project with id `{id}` already exists"),
            Self::NotFound(message) => write!(f, "{message}"),
            Self::InvalidOperation(message) => write!(f, "{message}"),
            Self::Conflict(message) => write!(f, "{message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProjectValidationError> for ProjectServiceError {
    fn from(value: ProjectValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            RepoError::AlreadyExists {
                entity: "project",
                id,
            } => Self::NameExists(id),
            RepoError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{entity} already exists: {id}"))
            }
            RepoError::LastOwner(role_id) => {
                Self::InvalidOperation(format!("role {role_id} must keep at least one owner"))
            }
            other => Self::Repo(other),
        }
    }
}

impl From<AccessServiceError> for ProjectServiceError {
    fn from(value: AccessServiceError) -> Self {
        match value {
            AccessServiceError::RoleNotFound { .. } => Self::NotFound(value.to_string()),
            AccessServiceError::AlreadyAssigned { .. } => Self::Conflict(value.to_string()),
            AccessServiceError::LastOwner { .. } => Self::InvalidOperation(value.to_string()),
            AccessServiceError::Repo(err) => err.into(),
        }
    }
}

pub type ProjectServiceResult<T> = Result<T, ProjectServiceError>;

/// Project lifecycle manager.
pub struct ProjectService<'a, R: AccessRepository> {
    stores: ProjectStores<'a>,
    access: AccessService<R>,
    config: ProjectServiceConfig,
}

impl<'a> ProjectService<'a, SqliteAccessRepository<'a>> {
    /// Wires a service onto SQLite stores sharing one connection.
    pub fn sqlite(conn: &'a Connection, config: ProjectServiceConfig) -> RepoResult<Self> {
        Ok(Self::new(
            ProjectStores::sqlite(conn)?,
            AccessService::new(SqliteAccessRepository::try_new(conn)?),
            config,
        ))
    }
}

impl<'a, R: AccessRepository> ProjectService<'a, R> {
    pub fn new(
        stores: ProjectStores<'a>,
        access: AccessService<R>,
        config: ProjectServiceConfig,
    ) -> Self {
        Self {
            stores,
            access,
            config,
        }
    }

    pub fn config(&self) -> &ProjectServiceConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessService<R> {
        &self.access
    }

    /// Lists all projects in store order.
    pub fn list_projects(&self) -> ProjectServiceResult<Vec<Project>> {
        Ok(self.stores.projects.get_all()?)
    }

    pub fn get_project(&self, id: &str) -> ProjectServiceResult<Project> {
        self.stores
            .projects
            .get(id)?
            .ok_or_else(|| ProjectServiceError::NotFound(format!("project not found: {id}")))
    }

    /// Creates a project and makes `user` its owner.
    ///
    /// # Errors
    /// - `Validation` when the candidate violates the schema.
    /// - `NameExists` when the id is taken, including a race lost at insert.
    pub fn create_project(
        &self,
        candidate: &ProjectInput,
        user: &User,
    ) -> ProjectServiceResult<Project> {
        let validated = candidate.validate()?;
        self.validate_unique_id(&validated.id)?;

        let project = validated.into_project((self.config.clock)());
        self.stores.projects.create(&project)?;

        if let Err(err) = self.access.create_default_project_roles(user, &project.id) {
            error!(
                "event=project_create module=project status=error project={} error_code=role_provisioning_failed error={}",
                project.id, err
            );
            // Without roles the project would have no owner; undo the insert.
            if let Err(cleanup_err) = self.stores.projects.delete(&project.id) {
                error!(
                    "event=project_create module=project status=error project={} error_code=rollback_failed error={}",
                    project.id, cleanup_err
                );
            }
            return Err(err.into());
        }

        self.append_event(user, ProjectEvent::Created(project.clone()))?;
        info!(
            "event=project_create module=project status=ok project={}",
            project.id
        );
        Ok(project)
    }

    /// Replaces name and description of an existing project.
    ///
    /// `created_at` always keeps its stored value.
    pub fn update_project(
        &self,
        candidate: &ProjectInput,
        user: &User,
    ) -> ProjectServiceResult<()> {
        let existing = self.get_project(&candidate.id)?;
        let validated = candidate.validate()?;

        let project = validated.into_project(existing.created_at);
        self.stores.projects.update(&project)?;

        self.append_event(user, ProjectEvent::Updated(project))?;
        info!(
            "event=project_update module=project status=ok project={}",
            candidate.id
        );
        Ok(())
    }

    /// Deletes a project that has no active toggles.
    ///
    /// # Errors
    /// - `InvalidOperation` for the default project or when non-archived
    ///   toggles still reference the project.
    /// - `NotFound` when no such project exists.
    pub fn delete_project(&self, id: &str, user: &User) -> ProjectServiceResult<()> {
        if id == self.config.default_project {
            return Err(ProjectServiceError::InvalidOperation(
                "you can not delete the default project".to_string(),
            ));
        }

        let active_toggles = self
            .stores
            .features
            .get_features_by(&FeatureFilter::active_in(id))?;
        if !active_toggles.is_empty() {
            return Err(ProjectServiceError::InvalidOperation(format!(
                "you can not delete project {id}: it still has {} active feature toggles",
                active_toggles.len()
            )));
        }

        self.stores.projects.delete(id)?;
        self.append_event(
            user,
            ProjectEvent::Deleted(ProjectDeleted { id: id.to_string() }),
        )?;

        match self.access.remove_default_project_roles(user, id) {
            Ok(()) => info!("event=project_delete module=project status=ok project={id}"),
            Err(err) => warn!(
                "event=project_delete module=project status=partial project={} error_code=role_release_failed error={}",
                id, err
            ),
        }
        Ok(())
    }

    /// Checks that `id` is well-formed and not yet taken.
    pub fn validate_project_id(&self, id: &str) -> ProjectServiceResult<bool> {
        validate_project_id_format(id)?;
        self.validate_unique_id(id)?;
        Ok(true)
    }

    pub fn get_users_with_access(&self, project: &str) -> ProjectServiceResult<UsersWithRoles> {
        Ok(self.access.get_users_with_access(project)?)
    }

    pub fn add_user(
        &self,
        project: &str,
        role_id: RoleId,
        user_id: UserId,
    ) -> ProjectServiceResult<()> {
        Ok(self.access.add_user(project, role_id, user_id)?)
    }

    pub fn remove_user(
        &self,
        project: &str,
        role_id: RoleId,
        user_id: UserId,
    ) -> ProjectServiceResult<()> {
        Ok(self.access.remove_user(project, role_id, user_id)?)
    }

    pub fn has_permission(
        &self,
        user_id: UserId,
        project: &str,
        permission: Permission,
    ) -> ProjectServiceResult<bool> {
        Ok(self.access.has_permission(user_id, project, permission)?)
    }

    /// Computes the health report of one project without storing it.
    pub fn calculate_health_rating(&self, project: &str) -> ProjectServiceResult<HealthReport> {
        if !self.stores.projects.has_project(project)? {
            return Err(ProjectServiceError::NotFound(format!(
                "project not found: {project}"
            )));
        }
        let feature_types = self.stores.feature_types.get_all()?;
        let toggles = self
            .stores
            .features
            .get_features_by(&FeatureFilter::project(project))?;
        Ok(calculate_health_rating(
            project,
            &toggles,
            &feature_types,
            (self.config.clock)(),
        ))
    }

    /// Recomputes and stores the health rating of every project.
    ///
    /// A project that fails is logged and skipped; the returned reports cover
    /// the projects whose rating was stored.
    pub fn refresh_health_ratings(&self) -> ProjectServiceResult<Vec<HealthReport>> {
        let projects = self.stores.projects.get_all()?;
        let feature_types = self.stores.feature_types.get_all()?;
        let now = (self.config.clock)();

        let mut reports = Vec::with_capacity(projects.len());
        for project in &projects {
            let stored = self
                .stores
                .features
                .get_features_by(&FeatureFilter::project(project.id.as_str()))
                .and_then(|toggles| {
                    let report =
                        calculate_health_rating(&project.id, &toggles, &feature_types, now);
                    self.stores
                        .projects
                        .set_health_rating(&project.id, report.rating)
                        .map(|()| report)
                });

            match stored {
                Ok(report) => reports.push(report),
                Err(err) => warn!(
                    "event=project_health module=project status=error project={} error={}",
                    project.id, err
                ),
            }
        }

        info!(
            "event=project_health module=project status=ok projects={} refreshed={}",
            projects.len(),
            reports.len()
        );
        Ok(reports)
    }

    /// Returns the last stored health rating of `project`.
    pub fn get_health_rating(&self, project: &str) -> ProjectServiceResult<Option<u8>> {
        Ok(self.stores.projects.get_health_rating(project)?)
    }

    fn validate_unique_id(&self, id: &str) -> ProjectServiceResult<()> {
        if self.stores.projects.has_project(id)? {
            return Err(ProjectServiceError::NameExists(id.to_string()));
        }
        Ok(())
    }

    fn append_event(&self, user: &User, event: ProjectEvent) -> ProjectServiceResult<StoredEvent> {
        let stored = self.stores.events.store(&NewEvent {
            created_by: user.actor().to_string(),
            event,
        })?;
        Ok(stored)
    }
}
