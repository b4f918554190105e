//! Project access control use-cases.
//!
//! # Responsibility
//! - Look up project roles and their holders.
//! - Assign and revoke project roles while keeping RBAC invariants.
//!
//! # Invariants
//! - A role is only usable through the project it belongs to.
//! - A `(user, role)` pair is assigned at most once.
//! - The owner role keeps at least one holder. Holders are read at call
//!   time, and the store re-checks inside its own transaction.

use crate::model::access::{Permission, Role, RoleId, RoleName, User, UserId, UserRoleAssignment};
use crate::repo::access_repo::AccessRepository;
use crate::repo::{RepoError, RepoResult};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Roles of one project together with their current holders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsersWithRoles {
    pub roles: Vec<Role>,
    pub users: Vec<UserRoleAssignment>,
}

/// Errors from access control operations.
#[derive(Debug)]
pub enum AccessServiceError {
    /// Role id is not one of the project's roles.
    RoleNotFound { project: String, role_id: RoleId },
    /// User already holds the role.
    AlreadyAssigned {
        project: String,
        role_id: RoleId,
        user_id: UserId,
    },
    /// Removal would leave the project without an owner.
    LastOwner { project: String, role_id: RoleId },
    Repo(RepoError),
}

impl Display for AccessServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoleNotFound { project, role_id } => {
                write!(f, "could not find role_id={role_id} on project={project}")
            }
            Self::AlreadyAssigned {
                project,
                role_id,
                user_id,
            } => write!(
                f,
                "user {user_id} already holds role_id={role_id} on project={project}"
            ),
            Self::LastOwner { project, .. } => {
                write!(f, "project {project} must have at least one owner")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AccessServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AccessServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Access control manager over a role store.
pub struct AccessService<R: AccessRepository> {
    repo: R,
}

impl<R: AccessRepository> AccessService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the project's roles and the users holding any of them.
    pub fn get_users_with_access(&self, project: &str) -> RepoResult<UsersWithRoles> {
        let (roles, users) = self.repo.get_project_role_users(project)?;
        Ok(UsersWithRoles { roles, users })
    }

    /// Grants `role_id` of `project` to `user_id`.
    ///
    /// # Errors
    /// - `RoleNotFound` when the role is not scoped to `project`.
    /// - `AlreadyAssigned` when the pair already exists.
    pub fn add_user(
        &self,
        project: &str,
        role_id: RoleId,
        user_id: UserId,
    ) -> Result<(), AccessServiceError> {
        let (roles, users) = self.repo.get_project_role_users(project)?;
        let role = find_role(&roles, project, role_id)?;

        let already_assigned = users
            .iter()
            .any(|assignment| assignment.user_id == user_id && assignment.role_id == role.id);
        if already_assigned {
            return Err(AccessServiceError::AlreadyAssigned {
                project: project.to_string(),
                role_id,
                user_id,
            });
        }

        match self.repo.add_user_to_role(user_id, role.id) {
            Ok(()) => {}
            Err(RepoError::AlreadyExists { .. }) => {
                return Err(AccessServiceError::AlreadyAssigned {
                    project: project.to_string(),
                    role_id,
                    user_id,
                });
            }
            Err(err) => return Err(err.into()),
        }

        info!(
            "event=project_access_add module=access status=ok project={} role_id={} user_id={}",
            project, role_id, user_id
        );
        Ok(())
    }

    /// Revokes `role_id` of `project` from `user_id`.
    ///
    /// # Errors
    /// - `RoleNotFound` when the role is not scoped to `project`.
    /// - `LastOwner` when the role is the owner role and fewer than two users
    ///   currently hold it.
    pub fn remove_user(
        &self,
        project: &str,
        role_id: RoleId,
        user_id: UserId,
    ) -> Result<(), AccessServiceError> {
        let roles = self.repo.get_roles_for_project(project)?;
        let role = find_role(&roles, project, role_id)?;

        let last_owner = || AccessServiceError::LastOwner {
            project: project.to_string(),
            role_id,
        };

        if role.name == RoleName::Owner {
            let owners = self.repo.get_users_for_role(role.id)?;
            debug!(
                "event=project_access_remove module=access status=check project={} owners={}",
                project,
                owners.len()
            );
            if owners.len() < 2 {
                return Err(last_owner());
            }
        }

        match self.repo.remove_user_from_role(user_id, role.id) {
            Ok(()) => {}
            Err(RepoError::LastOwner(_)) => return Err(last_owner()),
            Err(err) => return Err(err.into()),
        }

        info!(
            "event=project_access_remove module=access status=ok project={} role_id={} user_id={}",
            project, role_id, user_id
        );
        Ok(())
    }

    /// Provisions the default roles of a new project with `owner` as owner.
    pub fn create_default_project_roles(&self, owner: &User, project: &str) -> RepoResult<()> {
        self.repo.create_default_project_roles(owner, project)
    }

    /// Releases every role of `project`.
    pub fn remove_default_project_roles(&self, actor: &User, project: &str) -> RepoResult<()> {
        self.repo.remove_default_project_roles(actor, project)
    }

    /// Returns whether any role `user_id` holds in `project` grants `permission`.
    pub fn has_permission(
        &self,
        user_id: UserId,
        project: &str,
        permission: Permission,
    ) -> RepoResult<bool> {
        let roles = self.repo.get_roles_for_user(user_id, project)?;
        Ok(roles
            .iter()
            .any(|role| role.name.permissions().contains(&permission)))
    }
}

fn find_role<'r>(
    roles: &'r [Role],
    project: &str,
    role_id: RoleId,
) -> Result<&'r Role, AccessServiceError> {
    roles
        .iter()
        .find(|role| role.id == role_id)
        .ok_or_else(|| AccessServiceError::RoleNotFound {
            project: project.to_string(),
            role_id,
        })
}
