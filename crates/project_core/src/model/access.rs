//! Project-scoped RBAC model.
//!
//! # Invariants
//! - Every role belongs to exactly one project.
//! - A `(user_id, role_id)` pair is assigned at most once.

use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};

pub type RoleId = i64;
pub type UserId = i64;

/// Fallback actor string when a user carries neither email nor username.
pub const UNKNOWN_ACTOR: &str = "unknown";

/// Closed set of project role names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    /// Full control over the project. At least one holder is mandatory.
    Owner,
    /// Can work with feature toggles inside the project.
    Member,
}

impl RoleName {
    /// Roles provisioned for every new project, in creation order.
    pub const DEFAULT_PROJECT_ROLES: [RoleName; 2] = [RoleName::Owner, RoleName::Member];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "Owner",
            Self::Member => "Member",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Owner" => Some(Self::Owner),
            "Member" => Some(Self::Member),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Owner => "Users with this role have full control over the project.",
            Self::Member => "Users with this role can create and manage feature toggles.",
        }
    }

    /// Permissions granted by this role within its project.
    pub fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Owner => &[
                Permission::UpdateProject,
                Permission::DeleteProject,
                Permission::CreateFeature,
                Permission::UpdateFeature,
                Permission::DeleteFeature,
            ],
            Self::Member => &[
                Permission::CreateFeature,
                Permission::UpdateFeature,
                Permission::DeleteFeature,
            ],
        }
    }
}

/// Project-scoped permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    UpdateProject,
    DeleteProject,
    CreateFeature,
    UpdateFeature,
    DeleteFeature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
    /// Owning project.
    pub project: ProjectId,
}

/// One user holding one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    pub user_id: UserId,
    pub role_id: RoleId,
}

/// The user performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Audit actor: non-empty email, else non-empty username.
    pub fn actor(&self) -> &str {
        [self.email.as_deref(), self.username.as_deref()]
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
            .unwrap_or(UNKNOWN_ACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::{Permission, RoleName, User, UNKNOWN_ACTOR};

    #[test]
    fn actor_prefers_email_over_username() {
        let user = User::new(1).with_email("ann@example.com").with_username("ann");
        assert_eq!(user.actor(), "ann@example.com");
    }

    #[test]
    fn actor_falls_back_to_username_when_email_is_empty() {
        let user = User::new(1).with_email("").with_username("ann");
        assert_eq!(user.actor(), "ann");
        assert_eq!(User::new(2).actor(), UNKNOWN_ACTOR);
    }

    #[test]
    fn role_names_roundtrip_through_storage_strings() {
        for name in RoleName::DEFAULT_PROJECT_ROLES {
            assert_eq!(RoleName::parse(name.as_str()), Some(name));
        }
        assert_eq!(RoleName::parse("owner"), None);
    }

    #[test]
    fn only_owner_may_delete_project() {
        assert!(RoleName::Owner
            .permissions()
            .contains(&Permission::DeleteProject));
        assert!(!RoleName::Member
            .permissions()
            .contains(&Permission::DeleteProject));
    }
}
