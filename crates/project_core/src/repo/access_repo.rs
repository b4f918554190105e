//! Project role store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provision and release the default roles of a project.
//! - Persist `(user, role)` assignments.
//!
//! # Invariants
//! - `(project, name)` is unique for roles; `(role_id, user_id)` is unique for
//!   assignments.
//! - Removing the last holder of an owner role is rejected inside an
//!   IMMEDIATE transaction, so the count check and the delete cannot
//!   interleave with another writer.

use crate::model::access::{Role, RoleId, RoleName, User, UserId, UserRoleAssignment};
use crate::repo::{ensure_tables, is_constraint_violation, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

/// Persistence contract for project-scoped roles.
pub trait AccessRepository {
    /// Creates the default project roles and makes `owner` hold the owner role.
    fn create_default_project_roles(&self, owner: &User, project: &str) -> RepoResult<()>;
    /// Deletes every role of `project` together with its assignments.
    fn remove_default_project_roles(&self, actor: &User, project: &str) -> RepoResult<()>;
    /// Returns project roles and every assignment to one of them.
    fn get_project_role_users(
        &self,
        project: &str,
    ) -> RepoResult<(Vec<Role>, Vec<UserRoleAssignment>)>;
    fn get_roles_for_project(&self, project: &str) -> RepoResult<Vec<Role>>;
    /// Returns holders of one role, read at call time.
    fn get_users_for_role(&self, role_id: RoleId) -> RepoResult<Vec<UserId>>;
    /// Returns the roles `user_id` holds inside `project`.
    fn get_roles_for_user(&self, user_id: UserId, project: &str) -> RepoResult<Vec<Role>>;
    /// Fails with `AlreadyExists` when the pair is already assigned.
    fn add_user_to_role(&self, user_id: UserId, role_id: RoleId) -> RepoResult<()>;
    /// Fails with `LastOwner` when the user is the only owner holder.
    fn remove_user_from_role(&self, user_id: UserId, role_id: RoleId) -> RepoResult<()>;
}

/// SQLite-backed role store.
pub struct SqliteAccessRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAccessRepository<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["roles", "role_user"])?;
        Ok(Self { conn })
    }
}

impl AccessRepository for SqliteAccessRepository<'_> {
    fn create_default_project_roles(&self, owner: &User, project: &str) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        // Roles left behind by an earlier project with the same id.
        tx.execute(
            "DELETE FROM role_user
             WHERE role_id IN (SELECT id FROM roles WHERE project = ?1);",
            [project],
        )?;
        tx.execute("DELETE FROM roles WHERE project = ?1;", [project])?;

        let mut owner_role_id = None;
        for name in RoleName::DEFAULT_PROJECT_ROLES {
            let inserted = tx.execute(
                "INSERT INTO roles (name, description, project) VALUES (?1, ?2, ?3);",
                params![name.as_str(), name.description(), project],
            );
            match inserted {
                Ok(_) => {}
                Err(err) if is_constraint_violation(&err) => {
                    return Err(RepoError::AlreadyExists {
                        entity: "role",
                        id: format!("{project}/{}", name.as_str()),
                    });
                }
                Err(err) => return Err(err.into()),
            }
            if name == RoleName::Owner {
                owner_role_id = Some(tx.last_insert_rowid());
            }
        }

        let owner_role_id = owner_role_id.ok_or_else(|| {
            RepoError::InvalidData("default project roles lack an owner role".to_string())
        })?;
        tx.execute(
            "INSERT INTO role_user (role_id, user_id) VALUES (?1, ?2);",
            params![owner_role_id, owner.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn remove_default_project_roles(&self, _actor: &User, project: &str) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM role_user
             WHERE role_id IN (SELECT id FROM roles WHERE project = ?1);",
            [project],
        )?;
        tx.execute("DELETE FROM roles WHERE project = ?1;", [project])?;
        tx.commit()?;
        Ok(())
    }

    fn get_project_role_users(
        &self,
        project: &str,
    ) -> RepoResult<(Vec<Role>, Vec<UserRoleAssignment>)> {
        let roles = self.get_roles_for_project(project)?;

        let mut stmt = self.conn.prepare(
            "SELECT ru.user_id, ru.role_id
             FROM role_user ru
             INNER JOIN roles r ON r.id = ru.role_id
             WHERE r.project = ?1
             ORDER BY ru.user_id ASC, ru.role_id ASC;",
        )?;
        let mut rows = stmt.query([project])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(UserRoleAssignment {
                user_id: row.get("user_id")?,
                role_id: row.get("role_id")?,
            });
        }

        Ok((roles, users))
    }

    fn get_roles_for_project(&self, project: &str) -> RepoResult<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, project
             FROM roles
             WHERE project = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([project])?;
        let mut roles = Vec::new();
        while let Some(row) = rows.next()? {
            roles.push(parse_role_row(row)?);
        }
        Ok(roles)
    }

    fn get_users_for_role(&self, role_id: RoleId) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id
             FROM role_user
             WHERE role_id = ?1
             ORDER BY user_id ASC;",
        )?;
        let mut rows = stmt.query([role_id])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(row.get(0)?);
        }
        Ok(users)
    }

    fn get_roles_for_user(&self, user_id: UserId, project: &str) -> RepoResult<Vec<Role>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.project
             FROM roles r
             INNER JOIN role_user ru ON ru.role_id = r.id
             WHERE ru.user_id = ?1
               AND r.project = ?2
             ORDER BY r.id ASC;",
        )?;
        let mut rows = stmt.query(params![user_id, project])?;
        let mut roles = Vec::new();
        while let Some(row) = rows.next()? {
            roles.push(parse_role_row(row)?);
        }
        Ok(roles)
    }

    fn add_user_to_role(&self, user_id: UserId, role_id: RoleId) -> RepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO role_user (role_id, user_id) VALUES (?1, ?2);",
            params![role_id, user_id],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_constraint_violation(&err) => {
                // Same code covers a dangling role id (foreign key) and a duplicate pair.
                if role_name_in_tx(self.conn, role_id)?.is_none() {
                    return Err(RepoError::NotFound {
                        entity: "role",
                        id: role_id.to_string(),
                    });
                }
                Err(RepoError::AlreadyExists {
                    entity: "role_user",
                    id: format!("{user_id}:{role_id}"),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remove_user_from_role(&self, user_id: UserId, role_id: RoleId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let name = role_name_in_tx(&tx, role_id)?.ok_or_else(|| RepoError::NotFound {
            entity: "role",
            id: role_id.to_string(),
        })?;

        if name == RoleName::Owner {
            let (holders, holds_role): (i64, i64) = tx.query_row(
                "SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN user_id = ?2 THEN 1 ELSE 0 END), 0)
                 FROM role_user
                 WHERE role_id = ?1;",
                params![role_id, user_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            if holds_role > 0 && holders < 2 {
                return Err(RepoError::LastOwner(role_id));
            }
        }

        tx.execute(
            "DELETE FROM role_user WHERE role_id = ?1 AND user_id = ?2;",
            params![role_id, user_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

fn role_name_in_tx(conn: &Connection, role_id: RoleId) -> RepoResult<Option<RoleName>> {
    let name: Option<String> = conn
        .query_row("SELECT name FROM roles WHERE id = ?1;", [role_id], |row| {
            row.get(0)
        })
        .optional()?;
    name.map(|value| parse_role_name(&value)).transpose()
}

fn parse_role_row(row: &Row<'_>) -> RepoResult<Role> {
    let name_text: String = row.get("name")?;
    Ok(Role {
        id: row.get("id")?,
        name: parse_role_name(&name_text)?,
        project: row.get("project")?,
    })
}

fn parse_role_name(value: &str) -> RepoResult<RoleName> {
    RoleName::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role name `{value}` in roles.name")))
}
