//! Store contracts consumed by project orchestration, plus SQLite backends.
//!
//! # Responsibility
//! - Define one narrow trait per store (projects, access, toggles, feature
//!   types, events).
//! - Keep SQL details out of service-level orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`,
//!   `LastOwner`) in addition to DB transport errors.
//! - Uniqueness and owner-minimum are enforced by the store itself, so
//!   concurrent callers cannot bypass service-level pre-checks.

use crate::db::DbError;
use crate::model::access::RoleId;
use crate::model::event::EventCodecError;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod access_repo;
pub mod event_repo;
pub mod feature_repo;
pub mod project_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every store.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Target row does not exist.
    NotFound { entity: &'static str, id: String },
    /// Unique key already taken.
    AlreadyExists { entity: &'static str, id: String },
    /// Removal would leave the owner role without holders.
    LastOwner(RoleId),
    /// Connection schema lacks a table this store needs.
    MissingRequiredTable(&'static str),
    /// Persisted row cannot be converted into a valid model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::AlreadyExists { entity, id } => write!(f, "{entity} already exists: {id}"),
            Self::LastOwner(role_id) => {
                write!(f, "role {role_id} must keep at least one owner")
            }
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<EventCodecError> for RepoError {
    fn from(value: EventCodecError) -> Self {
        Self::InvalidData(value.to_string())
    }
}

pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}
