//! Project domain model and schema validation.
//!
//! # Responsibility
//! - Define the canonical project record and its candidate input shape.
//! - Own the project schema (id format, required name, optional description).
//!
//! # Invariants
//! - `id` is URL-friendly and immutable after creation.
//! - A validated project never carries a blank name or an empty description.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable project identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type ProjectId = String;

/// Identifier reserved for the system default project.
pub const DEFAULT_PROJECT_ID: &str = "default";

const PROJECT_ID_MAX_CHARS: usize = 100;
const PROJECT_NAME_MAX_CHARS: usize = 100;

static PROJECT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.~-]+$").expect("valid project id regex"));

/// Schema violations for project input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectValidationError {
    /// Identifier is empty after trim.
    EmptyId,
    /// Identifier exceeds the maximum length.
    IdTooLong(usize),
    /// Identifier contains characters outside the URL-friendly set.
    InvalidId(String),
    /// Display name is blank after trim.
    BlankName,
    /// Display name exceeds the maximum length.
    NameTooLong(usize),
}

impl Display for ProjectValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyId => write!(f, "project id must not be empty"),
            Self::IdTooLong(len) => write!(
                f,
                "project id is {len} chars; at most {PROJECT_ID_MAX_CHARS} are allowed"
            ),
            Self::InvalidId(value) => write!(
                f,
                "project id `{value}` must only contain letters, digits and `_.~-`"
            ),
            Self::BlankName => write!(f, "project name must not be blank"),
            Self::NameTooLong(len) => write!(
                f,
                "project name is {len} chars; at most {PROJECT_NAME_MAX_CHARS} are allowed"
            ),
        }
    }
}

impl Error for ProjectValidationError {}

/// Persisted project record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Globally unique identifier.
    pub id: ProjectId,
    /// User-facing display name.
    pub name: String,
    /// Optional free-form description.
    pub description: Option<String>,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Candidate project submitted by callers for create/update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInput {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl ProjectInput {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validates this candidate against the project schema.
    ///
    /// Returns a normalized copy: name is trimmed and an empty description
    /// becomes `None`. The id is checked as-is, never rewritten.
    pub fn validate(&self) -> Result<ProjectInput, ProjectValidationError> {
        validate_project_id_format(&self.id)?;

        let name = self.name.trim();
        if name.is_empty() {
            return Err(ProjectValidationError::BlankName);
        }
        let name_len = name.chars().count();
        if name_len > PROJECT_NAME_MAX_CHARS {
            return Err(ProjectValidationError::NameTooLong(name_len));
        }

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(ProjectInput {
            id: self.id.clone(),
            name: name.to_string(),
            description,
        })
    }

    /// Converts a validated candidate into a project record.
    pub fn into_project(self, created_at: i64) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at,
        }
    }
}

/// General name-format check shared by project ids.
pub fn validate_project_id_format(id: &str) -> Result<(), ProjectValidationError> {
    if id.trim().is_empty() {
        return Err(ProjectValidationError::EmptyId);
    }
    let len = id.chars().count();
    if len > PROJECT_ID_MAX_CHARS {
        return Err(ProjectValidationError::IdTooLong(len));
    }
    if !PROJECT_ID_RE.is_match(id) {
        return Err(ProjectValidationError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_project_id_format, ProjectInput, ProjectValidationError};

    #[test]
    fn id_format_accepts_url_friendly_values() {
        for id in ["default", "my-project", "team_a.v2", "x~1"] {
            validate_project_id_format(id).expect("id should be accepted");
        }
    }

    #[test]
    fn id_format_rejects_spaces_and_slashes() {
        assert!(matches!(
            validate_project_id_format("has space"),
            Err(ProjectValidationError::InvalidId(_))
        ));
        assert!(matches!(
            validate_project_id_format("a/b"),
            Err(ProjectValidationError::InvalidId(_))
        ));
        assert_eq!(
            validate_project_id_format("   "),
            Err(ProjectValidationError::EmptyId)
        );
    }

    #[test]
    fn id_format_rejects_overlong_values() {
        let id = "a".repeat(101);
        assert_eq!(
            validate_project_id_format(&id),
            Err(ProjectValidationError::IdTooLong(101))
        );
    }

    #[test]
    fn validate_trims_name_and_drops_empty_description() {
        let input = ProjectInput::new("web", "  Web shop  ").with_description("   ");
        let validated = input.validate().expect("input should validate");
        assert_eq!(validated.name, "Web shop");
        assert_eq!(validated.description, None);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = ProjectInput::new("web", " ").validate().unwrap_err();
        assert_eq!(err, ProjectValidationError::BlankName);
    }
}
