//! Audit events emitted by project lifecycle operations.
//!
//! # Invariants
//! - Each event kind carries a typed payload matching its entity.
//! - Stored events are immutable; `created_at` is assigned at append time.

use crate::model::project::{Project, ProjectId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const PROJECT_CREATED: &str = "project-created";
pub const PROJECT_UPDATED: &str = "project-updated";
pub const PROJECT_DELETED: &str = "project-deleted";

/// Payload of a project deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDeleted {
    pub id: ProjectId,
}

/// Project lifecycle event.
///
/// Serialized as `{"type": "project-created", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ProjectEvent {
    #[serde(rename = "project-created")]
    Created(Project),
    #[serde(rename = "project-updated")]
    Updated(Project),
    #[serde(rename = "project-deleted")]
    Deleted(ProjectDeleted),
}

impl ProjectEvent {
    /// Stable type tag used for storage and filtering.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => PROJECT_CREATED,
            Self::Updated(_) => PROJECT_UPDATED,
            Self::Deleted(_) => PROJECT_DELETED,
        }
    }

    /// Identifier of the project this event is about.
    pub fn project_id(&self) -> &str {
        match self {
            Self::Created(project) | Self::Updated(project) => project.id.as_str(),
            Self::Deleted(payload) => payload.id.as_str(),
        }
    }

    /// Serializes the payload alone, without the type tag.
    pub fn payload_json(&self) -> Result<String, EventCodecError> {
        let encoded = match self {
            Self::Created(project) | Self::Updated(project) => serde_json::to_string(project),
            Self::Deleted(payload) => serde_json::to_string(payload),
        };
        encoded.map_err(EventCodecError::Json)
    }

    /// Rebuilds an event from a stored type tag and payload.
    pub fn from_parts(event_type: &str, payload: &str) -> Result<Self, EventCodecError> {
        match event_type {
            PROJECT_CREATED => Ok(Self::Created(serde_json::from_str(payload)?)),
            PROJECT_UPDATED => Ok(Self::Updated(serde_json::from_str(payload)?)),
            PROJECT_DELETED => Ok(Self::Deleted(serde_json::from_str(payload)?)),
            other => Err(EventCodecError::UnknownType(other.to_string())),
        }
    }
}

/// Event payload encode/decode errors.
#[derive(Debug)]
pub enum EventCodecError {
    UnknownType(String),
    Json(serde_json::Error),
}

impl Display for EventCodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownType(value) => write!(f, "unknown event type `{value}`"),
            Self::Json(err) => write!(f, "invalid event payload: {err}"),
        }
    }
}

impl Error for EventCodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownType(_) => None,
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for EventCodecError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Event waiting to be appended to the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    /// Acting user's email or username.
    pub created_by: String,
    pub event: ProjectEvent,
}

/// Event as persisted by the audit log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEvent {
    /// Monotonic append sequence.
    pub id: i64,
    pub created_by: String,
    /// Epoch milliseconds, assigned by the store.
    pub created_at: i64,
    pub event: ProjectEvent,
}

#[cfg(test)]
mod tests {
    use super::{ProjectDeleted, ProjectEvent, PROJECT_DELETED};
    use crate::model::project::Project;

    #[test]
    fn event_serializes_with_type_tag_and_typed_payload() {
        let event = ProjectEvent::Created(Project {
            id: "web".to_string(),
            name: "Web".to_string(),
            description: None,
            created_at: 42,
        });
        let value = serde_json::to_value(&event).expect("event should serialize");
        assert_eq!(value["type"], "project-created");
        assert_eq!(value["data"]["id"], "web");
        assert_eq!(value["data"]["createdAt"], 42);
    }

    #[test]
    fn from_parts_rejects_unknown_type() {
        let err = ProjectEvent::from_parts("feature-created", "{}").unwrap_err();
        assert!(err.to_string().contains("feature-created"));
    }

    #[test]
    fn deleted_payload_survives_storage_split() {
        let event = ProjectEvent::Deleted(ProjectDeleted {
            id: "old".to_string(),
        });
        let payload = event.payload_json().expect("payload should encode");
        let decoded =
            ProjectEvent::from_parts(PROJECT_DELETED, &payload).expect("payload should decode");
        assert_eq!(decoded, event);
    }
}
