//! Feature toggle and feature type read models.
//!
//! Toggles are owned by the surrounding system; core only reads them to
//! enforce deletion preconditions and compute health ratings.

use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};

/// Feature toggle as seen by project orchestration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggle {
    /// Unique toggle name.
    pub name: String,
    /// Owning project.
    pub project: ProjectId,
    /// Feature type id, e.g. `release`.
    #[serde(rename = "type")]
    pub feature_type: String,
    /// Explicitly marked as no longer relevant.
    pub stale: bool,
    pub archived: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Feature type with its expected lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureType {
    pub id: String,
    pub name: String,
    /// `None` means toggles of this type never expire.
    pub lifetime_days: Option<u32>,
}

/// Filter for toggle lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureFilter {
    pub project: ProjectId,
    /// `None` matches archived and non-archived toggles.
    pub archived: Option<bool>,
}

impl FeatureFilter {
    /// Matches every toggle of `project`.
    pub fn project(project: impl Into<ProjectId>) -> Self {
        Self {
            project: project.into(),
            archived: None,
        }
    }

    /// Matches only non-archived toggles of `project`.
    pub fn active_in(project: impl Into<ProjectId>) -> Self {
        Self {
            project: project.into(),
            archived: Some(false),
        }
    }
}
