//! Project health rating.
//!
//! # Responsibility
//! - Summarize toggle staleness of one project as a 0..=100 score.
//!
//! # Invariants
//! - Pure: no store access, `now` is supplied by the caller.
//! - A project without toggles rates `EMPTY_PROJECT_RATING`.
//! - A toggle already flagged stale is never also counted as potentially
//!   stale.

use crate::model::feature::{FeatureToggle, FeatureType};
use crate::model::project::ProjectId;
use std::collections::HashMap;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Rating reported for a project with no toggles.
pub const EMPTY_PROJECT_RATING: u8 = 100;

/// Outcome of one health computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub project: ProjectId,
    /// Every toggle considered.
    pub total: usize,
    /// Toggles flagged stale.
    pub stale: usize,
    /// Active toggles older than their type lifetime.
    pub potentially_stale: usize,
    pub rating: u8,
}

/// Computes the health report of `project` from its toggles.
pub fn calculate_health_rating(
    project: &str,
    toggles: &[FeatureToggle],
    feature_types: &[FeatureType],
    now_ms: i64,
) -> HealthReport {
    let (stale, active): (Vec<&FeatureToggle>, Vec<&FeatureToggle>) =
        toggles.iter().partition(|toggle| toggle.stale);
    let potentially_stale = potentially_stale_toggles(active, feature_types, now_ms).len();

    HealthReport {
        project: project.to_string(),
        total: toggles.len(),
        stale: stale.len(),
        potentially_stale,
        rating: health_rating(toggles.len(), stale.len(), potentially_stale),
    }
}

/// Filters active toggles down to those that outlived their feature type.
///
/// Types without a lifetime, and toggles referencing an unknown type, never
/// expire.
pub fn potentially_stale_toggles<'a>(
    active: impl IntoIterator<Item = &'a FeatureToggle>,
    feature_types: &[FeatureType],
    now_ms: i64,
) -> Vec<&'a FeatureToggle> {
    let lifetimes: HashMap<&str, u32> = feature_types
        .iter()
        .filter_map(|kind| kind.lifetime_days.map(|days| (kind.id.as_str(), days)))
        .collect();

    active
        .into_iter()
        .filter(|toggle| !toggle.stale)
        .filter(|toggle| {
            lifetimes
                .get(toggle.feature_type.as_str())
                .is_some_and(|days| is_expired(toggle.created_at, *days, now_ms))
        })
        .collect()
}

/// `round(100 - stale% - potentially_stale%)`, clamped to `0..=100`.
pub fn health_rating(total: usize, stale: usize, potentially_stale: usize) -> u8 {
    if total == 0 {
        return EMPTY_PROJECT_RATING;
    }

    let total = total as f64;
    let stale_pct = stale as f64 / total * 100.0;
    let potentially_stale_pct = potentially_stale as f64 / total * 100.0;
    let rating = (100.0 - stale_pct - potentially_stale_pct).round();
    rating.clamp(0.0, 100.0) as u8
}

fn is_expired(created_at: i64, lifetime_days: u32, now_ms: i64) -> bool {
    let age_ms = now_ms.saturating_sub(created_at);
    age_ms > i64::from(lifetime_days) * DAY_MS
}

#[cfg(test)]
mod tests {
    use super::{calculate_health_rating, health_rating, potentially_stale_toggles, DAY_MS};
    use crate::model::feature::{FeatureToggle, FeatureType};

    const NOW: i64 = 1_000 * DAY_MS;

    fn toggle(name: &str, kind: &str, stale: bool, age_days: i64) -> FeatureToggle {
        FeatureToggle {
            name: name.to_string(),
            project: "web".to_string(),
            feature_type: kind.to_string(),
            stale,
            archived: false,
            created_at: NOW - age_days * DAY_MS,
        }
    }

    fn types() -> Vec<FeatureType> {
        vec![
            FeatureType {
                id: "release".to_string(),
                name: "Release".to_string(),
                lifetime_days: Some(40),
            },
            FeatureType {
                id: "kill-switch".to_string(),
                name: "Kill switch".to_string(),
                lifetime_days: None,
            },
        ]
    }

    #[test]
    fn ten_toggles_two_stale_three_expired_rates_fifty() {
        let mut toggles = Vec::new();
        for idx in 0..2 {
            toggles.push(toggle(&format!("stale-{idx}"), "release", true, 100));
        }
        for idx in 0..3 {
            toggles.push(toggle(&format!("old-{idx}"), "release", false, 41));
        }
        for idx in 0..5 {
            toggles.push(toggle(&format!("fresh-{idx}"), "release", false, 1));
        }

        let report = calculate_health_rating("web", &toggles, &types(), NOW);
        assert_eq!(report.total, 10);
        assert_eq!(report.stale, 2);
        assert_eq!(report.potentially_stale, 3);
        assert_eq!(report.rating, 50);
    }

    #[test]
    fn empty_project_rates_one_hundred() {
        let report = calculate_health_rating("web", &[], &types(), NOW);
        assert_eq!(report.total, 0);
        assert_eq!(report.rating, 100);
    }

    #[test]
    fn types_without_lifetime_and_unknown_types_never_expire() {
        let toggles = [
            toggle("switch", "kill-switch", false, 5_000),
            toggle("mystery", "not-a-type", false, 5_000),
        ];
        let expired = potentially_stale_toggles(toggles.iter(), &types(), NOW);
        assert!(expired.is_empty());
    }

    #[test]
    fn toggle_exactly_at_lifetime_is_not_expired() {
        let toggles = [toggle("edge", "release", false, 40)];
        let expired = potentially_stale_toggles(toggles.iter(), &types(), NOW);
        assert!(expired.is_empty());
    }

    #[test]
    fn stale_toggles_are_not_double_counted() {
        let toggles = [toggle("old-and-stale", "release", true, 400)];
        let report = calculate_health_rating("web", &toggles, &types(), NOW);
        assert_eq!(report.stale, 1);
        assert_eq!(report.potentially_stale, 0);
        assert_eq!(report.rating, 0);
    }

    #[test]
    fn rating_rounds_to_nearest_integer() {
        assert_eq!(health_rating(3, 1, 0), 67);
        assert_eq!(health_rating(8, 1, 0), 88);
        assert_eq!(health_rating(4, 4, 0), 0);
    }
}
