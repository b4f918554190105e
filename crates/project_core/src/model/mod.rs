//! Domain model for projects, project RBAC, feature toggles and audit events.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Keep schema validation next to the types it guards.
//!
//! # Invariants
//! - Every project is identified by a stable, unique `ProjectId`.
//! - Roles are always scoped to exactly one project.

pub mod access;
pub mod event;
pub mod feature;
pub mod project;
