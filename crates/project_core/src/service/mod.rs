//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store calls into project lifecycle, access control and
//!   health-rating use-cases.
//! - Keep callers decoupled from storage details.

pub mod access_service;
pub mod health;
pub mod project_service;
