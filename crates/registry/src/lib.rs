//! # Codescout Registry
//!
//! Multi-project coordination: which projects this process tracks, the
//! lifecycle of each one's index, and the service façade the tool surface
//! calls into.
//!
//! The registry bounds how many projects are live at once; each tracked
//! project owns its store and serializes builds so concurrent requests
//! against a cold project share a single indexing pass.

mod config;
mod error;
mod project;
mod registry;
mod service;

pub use config::{ServiceConfig, DEFAULT_MAX_PROJECTS};
pub use error::{Result, ServiceError};
pub use project::{BuildOutcome, Project, ProjectSnapshot, ProjectStatus};
pub use registry::ProjectRegistry;
pub use service::SearchService;
