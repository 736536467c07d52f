//! Codescout MCP tool surface.
//!
//! Schemas, the error envelope mapping, and the tool router live in their
//! own submodules so each stays reviewable on its own.

pub mod catalog;
mod envelope;
mod schemas;
mod server;

pub use server::CodescoutService;
