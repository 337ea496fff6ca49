//! protogen - Proto rule generation for Bazel workspaces
//!
//! Facade over the engine (`protogen-core`) and the workspace host
//! (`protogen-cli`).
pub use protogen_cli::{UpdateOptions, UpdateReport, update_workspace};
pub use protogen_core::*;
