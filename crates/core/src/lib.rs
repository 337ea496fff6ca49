//! protogen-core - Build-graph synthesis for protocol buffer sources
//!
//! This crate provides functionality to:
//! - Parse `.proto` files for their package, imports and options
//! - Group a directory's files into compilation units, reusing hand-written
//!   `proto_library` rules
//! - Generate one declaration per unit and plugin, and resolve imports into
//!   dependency edges across directories
//! - Render declarations into BUILD files and rule schemas into `.bzl` rules
pub mod bazel;
pub mod config;
pub mod diagnostics;
pub mod emit;
pub mod engine;
pub mod error;
pub mod generate;
pub mod plugin;
pub mod proto;
pub mod resolve;
pub mod schema;
pub mod unit;

// Re-export commonly used types
pub use bazel::{BuildFileContents, Label, read_build_file};
pub use config::{Directive, ProtoConfig, Settings};
pub use diagnostics::Diagnostic;
pub use emit::{render_declaration, update_build_file};
pub use engine::{EmptyDeclaration, GenerateArgs, GenerateResult, ProtoEngine};
pub use error::{Error, Result};
pub use generate::{GeneratedDeclaration, ImportRef};
pub use plugin::{PluginRegistry, PluginSpec};
pub use proto::SourceFile;
pub use resolve::ImportIndex;
pub use unit::{CompilationUnit, UnitId};
