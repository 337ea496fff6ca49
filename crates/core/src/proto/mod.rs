//! Proto source files: parsing and the immutable file description

pub mod file;
pub mod parser;

pub use file::{Import, ImportKind, SourceFile, is_proto_file};
pub use parser::ProtoParser;
