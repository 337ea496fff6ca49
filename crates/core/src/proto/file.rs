//! Parsed description of one `.proto` source file

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::Result;

use super::parser::ProtoParser;

/// Modifier on an import statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    Default,
    Public,
    Weak,
}

/// One `import` statement, path kept exactly as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    pub path: String,
    pub kind: ImportKind,
}

/// An immutable description of a parsed `.proto` file.
///
/// Identity is the pair (`rel`, `basename`): the directory relative to the
/// workspace root and the file name within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    rel: String,
    basename: String,
    syntax: Option<String>,
    package: Option<String>,
    imports: Vec<Import>,
    options: BTreeMap<String, String>,
}

impl SourceFile {
    /// Parse `content` as the file `basename` living in directory `rel`
    pub fn parse(rel: &str, basename: &str, content: &str) -> Result<Self> {
        ProtoParser::new(rel, basename).parse(content)
    }

    pub(crate) fn from_parts(
        rel: &str,
        basename: &str,
        syntax: Option<String>,
        package: Option<String>,
        imports: Vec<Import>,
        options: BTreeMap<String, String>,
    ) -> Self {
        Self {
            rel: rel.to_string(),
            basename: basename.to_string(),
            syntax,
            package,
            imports,
            options,
        }
    }

    pub fn rel(&self) -> &str {
        &self.rel
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// File name without the `.proto` extension
    pub fn stem(&self) -> &str {
        self.basename
            .strip_suffix(".proto")
            .unwrap_or(&self.basename)
    }

    pub fn syntax(&self) -> Option<&str> {
        self.syntax.as_deref()
    }

    /// Declared `package`, if any
    pub fn package(&self) -> Option<&str> {
        self.package.as_deref()
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    /// The string another file would use to import this one
    pub fn import_path(&self) -> String {
        join_rel(&self.rel, &self.basename)
    }
}

/// Whether a file name looks like a proto source
pub fn is_proto_file(name: &str) -> bool {
    name.ends_with(".proto")
}

/// Join a workspace-relative directory and a name with `/`
pub(crate) fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_path_at_root_and_nested() {
        let root = SourceFile::parse("", "a.proto", "syntax = \"proto3\";").unwrap();
        assert_eq!(root.import_path(), "a.proto");

        let nested = SourceFile::parse("pkg/a", "a.proto", "package a;").unwrap();
        assert_eq!(nested.import_path(), "pkg/a/a.proto");
        assert_eq!(nested.stem(), "a");
    }

    #[test]
    fn test_is_proto_file() {
        assert!(is_proto_file("service.proto"));
        assert!(!is_proto_file("BUILD.bazel"));
        assert!(!is_proto_file("proto"));
    }
}
