//! Plugin-driven rule generation
//!
//! One compilation unit becomes one declaration per enabled plugin. The
//! declarations leave this module unresolved: they carry import references
//! which the resolver later turns into dependency labels.

use serde::Serialize;

use crate::bazel::Label;
use crate::diagnostics::Diagnostic;
use crate::plugin::{PluginDep, PluginSpec};
use crate::unit::{CompilationUnit, UnitId};

/// An unresolved dependency of a generated declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ImportRef {
    /// An import statement of a member file, path as written
    Source(String),
    /// The same unit's output for another plugin
    Plugin(String),
    /// A fixed label
    Label(String),
}

/// One target-language declaration for one unit and one plugin
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDeclaration {
    /// `<output_kind>_<rule_kind>`
    pub kind: String,
    pub name: String,
    pub package: String,
    pub unit: UnitId,
    pub plugin: String,
    pub srcs: Vec<String>,
    /// The hand-authored `proto_library` behind an adopted unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto: Option<Label>,
    pub imports: Vec<ImportRef>,
    pub deps: Vec<String>,
    pub merge_directories: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// Delete any existing declaration of this name instead of writing one
    pub empty: bool,
    pub resolved: bool,
}

impl GeneratedDeclaration {
    pub fn label(&self) -> Label {
        Label::new(self.package.clone(), self.name.clone())
    }
}

pub struct RuleGenerator<'a> {
    rule_kind: &'a str,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(rule_kind: &'a str) -> Self {
        Self { rule_kind }
    }

    /// Declarations for `unit`, one per plugin, in plugin order
    pub fn generate(&self, unit: &CompilationUnit, plugins: &[&PluginSpec]) -> Vec<GeneratedDeclaration> {
        let sources = source_imports(unit);
        plugins
            .iter()
            .map(|plugin| {
                let declaration = self.declaration(unit, plugin, &sources);
                tracing::debug!(
                    "generated {} {} ({} imports)",
                    declaration.kind,
                    declaration.label(),
                    declaration.imports.len()
                );
                declaration
            })
            .collect()
    }

    fn declaration(
        &self,
        unit: &CompilationUnit,
        plugin: &PluginSpec,
        sources: &[ImportRef],
    ) -> GeneratedDeclaration {
        let mut imports = sources.to_vec();
        for dep in &plugin.deps {
            let import = match dep {
                PluginDep::Plugin(name) => ImportRef::Plugin(name.clone()),
                PluginDep::Label(label) => ImportRef::Label(label.clone()),
            };
            if !imports.contains(&import) {
                imports.push(import);
            }
        }

        let srcs = unit.srcs();
        GeneratedDeclaration {
            kind: plugin.kind_for(self.rule_kind),
            name: plugin.output_name(unit.name()),
            package: unit.package().to_string(),
            unit: unit.id().clone(),
            plugin: plugin.name.clone(),
            empty: srcs.is_empty(),
            srcs,
            proto: unit.proto_label(),
            imports,
            deps: Vec::new(),
            merge_directories: plugin.merge_directories,
            diagnostics: Vec::new(),
            resolved: false,
        }
    }
}

/// Import statements of all member files, first occurrence order
fn source_imports(unit: &CompilationUnit) -> Vec<ImportRef> {
    let mut imports: Vec<ImportRef> = Vec::new();
    for file in unit.files() {
        for import in file.imports() {
            let import = ImportRef::Source(import.path.clone());
            if !imports.contains(&import) {
                imports.push(import);
            }
        }
    }
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;
    use crate::proto::SourceFile;
    use crate::unit::SynthesizedUnit;

    fn unit(rel: &str, name: &str, files: &[(&str, &str)]) -> CompilationUnit {
        let files = files
            .iter()
            .map(|(basename, content)| SourceFile::parse(rel, basename, content).unwrap())
            .collect();
        CompilationUnit::Synthesized(SynthesizedUnit::new(rel, name, files))
    }

    #[test]
    fn test_one_declaration_per_plugin_in_order() {
        let registry = PluginRegistry::new();
        let plugins = vec![registry.get("py").unwrap(), registry.get("go").unwrap()];
        let unit = unit("pkg/a", "a", &[("a.proto", "syntax = \"proto3\";")]);

        let declarations = RuleGenerator::new("proto_library").generate(&unit, &plugins);
        let names: Vec<(&str, &str)> = declarations
            .iter()
            .map(|d| (d.kind.as_str(), d.name.as_str()))
            .collect();
        assert_eq!(names, vec![("py_proto_library", "a_py"), ("go_proto_library", "a_go")]);
        assert_eq!(declarations[0].srcs, vec!["a.proto"]);
        assert!(!declarations[0].empty);
        assert!(!declarations[0].resolved);
    }

    #[test]
    fn test_imports_are_deduplicated_across_files() {
        let registry = PluginRegistry::new();
        let unit = unit(
            "pkg/b",
            "b",
            &[
                ("b.proto", "import \"pkg/a/a.proto\";\nimport \"pkg/a/a.proto\";"),
                ("c.proto", "import \"pkg/a/a.proto\";\nimport \"google/protobuf/any.proto\";"),
            ],
        );
        let declarations =
            RuleGenerator::new("proto_library").generate(&unit, &[registry.get("go").unwrap()]);
        assert_eq!(
            declarations[0].imports,
            vec![
                ImportRef::Source("pkg/a/a.proto".into()),
                ImportRef::Source("google/protobuf/any.proto".into()),
            ]
        );
    }

    #[test]
    fn test_plugin_deps_are_appended() {
        let registry = PluginRegistry::new();
        let unit = unit("svc", "svc", &[("svc.proto", "import \"svc/types.proto\";")]);
        let declarations = RuleGenerator::new("proto_compile")
            .generate(&unit, &[registry.get("grpc_go").unwrap()]);

        let declaration = &declarations[0];
        assert_eq!(declaration.kind, "go_grpc_proto_compile");
        assert_eq!(declaration.name, "svc_go_grpc");
        assert_eq!(
            declaration.imports,
            vec![
                ImportRef::Source("svc/types.proto".into()),
                ImportRef::Plugin("go".into()),
                ImportRef::Label("@org_golang_google_grpc//:go_default_library".into()),
            ]
        );
    }

    #[test]
    fn test_merge_flag_and_emptiness() {
        let registry = PluginRegistry::new();
        let unit = unit("web", "web", &[]);
        let declarations =
            RuleGenerator::new("proto_library").generate(&unit, &[registry.get("ts").unwrap()]);
        assert!(declarations[0].merge_directories);
        assert!(declarations[0].empty);
    }
}
