//! The per-directory generation entry point and the run-wide resolve step

use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::bazel::BuildFileContents;
use crate::config::ProtoConfig;
use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::generate::{GeneratedDeclaration, RuleGenerator};
use crate::plugin::PluginRegistry;
use crate::proto::file::join_rel;
use crate::proto::{SourceFile, is_proto_file};
use crate::resolve::{ImportIndex, resolve_declaration};
use crate::unit::{ADOPTED_UNIT_KIND, CompilationUnit, UnitAggregator, synthesized_base};

/// Inputs for one directory visit
pub struct GenerateArgs<'a> {
    /// Directory relative to the workspace root, `""` for the root
    pub rel: &'a str,
    /// Absolute path of the directory
    pub dir: &'a Path,
    pub config: &'a ProtoConfig,
    /// Names of the regular files in the directory
    pub regular_files: &'a [String],
    /// The directory's BUILD file, if it has one
    pub build_file: Option<&'a BuildFileContents>,
}

/// An existing declaration to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyDeclaration {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateResult {
    pub rel: String,
    #[serde(rename = "gen")]
    pub generated: Vec<GeneratedDeclaration>,
    pub empty: Vec<EmptyDeclaration>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerateResult {
    /// Whether the directory's BUILD file needs any change at all
    pub fn is_noop(&self) -> bool {
        self.generated.is_empty() && self.empty.is_empty()
    }
}

/// Drives parsing, aggregation and generation per directory and owns the
/// run-wide import index
#[derive(Debug)]
pub struct ProtoEngine {
    registry: PluginRegistry,
    index: ImportIndex,
}

impl ProtoEngine {
    pub fn new(registry: PluginRegistry) -> Self {
        Self {
            registry,
            index: ImportIndex::new(),
        }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn index(&self) -> &ImportIndex {
        &self.index
    }

    /// Parse the directory's proto files and generate its declarations
    pub fn generate_rules(&mut self, args: &GenerateArgs<'_>) -> Result<GenerateResult> {
        let mut names: Vec<&String> = args
            .regular_files
            .iter()
            .filter(|name| is_proto_file(name))
            .collect();
        names.sort();

        let mut files = Vec::with_capacity(names.len());
        let mut diagnostics = Vec::new();
        for name in names {
            let parsed = read_source(args.dir, args.rel, name)
                .and_then(|content| SourceFile::parse(args.rel, name, &content));
            match parsed {
                Ok(file) => files.push(file),
                Err(err @ Error::ProtoParse { .. }) if !args.config.strict() => {
                    let diagnostic = Diagnostic::SkippedSourceFile {
                        file: join_rel(args.rel, name),
                        message: err.to_string(),
                    };
                    diagnostic.log();
                    diagnostics.push(diagnostic);
                }
                Err(err) => return Err(err),
            }
        }

        let mut result =
            self.generate_from_sources(args.rel, args.config, files, args.build_file)?;
        diagnostics.append(&mut result.diagnostics);
        result.diagnostics = diagnostics;
        Ok(result)
    }

    /// Generate declarations for already parsed `files` of directory `rel`
    pub fn generate_from_sources(
        &mut self,
        rel: &str,
        config: &ProtoConfig,
        files: Vec<SourceFile>,
        build_file: Option<&BuildFileContents>,
    ) -> Result<GenerateResult> {
        let adopted: Vec<_> = build_file
            .map(|contents| {
                contents
                    .rules
                    .iter()
                    .filter(|rule| rule.rule_type == ADOPTED_UNIT_KIND)
                    .collect()
            })
            .unwrap_or_default();

        let aggregation = UnitAggregator::new(rel).aggregate(files, &adopted)?;
        let plugins = self.registry.enabled(config);
        let generator = RuleGenerator::new(config.rule_kind());

        let mut result = GenerateResult {
            rel: rel.to_string(),
            diagnostics: aggregation.diagnostics,
            ..Default::default()
        };

        for unit in &aggregation.units {
            for spec in unit.import_specs() {
                self.index.add_import(&spec, unit.id());
            }
            for declaration in generator.generate(unit, &plugins) {
                if declaration.empty {
                    result.empty.push(EmptyDeclaration {
                        kind: declaration.kind,
                        name: declaration.name,
                    });
                } else {
                    self.index
                        .register_output(unit.id(), &declaration.plugin, declaration.label());
                    result.generated.push(declaration);
                }
            }
        }

        if let Some(contents) = build_file {
            let generatable = self.registry.generatable_kinds();
            let owned = self.owned_names(rel, &aggregation.units);
            let kept: HashSet<&str> = result.generated.iter().map(|d| d.name.as_str()).collect();
            let stale: Vec<EmptyDeclaration> = contents
                .rules
                .iter()
                .filter(|rule| generatable.contains(&rule.rule_type))
                .filter(|rule| owned.contains(&rule.name))
                .filter(|rule| !kept.contains(rule.name.as_str()))
                .map(|rule| EmptyDeclaration {
                    kind: rule.rule_type.clone(),
                    name: rule.name.clone(),
                })
                .collect();
            for declaration in stale {
                if !result.empty.contains(&declaration) {
                    result.empty.push(declaration);
                }
            }
        }

        tracing::debug!(
            "//{}: {} declarations, {} to delete",
            rel,
            result.generated.len(),
            result.empty.len()
        );
        Ok(result)
    }

    /// Names the engine may have generated in directory `rel`: every
    /// registered plugin's output for the current units and for the unit
    /// the directory would synthesize. Other rules are hand-written.
    fn owned_names(&self, rel: &str, units: &[CompilationUnit]) -> HashSet<String> {
        let base = synthesized_base(rel);
        let unit_names: Vec<String> = units
            .iter()
            .map(|unit| unit.name().to_string())
            .chain([format!("{}_default", base), base.to_string()])
            .collect();
        self.registry
            .plugins()
            .iter()
            .flat_map(|plugin| unit_names.iter().map(|unit| plugin.output_name(unit)))
            .collect()
    }

    /// Resolve one declaration against the index built so far
    pub fn resolve(&self, declaration: &mut GeneratedDeclaration) {
        match self.registry.get(&declaration.plugin) {
            Some(plugin) => resolve_declaration(declaration, plugin, &self.index),
            None => tracing::warn!(
                "{}: plugin {} is no longer registered",
                declaration.label(),
                declaration.plugin
            ),
        }
    }

    /// Resolve every declaration of every result, after the whole walk
    pub fn resolve_all(&self, results: &mut [GenerateResult]) {
        for result in results.iter_mut() {
            for declaration in &mut result.generated {
                self.resolve(declaration);
            }
        }
    }
}

/// Read a source file; unreadable or non-UTF-8 content counts as unparseable
fn read_source(dir: &Path, rel: &str, name: &str) -> Result<String> {
    let unreadable = |message: String| Error::ProtoParse {
        file: join_rel(rel, name),
        line: 0,
        message,
    };
    let bytes = fs::read(dir.join(name)).map_err(|err| unreadable(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| unreadable(format!("not valid UTF-8: {}", err.utf8_error())))
}
