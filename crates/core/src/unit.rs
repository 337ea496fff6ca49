//! Compilation units and the per-directory aggregator
//!
//! A directory's proto files are partitioned between the hand-authored
//! `proto_library` rules found in its BUILD file (adopted units) and at most
//! one unit the engine synthesizes for everything left over.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

use crate::bazel::{AttributeValue, Label, RuleCall};
use crate::diagnostics::{Diagnostic, MismatchReason};
use crate::error::{Error, Result};
use crate::proto::SourceFile;
use crate::proto::file::join_rel;

/// Kind tag of hand-authored compilation units
pub const ADOPTED_UNIT_KIND: &str = "proto_library";

const ROOT_UNIT_NAME: &str = "root";

/// Identity of a compilation unit: its package and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId {
    pub package: String,
    pub name: String,
}

impl UnitId {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "//{}:{}", self.package, self.name)
    }
}

/// A unit owned by the engine
#[derive(Debug, Clone)]
pub struct SynthesizedUnit {
    id: UnitId,
    files: Vec<SourceFile>,
}

impl SynthesizedUnit {
    pub fn new(package: &str, name: &str, files: Vec<SourceFile>) -> Self {
        Self {
            id: UnitId::new(package, name),
            files,
        }
    }
}

/// A unit declared by hand; the engine only reads it
#[derive(Debug, Clone)]
pub struct AdoptedUnit {
    id: UnitId,
    rule_name: String,
    files: Vec<SourceFile>,
    /// Local `srcs` names as declared, matched or not
    declared: Vec<String>,
    /// `srcs` entries pointing into other packages
    external: Vec<Label>,
}

impl AdoptedUnit {
    pub fn rule_name(&self) -> &str {
        &self.rule_name
    }

    pub fn external_srcs(&self) -> &[Label] {
        &self.external
    }
}

#[derive(Debug, Clone)]
pub enum CompilationUnit {
    Synthesized(SynthesizedUnit),
    Adopted(AdoptedUnit),
}

impl CompilationUnit {
    pub fn id(&self) -> &UnitId {
        match self {
            CompilationUnit::Synthesized(unit) => &unit.id,
            CompilationUnit::Adopted(unit) => &unit.id,
        }
    }

    pub fn name(&self) -> &str {
        &self.id().name
    }

    pub fn package(&self) -> &str {
        &self.id().package
    }

    /// Member files found in this directory, in file order
    pub fn files(&self) -> &[SourceFile] {
        match self {
            CompilationUnit::Synthesized(unit) => &unit.files,
            CompilationUnit::Adopted(unit) => &unit.files,
        }
    }

    pub fn is_adopted(&self) -> bool {
        matches!(self, CompilationUnit::Adopted(_))
    }

    /// Sources written into the unit's generated declarations.
    ///
    /// Adopted units mirror their `srcs` as declared, so a unit whose files
    /// are gone still yields declarations others can depend on.
    pub fn srcs(&self) -> Vec<String> {
        match self {
            CompilationUnit::Synthesized(unit) => unit
                .files
                .iter()
                .map(|file| file.basename().to_string())
                .collect(),
            CompilationUnit::Adopted(unit) => unit
                .declared
                .iter()
                .cloned()
                .chain(unit.external.iter().map(|label| label.rel_to(&unit.id.package)))
                .collect(),
        }
    }

    /// The hand-authored `proto_library` this unit came from
    pub fn proto_label(&self) -> Option<Label> {
        match self {
            CompilationUnit::Synthesized(_) => None,
            CompilationUnit::Adopted(unit) => {
                Some(Label::new(unit.id.package.clone(), unit.rule_name.clone()))
            }
        }
    }

    /// Import strings under which other files reach this unit
    pub fn import_specs(&self) -> Vec<String> {
        let mut specs: Vec<String> = match self {
            CompilationUnit::Synthesized(unit) => {
                unit.files.iter().map(SourceFile::import_path).collect()
            }
            CompilationUnit::Adopted(unit) => unit
                .declared
                .iter()
                .map(|name| join_rel(&unit.id.package, name))
                .chain(
                    unit.external
                        .iter()
                        .filter(|label| label.repo.is_none())
                        .map(|label| join_rel(&label.package, &label.name)),
                )
                .collect(),
        };
        let mut seen = HashSet::new();
        specs.retain(|spec| seen.insert(spec.clone()));
        specs
    }
}

/// Units of one directory plus what went wrong while adopting
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub units: Vec<CompilationUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Groups a directory's files into compilation units
pub struct UnitAggregator<'a> {
    rel: &'a str,
}

impl<'a> UnitAggregator<'a> {
    pub fn new(rel: &'a str) -> Self {
        Self { rel }
    }

    /// Partition `files` between the `adopted` rules and a synthesized unit
    pub fn aggregate(&self, mut files: Vec<SourceFile>, adopted: &[&RuleCall]) -> Result<Aggregation> {
        files.sort_by(|a, b| a.basename().cmp(b.basename()));

        let mut aggregation = Aggregation::default();
        let mut claimed: HashSet<String> = HashSet::new();
        let mut taken: HashSet<String> = HashSet::new();
        for rule in adopted {
            let mut unit = self.adopt(rule, &files, &mut claimed, &mut aggregation.diagnostics)?;
            let stem = unit.id.name.clone();
            unit.id.name = unique_name(&taken, &[stem.as_str(), rule.name.as_str()]);
            taken.insert(unit.id.name.clone());
            tracing::debug!(
                "adopted {} with {} local files",
                unit.id,
                unit.files.len()
            );
            aggregation.units.push(CompilationUnit::Adopted(unit));
        }

        let remaining: Vec<SourceFile> = files
            .into_iter()
            .filter(|file| !claimed.contains(file.basename()))
            .collect();

        if !remaining.is_empty() {
            let base = synthesized_base(self.rel);
            let fallback = format!("{}_default", base);
            let name = unique_name(&taken, &[base, fallback.as_str()]);
            tracing::debug!(
                "synthesized //{}:{} with {} files",
                self.rel,
                name,
                remaining.len()
            );
            aggregation
                .units
                .push(CompilationUnit::Synthesized(SynthesizedUnit::new(self.rel, &name, remaining)));
        }

        Ok(aggregation)
    }

    fn adopt(
        &self,
        rule: &RuleCall,
        files: &[SourceFile],
        claimed: &mut HashSet<String>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<AdoptedUnit> {
        let mut claim = Claim {
            unit: Label::new(self.rel, rule.name.clone()).to_string(),
            files,
            claimed,
            members: Vec::new(),
            diagnostics,
        };
        let mut declared = Vec::new();
        let mut external = Vec::new();

        match rule.attributes.get("srcs") {
            Some(AttributeValue::Glob(glob)) => {
                let patterns = compile_patterns(&glob.patterns)?;
                let exclude = compile_patterns(&glob.exclude)?;
                for file in files {
                    let name = file.basename();
                    if patterns.iter().any(|p| p.matches(name))
                        && !exclude.iter().any(|p| p.matches(name))
                    {
                        declared.push(name.to_string());
                        claim.take(name);
                    }
                }
            }
            _ => {
                for src in rule.attr_strings("srcs") {
                    let label = Label::parse(&src)?.resolve_in(self.rel);
                    if label.repo.is_none() && label.package == self.rel {
                        claim.take(&label.name);
                        declared.push(label.name);
                    } else {
                        external.push(label);
                    }
                }
            }
        }

        let members = claim.members;
        let name = rule
            .name
            .strip_suffix("_proto")
            .filter(|stem| !stem.is_empty())
            .unwrap_or(&rule.name);

        Ok(AdoptedUnit {
            id: UnitId::new(self.rel, name),
            rule_name: rule.name.clone(),
            files: files
                .iter()
                .filter(|file| members.iter().any(|m| m == file.basename()))
                .cloned()
                .collect(),
            declared,
            external,
        })
    }

}

/// Name of the unit synthesized for directory `rel`, before disambiguation
pub fn synthesized_base(rel: &str) -> &str {
    match rel.rsplit('/').next() {
        Some(base) if !base.is_empty() => base,
        _ => ROOT_UNIT_NAME,
    }
}

/// First candidate not yet `taken`, else the last one with a numeric suffix
fn unique_name(taken: &HashSet<String>, candidates: &[&str]) -> String {
    if let Some(free) = candidates.iter().find(|name| !taken.contains(**name)) {
        return free.to_string();
    }
    let last = candidates.last().copied().unwrap_or(ROOT_UNIT_NAME);
    (2..)
        .map(|n| format!("{}_{}", last, n))
        .find(|name| !taken.contains(name))
        .unwrap_or_else(|| last.to_string())
}

/// Bookkeeping while one adopted rule claims its sources
struct Claim<'a> {
    unit: String,
    files: &'a [SourceFile],
    claimed: &'a mut HashSet<String>,
    members: Vec<String>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Claim<'_> {
    fn take(&mut self, name: &str) {
        if !self.files.iter().any(|file| file.basename() == name) {
            self.report(name, MismatchReason::Missing);
        } else if self.claimed.insert(name.to_string()) {
            self.members.push(name.to_string());
        } else if !self.members.iter().any(|m| m == name) {
            self.report(name, MismatchReason::AlreadyClaimed);
        }
    }

    fn report(&mut self, src: &str, reason: MismatchReason) {
        let diagnostic = Diagnostic::AdoptedUnitMismatch {
            unit: self.unit.clone(),
            src: src.to_string(),
            reason,
        };
        diagnostic.log();
        self.diagnostics.push(diagnostic);
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| Error::Config(format!("invalid glob pattern {:?}: {}", p, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bazel::read_build_file;

    fn proto(rel: &str, name: &str) -> SourceFile {
        SourceFile::parse(rel, name, "syntax = \"proto3\";").unwrap()
    }

    fn aggregate(rel: &str, files: &[&str], build: &str) -> Aggregation {
        let contents = read_build_file(build).unwrap();
        let adopted: Vec<&RuleCall> = contents
            .rules
            .iter()
            .filter(|r| r.rule_type == ADOPTED_UNIT_KIND)
            .collect();
        let files = files.iter().map(|f| proto(rel, f)).collect();
        UnitAggregator::new(rel).aggregate(files, &adopted).unwrap()
    }

    fn member_names(unit: &CompilationUnit) -> Vec<&str> {
        unit.files().iter().map(|f| f.basename()).collect()
    }

    #[test]
    fn test_single_synthesized_unit_per_directory() {
        let aggregation = aggregate("pkg/a", &["b.proto", "a.proto"], "");
        assert_eq!(aggregation.units.len(), 1);

        let unit = &aggregation.units[0];
        assert!(!unit.is_adopted());
        assert_eq!(unit.id(), &UnitId::new("pkg/a", "a"));
        assert_eq!(member_names(unit), vec!["a.proto", "b.proto"]);
        assert_eq!(unit.import_specs(), vec!["pkg/a/a.proto", "pkg/a/b.proto"]);
        assert_eq!(unit.proto_label(), None);
    }

    #[test]
    fn test_adopted_unit_claims_files() {
        let build = r#"
proto_library(
    name = "x_proto",
    srcs = ["x.proto"],
)
"#;
        let aggregation = aggregate("pkg/c", &["x.proto", "y.proto"], build);
        assert_eq!(aggregation.units.len(), 2);
        assert!(aggregation.diagnostics.is_empty());

        let adopted = &aggregation.units[0];
        assert!(adopted.is_adopted());
        assert_eq!(adopted.name(), "x");
        assert_eq!(member_names(adopted), vec!["x.proto"]);
        assert_eq!(adopted.proto_label().unwrap().to_string(), "//pkg/c:x_proto");

        let synthesized = &aggregation.units[1];
        assert_eq!(synthesized.name(), "c");
        assert_eq!(member_names(synthesized), vec!["y.proto"]);
    }

    #[test]
    fn test_fully_claimed_directory_synthesizes_nothing() {
        let build = r#"proto_library(name = "all_proto", srcs = glob(["*.proto"]))"#;
        let aggregation = aggregate("pkg/d", &["a.proto", "b.proto"], build);
        assert_eq!(aggregation.units.len(), 1);
        assert_eq!(member_names(&aggregation.units[0]), vec!["a.proto", "b.proto"]);
    }

    #[test]
    fn test_glob_exclude_leaves_file_for_synthesis() {
        let build = r#"proto_library(name = "pub_proto", srcs = glob(["*.proto"], exclude = ["internal.proto"]))"#;
        let aggregation = aggregate("svc", &["api.proto", "internal.proto"], build);
        assert_eq!(member_names(&aggregation.units[0]), vec!["api.proto"]);
        assert_eq!(member_names(&aggregation.units[1]), vec!["internal.proto"]);
    }

    #[test]
    fn test_missing_source_keeps_unit_as_dependency_target() {
        let build = r#"
proto_library(
    name = "gone_proto",
    srcs = ["gone.proto", ":also_gone.proto"],
)
"#;
        let aggregation = aggregate("pkg/e", &[], build);
        assert_eq!(aggregation.units.len(), 1);
        let unit = &aggregation.units[0];
        assert!(unit.files().is_empty());
        assert_eq!(unit.import_specs(), vec!["pkg/e/gone.proto", "pkg/e/also_gone.proto"]);
        assert_eq!(aggregation.diagnostics.len(), 2);
        assert!(matches!(
            &aggregation.diagnostics[0],
            Diagnostic::AdoptedUnitMismatch { src, reason: MismatchReason::Missing, .. } if src == "gone.proto"
        ));
    }

    #[test]
    fn test_file_claimed_twice_belongs_to_first_unit() {
        let build = r#"
proto_library(name = "first_proto", srcs = ["shared.proto"])
proto_library(name = "second_proto", srcs = ["shared.proto", "own.proto"])
"#;
        let aggregation = aggregate("pkg/f", &["own.proto", "shared.proto"], build);
        assert_eq!(aggregation.units.len(), 2);
        assert_eq!(member_names(&aggregation.units[0]), vec!["shared.proto"]);
        assert_eq!(member_names(&aggregation.units[1]), vec!["own.proto"]);
        assert!(matches!(
            &aggregation.diagnostics[..],
            [Diagnostic::AdoptedUnitMismatch { reason: MismatchReason::AlreadyClaimed, .. }]
        ));
    }

    #[test]
    fn test_cross_directory_srcs_are_kept_verbatim() {
        let build = r#"
proto_library(
    name = "bundle_proto",
    srcs = ["//pkg/other:o.proto", "//pkg/g:local.proto"],
)
"#;
        let aggregation = aggregate("pkg/g", &["local.proto"], build);
        let unit = &aggregation.units[0];
        assert_eq!(unit.srcs(), vec!["local.proto", "//pkg/other:o.proto"]);
        assert_eq!(unit.import_specs(), vec!["pkg/g/local.proto", "pkg/other/o.proto"]);
        assert_eq!(aggregation.units.len(), 1);
    }

    #[test]
    fn test_synthesized_name_avoids_adopted_names() {
        let build = r#"proto_library(name = "h_proto", srcs = ["one.proto"])"#;
        let aggregation = aggregate("pkg/h", &["one.proto", "two.proto"], build);
        assert_eq!(aggregation.units[1].name(), "h_default");

        let root = aggregate("", &["top.proto"], "");
        assert_eq!(root.units[0].id(), &UnitId::new("", "root"));
    }

    #[test]
    fn test_unit_names_are_unique_per_directory() {
        let build = r#"
proto_library(name = "foo_proto", srcs = ["a.proto"])
proto_library(name = "foo", srcs = ["b.proto"])
proto_library(name = "x", srcs = ["c.proto"])
"#;
        let aggregation = aggregate("pkg/x", &["a.proto", "b.proto", "c.proto", "d.proto"], build);
        let names: Vec<&str> = aggregation.units.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["foo", "foo_2", "x", "x_default"]);
        assert_eq!(
            aggregation.units[1].proto_label().unwrap().to_string(),
            "//pkg/x:foo"
        );
    }

    #[test]
    fn test_unparseable_src_label_is_an_error() {
        let contents = read_build_file(r#"proto_library(name = "x_proto", srcs = ["//bad:"])"#).unwrap();
        let adopted: Vec<&RuleCall> = contents.rules.iter().collect();
        let result = UnitAggregator::new("pkg").aggregate(vec![], &adopted);
        assert!(matches!(result, Err(Error::InvalidLabel { .. })));
    }
}
