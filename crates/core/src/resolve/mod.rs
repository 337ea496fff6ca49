//! Import resolution
//!
//! Turns the import references of a generated declaration into dependency
//! labels once the whole graph has been indexed.

mod index;

pub use index::ImportIndex;

use std::collections::BTreeSet;

use crate::diagnostics::Diagnostic;
use crate::generate::{GeneratedDeclaration, ImportRef};
use crate::plugin::PluginSpec;
use crate::unit::UnitId;

const WELL_KNOWN_PREFIX: &str = "google/protobuf/";

/// Everything a resolve hook may look at
pub struct ResolveRequest<'a> {
    pub declaration: &'a GeneratedDeclaration,
    pub plugin: &'a PluginSpec,
    pub index: &'a ImportIndex,
}

/// What a resolve hook produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Labels as written from the declaring package
    pub deps: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// The hook every built-in plugin uses
pub fn default_resolve(request: &ResolveRequest<'_>) -> Resolution {
    let declaration = request.declaration;
    let package = declaration.package.as_str();
    let mut deps = BTreeSet::new();
    let mut diagnostics = Vec::new();

    let unresolved = |import: &str, reason: String| Diagnostic::UnresolvedImport {
        declaration: declaration.label().to_string(),
        import: import.to_string(),
        reason,
    };

    for import in &declaration.imports {
        match import {
            ImportRef::Source(path) => {
                let candidates = request.index.lookup(path);
                if candidates.is_empty() {
                    match well_known_label(path, request.plugin) {
                        Some(label) => {
                            deps.insert(label);
                        }
                        None => diagnostics.push(unresolved(
                            path,
                            "no compilation unit provides this import".to_string(),
                        )),
                    }
                    continue;
                }
                let output = |unit: &UnitId| request.index.output(unit, &request.plugin.name);
                // The declaring unit wins, then the first unit with an output for this plugin
                let chosen = candidates
                    .iter()
                    .find(|unit| **unit == declaration.unit)
                    .or_else(|| candidates.iter().find(|unit| output(*unit).is_some()))
                    .unwrap_or(&candidates[0]);
                if candidates.len() > 1 {
                    diagnostics.push(Diagnostic::AmbiguousImport {
                        declaration: declaration.label().to_string(),
                        import: path.clone(),
                        chosen: chosen.to_string(),
                        candidates: candidates.iter().map(ToString::to_string).collect(),
                    });
                }
                if *chosen == declaration.unit {
                    continue;
                }
                match output(chosen) {
                    Some(label) => {
                        deps.insert(label.rel_to(package));
                    }
                    None => diagnostics.push(unresolved(
                        path,
                        format!("{} has no {} output", chosen, request.plugin.name),
                    )),
                }
            }
            ImportRef::Plugin(name) => match request.index.output(&declaration.unit, name) {
                Some(label) => {
                    deps.insert(label.rel_to(package));
                }
                None => diagnostics.push(unresolved(
                    &format!("plugin:{}", name),
                    format!("plugin {} is not enabled for {}", name, declaration.unit),
                )),
            },
            ImportRef::Label(label) => {
                deps.insert(label.clone());
            }
        }
    }

    Resolution {
        deps: deps.into_iter().collect(),
        diagnostics,
    }
}

/// Name-based label for a well-known import the graph does not contain
fn well_known_label(path: &str, plugin: &PluginSpec) -> Option<String> {
    let template = plugin.well_known.as_ref()?;
    let stem = path.strip_prefix(WELL_KNOWN_PREFIX)?.strip_suffix(".proto")?;
    Some(template.replace("{stem}", &stem.replace('/', "_")))
}

/// Run the plugin's hook on `declaration`; a resolved declaration is left as is
pub fn resolve_declaration(
    declaration: &mut GeneratedDeclaration,
    plugin: &PluginSpec,
    index: &ImportIndex,
) {
    if declaration.resolved {
        return;
    }
    let resolution = (plugin.resolve)(&ResolveRequest {
        declaration: &*declaration,
        plugin,
        index,
    });
    for diagnostic in &resolution.diagnostics {
        diagnostic.log();
    }
    tracing::debug!(
        "resolved {} with {} deps",
        declaration.label(),
        resolution.deps.len()
    );
    declaration.deps = resolution.deps;
    declaration.diagnostics.extend(resolution.diagnostics);
    declaration.resolved = true;
}
