//! Run-wide import index
//!
//! Filled while directories are generated, read once every directory has
//! been visited. Lookups never fail: an import nobody registered is simply
//! absent.

use std::collections::{BTreeMap, HashMap};

use crate::bazel::Label;
use crate::unit::UnitId;

#[derive(Debug, Clone, Default)]
pub struct ImportIndex {
    /// Import string to owning units, in registration order
    imports: HashMap<String, Vec<UnitId>>,
    /// Unit to its output label per plugin
    outputs: HashMap<UnitId, BTreeMap<String, Label>>,
}

impl ImportIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the output `label` of `unit` for `plugin`
    pub fn register_output(&mut self, unit: &UnitId, plugin: &str, label: Label) {
        self.outputs
            .entry(unit.clone())
            .or_default()
            .insert(plugin.to_string(), label);
    }

    /// Record that `import` is satisfied by `unit`
    pub fn add_import(&mut self, import: &str, unit: &UnitId) {
        let owners = self.imports.entry(import.to_string()).or_default();
        if !owners.contains(unit) {
            owners.push(unit.clone());
        }
    }

    /// Units providing `import`, first registered first
    pub fn lookup(&self, import: &str) -> &[UnitId] {
        self.imports.get(import).map(Vec::as_slice).unwrap_or_default()
    }

    /// Output of `unit` for `plugin`, if that plugin ran on it
    pub fn output(&self, unit: &UnitId, plugin: &str) -> Option<&Label> {
        self.outputs.get(unit).and_then(|outputs| outputs.get(plugin))
    }

    /// Number of indexed import strings
    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }
}
