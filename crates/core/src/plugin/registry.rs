//! Plugin registry
//!
//! Manages registration and lookup of plugins and the unit kinds they can
//! be combined with.

use std::collections::{BTreeSet, HashMap};

use super::{PluginDep, PluginSpec, builtin_plugins};
use crate::config::{ProtoConfig, Settings};
use crate::error::{Error, Result};

pub const DEFAULT_RULE_KINDS: [&str; 2] = ["proto_library", "proto_compile"];

/// Registry of plugins, kept in registration order
#[derive(Clone)]
pub struct PluginRegistry {
    plugins: Vec<PluginSpec>,
    by_name: HashMap<String, usize>,
    rule_kinds: Vec<String>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.names())
            .field("rule_kinds", &self.rule_kinds)
            .finish()
    }
}

impl PluginRegistry {
    /// Create a new registry with the built-in plugins
    pub fn new() -> Self {
        let mut registry = Self {
            plugins: Vec::new(),
            by_name: HashMap::new(),
            rule_kinds: DEFAULT_RULE_KINDS.iter().map(|k| k.to_string()).collect(),
        };
        for spec in builtin_plugins() {
            registry.insert(spec);
        }
        registry
    }

    /// Built-ins plus the `[[plugin]]` entries and rule kinds of `settings`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new();
        for plugin in &settings.plugins {
            registry.register(PluginSpec::from_settings(plugin)?)?;
        }
        registry.rule_kinds = settings.rule_kinds.clone();
        registry.validate(settings)?;
        Ok(registry)
    }

    /// Register a plugin, replacing any plugin of the same name in place
    pub fn register(&mut self, spec: PluginSpec) -> Result<()> {
        spec.validate()?;
        tracing::debug!("registering plugin {}", spec.name);
        self.insert(spec);
        Ok(())
    }

    fn insert(&mut self, spec: PluginSpec) {
        match self.by_name.get(&spec.name) {
            Some(&position) => self.plugins[position] = spec,
            None => {
                self.by_name.insert(spec.name.clone(), self.plugins.len());
                self.plugins.push(spec);
            }
        }
    }

    fn validate(&self, settings: &Settings) -> Result<()> {
        for spec in &self.plugins {
            for dep in &spec.deps {
                if let PluginDep::Plugin(name) = dep {
                    if !self.contains(name) {
                        return Err(Error::UnknownPlugin(format!(
                            "{} (dependency of plugin {})",
                            name, spec.name
                        )));
                    }
                }
            }
        }
        for name in &settings.default_plugins {
            if !self.contains(name) {
                return Err(Error::UnknownPlugin(name.clone()));
            }
        }
        if self.rule_kinds.is_empty() {
            return Err(Error::Config("at least one rule kind is required".to_string()));
        }
        if !self.has_rule_kind(&settings.default_rule_kind) {
            return Err(Error::UnknownRuleKind(settings.default_rule_kind.clone()));
        }
        Ok(())
    }

    /// Get a plugin by name
    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.by_name.get(name).map(|&i| &self.plugins[i])
    }

    /// Check if a plugin exists
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All plugins in registration order
    pub fn plugins(&self) -> &[PluginSpec] {
        &self.plugins
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn languages(&self) -> BTreeSet<&str> {
        self.plugins.iter().map(|p| p.language.as_str()).collect()
    }

    pub fn rule_kinds(&self) -> &[String] {
        &self.rule_kinds
    }

    pub fn has_rule_kind(&self, kind: &str) -> bool {
        self.rule_kinds.iter().any(|k| k == kind)
    }

    /// Plugins enabled by `config`, in the configured order
    pub fn enabled(&self, config: &ProtoConfig) -> Vec<&PluginSpec> {
        config
            .plugins()
            .iter()
            .filter_map(|name| self.get(name))
            .filter(|spec| config.language_enabled(&spec.language))
            .collect()
    }

    /// Every kind any registered plugin can emit
    pub fn generatable_kinds(&self) -> BTreeSet<String> {
        self.plugins
            .iter()
            .flat_map(|spec| self.rule_kinds.iter().map(|kind| spec.kind_for(kind)))
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginSettings;

    #[test]
    fn test_builtin_registry() {
        let registry = PluginRegistry::new();
        assert!(registry.contains("go"));
        assert!(registry.contains("grpc_py"));
        assert_eq!(registry.get("cpp").unwrap().output_kind, "cc");
        assert!(registry.languages().contains("python"));
        assert!(registry.generatable_kinds().contains("go_grpc_proto_compile"));
    }

    #[test]
    fn test_settings_plugin_replaces_builtin_in_place() {
        let mut settings = Settings::default();
        settings.plugins.push(PluginSettings {
            name: "go".into(),
            language: "go".into(),
            output_kind: Some("gogo".into()),
            naming: None,
            deps: vec![],
            merge_directories: false,
            well_known: None,
        });
        let registry = PluginRegistry::from_settings(&settings).unwrap();
        assert_eq!(registry.names()[0], "go");
        assert_eq!(registry.get("go").unwrap().output_kind, "gogo");
        assert_eq!(registry.get("go").unwrap().output_name("a"), "a_go");
    }

    #[test]
    fn test_unknown_references_are_rejected() {
        let mut settings = Settings::default();
        settings.default_plugins = vec!["go".into(), "rust".into()];
        assert!(matches!(
            PluginRegistry::from_settings(&settings),
            Err(Error::UnknownPlugin(name)) if name == "rust"
        ));

        let mut settings = Settings::default();
        settings.plugins.push(PluginSettings {
            name: "grpc_rust".into(),
            language: "rust".into(),
            output_kind: None,
            naming: None,
            deps: vec!["plugin:rust".into()],
            merge_directories: false,
            well_known: None,
        });
        assert!(matches!(
            PluginRegistry::from_settings(&settings),
            Err(Error::UnknownPlugin(_))
        ));

        let mut settings = Settings::default();
        settings.default_rule_kind = "grpc_library".into();
        assert!(matches!(
            PluginRegistry::from_settings(&settings),
            Err(Error::UnknownRuleKind(_))
        ));
    }

    #[test]
    fn test_enabled_follows_config_order_and_languages() {
        let registry = PluginRegistry::new();
        let mut settings = Settings::default();
        settings.default_plugins = vec!["py".into(), "go".into(), "java".into()];
        let config = ProtoConfig::root(&settings);

        let names: Vec<&str> = registry.enabled(&config).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["py", "go", "java"]);

        let child = config
            .child(&[crate::config::Directive::parse("proto_language", "-java").unwrap()], &registry)
            .unwrap();
        let names: Vec<&str> = registry.enabled(&child).iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["py", "go"]);
    }
}
