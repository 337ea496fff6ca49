//! Configuration: project settings, directives and the per-directory context
//!
//! `ProtoConfig` is the context handed to every directory visit. A child
//! directory starts from a clone of its parent's context and applies its own
//! directives on top, so overrides are inherited by the whole subtree.

mod directive;
mod settings;

pub use directive::{
    Directive, KNOWN_DIRECTIVES, LANGUAGE_DIRECTIVE, ListUpdate, PLUGIN_DIRECTIVE, RULE_DIRECTIVE,
};
pub use settings::{PluginSettings, SETTINGS_FILE_NAME, Settings};

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::plugin::PluginRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoConfig {
    /// Enabled plugin families; `None` enables all of them
    languages: Option<BTreeSet<String>>,
    plugins: Vec<String>,
    rule_kind: String,
    strict: bool,
}

impl ProtoConfig {
    /// Context for the workspace root
    pub fn root(settings: &Settings) -> Self {
        Self {
            languages: None,
            plugins: settings.default_plugins.clone(),
            rule_kind: settings.default_rule_kind.clone(),
            strict: settings.strict,
        }
    }

    /// Context for a subdirectory: this one plus `directives`
    pub fn child(&self, directives: &[Directive], registry: &PluginRegistry) -> Result<Self> {
        let mut config = self.clone();
        for directive in directives {
            config.apply(directive, registry)?;
        }
        Ok(config)
    }

    pub fn apply(&mut self, directive: &Directive, registry: &PluginRegistry) -> Result<()> {
        match directive {
            Directive::Language(update) => {
                let known = registry.languages();
                for name in update_names(update) {
                    if !known.contains(name.as_str()) {
                        return Err(Error::UnknownLanguage(name.clone()));
                    }
                }
                self.languages = match update {
                    ListUpdate::All => None,
                    ListUpdate::Replace(names) => Some(names.iter().cloned().collect()),
                    ListUpdate::Edit { add, remove } => {
                        let mut languages = self.languages.clone().unwrap_or_else(|| {
                            known.iter().map(|l| l.to_string()).collect()
                        });
                        languages.extend(add.iter().cloned());
                        languages.retain(|l| !remove.contains(l));
                        Some(languages)
                    }
                };
            }
            Directive::Plugin(update) => {
                for name in update_names(update) {
                    if !registry.contains(name) {
                        return Err(Error::UnknownPlugin(name.clone()));
                    }
                }
                match update {
                    ListUpdate::All => {
                        self.plugins = registry.names().into_iter().map(String::from).collect();
                    }
                    ListUpdate::Replace(names) => {
                        self.plugins = Vec::new();
                        for name in names {
                            if !self.plugins.contains(name) {
                                self.plugins.push(name.clone());
                            }
                        }
                    }
                    ListUpdate::Edit { add, remove } => {
                        for name in add {
                            if !self.plugins.contains(name) {
                                self.plugins.push(name.clone());
                            }
                        }
                        self.plugins.retain(|p| !remove.contains(p));
                    }
                }
            }
            Directive::Rule(kind) => {
                if !registry.has_rule_kind(kind) {
                    return Err(Error::UnknownRuleKind(kind.clone()));
                }
                self.rule_kind = kind.clone();
            }
        }
        Ok(())
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn plugins(&self) -> &[String] {
        &self.plugins
    }

    pub fn languages(&self) -> Option<&BTreeSet<String>> {
        self.languages.as_ref()
    }

    pub fn language_enabled(&self, language: &str) -> bool {
        self.languages
            .as_ref()
            .is_none_or(|languages| languages.contains(language))
    }

    pub fn rule_kind(&self) -> &str {
        &self.rule_kind
    }

    pub fn strict(&self) -> bool {
        self.strict
    }
}

fn update_names(update: &ListUpdate) -> Vec<&String> {
    match update {
        ListUpdate::All => Vec::new(),
        ListUpdate::Replace(names) => names.iter().collect(),
        ListUpdate::Edit { add, remove } => add.iter().chain(remove.iter()).collect(),
    }
}
