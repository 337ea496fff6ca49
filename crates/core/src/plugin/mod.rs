//! Plugin records and the registry that maps plugin names to them
//!
//! A plugin turns one compilation unit into one target-language declaration.
//! Plugins are plain data plus a resolve hook; there is no trait object
//! behind a plugin name.

mod builtin;
mod registry;

pub use builtin::builtin_plugins;
pub use registry::PluginRegistry;

use std::fmt;

use crate::bazel::Label;
use crate::config::PluginSettings;
use crate::error::{Error, Result};
use crate::resolve::{Resolution, ResolveRequest, default_resolve};

/// Resolution hook invoked once per generated declaration
pub type ResolveHook = fn(&ResolveRequest<'_>) -> Resolution;

pub const DEFAULT_NAMING: &str = "{unit}_{plugin}";

/// Extra dependency declared by a plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginDep {
    /// The same unit's output for another plugin
    Plugin(String),
    /// A fixed label, written as given
    Label(String),
}

impl PluginDep {
    /// Parse `plugin:<name>` or a label
    pub fn parse(value: &str) -> Result<Self> {
        match value.strip_prefix("plugin:") {
            Some("") => Err(Error::Config(format!("empty plugin reference in {:?}", value))),
            Some(name) => Ok(PluginDep::Plugin(name.to_string())),
            None => {
                Label::parse(value)?;
                Ok(PluginDep::Label(value.to_string()))
            }
        }
    }
}

impl fmt::Display for PluginDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginDep::Plugin(name) => write!(f, "plugin:{}", name),
            PluginDep::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Clone)]
pub struct PluginSpec {
    pub name: String,
    /// Plugin family, matched by the language directive
    pub language: String,
    /// Prefix of the emitted kind, `<output_kind>_<rule kind>`
    pub output_kind: String,
    /// Output name template with `{unit}` and `{plugin}` placeholders
    pub naming: String,
    pub deps: Vec<PluginDep>,
    /// Outputs of all directories land in one shared tree
    pub merge_directories: bool,
    /// Label template (`{stem}`) for `google/protobuf/*.proto` imports
    pub well_known: Option<String>,
    pub resolve: ResolveHook,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            output_kind: name.clone(),
            name,
            language: language.into(),
            naming: DEFAULT_NAMING.to_string(),
            deps: Vec::new(),
            merge_directories: false,
            well_known: None,
            resolve: default_resolve,
        }
    }

    pub fn with_output_kind(mut self, output_kind: impl Into<String>) -> Self {
        self.output_kind = output_kind.into();
        self
    }

    pub fn with_naming(mut self, naming: impl Into<String>) -> Self {
        self.naming = naming.into();
        self
    }

    pub fn with_dep(mut self, dep: PluginDep) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn merging_directories(mut self) -> Self {
        self.merge_directories = true;
        self
    }

    pub fn with_well_known(mut self, template: impl Into<String>) -> Self {
        self.well_known = Some(template.into());
        self
    }

    pub fn with_resolve(mut self, hook: ResolveHook) -> Self {
        self.resolve = hook;
        self
    }

    /// Build a plugin from a `[[plugin]]` settings entry
    pub fn from_settings(settings: &PluginSettings) -> Result<Self> {
        let mut spec = PluginSpec::new(&settings.name, &settings.language);
        if let Some(output_kind) = &settings.output_kind {
            spec.output_kind = output_kind.clone();
        }
        if let Some(naming) = &settings.naming {
            spec.naming = naming.clone();
        }
        spec.deps = settings
            .deps
            .iter()
            .map(|dep| PluginDep::parse(dep))
            .collect::<Result<_>>()?;
        spec.merge_directories = settings.merge_directories;
        spec.well_known = settings.well_known.clone();
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        let is_identifier = |s: &str| {
            !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !is_identifier(&self.name) {
            return Err(Error::Config(format!("invalid plugin name {:?}", self.name)));
        }
        if !is_identifier(&self.output_kind) {
            return Err(Error::Config(format!(
                "plugin {}: invalid output kind {:?}",
                self.name, self.output_kind
            )));
        }
        if self.language.is_empty() {
            return Err(Error::Config(format!("plugin {}: empty language", self.name)));
        }
        if !self.naming.contains("{unit}") {
            return Err(Error::Config(format!(
                "plugin {}: naming template {:?} must contain {{unit}}",
                self.name, self.naming
            )));
        }
        if self.deps.contains(&PluginDep::Plugin(self.name.clone())) {
            return Err(Error::Config(format!("plugin {} depends on itself", self.name)));
        }
        Ok(())
    }

    /// Kind of the declaration this plugin emits for `rule_kind`
    pub fn kind_for(&self, rule_kind: &str) -> String {
        format!("{}_{}", self.output_kind, rule_kind)
    }

    /// Output name for the unit `unit`
    pub fn output_name(&self, unit: &str) -> String {
        self.naming
            .replace("{unit}", unit)
            .replace("{plugin}", &self.name)
    }
}

impl fmt::Debug for PluginSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginSpec")
            .field("name", &self.name)
            .field("language", &self.language)
            .field("output_kind", &self.output_kind)
            .field("naming", &self.naming)
            .field("deps", &self.deps)
            .field("merge_directories", &self.merge_directories)
            .field("well_known", &self.well_known)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_dep_parse() {
        assert_eq!(PluginDep::parse("plugin:go").unwrap(), PluginDep::Plugin("go".into()));
        assert_eq!(
            PluginDep::parse("@pypi//grpcio").unwrap(),
            PluginDep::Label("@pypi//grpcio".into())
        );
        assert!(PluginDep::parse("plugin:").is_err());
        assert!(PluginDep::parse("not a label").is_err());
    }

    #[test]
    fn test_output_name_and_kind() {
        let spec = PluginSpec::new("grpc_go", "go")
            .with_output_kind("go_grpc")
            .with_naming("{unit}_go_grpc");
        assert_eq!(spec.output_name("a"), "a_go_grpc");
        assert_eq!(spec.kind_for("proto_library"), "go_grpc_proto_library");

        let default_naming = PluginSpec::new("py", "python");
        assert_eq!(default_naming.output_name("b"), "b_py");
    }

    #[test]
    fn test_from_settings_validates() {
        let settings = PluginSettings {
            name: "ts".into(),
            language: "typescript".into(),
            output_kind: None,
            naming: Some("{unit}_ts".into()),
            deps: vec!["@npm//protobufjs".into()],
            merge_directories: true,
            well_known: None,
        };
        let spec = PluginSpec::from_settings(&settings).unwrap();
        assert_eq!(spec.output_kind, "ts");
        assert!(spec.merge_directories);

        let bad = PluginSettings {
            naming: Some("fixed_name".into()),
            ..settings.clone()
        };
        assert!(matches!(PluginSpec::from_settings(&bad), Err(Error::Config(_))));

        let self_dep = PluginSettings {
            deps: vec!["plugin:ts".into()],
            ..settings
        };
        assert!(PluginSpec::from_settings(&self_dep).is_err());
    }
}
