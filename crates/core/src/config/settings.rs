use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

pub const SETTINGS_FILE_NAME: &str = "protogen.toml";

/// Project-wide settings loaded from `protogen.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Plugin list at the workspace root, in emission order
    pub default_plugins: Vec<String>,

    /// Unit kinds the rule directive may select
    pub rule_kinds: Vec<String>,

    pub default_rule_kind: String,

    /// Package holding the rule implementations, used in emitted loads
    pub load_prefix: String,

    /// Abort on unparseable proto files instead of skipping them
    pub strict: bool,

    /// BUILD file names, in lookup order; the first is used for new files
    pub build_file_names: Vec<String>,

    #[serde(rename = "plugin", skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_plugins: vec!["go".to_string(), "py".to_string()],
            rule_kinds: vec!["proto_library".to_string(), "proto_compile".to_string()],
            default_rule_kind: "proto_library".to_string(),
            load_prefix: "//rules".to_string(),
            strict: true,
            build_file_names: vec!["BUILD.bazel".to_string(), "BUILD".to_string()],
            plugins: Vec::new(),
        }
    }
}

/// A `[[plugin]]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSettings {
    pub name: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<String>,
    /// `plugin:<name>` or a label
    #[serde(default)]
    pub deps: Vec<String>,
    #[serde(default)]
    pub merge_directories: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub well_known: Option<String>,
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!("loading settings from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Settings from `<root>/protogen.toml`, or the defaults when absent
    pub fn discover(root: &Path) -> Result<Self> {
        let path = root.join(SETTINGS_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            tracing::debug!("no {} under {}, using defaults", SETTINGS_FILE_NAME, root.display());
            Ok(Self::default())
        }
    }
}
