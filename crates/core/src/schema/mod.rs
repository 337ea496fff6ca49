//! Rule definition meta-generator
//!
//! A `RuleSchema` plus four templates render into the `.bzl` implementation
//! of a language rule, a JSON snapshot of the inputs, and a small example
//! workspace exercising the rule.

mod template;

pub use template::render_template;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::emit::load_label;
use crate::error::{Error, Result};
use crate::plugin::PluginRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Proto,
    Service,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Proto => "proto",
            RuleKind::Service => "service",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSchema {
    pub name: String,
    pub kind: RuleKind,
    /// Package the rule's `.bzl` file is loaded from
    pub package: String,
    #[serde(default)]
    pub skip_directory_merge: bool,
    #[serde(default)]
    pub plugins: Vec<String>,
    pub implementation_template: PathBuf,
    pub build_template: PathBuf,
    pub workspace_template: PathBuf,
    pub test_template: PathBuf,
}

impl RuleSchema {
    /// Load a schema from a `.json` or `.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let schema: RuleSchema = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<()> {
        let is_identifier = |s: &str| {
            !s.is_empty()
                && !s.starts_with(|c: char| c.is_ascii_digit())
                && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        if !is_identifier(&self.name) {
            return Err(Error::Config(format!("invalid rule name {:?}", self.name)));
        }
        if self.package.starts_with('/') || self.package.ends_with('/') {
            return Err(Error::Config(format!("invalid rule package {:?}", self.package)));
        }
        Ok(())
    }

    /// Every default plugin must be registered
    pub fn check_plugins(&self, registry: &PluginRegistry) -> Result<()> {
        match self.plugins.iter().find(|p| !registry.contains(p)) {
            Some(unknown) => Err(Error::UnknownPlugin(unknown.clone())),
            None => Ok(()),
        }
    }

    fn load_label(&self) -> String {
        load_label(&format!("//{}", self.package), &self.name)
    }
}

/// Template sources, keyed by role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    pub implementation: String,
    pub build: String,
    pub workspace: String,
    pub test: String,
}

impl Templates {
    /// Read the schema's templates, resolving paths against `base`
    pub fn load(schema: &RuleSchema, base: &Path) -> Result<Self> {
        let read = |path: &Path| -> Result<String> {
            let full = base.join(path);
            fs::read_to_string(&full).map_err(|e| Error::SchemaRender {
                template: full.display().to_string(),
                message: e.to_string(),
            })
        };
        Ok(Self {
            implementation: read(&schema.implementation_template)?,
            build: read(&schema.build_template)?,
            workspace: read(&schema.workspace_template)?,
            test: read(&schema.test_template)?,
        })
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    schema: &'a RuleSchema,
    template_md5: BTreeMap<&'static str, String>,
}

/// The five rendered artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRule {
    pub name: String,
    pub implementation: String,
    pub snapshot: String,
    pub example_build: String,
    pub example_workspace: String,
    pub example_test: String,
}

/// Render `schema` with `templates`; nothing is written
pub fn render(schema: &RuleSchema, templates: &Templates) -> Result<RenderedRule> {
    let plugins = format!(
        "[{}]",
        schema
            .plugins
            .iter()
            .map(|p| format!("\"{}\"", p))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let fields = BTreeMap::from([
        ("name", schema.name.clone()),
        ("kind", schema.kind.as_str().to_string()),
        ("package", schema.package.clone()),
        (
            "skip_directory_merge",
            if schema.skip_directory_merge { "True" } else { "False" }.to_string(),
        ),
        ("plugins", plugins),
        ("load_label", schema.load_label()),
    ]);

    let snapshot = Snapshot {
        schema,
        template_md5: BTreeMap::from([
            ("implementation", digest(&templates.implementation)),
            ("build", digest(&templates.build)),
            ("workspace", digest(&templates.workspace)),
            ("test", digest(&templates.test)),
        ]),
    };

    Ok(RenderedRule {
        name: schema.name.clone(),
        implementation: render_template("implementation", &templates.implementation, &fields)?,
        snapshot: serde_json::to_string_pretty(&snapshot)? + "\n",
        example_build: render_template("build", &templates.build, &fields)?,
        example_workspace: render_template("workspace", &templates.workspace, &fields)?,
        example_test: render_template("test", &templates.test, &fields)?,
    })
}

fn digest(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

impl RenderedRule {
    /// Output paths relative to the output directory, with their contents
    pub fn files(&self) -> Vec<(PathBuf, &str)> {
        vec![
            (PathBuf::from(format!("{}.bzl", self.name)), self.implementation.as_str()),
            (PathBuf::from(format!("{}.schema.json", self.name)), self.snapshot.as_str()),
            (PathBuf::from("example").join("BUILD.bazel"), self.example_build.as_str()),
            (PathBuf::from("example").join("WORKSPACE"), self.example_workspace.as_str()),
            (PathBuf::from(format!("{}_test.bzl", self.name)), self.example_test.as_str()),
        ]
    }

    /// Write all artifacts under `out_dir`, or none of them.
    ///
    /// Contents are staged next to their targets first. Files replaced
    /// before a later rename fails are restored from their backups.
    pub fn write_to(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files();
        let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());

        for (rel, content) in &files {
            let target = out_dir.join(rel);
            let temp = sibling(&target, "tmp");
            let written = target
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&temp, content));
            if let Err(err) = written {
                discard(&staged);
                let _ = fs::remove_file(&temp);
                return Err(err.into());
            }
            staged.push((temp, target));
        }

        let mut committed: Vec<(&Path, Option<PathBuf>)> = Vec::with_capacity(staged.len());
        for (i, (temp, target)) in staged.iter().enumerate() {
            match commit(temp, target) {
                Ok(backup) => committed.push((target.as_path(), backup)),
                Err(err) => {
                    discard(&staged[i..]);
                    roll_back(&committed);
                    return Err(err.into());
                }
            }
        }
        for (target, backup) in &committed {
            if let Some(backup) = backup {
                if let Err(err) = fs::remove_file(backup) {
                    tracing::warn!("failed to remove {}: {}", backup.display(), err);
                }
            }
            tracing::debug!("wrote {}", target.display());
        }
        Ok(staged.into_iter().map(|(_, target)| target).collect())
    }
}

/// `.<name>.<suffix>` next to `target`
fn sibling(target: &Path, suffix: &str) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{}", name, suffix))
}

/// Move `temp` onto `target`, keeping a replaced file as a backup
fn commit(temp: &Path, target: &Path) -> io::Result<Option<PathBuf>> {
    let backup = if target.is_file() {
        let backup = sibling(target, "bak");
        fs::rename(target, &backup)?;
        Some(backup)
    } else {
        None
    };
    if let Err(err) = fs::rename(temp, target) {
        if let Some(backup) = &backup {
            restore(backup, target);
        }
        return Err(err);
    }
    Ok(backup)
}

fn roll_back(committed: &[(&Path, Option<PathBuf>)]) {
    for (target, backup) in committed.iter().rev() {
        match backup {
            Some(backup) => restore(backup, target),
            None => {
                if let Err(err) = fs::remove_file(target) {
                    tracing::warn!("failed to remove {}: {}", target.display(), err);
                }
            }
        }
    }
}

fn restore(backup: &Path, target: &Path) {
    if let Err(err) = fs::rename(backup, target) {
        tracing::warn!("failed to restore {}: {}", target.display(), err);
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        if let Err(err) = fs::remove_file(temp) {
            tracing::warn!("failed to remove {}: {}", temp.display(), err);
        }
    }
}
