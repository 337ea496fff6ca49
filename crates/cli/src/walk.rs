//! Workspace traversal: the host side of the engine
//!
//! Directories are walked twice. A pre-order pass reads BUILD files and
//! builds each directory's configuration from its parent's; a post-order
//! pass generates declarations. Resolution runs once every directory has
//! been indexed, then BUILD files are rewritten.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use protogen_core::config::{Directive, ProtoConfig, Settings};
use protogen_core::diagnostics::Diagnostic;
use protogen_core::engine::{GenerateArgs, GenerateResult, ProtoEngine};
use protogen_core::plugin::PluginRegistry;
use protogen_core::{BuildFileContents, read_build_file, update_build_file};

#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub root: PathBuf,
    /// Settings file; `<root>/protogen.toml` when absent
    pub settings: Option<PathBuf>,
    pub dry_run: bool,
    pub lenient: bool,
}

/// A BUILD file whose content changed
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub created: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateReport {
    pub results: Vec<GenerateResult>,
    pub changed: Vec<ChangedFile>,
    pub dry_run: bool,
}

impl UpdateReport {
    /// Every diagnostic of the run, directory and declaration level
    pub fn diagnostics(&self) -> Vec<&Diagnostic> {
        self.results
            .iter()
            .flat_map(|result| {
                result
                    .diagnostics
                    .iter()
                    .chain(result.generated.iter().flat_map(|d| d.diagnostics.iter()))
            })
            .collect()
    }
}

struct ExistingBuildFile {
    path: PathBuf,
    content: String,
    contents: BuildFileContents,
}

struct Visit {
    dir: PathBuf,
    config: ProtoConfig,
    regular_files: Vec<String>,
    build_file: Option<ExistingBuildFile>,
}

/// Load settings, walk `options.root`, and update every BUILD file
pub fn update_workspace(options: &UpdateOptions) -> Result<UpdateReport> {
    let root = options
        .root
        .canonicalize()
        .with_context(|| format!("Failed to resolve workspace root {}", options.root.display()))?;

    let settings = match &options.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::discover(&root).context("Failed to load workspace settings")?,
    };
    let registry = PluginRegistry::from_settings(&settings).context("Invalid plugin settings")?;
    let root_config = ProtoConfig::root(&settings).with_strict(settings.strict && !options.lenient);

    let (visits, pre_order) = configure(&root, &settings, &registry, root_config)?;
    let mut engine = ProtoEngine::new(registry);
    let mut results = Vec::new();

    for rel in post_order(&pre_order) {
        let Some(visit) = visits.get(rel) else {
            continue;
        };
        let result = engine
            .generate_rules(&GenerateArgs {
                rel,
                dir: &visit.dir,
                config: &visit.config,
                regular_files: &visit.regular_files,
                build_file: visit.build_file.as_ref().map(|b| &b.contents),
            })
            .with_context(|| format!("Failed to generate rules for //{}", rel))?;
        results.push(result);
    }
    info!("indexed {} imports in {} directories", engine.index().len(), results.len());

    engine.resolve_all(&mut results);

    let mut changed = Vec::new();
    for result in &results {
        let Some(visit) = visits.get(&result.rel) else {
            continue;
        };
        if let Some(change) = write_build_file(visit, result, &settings, options.dry_run)? {
            changed.push(change);
        }
    }

    Ok(UpdateReport {
        results,
        changed,
        dry_run: options.dry_run,
    })
}

/// Pre-order pass: per-directory configuration and BUILD file contents,
/// plus the order directories were visited in
fn configure(
    root: &Path,
    settings: &Settings,
    registry: &PluginRegistry,
    root_config: ProtoConfig,
) -> Result<(HashMap<String, Visit>, Vec<String>)> {
    let mut visits: HashMap<String, Visit> = HashMap::new();
    let mut order = Vec::new();

    for entry in walk(root) {
        let entry = entry.context("Failed to walk workspace")?;
        let rel = rel_path(root, entry.path());
        let regular_files = regular_files(entry.path())?;

        let build_file = settings
            .build_file_names
            .iter()
            .find(|name| regular_files.contains(name))
            .map(|name| read_existing(&entry.path().join(name)))
            .transpose()?;

        let parent = if rel.is_empty() {
            &root_config
        } else {
            let parent_rel = rel.rsplit_once('/').map_or("", |(parent, _)| parent);
            visits
                .get(parent_rel)
                .map(|visit| &visit.config)
                .unwrap_or(&root_config)
        };
        let config = match &build_file {
            Some(build) => {
                let directives = Directive::collect(&build.contents.directives)
                    .with_context(|| format!("Invalid directive in {}", build.path.display()))?;
                parent
                    .child(&directives, registry)
                    .with_context(|| format!("Invalid directive in {}", build.path.display()))?
            }
            None => parent.clone(),
        };
        debug!("configured //{}: plugins {:?}", rel, config.plugins());

        order.push(rel.clone());
        visits.insert(
            rel,
            Visit {
                dir: entry.path().to_path_buf(),
                config,
                regular_files,
                build_file,
            },
        );
    }
    Ok((visits, order))
}

/// Names of the files in `dir`, following symlinks
fn regular_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for file in fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))? {
        let file = file?;
        let path = file.path();
        match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                names.push(file.file_name().to_string_lossy().into_owned());
            }
            Ok(_) => {}
            Err(err) => debug!("skipping {}: {}", path.display(), err),
        }
    }
    names.sort();
    Ok(names)
}

/// Children before parents, siblings in their pre-order sequence
fn post_order(pre_order: &[String]) -> Vec<&str> {
    let mut order = Vec::with_capacity(pre_order.len());
    let mut open: Vec<&str> = Vec::new();
    for rel in pre_order {
        while let Some(&top) = open.last() {
            if contains_dir(top, rel) {
                break;
            }
            order.push(top);
            open.pop();
        }
        open.push(rel);
    }
    order.extend(open.into_iter().rev());
    order
}

fn contains_dir(parent: &str, rel: &str) -> bool {
    parent.is_empty() || rel.strip_prefix(parent).is_some_and(|rest| rest.starts_with('/'))
}

fn read_existing(path: &Path) -> Result<ExistingBuildFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let contents =
        read_build_file(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(ExistingBuildFile {
        path: path.to_path_buf(),
        content,
        contents,
    })
}

fn write_build_file(
    visit: &Visit,
    result: &GenerateResult,
    settings: &Settings,
    dry_run: bool,
) -> Result<Option<ChangedFile>> {
    let (path, original, updated, created) = match &visit.build_file {
        Some(build) => {
            let updated =
                update_build_file(&build.content, &build.contents, result, &settings.load_prefix);
            (build.path.clone(), build.content.as_str(), updated, false)
        }
        None if result.generated.is_empty() => return Ok(None),
        None => {
            let name = settings
                .build_file_names
                .first()
                .map(String::as_str)
                .unwrap_or("BUILD.bazel");
            let updated = update_build_file(
                "",
                &BuildFileContents::default(),
                result,
                &settings.load_prefix,
            );
            (visit.dir.join(name), "", updated, true)
        }
    };

    if updated == original {
        return Ok(None);
    }
    if !dry_run {
        fs::write(&path, &updated).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!("wrote {}", path.display());
    }
    Ok(Some(ChangedFile { path, created }))
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored(entry))
        .filter(|entry| entry.as_ref().map_or(true, |e| e.file_type().is_dir()))
}

fn is_ignored(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && (name.starts_with('.') || name.starts_with("bazel-"))
}

/// Workspace-relative, `/`-separated directory path; `""` for the root
fn rel_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
