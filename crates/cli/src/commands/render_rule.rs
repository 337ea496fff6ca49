use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use protogen_core::schema::{RuleSchema, Templates, render};

use super::load_registry;

pub fn render_rule_command(schema_path: &Path, out: &Path, settings: Option<&Path>) -> Result<()> {
    debug!("Rendering rule schema {}", schema_path.display());

    let schema = RuleSchema::load(schema_path)
        .with_context(|| format!("Failed to load rule schema {}", schema_path.display()))?;
    let registry = load_registry(settings)?;
    schema
        .check_plugins(&registry)
        .with_context(|| format!("Invalid plugin list in {}", schema_path.display()))?;

    let base = schema_path.parent().unwrap_or_else(|| Path::new("."));
    let templates = Templates::load(&schema, base)?;
    let rendered = render(&schema, &templates)?;
    let written = rendered
        .write_to(out)
        .with_context(|| format!("Failed to write rule files to {}", out.display()))?;

    println!("✅ Rendered {} ({} files)", schema.name, written.len());
    for path in written {
        println!("   {}", path.display());
    }
    Ok(())
}
