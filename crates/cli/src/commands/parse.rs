use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use protogen_core::proto::{SourceFile, is_proto_file};

pub fn parse_command(file: &Path) -> Result<()> {
    let basename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_proto_file(&basename) {
        bail!("{} is not a .proto file", file.display());
    }
    let rel = file
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();

    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let rel = match rel.trim_start_matches("./") {
        "." => "",
        rel => rel,
    };
    let source = SourceFile::parse(rel, &basename, &content)?;

    println!("{}", serde_json::to_string_pretty(&source)?);
    Ok(())
}
