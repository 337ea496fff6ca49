pub mod parse;
pub mod plugins;
pub mod render_rule;
pub mod update;

pub use parse::parse_command;
pub use plugins::plugins_command;
pub use render_rule::render_rule_command;
pub use update::update_command;

use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use protogen_core::config::Settings;
use protogen_core::plugin::PluginRegistry;

/// Registry from an explicit settings file, or from `./protogen.toml`
pub(crate) fn load_registry(settings: Option<&Path>) -> Result<PluginRegistry> {
    let settings = match settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => {
            let cwd = env::current_dir().context("Failed to get current directory")?;
            Settings::discover(&cwd).context("Failed to load settings")?
        }
    };
    PluginRegistry::from_settings(&settings).context("Invalid plugin settings")
}
