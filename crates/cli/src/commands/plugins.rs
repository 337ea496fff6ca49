use anyhow::Result;
use std::path::Path;

use super::load_registry;
use crate::display::print_plugins;

pub fn plugins_command(settings: Option<&Path>) -> Result<()> {
    let registry = load_registry(settings)?;
    print_plugins(&registry);
    Ok(())
}
