use anyhow::{Context, Result};
use tracing::debug;

use crate::display::print_update_report;
use crate::walk::{UpdateOptions, update_workspace};

pub fn update_command(options: &UpdateOptions, json: bool) -> Result<()> {
    debug!("Updating workspace at {}", options.root.display());

    let report = update_workspace(options)?;

    if json {
        let output =
            serde_json::to_string_pretty(&report).context("Failed to serialize update report")?;
        println!("{}", output);
    } else {
        print_update_report(&report);
    }
    Ok(())
}
