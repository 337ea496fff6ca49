pub mod formatter;

pub use formatter::{format_diagnostic, print_plugins, print_update_report};
