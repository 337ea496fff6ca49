pub mod cli;
pub mod commands;
pub mod display;
pub mod walk;

// Re-export commonly used items
pub use cli::{Cli, Commands};
pub use walk::{UpdateOptions, UpdateReport, update_workspace};
