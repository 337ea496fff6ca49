use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{parse_command, plugins_command, render_rule_command, update_command};
use crate::walk::UpdateOptions;

#[derive(Parser, Debug)]
#[command(name = "protogen")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    RUST_LOG=protogen_core=debug    Enable debug logging")]
pub struct Cli {
    /// Log progress at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and update proto rules in every BUILD file under ROOT
    #[command(visible_alias = "u")]
    Update {
        /// Workspace root (defaults to the current directory)
        root: Option<PathBuf>,

        /// Settings file (defaults to ROOT/protogen.toml)
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Report changes without writing any file
        #[arg(short, long)]
        dry_run: bool,

        /// Skip unparseable proto files instead of aborting
        #[arg(long)]
        lenient: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse one proto file and print what was found
    Parse {
        /// Path to the .proto file
        file: PathBuf,
    },
    /// List the registered plugins
    Plugins {
        /// Settings file (defaults to ./protogen.toml)
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Render a rule schema into its .bzl rule and example workspace
    RenderRule {
        /// Schema file (.toml or .json)
        schema: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Settings file used to validate the schema's plugins
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
}

impl Commands {
    /// Execute the command
    pub fn execute(self) -> Result<()> {
        match self {
            Commands::Update {
                root,
                settings,
                dry_run,
                lenient,
                json,
            } => {
                let options = UpdateOptions {
                    root: root.unwrap_or_else(|| PathBuf::from(".")),
                    settings,
                    dry_run,
                    lenient,
                };
                update_command(&options, json)
            }
            Commands::Parse { file } => parse_command(&file),
            Commands::Plugins { settings } => plugins_command(settings.as_deref()),
            Commands::RenderRule {
                schema,
                out,
                settings,
            } => render_rule_command(&schema, &out, settings.as_deref()),
        }
    }
}
