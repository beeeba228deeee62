//! confbind - inspect and generate schema-bound configuration files
//!
//! Works against the bundled `SimulationConfig` sample schema. Every leaf
//! field of the schema is also accepted as an option of `show`.

use anyhow::Context;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use confbind::{
    cli,
    demo::SimulationConfig,
    logging::{init_logging, LogConfig, LogLevel},
    ConfigSession, Result, RootNamePolicy, SchemaRegistry,
};
use std::path::PathBuf;
use tracing::{debug, error, info};

/// confbind command-line interface
#[derive(Parser)]
#[command(name = "confbind")]
#[command(about = "Inspect and generate schema-bound configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ConfbindCli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a config, apply command-line overrides and print the result
    Show {
        /// Config file to load before applying overrides
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Root name expected in the file (default: main)
        #[arg(long)]
        root: Option<String>,

        /// Accept whatever root name the file uses
        #[arg(long)]
        from_file_root: bool,

        /// Ignore keys that are not part of the schema
        #[arg(long)]
        lenient: bool,
    },

    /// Write a config file holding the default values
    Init {
        /// Destination (default: SimulationConfig.toml)
        file: Option<PathBuf>,

        /// Root name to write under
        #[arg(long)]
        root: Option<String>,
    },

    /// Export the JSON schema into a directory
    Schema {
        /// Output directory, created if missing
        dir: PathBuf,
    },

    /// List the generated command-line options
    Fields,
}

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let template = ConfigSession::<SimulationConfig>::new();
    let matches = ConfbindCli::command()
        .mut_subcommand("show", |show| cli::register_as_cli(&template, show))
        .get_matches();
    let args = ConfbindCli::from_arg_matches(&matches)?;

    let mut log_config = LogConfig::from_env();
    if args.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    match args.command {
        Commands::Show {
            config,
            root,
            from_file_root,
            lenient,
        } => {
            let mut session = template;
            if let Some(root) = root {
                session.set_root_name(root);
            }
            if from_file_root {
                session.set_policy(RootNamePolicy::FromFile);
            }
            session.set_strict(!lenient);

            if let Some(path) = &config {
                session
                    .load(path)
                    .with_context(|| format!("Failed to load {}", path.display()))?;
            }

            if let Some(show_matches) = matches.subcommand_matches("show") {
                let applied = cli::apply_matches(&mut session, show_matches)?;
                debug!(applied, state = %session.state(), "Applied command-line overrides");
            }

            print!("{session}");
        }
        Commands::Init { file, root } => {
            let mut session = template;
            if let Some(root) = root {
                session.set_root_name(root);
            }

            let path = match file {
                Some(path) => {
                    session.save(&path)?;
                    path
                }
                None => session.save_to_default()?,
            };
            println!("Wrote {}", path.display());
        }
        Commands::Schema { dir } => {
            let registry = SchemaRegistry::new();
            registry.register::<SimulationConfig>();
            info!(schemas = registry.len(), "Exporting schemas");

            for path in registry.write_all(&dir)? {
                println!("Wrote {}", path.display());
            }
        }
        Commands::Fields => {
            for option in cli::flatten(template.schema(), "") {
                println!("{:<32} {}", option.flag(), option.kind.describe());
            }
        }
    }

    Ok(())
}
