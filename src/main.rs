//! taskgraph command-line tool
//!
//! Tracks tasks in a local SQLite database together with their parent/child
//! tree, blocking dependencies, tags and metadata.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use taskgraph::cli::Cli;
use taskgraph::cli::commands::execute;
use taskgraph::config::Config;
use taskgraph::db::Database;
use taskgraph::format::{OutputFormat, render};
use taskgraph::logging::{self, LogTarget};
use tracing::{debug, info};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config first: it supplies the default log level
    let (mut config, config_path) = Config::discover(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.database.path = PathBuf::from(db_path);
    }

    logging::init(&LogTarget::parse(&cli.log), cli.verbose, &config.logging.level)?;

    match &config_path {
        Some(path) => debug!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }

    config.ensure_db_dir()?;
    let db = Database::open(&config.database.path)?;
    info!("Using database {}", config.database.path.display());

    let format = OutputFormat::from_json_flag(cli.json);
    let result = execute(cli.command, &db);
    db.close()?;

    match result {
        Ok(output) => {
            print!("{}", render(&output, format));
            Ok(())
        }
        Err(e) => {
            match format {
                OutputFormat::Json => eprintln!("{}", e.to_json()),
                OutputFormat::Markdown => eprintln!("Error: {}", e),
            }
            std::process::exit(1);
        }
    }
}
