//! Operator CLI for the Clouber portal
//!
//! Validates a portal configuration, lists what producers offer and renders
//! pages to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use clouber_portal::PortalConfig;
use std::path::PathBuf;

mod commands;

use commands::{describe, render, validate};

#[derive(Parser)]
#[command(name = "clouber")]
#[command(about = "Clouber - portlet consumer and page aggregation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Portal configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the configuration
    Validate,

    /// Register with producers and list the portlets they offer
    Describe {
        /// Only describe this producer
        #[arg(short, long)]
        producer: Option<String>,
    },

    /// Navigate to a page and print its HTML
    Render {
        /// Page id
        page: String,

        /// Text appended to the page title
        #[arg(short, long)]
        title: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = PortalConfig::load(cli.config.as_deref())?;

    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone())
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let base_dir = cli
        .config
        .as_deref()
        .and_then(|path| path.parent())
        .map(PathBuf::from);

    match cli.command {
        Commands::Validate => validate::run(&config)?,
        Commands::Describe { producer } => {
            describe::run(&config, base_dir.as_deref(), producer.as_deref()).await?;
        }
        Commands::Render { page, title } => {
            render::run(&config, base_dir.as_deref(), &page, title.as_deref()).await?;
        }
    }

    Ok(())
}
