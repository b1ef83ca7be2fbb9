//! devroot - development server for web-asset pipelines.
//!
//! Serves several document roots as one tree, rebuilds templates and
//! pipeline resources when files change, and tells connected browsers to
//! reload.

mod cli;
mod config;
mod core;
mod embed;
mod logger;
mod rebuild;
mod reload;
mod utils;
mod vfs;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::DevConfig;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let config = DevConfig::load(&cli)?;

    match &cli.command {
        Commands::Serve { .. } => cli::serve::serve(&config),
        Commands::Build { .. } => cli::build::build(&config),
    }
}
