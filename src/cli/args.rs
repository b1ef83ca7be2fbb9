//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::config::BackendKind;

/// Development server for web-asset pipelines
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: devroot.toml, searched upward)
    #[arg(short = 'C', long, global = true, default_value = "devroot.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the merged document roots, rebuilding and reloading on change
    #[command(visible_alias = "s")]
    Serve {
        #[command(flatten)]
        args: ServeArgs,
    },

    /// Run templates and the resource pipeline once, then exit
    #[command(visible_alias = "b")]
    Build {
        /// Enable verbose output for debugging
        #[arg(short = 'V', long)]
        verbose: bool,
    },
}

/// Serve command arguments.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Document root mounted at `/` (repeatable, first wins).
    /// Replaces the `[[mounts]]` tables of the config file.
    #[arg(short, long = "root", value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub roots: Vec<PathBuf>,

    /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
    #[arg(short, long)]
    pub interface: Option<IpAddr>,

    /// Port number to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Disable live reload
    #[arg(long)]
    pub no_reload: bool,

    /// Change notification backend
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        match &self.command {
            Commands::Serve { args } => args.verbose,
            Commands::Build { verbose } => *verbose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from([
            "devroot", "serve", "--root", "web", "-r", "gen", "--port", "8080", "--no-reload",
            "--backend", "poll",
        ])
        .unwrap();

        let Commands::Serve { args } = cli.command else {
            unreachable!()
        };
        assert_eq!(args.roots, [PathBuf::from("web"), PathBuf::from("gen")]);
        assert_eq!(args.port, Some(8080));
        assert!(args.no_reload);
        assert_eq!(args.backend, Some(BackendKind::Poll));
    }

    #[test]
    fn test_parse_build_with_global_config() {
        let cli = Cli::try_parse_from(["devroot", "build", "-V", "-C", "site/devroot.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Build { .. }));
        assert!(cli.is_verbose());
        assert_eq!(cli.config, PathBuf::from("site/devroot.toml"));
    }

    #[test]
    fn test_default_config_name() {
        let cli = Cli::try_parse_from(["devroot", "s"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("devroot.toml"));
        assert!(!cli.is_verbose());
    }
}
