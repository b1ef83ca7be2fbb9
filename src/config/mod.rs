//! Server configuration management for `devroot.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── serve      # [serve]
//! │   ├── mount      # [[mounts]]
//! │   ├── watch      # [watch]
//! │   ├── template   # [template]
//! │   └── pipeline   # [pipeline]
//! ├── types/         # ConfigError, diagnostics, field paths
//! ├── util.rs        # config file discovery
//! └── mod.rs         # DevConfig (this file)
//! ```
//!
//! Loading order: file (searched upward from the working directory), path
//! resolution against the file's directory, CLI overrides, validation.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{
    BackendKind, EngineKind, MountConfig, PipelineConfig, ServeConfig, TemplateConfig, WatchConfig,
};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::{Cli, Commands, ServeArgs};
use crate::log;
use crate::utils::path::{normalize_path, resolve_config_path};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing devroot.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DevConfig {
    /// Absolute path to the config file, empty when running without one
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    /// Logical prefixes and their document roots
    #[serde(default)]
    pub mounts: Vec<MountConfig>,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub template: TemplateConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl DevConfig {
    /// Load configuration from CLI arguments.
    ///
    /// `serve --root DIR` works without a config file; every other
    /// invocation requires one.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let mut config = match find_config_file(&cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                config.root = path
                    .parent()
                    .map(normalize_path)
                    .unwrap_or_else(|| cwd.clone());
                config.config_path = normalize_path(&path);
                config
            }
            None if has_cli_roots(cli) => Self {
                root: cwd.clone(),
                ..Self::default()
            },
            None => return Err(ConfigError::NotFound(cli.config.clone()).into()),
        };

        config.normalize_paths();
        config.apply_command_options(cli, &cwd);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Directory of the config file (or the working directory).
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Mounts with the pipeline output in front of every other root of `/`.
    ///
    /// The output directory is created on the first pipeline run, so it is
    /// only listed when a pipeline is configured.
    pub fn effective_mounts(&self) -> Vec<MountConfig> {
        let mut mounts = self.mounts.clone();
        if !self.pipeline.is_enabled() {
            return mounts;
        }

        let output = self.pipeline.output.clone();
        match mounts.iter_mut().find(|m| m.prefix == "/") {
            Some(root) => {
                root.roots.retain(|r| r != &output);
                root.roots.insert(0, output);
            }
            None => mounts.push(MountConfig::new("/", vec![output])),
        }
        mounts
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli, cwd: &Path) {
        crate::logger::set_verbose(cli.is_verbose());

        if let Commands::Serve { args } = &cli.command {
            self.apply_serve_args(args, cwd);
        }
    }

    fn apply_serve_args(&mut self, args: &ServeArgs, cwd: &Path) {
        if !args.roots.is_empty() {
            let roots = args
                .roots
                .iter()
                .map(|root| resolve_config_path(root, cwd))
                .collect();
            self.mounts = vec![MountConfig::new("/", roots)];
        }

        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        Self::update_option(&mut self.watch.backend, args.backend.as_ref());
        if args.no_reload {
            self.serve.live_reload = false;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve all configured paths against the config directory.
    fn normalize_paths(&mut self) {
        let root = self.root.clone();
        for mount in &mut self.mounts {
            mount.normalize(&root);
        }
        self.pipeline.normalize(&root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the final configuration.
    ///
    /// Collects all validation errors and returns them at once; warnings
    /// are printed and do not fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        MountConfig::validate_all(&self.mounts, &mut diag);
        self.watch.validate(&mut diag);
        self.template.validate(&mut diag);
        self.pipeline.validate(&mut diag);

        diag.print_warnings();
        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

fn has_cli_roots(cli: &Cli) -> bool {
    matches!(&cli.command, Commands::Serve { args } if !args.roots.is_empty())
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> DevConfig {
    let (parsed, ignored) = DevConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
