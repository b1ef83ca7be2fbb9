//! Resource pipeline collaborator.
//!
//! The coordinator never tells the pipeline which paths changed: one run
//! covers the whole configured scope and the pipeline decides what is stale.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;

use crate::utils::exec::Cmd;
use crate::vfs::{MergedVfs, ResourceResolver};

/// What the pipeline builds.
#[derive(Debug, Clone, Default)]
pub struct PipelineTask {
    /// Comma-separated processor chain (e.g. `closure,lessjs`).
    pub processors: String,
    /// Input descriptors.
    pub inputs: Vec<String>,
    /// Logical paths the pipeline produces.
    pub process: Vec<String>,
    /// Directory the pipeline writes to.
    pub output: PathBuf,
}

/// Arguments of one pipeline execution.
pub struct PipelineRun<'a> {
    pub version: &'a str,
    /// Sequence number of this run, starting at 1.
    pub run: u64,
    pub vfs: &'a MergedVfs,
    pub resolver: &'a dyn ResourceResolver,
    pub task: &'a PipelineTask,
}

pub trait ResourcePipeline: Send + Sync {
    /// Perform one full build pass.
    fn execute(&self, run: &PipelineRun<'_>) -> Result<()>;
}

/// Pipeline used when no command is configured. Every run succeeds.
pub struct NullPipeline;

impl ResourcePipeline for NullPipeline {
    fn execute(&self, run: &PipelineRun<'_>) -> Result<()> {
        crate::debug!("pipeline"; "run #{}: no command configured", run.run);
        Ok(())
    }
}

/// Runs an external build command.
///
/// `$DEVROOT_*` variables are substituted in the arguments and exported to
/// the process environment.
pub struct CommandPipeline {
    command: Vec<String>,
    cwd: PathBuf,
    quiet: bool,
}

impl CommandPipeline {
    pub fn new(command: Vec<String>, cwd: PathBuf, quiet: bool) -> Self {
        Self {
            command,
            cwd,
            quiet,
        }
    }

    fn display_name(&self) -> &str {
        self.command.first().map_or("pipeline", String::as_str)
    }
}

impl ResourcePipeline for CommandPipeline {
    fn execute(&self, run: &PipelineRun<'_>) -> Result<()> {
        let vars = build_vars(run);
        let resolved = resolve_args(&self.command, &vars);

        std::fs::create_dir_all(&run.task.output).with_context(|| {
            format!(
                "failed to create pipeline output `{}`",
                run.task.output.display()
            )
        })?;

        if !self.quiet {
            crate::log!("pipeline"; "`{}` running (#{})", self.display_name(), run.run);
        }

        Cmd::from_slice(&resolved)
            .cwd(&self.cwd)
            .envs(&vars)
            .pty(!self.quiet)
            .quiet(self.quiet)
            .run()
            .with_context(|| format!("pipeline `{}` failed", self.display_name()))?;

        let missing = missing_outputs(run);
        if !missing.is_empty() {
            crate::log!("pipeline"; "not produced: {}", missing.join(", "));
        }
        Ok(())
    }
}

/// Declared outputs that do not resolve after a run.
fn missing_outputs<'a>(run: &PipelineRun<'a>) -> Vec<&'a str> {
    run.task
        .process
        .iter()
        .map(String::as_str)
        .filter(|path| !matches!(run.resolver.resolve(path), Ok(Some(_))))
        .collect()
}

/// Build `$DEVROOT_*` variables for one run.
pub fn build_vars(run: &PipelineRun<'_>) -> FxHashMap<String, String> {
    let task = run.task;
    let roots: Vec<String> = run
        .vfs
        .snapshot()
        .roots()
        .map(|(_, path)| path.display().to_string())
        .collect();

    let mut vars = FxHashMap::default();
    vars.insert("DEVROOT_VERSION".into(), run.version.to_string());
    vars.insert("DEVROOT_RUN".into(), run.run.to_string());
    vars.insert("DEVROOT_OUTPUT".into(), task.output.display().to_string());
    vars.insert("DEVROOT_PROCESSORS".into(), task.processors.clone());
    vars.insert("DEVROOT_IN".into(), task.inputs.join(","));
    vars.insert("DEVROOT_PROCESS".into(), task.process.join(","));
    vars.insert(
        "DEVROOT_ROOTS".into(),
        std::env::join_paths(&roots)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| roots.join(",")),
    );
    vars
}

/// Resolve `$DEVROOT_*` variables in command arguments.
///
/// Longer names are replaced first so `$DEVROOT_PROCESSORS` is never split
/// by `$DEVROOT_PROCESS`.
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    let mut keys: Vec<&String> = vars.keys().collect();
    keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for key in &keys {
                result = result.replace(&format!("${key}"), &vars[*key]);
            }
            result
        })
        .collect()
}
