//! `[pipeline]` section configuration.
//!
//! The pipeline is an external command (bundler, minifier, preprocessor
//! chain) run whenever a change is not satisfied by template recompilation.
//!
//! ```toml
//! [pipeline]
//! command = ["npx", "smaller", "--out", "$DEVROOT_OUTPUT"]
//! processors = "closure,lessjs"
//! in = ["main.json"]
//! process = ["/app.js", "/style.css"]
//! output = "target/devroot"
//! quiet = true
//! ```
//!
//! `$DEVROOT_*` variables in `command` are substituted before the command
//! runs and exported to its environment.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::rebuild::PipelineTask;
use crate::utils::path::resolve_config_path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Program and arguments. Empty disables the pipeline.
    pub command: Vec<String>,

    /// Processor chain passed as `$DEVROOT_PROCESSORS`.
    pub processors: String,

    /// Input descriptors passed as `$DEVROOT_IN`.
    #[serde(rename = "in")]
    pub inputs: Vec<String>,

    /// Logical paths produced, passed as `$DEVROOT_PROCESS`.
    pub process: Vec<String>,

    /// Output directory. Mounted in front of every other root of `/`.
    pub output: PathBuf,

    /// Capture command output instead of streaming it.
    pub quiet: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            processors: String::new(),
            inputs: Vec::new(),
            process: Vec::new(),
            output: PathBuf::from("target/devroot"),
            quiet: false,
        }
    }
}

impl PipelineConfig {
    pub const COMMAND: FieldPath = FieldPath::new("pipeline.command");

    pub fn is_enabled(&self) -> bool {
        !self.command.is_empty()
    }

    pub fn normalize(&mut self, base: &Path) {
        self.output = resolve_config_path(&self.output, base);
    }

    /// Task handed to the pipeline on every run.
    pub fn task(&self) -> PipelineTask {
        PipelineTask {
            processors: self.processors.clone(),
            inputs: self.inputs.clone(),
            process: self.process.clone(),
            output: self.output.clone(),
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let Some(program) = self.command.first() else {
            return;
        };
        if program.is_empty() {
            diag.error(Self::COMMAND, "program name is empty");
            return;
        }
        // Programs given as a path are resolved by the OS at run time
        if !program.contains(['/', '\\']) && which::which(program).is_err() {
            diag.warn(
                Self::COMMAND,
                format!("`{program}` not found on PATH, pipeline runs will fail"),
            );
        }
    }
}
