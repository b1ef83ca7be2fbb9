//! Rebuild coordinator.
//!
//! ```text
//! rebuild(None)            ───────────────────────────► pipeline ─┐
//! rebuild(Some(changes)) ─► compile templates ─ remaining? ─► pipeline ─┤
//!                                             └─ none ───────────────────┤
//!                                                                        ▼
//!                                                                  broadcast
//! ```
//!
//! Template and pipeline failures are reported, never propagated: one bad
//! file must not stop later changes from being picked up.

pub mod pipeline;
pub mod template;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::reload::ReloadBroadcaster;
use crate::vfs::MergedVfs;
use crate::watch::ChangeSet;

pub use pipeline::{CommandPipeline, NullPipeline, PipelineRun, PipelineTask, ResourcePipeline};
pub use template::{NullTemplates, StaticTemplates, TemplateEngine, TemplateError};

/// Result of one rebuild invocation.
#[derive(Debug, Default)]
pub struct RebuildOutcome {
    /// Paths satisfied by template recompilation, in input order.
    pub recompiled: Vec<String>,
    /// Templates that failed to recompile, with the error chain.
    pub failures: Vec<(String, String)>,
    /// Whether the resource pipeline was executed.
    pub pipeline_ran: bool,
    /// Pipeline error chain, if the run failed.
    pub pipeline_error: Option<String>,
    /// Number of reload channels reached.
    pub delivered: usize,
}

impl RebuildOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.pipeline_error.is_none()
    }
}

pub struct RebuildCoordinator {
    vfs: Arc<MergedVfs>,
    templates: Arc<dyn TemplateEngine>,
    pipeline: Box<dyn ResourcePipeline>,
    task: PipelineTask,
    broadcaster: Arc<ReloadBroadcaster>,
    runs: AtomicU64,
}

impl RebuildCoordinator {
    pub fn new(
        vfs: Arc<MergedVfs>,
        templates: Arc<dyn TemplateEngine>,
        pipeline: Box<dyn ResourcePipeline>,
        task: PipelineTask,
        broadcaster: Arc<ReloadBroadcaster>,
    ) -> Self {
        Self {
            vfs,
            templates,
            pipeline,
            task,
            broadcaster,
            runs: AtomicU64::new(0),
        }
    }

    /// Rebuild after `changes`; `None` rebuilds everything.
    pub fn rebuild(&self, changes: Option<ChangeSet>) -> RebuildOutcome {
        let mut outcome = RebuildOutcome::default();

        let full = match changes {
            None => true,
            Some(mut remaining) => {
                remaining.retain(|path| match self.templates.compile(path) {
                    Ok(true) => {
                        crate::debug!("rebuild"; "recompiled {}", path);
                        outcome.recompiled.push(path.clone());
                        false
                    }
                    Ok(false) => true,
                    Err(e) => {
                        let error = format!("{:#}", anyhow::Error::new(e));
                        crate::debug!("rebuild"; "template {} failed: {}", path, error);
                        outcome.failures.push((path.clone(), error));
                        true
                    }
                });
                !remaining.is_empty()
            }
        };

        if full {
            outcome.pipeline_ran = true;
            if let Err(e) = self.run_pipeline() {
                outcome.pipeline_error = Some(format!("{e:#}"));
            }
        }

        outcome.delivered = self.broadcaster.broadcast();
        outcome
    }

    fn run_pipeline(&self) -> anyhow::Result<()> {
        let run = self.runs.fetch_add(1, Ordering::Relaxed) + 1;
        self.pipeline.execute(&PipelineRun {
            version: env!("CARGO_PKG_VERSION"),
            run,
            vfs: &self.vfs,
            resolver: self.vfs.as_ref(),
            task: &self.task,
        })
    }

    /// Number of pipeline executions so far.
    pub fn pipeline_runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }
}

/// Print a rebuild outcome on the watch status line.
pub fn report(outcome: &RebuildOutcome, started: Instant) {
    let elapsed = started.elapsed().as_millis();

    for (path, error) in &outcome.failures {
        crate::logger::status_detach();
        crate::log!("rebuild"; "template {} failed: {}", path, error);
    }

    if let Some(error) = &outcome.pipeline_error {
        crate::logger::status_error("pipeline failed", error);
        return;
    }

    let mut parts = Vec::new();
    if !outcome.recompiled.is_empty() {
        parts.push(format!("{} template(s)", outcome.recompiled.len()));
    }
    if outcome.pipeline_ran {
        parts.push("pipeline".to_string());
    }
    if parts.is_empty() {
        parts.push("nothing to rebuild".to_string());
    }

    let message = format!(
        "{} in {}ms, reloaded {} client(s)",
        parts.join(" + "),
        elapsed,
        outcome.delivered
    );
    if outcome.is_success() {
        crate::logger::status_success(&message);
    } else {
        crate::logger::status_warning(&message);
    }
}
