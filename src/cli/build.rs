//! `devroot build`: one full rebuild without serving.
//!
//! Runs the same coordinator as `serve` with no change set, so templates
//! are left alone and the pipeline runs exactly once.

use std::time::Instant;

use anyhow::{Result, bail};

use super::common::BuildParts;
use crate::config::DevConfig;
use crate::log;

pub fn build(config: &DevConfig) -> Result<()> {
    let started = Instant::now();
    let parts = BuildParts::new(config)?;

    let outcome = parts.coordinator.rebuild(None);
    if let Some(error) = outcome.pipeline_error {
        bail!(error);
    }

    if config.pipeline.is_enabled() {
        log!(
            "build";
            "pipeline finished in {}ms, output in {}",
            started.elapsed().as_millis(),
            config.pipeline.output.display()
        );
    } else {
        log!("build"; "no pipeline configured, nothing to build");
    }
    Ok(())
}
