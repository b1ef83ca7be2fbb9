//! Construction shared by the `serve` and `build` commands.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{DevConfig, EngineKind};
use crate::rebuild::{
    CommandPipeline, NullPipeline, NullTemplates, RebuildCoordinator, ResourcePipeline,
    StaticTemplates, TemplateEngine,
};
use crate::reload::ReloadBroadcaster;
use crate::vfs::MergedVfs;

/// Mount every configured prefix, pipeline output first under `/`.
pub fn mount_vfs(config: &DevConfig) -> Result<Arc<MergedVfs>> {
    let vfs = MergedVfs::new();
    for mount in config.effective_mounts() {
        vfs.mount(&mount.prefix, mount.roots.clone())
            .with_context(|| format!("failed to mount `{}`", mount.prefix))?;
        crate::debug!("vfs"; "{} -> {:?}", mount.prefix, mount.roots);
    }
    Ok(Arc::new(vfs))
}

pub fn template_engine(config: &DevConfig, vfs: &Arc<MergedVfs>) -> Arc<dyn TemplateEngine> {
    match config.template.engine {
        EngineKind::None => Arc::new(NullTemplates),
        EngineKind::Static => {
            let resolver: Arc<MergedVfs> = Arc::clone(vfs);
            Arc::new(StaticTemplates::new(resolver, &config.template.extensions))
        }
    }
}

pub fn resource_pipeline(config: &DevConfig) -> Box<dyn ResourcePipeline> {
    let pipeline = &config.pipeline;
    if !pipeline.is_enabled() {
        return Box::new(NullPipeline);
    }
    Box::new(CommandPipeline::new(
        pipeline.command.clone(),
        config.get_root().to_path_buf(),
        pipeline.quiet,
    ))
}

/// Everything a rebuild needs, wired from the config.
pub struct BuildParts {
    pub vfs: Arc<MergedVfs>,
    pub templates: Arc<dyn TemplateEngine>,
    pub broadcaster: Arc<ReloadBroadcaster>,
    pub coordinator: Arc<RebuildCoordinator>,
}

impl BuildParts {
    pub fn new(config: &DevConfig) -> Result<Self> {
        Ok(Self::with_vfs(config, mount_vfs(config)?))
    }

    /// Wire the collaborators around an existing filesystem.
    pub fn with_vfs(config: &DevConfig, vfs: Arc<MergedVfs>) -> Self {
        let templates = template_engine(config, &vfs);
        let broadcaster = Arc::new(ReloadBroadcaster::new());
        let coordinator = Arc::new(RebuildCoordinator::new(
            Arc::clone(&vfs),
            Arc::clone(&templates),
            resource_pipeline(config),
            config.pipeline.task(),
            Arc::clone(&broadcaster),
        ));

        Self {
            vfs,
            templates,
            broadcaster,
            coordinator,
        }
    }
}
