//! Server lifecycle management.
//!
//! Startup: mount and watch every root, first full rebuild, reload
//! endpoint, watch loop. Shutdown runs the same steps backwards.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tiny_http::Server;

use super::handler::Handler;
use crate::cli::common::BuildParts;
use crate::config::DevConfig;
use crate::log;
use crate::rebuild::{RebuildCoordinator, report};
use crate::reload::ReloadServer;
use crate::utils::path::normalize_path;
use crate::vfs::MergedVfs;
use crate::watch::{RootSet, WatchLoop, WatchProvider, WatchRegistry, WatchedRoot};

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Upper bound on waiting for the watch thread (an in-flight rebuild
/// finishes first).
const WATCH_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything serve mode owns, torn down by [`shutdown`].
pub struct ServeContext {
    parts: BuildParts,
    provider: Arc<WatchProvider>,
    registry: WatchRegistry,
    /// Roots the watch loop maps events against.
    roots: RootSet,
    reload: Option<ReloadServer>,
    watch_thread: Option<JoinHandle<()>>,
}

impl ServeContext {
    /// Request handler bound to this context.
    pub fn handler(&self) -> Handler {
        Handler::new(
            Arc::clone(&self.parts.vfs),
            Arc::clone(&self.parts.templates),
            self.reload.as_ref().map(ReloadServer::port),
        )
    }

    pub fn watched_dirs(&self) -> usize {
        self.registry.len()
    }

    /// Mount `physical` under `prefix` and watch it.
    ///
    /// Works before and after the watch loop is running: a running loop
    /// sees the new root on its next event.
    pub fn mount_root(&mut self, prefix: &str, priority: u32, physical: &Path) -> Result<()> {
        let physical = normalize_path(physical);
        self.parts
            .vfs
            .add_root(prefix, priority, physical.clone())
            .with_context(|| format!("failed to mount `{prefix}`"))?;
        let prefix = crate::vfs::path::normalize(prefix)?;

        let added = self
            .registry
            .ensure_watched(&physical)
            .with_context(|| format!("cannot watch `{}`", physical.display()))?;
        if added {
            crate::debug!("watch"; "registered {}", physical.display());
        }

        crate::debug!("vfs"; "{} -> {} (priority {})", prefix, physical.display(), priority);
        self.roots.add(WatchedRoot {
            physical,
            mount: prefix,
        });
        Ok(())
    }
}

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Build the serve context and start the background threads.
///
/// Every root is watched before the first rebuild, so edits made while it
/// runs are picked up by the loop once it starts.
pub fn start(config: &DevConfig) -> Result<ServeContext> {
    let parts = BuildParts::with_vfs(config, Arc::new(MergedVfs::new()));
    let provider = Arc::new(
        WatchProvider::new(config.watch.backend, config.watch.poll_interval())
            .context("failed to start the file watcher")?,
    );
    let mut ctx = ServeContext {
        parts,
        registry: WatchRegistry::new(Arc::clone(&provider)),
        provider,
        roots: RootSet::default(),
        reload: None,
        watch_thread: None,
    };

    mount_all(&mut ctx, config)?;
    log!(
        "watch";
        "{} root(s) in {} director{} via {}",
        ctx.roots.len(),
        ctx.registry.len(),
        if ctx.registry.len() == 1 { "y" } else { "ies" },
        ctx.provider.backend_name()
    );
    for dir in ctx.registry.watched() {
        crate::debug!("watch"; "{}", dir.display());
    }

    // First full build so the pipeline output exists before any request
    let started = Instant::now();
    report(&ctx.parts.coordinator.rebuild(None), started);

    if config.serve.live_reload {
        let server = ReloadServer::start(
            config.serve.interface,
            config.serve.reload_port,
            Arc::clone(&ctx.parts.broadcaster),
        )?;
        crate::debug!("reload"; "ws://{}:{}", config.serve.interface, server.port());
        ctx.reload = Some(server);
    }

    ctx.watch_thread = Some(spawn_watch_loop(
        config,
        Arc::clone(&ctx.provider),
        ctx.roots.clone(),
        Arc::clone(&ctx.parts.coordinator),
    )?);
    Ok(ctx)
}

/// Mount every configured root. The pipeline output is mounted but never
/// watched.
fn mount_all(ctx: &mut ServeContext, config: &DevConfig) -> Result<()> {
    let output = normalize_path(&config.pipeline.output);
    for mount in config.effective_mounts() {
        for (index, root) in mount.roots.iter().enumerate() {
            let priority = u32::try_from(index).unwrap_or(u32::MAX);
            let root = normalize_path(root);
            if root == output {
                ctx.parts
                    .vfs
                    .add_root(&mount.prefix, priority, root)
                    .with_context(|| format!("failed to mount `{}`", mount.prefix))?;
            } else {
                ctx.mount_root(&mount.prefix, priority, &root)?;
            }
        }
    }
    Ok(())
}

fn spawn_watch_loop(
    config: &DevConfig,
    provider: Arc<WatchProvider>,
    roots: RootSet,
    coordinator: Arc<RebuildCoordinator>,
) -> Result<JoinHandle<()>> {
    let excluded = vec![normalize_path(&config.pipeline.output)];
    let watch_loop = WatchLoop::new(
        provider,
        roots,
        excluded,
        config.watch.debounce(),
        config.watch.max_wait(),
        move |changes| {
            let started = Instant::now();
            let outcome = coordinator.rebuild(Some(changes));
            report(&outcome, started);
        },
    );
    watch_loop
        .spawn()
        .context("failed to spawn the watch thread")
}

/// Stop watching, let the last rebuild finish, then drop every client.
pub fn shutdown(mut ctx: ServeContext) {
    ctx.provider.close();
    if let Some(handle) = ctx.watch_thread.take() {
        wait_for_thread(handle, WATCH_JOIN_TIMEOUT);
    }

    ctx.parts.broadcaster.close_all();
    if let Some(reload) = ctx.reload.take() {
        reload.stop();
    }
    crate::debug!("serve"; "{} pipeline run(s) this session", ctx.parts.coordinator.pipeline_runs());
}

/// Join `handle`, giving up after `timeout`.
fn wait_for_thread(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
    log!("serve"; "watch thread still busy, not waiting any longer");
}

#[cfg(test)]
mod tests {
    use super::super::handler::Reply;
    use super::*;
    use crate::config::{BackendKind, MountConfig};
    use crate::reload::{ReloadChannel, ReloadMessage};
    use std::fs;
    use std::path::PathBuf;

    fn config(temp: &tempfile::TempDir) -> DevConfig {
        let web = temp.path().join("web");
        fs::create_dir_all(&web).unwrap();
        fs::write(web.join("index.html"), "<body>{{title}}</body>").unwrap();

        let mut config = DevConfig {
            root: temp.path().to_path_buf(),
            mounts: vec![MountConfig::new("/", vec![normalize_path(&web)])],
            ..Default::default()
        };
        config.serve.live_reload = false;
        config.watch.backend = BackendKind::Poll;
        config.watch.poll_interval_ms = 50;
        config.watch.debounce_ms = 50;
        config.watch.max_wait_ms = 500;
        config.pipeline.output = temp.path().join("out");
        config
    }

    #[test]
    fn test_output_is_mounted_but_not_watched() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = config(&temp);
        let out = normalize_path(&temp.path().join("out"));
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("built.js"), "built").unwrap();
        config.mounts[0].roots.push(out);

        let ctx = start(&config).unwrap();
        assert_eq!(ctx.watched_dirs(), 1);
        assert_eq!(ctx.roots.len(), 1);
        assert_eq!(ctx.parts.vfs.snapshot().roots().count(), 2);
        assert_eq!(ctx.parts.vfs.read("/built.js").unwrap(), b"built");

        shutdown(ctx);
    }

    #[test]
    fn test_start_rejects_unwatchable_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = config(&temp);
        config.mounts[0].roots.push(PathBuf::from("/nonexistent/devroot-root"));

        let err = start(&config).err().unwrap();
        assert!(format!("{err:#}").contains("cannot watch"));
    }

    #[test]
    fn test_change_triggers_rebuild_and_reload() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = config(&temp);
        let ctx = start(&config).unwrap();
        assert_eq!(ctx.watched_dirs(), 1);

        let (channel, client) = ReloadChannel::new(16);
        ctx.parts.broadcaster.register(channel);

        // Let the poll watcher take its first snapshot
        thread::sleep(Duration::from_millis(200));
        fs::write(temp.path().join("web/app.css"), "body{}").unwrap();

        let msg = client.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(msg, ReloadMessage::Reload);
        assert!(ctx.parts.coordinator.pipeline_runs() >= 2);

        let handler = ctx.handler();
        assert!(matches!(handler.reply("/app.css"), Reply::Resource { .. }));

        shutdown(ctx);
    }

    #[cfg(unix)]
    #[test]
    fn test_edit_during_startup_build_is_not_lost() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = config(&temp);
        config.pipeline.quiet = true;
        config.pipeline.command = vec![
            "sh".into(),
            "-c".into(),
            "sleep 0.3; [ -e web/late.css ] || echo edited > web/late.css".into(),
        ];

        let ctx = start(&config).unwrap();
        let (channel, client) = ReloadChannel::new(16);
        ctx.parts.broadcaster.register(channel);

        let msg = client.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(msg, ReloadMessage::Reload);
        assert!(ctx.parts.coordinator.pipeline_runs() >= 2);
        assert!(matches!(ctx.handler().reply("/late.css"), Reply::Resource { .. }));

        shutdown(ctx);
    }

    #[test]
    fn test_root_mounted_while_serving_is_watched() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = config(&temp);
        let extra = temp.path().join("extra");
        fs::create_dir_all(&extra).unwrap();

        let mut ctx = start(&config).unwrap();
        ctx.mount_root("/extra", 0, &extra).unwrap();
        assert_eq!(ctx.watched_dirs(), 2);

        let (channel, client) = ReloadChannel::new(16);
        ctx.parts.broadcaster.register(channel);

        thread::sleep(Duration::from_millis(200));
        fs::write(extra.join("x.css"), "a{}").unwrap();

        let msg = client.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(msg, ReloadMessage::Reload);
        assert!(matches!(ctx.handler().reply("/extra/x.css"), Reply::Resource { .. }));

        shutdown(ctx);
    }

    #[test]
    fn test_bind_with_retry() {
        let interface = IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        let (_server, addr) = bind_with_retry(interface, 0).unwrap();
        assert_ne!(addr.port(), 0);
    }
}
