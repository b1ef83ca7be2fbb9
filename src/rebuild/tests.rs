use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::*;
use crate::reload::{ReloadChannel, ReloadMessage};

/// Treats `*.tpl` as templates; paths listed in `broken` fail to compile.
struct FakeTemplates {
    broken: Vec<&'static str>,
    compiled: Mutex<Vec<String>>,
}

impl FakeTemplates {
    fn new(broken: Vec<&'static str>) -> Self {
        Self {
            broken,
            compiled: Mutex::new(Vec::new()),
        }
    }
}

impl TemplateEngine for FakeTemplates {
    fn compile(&self, path: &str) -> Result<bool, TemplateError> {
        if !self.accepts(path) {
            return Ok(false);
        }
        self.compiled.lock().push(path.to_string());
        if self.broken.contains(&path) {
            return Err(TemplateError::Encoding(path.to_string()));
        }
        Ok(true)
    }

    fn accepts(&self, path: &str) -> bool {
        path.ends_with(".tpl")
    }

    fn render(&self, path: &str, _data: &serde_json::Value) -> Result<String, TemplateError> {
        Ok(path.to_string())
    }
}

struct CountingPipeline {
    runs: Arc<AtomicUsize>,
    fail: bool,
}

impl ResourcePipeline for CountingPipeline {
    fn execute(&self, run: &PipelineRun<'_>) -> anyhow::Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        assert_eq!(run.task.processors, "closure");
        if self.fail {
            anyhow::bail!("less: syntax error");
        }
        Ok(())
    }
}

struct Harness {
    coordinator: RebuildCoordinator,
    templates: Arc<FakeTemplates>,
    runs: Arc<AtomicUsize>,
    client: crossbeam::channel::Receiver<ReloadMessage>,
}

fn harness(broken: Vec<&'static str>, fail_pipeline: bool) -> Harness {
    let templates = Arc::new(FakeTemplates::new(broken));
    let runs = Arc::new(AtomicUsize::new(0));
    let broadcaster = Arc::new(ReloadBroadcaster::new());
    let (channel, client) = ReloadChannel::new(16);
    broadcaster.register(channel);

    let coordinator = RebuildCoordinator::new(
        Arc::new(MergedVfs::new()),
        Arc::clone(&templates) as Arc<dyn TemplateEngine>,
        Box::new(CountingPipeline {
            runs: Arc::clone(&runs),
            fail: fail_pipeline,
        }),
        PipelineTask {
            processors: "closure".into(),
            ..Default::default()
        },
        broadcaster,
    );

    Harness {
        coordinator,
        templates,
        runs,
        client,
    }
}

fn changes(paths: &[&str]) -> ChangeSet {
    paths.iter().map(|p| p.to_string()).collect()
}

fn broadcasts(client: &crossbeam::channel::Receiver<ReloadMessage>) -> usize {
    client.try_iter().filter(|m| *m == ReloadMessage::Reload).count()
}

#[test]
fn test_full_rebuild_runs_pipeline_once() {
    let h = harness(vec![], false);

    let outcome = h.coordinator.rebuild(None);

    assert!(outcome.pipeline_ran);
    assert!(outcome.recompiled.is_empty());
    assert_eq!(h.runs.load(Ordering::SeqCst), 1);
    assert_eq!(broadcasts(&h.client), 1);
    assert!(h.templates.compiled.lock().is_empty());
}

#[test]
fn test_template_only_skips_pipeline() {
    let h = harness(vec![], false);

    let outcome = h.coordinator.rebuild(Some(changes(&["/a.tpl"])));

    assert_eq!(outcome.recompiled, ["/a.tpl"]);
    assert!(!outcome.pipeline_ran);
    assert_eq!(h.runs.load(Ordering::SeqCst), 0);
    assert_eq!(broadcasts(&h.client), 1);
    assert_eq!(outcome.delivered, 1);
}

#[test]
fn test_remaining_path_triggers_one_pipeline_run() {
    let h = harness(vec![], false);

    let outcome = h.coordinator.rebuild(Some(changes(&["/a.tpl", "/b.css"])));

    assert_eq!(outcome.recompiled, ["/a.tpl"]);
    assert!(outcome.pipeline_ran);
    assert_eq!(h.runs.load(Ordering::SeqCst), 1);
    assert_eq!(broadcasts(&h.client), 1);
}

#[test]
fn test_failed_template_falls_back_to_pipeline() {
    let h = harness(vec!["/a.tpl"], false);

    let outcome = h
        .coordinator
        .rebuild(Some(changes(&["/a.tpl", "/b.tpl"])));

    assert_eq!(outcome.recompiled, ["/b.tpl"]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, "/a.tpl");
    assert!(outcome.pipeline_ran);
    assert_eq!(h.runs.load(Ordering::SeqCst), 1);
    assert_eq!(broadcasts(&h.client), 1);
    assert!(!outcome.is_success());
}

#[test]
fn test_compiles_in_insertion_order() {
    let h = harness(vec![], false);

    h.coordinator
        .rebuild(Some(changes(&["/z.tpl", "/x.css", "/a.tpl"])));

    assert_eq!(*h.templates.compiled.lock(), ["/z.tpl", "/a.tpl"]);
}

#[test]
fn test_pipeline_failure_still_broadcasts() {
    let h = harness(vec![], true);

    let outcome = h.coordinator.rebuild(Some(changes(&["/b.css"])));

    assert!(outcome.pipeline_ran);
    assert!(
        outcome
            .pipeline_error
            .as_deref()
            .is_some_and(|e| e.contains("syntax error"))
    );
    assert_eq!(broadcasts(&h.client), 1);

    // The next change is still processed
    h.coordinator.rebuild(Some(changes(&["/b.css"])));
    assert_eq!(h.runs.load(Ordering::SeqCst), 2);
    assert_eq!(h.coordinator.pipeline_runs(), 2);
}

#[test]
fn test_empty_change_set_only_broadcasts() {
    let h = harness(vec![], false);

    let outcome = h.coordinator.rebuild(Some(ChangeSet::default()));

    assert!(!outcome.pipeline_ran);
    assert_eq!(broadcasts(&h.client), 1);
}
