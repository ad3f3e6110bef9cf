//! Shared helpers for template-rs integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use template_rs::registry::{extension_rule, JinjaTemplates, PlainText};
use template_rs::{CssInliner, Result, TemplateType, TypeRegistry};
use tempfile::TempDir;

/// Route test logs through the test writer (RUST_LOG=debug to see them)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Write `contents` to `relative` under `root`, creating parent directories
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Template tree with a nunjucks/text template, a tera template and a hidden draft
pub fn setup_templates() -> TempDir {
    let dir = tempfile::tempdir().unwrap();

    write(dir.path(), "welcome/html.njk", "<p>Hello {{ hello }}</p>");
    write(dir.path(), "welcome/text.txt", "Hello {{ hello }}!");
    write(dir.path(), "receipt/html.tera", "<p>Total: {{ total }}</p>");
    write(dir.path(), ".drafts/html.njk", "<p>draft {{ hello }}</p>");

    dir
}

/// Inliner recording every call and tagging its output
#[derive(Default, Clone)]
pub struct RecordingInliner {
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingInliner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base paths passed to the inliner, in call order
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CssInliner for RecordingInliner {
    async fn inline(&self, html: String, base: &Path) -> Result<String> {
        self.calls.lock().unwrap().push(base.to_path_buf());
        Ok(format!("[inlined]{}", html))
    }
}

/// Registry counting how many files were compiled
pub fn counting_registry() -> (TypeRegistry, Arc<AtomicUsize>) {
    let compiled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&compiled);

    let registry = TypeRegistry::new()
        .register(
            "counted-jinja",
            extension_rule(&[".njk"]),
            true,
            move |source: &str, path: &Path| {
                counter.fetch_add(1, Ordering::SeqCst);
                JinjaTemplates.compile(source, path)
            },
        )
        .with_type(PlainText);

    (registry, compiled)
}
