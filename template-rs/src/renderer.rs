//! Template renderer
//!
//! The renderer loads the template tree on first use and keeps the compiled
//! store for the rest of its lifetime. Callers that arrive while the first
//! load is running wait on that same load instead of starting another one.

use crate::config::RendererConfig;
use crate::error::{Result, TemplateError};
use crate::inline::{CssInliner, PassthroughInliner, StylesheetInliner};
use crate::loader;
use crate::registry::TypeRegistry;
use crate::store::{CompiledPart, TemplateStore};
use futures::future::{try_join_all, BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<TemplateStore>>>>;

/// Initialization state of a renderer
enum InitState {
    Uninitialized,
    /// A load is in flight; `attempt` tells concurrent loads apart
    Initializing { attempt: u64, load: LoadFuture },
    Ready(Arc<TemplateStore>),
    /// Terminal when retries are disabled
    Failed(TemplateError),
}

/// Renders the templates found under a template root
///
/// # Example
///
/// ```no_run
/// use template_rs::Renderer;
/// use serde_json::json;
///
/// # async fn example() -> template_rs::Result<()> {
/// let renderer = Renderer::with_preset("./templates", "nunjucks")?;
/// let parts = renderer.render("welcome", &json!({ "name": "Ada" })).await?;
///
/// let html = &parts["html"];
/// let text = &parts["text"];
/// # Ok(())
/// # }
/// ```
pub struct Renderer {
    root: PathBuf,
    registry: Arc<TypeRegistry>,
    inliner: Arc<dyn CssInliner>,
    retry_failed_init: bool,
    state: Mutex<InitState>,
    attempts: AtomicU64,
}

impl Renderer {
    /// Create a renderer for `root` using the given type registry
    ///
    /// Fails with a configuration error when `root` is empty. The directory
    /// itself is only read on first use.
    pub fn new(root: impl Into<PathBuf>, registry: TypeRegistry) -> Result<Self> {
        let root = root.into();
        if root.as_os_str().is_empty() {
            return Err(TemplateError::Config(
                "A template directory is required".to_string(),
            ));
        }

        Ok(Self {
            root,
            registry: Arc::new(registry),
            inliner: Arc::new(StylesheetInliner::new()),
            retry_failed_init: true,
            state: Mutex::new(InitState::Uninitialized),
            attempts: AtomicU64::new(0),
        })
    }

    /// Create a renderer using one of the built-in type presets
    pub fn with_preset(root: impl Into<PathBuf>, preset: &str) -> Result<Self> {
        Self::new(root, TypeRegistry::preset(preset)?)
    }

    /// Create a renderer from configuration
    pub fn from_config(config: &RendererConfig) -> Result<Self> {
        config.validate()?;

        let renderer = Self::with_preset(config.templates.root.clone(), &config.templates.preset)?
            .retry_failed_init(config.templates.retry_failed_init);

        Ok(if config.inlining.enabled {
            renderer.with_inliner(StylesheetInliner::from_config(&config.inlining))
        } else {
            renderer.with_inliner(PassthroughInliner)
        })
    }

    /// Replace the CSS inliner used for HTML parts
    pub fn with_inliner(mut self, inliner: impl CssInliner + 'static) -> Self {
        self.inliner = Arc::new(inliner);
        self
    }

    /// Whether a failed load is retried by the next call
    ///
    /// When disabled, the first load error is returned by every later call.
    pub fn retry_failed_init(mut self, retry: bool) -> Self {
        self.retry_failed_init = retry;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Load the template tree now instead of on first render
    pub async fn init(&self) -> Result<()> {
        self.store().await.map(|_| ())
    }

    /// Whether the template store has been loaded successfully
    pub async fn is_initialized(&self) -> bool {
        matches!(*self.state.lock().await, InitState::Ready(_))
    }

    /// Names of the loaded templates, sorted
    pub async fn template_names(&self) -> Result<Vec<String>> {
        Ok(self.store().await?.names())
    }

    /// Render every part of a template
    ///
    /// Returns the rendered parts keyed by output key. HTML parts are passed
    /// through the CSS inliner. If any part fails, the whole render fails.
    pub async fn render<T>(&self, name: &str, locals: &T) -> Result<HashMap<String, String>>
    where
        T: Serialize + ?Sized,
    {
        let store = self.store().await?;
        let parts = store
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_string()))?;

        let locals =
            serde_json::to_value(locals).map_err(|e| TemplateError::InvalidLocals(e.to_string()))?;

        debug!("Rendering template '{}' ({} parts)", name, parts.len());

        let outputs = try_join_all(parts.iter().map(|part| self.render_part(part, &locals))).await?;

        Ok(outputs.into_iter().collect())
    }

    async fn render_part(&self, part: &CompiledPart, locals: &Value) -> Result<(String, String)> {
        let text = part.render(locals)?;

        let output = if part.requires_inlining() {
            self.inliner.inline(text, part.source_path()).await?
        } else {
            text
        };

        Ok((part.output_key().to_string(), output))
    }

    /// Get the template store, loading it if needed
    async fn store(&self) -> Result<Arc<TemplateStore>> {
        let (attempt, load) = {
            let mut state = self.state.lock().await;
            match &*state {
                InitState::Ready(store) => return Ok(Arc::clone(store)),
                InitState::Failed(err) => return Err(err.clone()),
                InitState::Initializing { attempt, load } => (*attempt, load.clone()),
                InitState::Uninitialized => {
                    let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
                    let load = self.start_load();
                    *state = InitState::Initializing {
                        attempt,
                        load: load.clone(),
                    };
                    (attempt, load)
                }
            }
        };

        let outcome = load.await;

        let mut state = self.state.lock().await;
        if matches!(&*state, InitState::Initializing { attempt: current, .. } if *current == attempt)
        {
            *state = match &outcome {
                Ok(store) => InitState::Ready(Arc::clone(store)),
                Err(_) if self.retry_failed_init => InitState::Uninitialized,
                Err(err) => InitState::Failed(err.clone()),
            };
        }

        outcome
    }

    fn start_load(&self) -> LoadFuture {
        let root = self.root.clone();
        let registry = Arc::clone(&self.registry);

        async move {
            match loader::load(&root, &registry).await {
                Ok(store) => {
                    info!("Template store ready ({} templates)", store.len());
                    Ok(Arc::new(store))
                }
                Err(err) => {
                    error!("Failed to load templates from {}: {}", root.display(), err);
                    Err(err)
                }
            }
        }
        .boxed()
        .shared()
    }
}
