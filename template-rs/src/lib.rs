//! template-rs: Multi-format email template renderer
//!
//! Renders email templates stored as a directory tree. Each sub-directory of
//! the template root is one logical template; every file in it that a
//! registered template type recognizes becomes a part (an HTML body, a plain
//! text fallback, a subject line, ...). Rendering a template renders all of
//! its parts and returns them keyed by file name without extension.
//!
//! # Features
//!
//! - Pluggable template types selected by file name (Jinja/Nunjucks, Tera,
//!   static HTML, plain text)
//! - Lazy loading: the tree is compiled once, on first use, and shared by all
//!   concurrent renders
//! - CSS inlining of HTML parts for email client compatibility
//!
//! # Template Layout
//!
//! ```text
//! templates/
//! ├── welcome/
//! │   ├── html.njk       -> "html" (inlined)
//! │   ├── text.txt       -> "text"
//! │   └── style.css      (linked from html.njk)
//! └── password-reset/
//!     ├── html.tera      -> "html" (inlined)
//!     └── text.txt       -> "text"
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! [templates]
//! root = "./templates"
//! preset = "email"
//! retry_failed_init = true
//!
//! [inlining]
//! enabled = true
//! keep_style_tags = false
//! ```
//!
//! # Modules
//!
//! - [`config`]: Configuration management
//! - [`error`]: Error types and handling
//! - [`registry`]: Template types and the ordered type registry
//! - [`loader`]: Template discovery and compilation
//! - [`store`]: Compiled template store
//! - [`inline`]: CSS inlining
//! - [`renderer`]: The renderer facade

pub mod config;
pub mod error;
pub mod inline;
pub mod loader;
pub mod registry;
pub mod renderer;
pub mod store;

// Re-export commonly used types
pub use config::RendererConfig;
pub use error::{Result, TemplateError};
pub use inline::{CssInliner, PassthroughInliner, StylesheetInliner};
pub use registry::{CompiledTemplate, TemplateType, TypeDescriptor, TypeRegistry};
pub use renderer::Renderer;
pub use store::{CompiledPart, TemplateStore};
