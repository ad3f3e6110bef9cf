//! CSS inlining for HTML parts
//!
//! Email clients ignore most `<style>` and `<link>` elements, so HTML output is
//! rewritten to carry its CSS rules as inline `style` attributes.
//!
//! Linked stylesheets are read from disk by the inliner itself rather than by
//! `css-inline`, so template roots whose paths need percent-encoding (spaces,
//! non-ASCII names) resolve to the right files.

use crate::config::InliningConfig;
use crate::error::{Result, TemplateError};
use async_trait::async_trait;
use regex::Regex;
use std::borrow::Cow;
use std::path::Path;
use tokio::fs;
use tracing::debug;
use url::Url;

const LINK_TAG: &str = r"(?is)<link\b[^>]*>";
const LINK_ATTR: &str = r#"(?i)\b(rel|href)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'<>`]+))"#;

/// CSS inliner trait
#[async_trait]
pub trait CssInliner: Send + Sync {
    /// Inline the stylesheets of `html`
    ///
    /// Relative stylesheet references are resolved against `base`, the path
    /// of the template that produced the HTML.
    async fn inline(&self, html: String, base: &Path) -> Result<String>;
}

/// Inliner backed by the `css-inline` crate
#[derive(Debug, Clone)]
pub struct StylesheetInliner {
    keep_style_tags: bool,
    keep_link_tags: bool,
    load_linked_stylesheets: bool,
}

impl StylesheetInliner {
    pub fn new() -> Self {
        Self::from_config(&InliningConfig::default())
    }

    pub fn from_config(config: &InliningConfig) -> Self {
        Self {
            keep_style_tags: config.keep_style_tags,
            keep_link_tags: config.keep_link_tags,
            load_linked_stylesheets: config.load_linked_stylesheets,
        }
    }

    /// Read the local stylesheets linked from `html`, in document order
    async fn linked_css(&self, html: &str, base: &Path) -> Result<Option<String>> {
        if !self.load_linked_stylesheets {
            return Ok(None);
        }

        let hrefs = linked_stylesheets(html);
        if hrefs.is_empty() {
            return Ok(None);
        }

        let base_url = file_url(base)?;
        let mut sheets = Vec::with_capacity(hrefs.len());
        for href in &hrefs {
            if let Some(css) = load_stylesheet(&base_url, href, base).await? {
                sheets.push(css);
            }
        }

        Ok((!sheets.is_empty()).then(|| sheets.join("\n")))
    }

    fn inline_blocking(
        &self,
        html: &str,
        extra_css: Option<String>,
    ) -> std::result::Result<String, css_inline::InlineError> {
        let inliner = css_inline::CSSInliner::options()
            .keep_style_tags(self.keep_style_tags)
            .keep_link_tags(self.keep_link_tags)
            .load_remote_stylesheets(false)
            .extra_css(extra_css.map(Cow::Owned))
            .build();

        inliner.inline(html)
    }
}

impl Default for StylesheetInliner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CssInliner for StylesheetInliner {
    async fn inline(&self, html: String, base: &Path) -> Result<String> {
        debug!("Inlining CSS for {}", base.display());
        let extra_css = self.linked_css(&html, base).await?;

        let inliner = self.clone();
        tokio::task::spawn_blocking(move || inliner.inline_blocking(&html, extra_css))
            .await
            .map_err(|e| TemplateError::Inlining {
                path: base.to_path_buf(),
                message: e.to_string(),
            })?
            .map_err(|e| TemplateError::Inlining {
                path: base.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// Inliner that returns HTML untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughInliner;

#[async_trait]
impl CssInliner for PassthroughInliner {
    async fn inline(&self, html: String, _base: &Path) -> Result<String> {
        Ok(html)
    }
}

/// `file://` URL for a template path, made absolute first
pub fn file_url(path: &Path) -> Result<Url> {
    let absolute = std::path::absolute(path).map_err(|e| TemplateError::Inlining {
        path: path.to_path_buf(),
        message: format!("Cannot resolve base path: {}", e),
    })?;

    Url::from_file_path(&absolute).map_err(|_| TemplateError::Inlining {
        path: path.to_path_buf(),
        message: format!("Cannot build file URL for {}", absolute.display()),
    })
}

/// `href` of every `<link rel="stylesheet">` in `html`
fn linked_stylesheets(html: &str) -> Vec<String> {
    let (Ok(link_tag), Ok(link_attr)) = (Regex::new(LINK_TAG), Regex::new(LINK_ATTR)) else {
        return Vec::new();
    };

    link_tag
        .find_iter(html)
        .filter_map(|tag| {
            let mut rel = None;
            let mut href = None;
            for attr in link_attr.captures_iter(tag.as_str()) {
                let value = attr
                    .get(2)
                    .or_else(|| attr.get(3))
                    .or_else(|| attr.get(4))
                    .map(|m| m.as_str().to_string());
                if attr[1].eq_ignore_ascii_case("rel") {
                    rel = value;
                } else {
                    href = value;
                }
            }

            let is_stylesheet = rel?
                .split_ascii_whitespace()
                .any(|token| token.eq_ignore_ascii_case("stylesheet"));
            is_stylesheet.then_some(href?)
        })
        .collect()
}

/// Read one linked stylesheet; remote references are skipped
async fn load_stylesheet(base_url: &Url, href: &str, base: &Path) -> Result<Option<String>> {
    let url = base_url.join(href).map_err(|e| TemplateError::Inlining {
        path: base.to_path_buf(),
        message: format!("Invalid stylesheet reference {}: {}", href, e),
    })?;

    if url.scheme() != "file" {
        debug!("Skipping remote stylesheet {}", url);
        return Ok(None);
    }

    // to_file_path decodes the percent-encoding added by the URL
    let path = url.to_file_path().map_err(|_| TemplateError::Inlining {
        path: base.to_path_buf(),
        message: format!("Invalid stylesheet path {}", url),
    })?;

    fs::read_to_string(&path)
        .await
        .map(Some)
        .map_err(|e| TemplateError::Inlining {
            path: base.to_path_buf(),
            message: format!("Missing stylesheet file: {}: {}", path.display(), e),
        })
}
