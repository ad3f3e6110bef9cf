//! Built-in template types
//!
//! - [`JinjaTemplates`]: Jinja/Nunjucks syntax via minijinja, HTML escaped
//! - [`TeraTemplates`]: Tera syntax, with the other `.tera` files of the
//!   template available to `include` and `extends`
//! - [`StaticHtml`]: HTML served as-is
//! - [`PlainText`]: Jinja syntax without escaping, never inlined

use crate::error::BoxError;
use crate::registry::{CompiledTemplate, TemplateType};
use minijinja::{AutoEscape, Environment};
use serde_json::Value;
use std::path::Path;
use tera::Tera;

pub const JINJA_EXTENSIONS: &[&str] = &[".njk", ".nunjucks", ".jinja", ".j2"];
pub const TERA_EXTENSIONS: &[&str] = &[".tera"];
pub const HTML_EXTENSIONS: &[&str] = &[".html", ".htm"];
pub const TEXT_EXTENSIONS: &[&str] = &[".txt"];

pub(crate) fn has_extension<'a>(
    file_name: &str,
    extensions: impl IntoIterator<Item = &'a str>,
) -> bool {
    extensions
        .into_iter()
        .any(|ext| file_name.len() > ext.len() && file_name.ends_with(ext))
}

fn template_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A minijinja environment holding a single template
///
/// Includes and imports are resolved relative to the directory of the source
/// file.
struct JinjaTemplate {
    env: Environment<'static>,
    name: String,
}

impl JinjaTemplate {
    fn compile(source: &str, path: &Path, escape: AutoEscape) -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(move |_| escape.clone());
        if let Some(dir) = path.parent() {
            env.set_loader(minijinja::path_loader(dir));
        }

        let name = template_name(path);
        env.add_template_owned(name.clone(), source.to_owned())?;

        Ok(Self { env, name })
    }
}

impl CompiledTemplate for JinjaTemplate {
    fn render(&self, locals: &Value) -> Result<String, BoxError> {
        let template = self.env.get_template(&self.name)?;
        Ok(template.render(locals)?)
    }
}

/// Jinja / Nunjucks templates producing HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct JinjaTemplates;

impl TemplateType for JinjaTemplates {
    fn name(&self) -> &str {
        "jinja"
    }

    fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, JINJA_EXTENSIONS.iter().copied())
    }

    fn requires_inlining(&self) -> bool {
        true
    }

    fn compile(&self, source: &str, path: &Path) -> Result<Box<dyn CompiledTemplate>, BoxError> {
        Ok(Box::new(JinjaTemplate::compile(source, path, AutoEscape::Html)?))
    }
}

/// Plain text parts, interpolated without escaping
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl TemplateType for PlainText {
    fn name(&self) -> &str {
        "text"
    }

    fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, TEXT_EXTENSIONS.iter().copied())
    }

    fn requires_inlining(&self) -> bool {
        false
    }

    fn compile(&self, source: &str, path: &Path) -> Result<Box<dyn CompiledTemplate>, BoxError> {
        Ok(Box::new(JinjaTemplate::compile(source, path, AutoEscape::None)?))
    }
}

struct TeraTemplate {
    tera: Tera,
    name: String,
}

impl CompiledTemplate for TeraTemplate {
    fn render(&self, locals: &Value) -> Result<String, BoxError> {
        let context = tera::Context::from_serialize(locals)?;
        Ok(self.tera.render(&self.name, &context)?)
    }
}

/// Tera templates producing HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraTemplates;

impl TemplateType for TeraTemplates {
    fn name(&self) -> &str {
        "tera"
    }

    fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, TERA_EXTENSIONS.iter().copied())
    }

    fn requires_inlining(&self) -> bool {
        true
    }

    fn compile(&self, source: &str, path: &Path) -> Result<Box<dyn CompiledTemplate>, BoxError> {
        let name = template_name(path);

        let mut templates = Vec::new();
        if let Some(dir) = path.parent().filter(|dir| dir.is_dir()) {
            tera_partials(dir, "", &mut templates)?;
        }
        templates.retain(|(partial, _)| partial != &name);
        templates.push((name.clone(), source.to_owned()));

        let mut tera = Tera::default();
        tera.autoescape_on(TERA_EXTENSIONS.to_vec());
        tera.add_raw_templates(templates)?;

        Ok(Box::new(TeraTemplate { tera, name }))
    }
}

/// Collect the `.tera` files under `dir` for includes and inheritance
///
/// Names are relative to `dir` with `/` separators, so `{% include
/// "partials/footer.tera" %}` resolves the same way it does for Jinja parts.
fn tera_partials(
    dir: &Path,
    prefix: &str,
    templates: &mut Vec<(String, String)>,
) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }

        let name = format!("{}{}", prefix, file_name);
        let path = entry.path();
        if path.is_dir() {
            tera_partials(&path, &format!("{}/", name), templates)?;
        } else if has_extension(&file_name, TERA_EXTENSIONS.iter().copied()) {
            templates.push((name, std::fs::read_to_string(&path)?));
        }
    }

    Ok(())
}

/// Static HTML, rendered verbatim regardless of locals
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticHtml;

impl TemplateType for StaticHtml {
    fn name(&self) -> &str {
        "html"
    }

    fn matches(&self, file_name: &str) -> bool {
        has_extension(file_name, HTML_EXTENSIONS.iter().copied())
    }

    fn requires_inlining(&self) -> bool {
        true
    }

    fn compile(&self, source: &str, _path: &Path) -> Result<Box<dyn CompiledTemplate>, BoxError> {
        let contents = source.to_owned();
        let compiled = move |_locals: &Value| -> Result<String, BoxError> { Ok(contents.clone()) };
        Ok(Box::new(compiled))
    }
}
