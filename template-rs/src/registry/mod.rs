//! Template type registry
//!
//! Maps template source files to the compiler that understands them. Types are
//! kept in registration order and the first type whose match rule accepts a
//! file name claims that file.

use crate::error::{BoxError, Result, TemplateError};
use serde_json::Value;
use std::fmt;
use std::path::Path;

pub mod engines;

pub use engines::{JinjaTemplates, PlainText, StaticHtml, TeraTemplates};

/// A compiled template, ready to be rendered with locals
pub trait CompiledTemplate: Send + Sync {
    /// Render the template with the given locals
    fn render(&self, locals: &Value) -> std::result::Result<String, BoxError>;
}

impl<F> CompiledTemplate for F
where
    F: Fn(&Value) -> std::result::Result<String, BoxError> + Send + Sync,
{
    fn render(&self, locals: &Value) -> std::result::Result<String, BoxError> {
        self(locals)
    }
}

/// A supported template source format
pub trait TemplateType: Send + Sync {
    /// Type name (e.g. "jinja", "text")
    fn name(&self) -> &str;

    /// Whether this type claims the given file name
    fn matches(&self, file_name: &str) -> bool;

    /// Whether rendered output must go through CSS inlining
    fn requires_inlining(&self) -> bool;

    /// Compile template source read from `path`
    fn compile(&self, source: &str, path: &Path)
        -> std::result::Result<Box<dyn CompiledTemplate>, BoxError>;
}

type MatchRule = Box<dyn Fn(&str) -> bool + Send + Sync>;
type CompileFn = Box<
    dyn Fn(&str, &Path) -> std::result::Result<Box<dyn CompiledTemplate>, BoxError>
        + Send
        + Sync,
>;

/// Template type assembled from a match rule and a compile function
pub struct TypeDescriptor {
    name: String,
    match_rule: MatchRule,
    requires_inlining: bool,
    compile: CompileFn,
}

impl TypeDescriptor {
    pub fn new<M, C>(name: impl Into<String>, match_rule: M, requires_inlining: bool, compile: C) -> Self
    where
        M: Fn(&str) -> bool + Send + Sync + 'static,
        C: Fn(&str, &Path) -> std::result::Result<Box<dyn CompiledTemplate>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            match_rule: Box::new(match_rule),
            requires_inlining,
            compile: Box::new(compile),
        }
    }
}

impl TemplateType for TypeDescriptor {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, file_name: &str) -> bool {
        (self.match_rule)(file_name)
    }

    fn requires_inlining(&self) -> bool {
        self.requires_inlining
    }

    fn compile(
        &self,
        source: &str,
        path: &Path,
    ) -> std::result::Result<Box<dyn CompiledTemplate>, BoxError> {
        (self.compile)(source, path)
    }
}

/// Build a match rule accepting file names that end with one of `extensions`
///
/// Extensions include the leading dot (e.g. `".njk"`). A bare extension such
/// as `".njk"` is not itself a match.
pub fn extension_rule(extensions: &[&str]) -> impl Fn(&str) -> bool + Send + Sync + 'static {
    let extensions: Vec<String> = extensions.iter().map(|ext| ext.to_string()).collect();
    move |file_name: &str| engines::has_extension(file_name, extensions.iter().map(String::as_str))
}

/// Names accepted by [`TypeRegistry::preset`]
pub const PRESETS: &[&str] = &["email", "html", "jinja", "nunjucks", "tera", "text"];

/// Ordered list of template types
#[derive(Default)]
pub struct TypeRegistry {
    types: Vec<Box<dyn TemplateType>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type from a match rule and a compile function
    pub fn register<M, C>(
        self,
        name: impl Into<String>,
        match_rule: M,
        requires_inlining: bool,
        compile: C,
    ) -> Self
    where
        M: Fn(&str) -> bool + Send + Sync + 'static,
        C: Fn(&str, &Path) -> std::result::Result<Box<dyn CompiledTemplate>, BoxError>
            + Send
            + Sync
            + 'static,
    {
        self.with_type(TypeDescriptor::new(name, match_rule, requires_inlining, compile))
    }

    /// Register a template type implementation
    pub fn with_type(mut self, template_type: impl TemplateType + 'static) -> Self {
        self.types.push(Box::new(template_type));
        self
    }

    /// Find the first registered type claiming `file_name`
    pub fn resolve(&self, file_name: &str) -> Option<&dyn TemplateType> {
        self.types
            .iter()
            .find(|t| t.matches(file_name))
            .map(|t| &**t)
    }

    /// Registered type names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Build one of the built-in registries
    ///
    /// # Presets
    /// - `email` - jinja, tera, static html and plain text
    /// - `html` - static html only
    /// - `jinja` / `nunjucks` - jinja and plain text
    /// - `tera` - tera and plain text
    /// - `text` - plain text only
    pub fn preset(name: &str) -> Result<Self> {
        let registry = match name {
            "email" => Self::email(),
            "html" => Self::new().with_type(StaticHtml),
            "jinja" | "nunjucks" => Self::new().with_type(JinjaTemplates).with_type(PlainText),
            "tera" => Self::new().with_type(TeraTemplates).with_type(PlainText),
            "text" => Self::new().with_type(PlainText),
            other => {
                return Err(TemplateError::Config(format!(
                    "Unknown template preset '{}' (expected one of: {})",
                    other,
                    PRESETS.join(", ")
                )))
            }
        };
        Ok(registry)
    }

    /// Registry with every built-in type
    pub fn email() -> Self {
        Self::new()
            .with_type(JinjaTemplates)
            .with_type(TeraTemplates)
            .with_type(StaticHtml)
            .with_type(PlainText)
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
