//! Compiled template store
//!
//! Logical template names map to the parts compiled from that template's
//! directory. The store is built once by the loader and never mutated after.

use crate::error::{Result, TemplateError};
use crate::registry::CompiledTemplate;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One compiled file of a logical template
pub struct CompiledPart {
    source_path: PathBuf,
    output_key: String,
    requires_inlining: bool,
    template: Box<dyn CompiledTemplate>,
}

impl CompiledPart {
    pub fn new(
        source_path: impl Into<PathBuf>,
        output_key: impl Into<String>,
        requires_inlining: bool,
        template: Box<dyn CompiledTemplate>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_key: output_key.into(),
            requires_inlining,
            template,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Key under which this part's output appears in a rendered result
    pub fn output_key(&self) -> &str {
        &self.output_key
    }

    pub fn requires_inlining(&self) -> bool {
        self.requires_inlining
    }

    /// Render this part with the given locals
    pub fn render(&self, locals: &Value) -> Result<String> {
        self.template
            .render(locals)
            .map_err(|e| TemplateError::render(&self.source_path, e))
    }
}

impl fmt::Debug for CompiledPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPart")
            .field("source_path", &self.source_path)
            .field("output_key", &self.output_key)
            .field("requires_inlining", &self.requires_inlining)
            .finish_non_exhaustive()
    }
}

/// Logical template name to compiled parts
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: HashMap<String, Vec<CompiledPart>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a part to the named template
    pub fn insert(&mut self, name: impl Into<String>, part: CompiledPart) {
        self.templates.entry(name.into()).or_default().push(part);
    }

    pub fn get(&self, name: &str) -> Option<&[CompiledPart]> {
        self.templates.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Logical template names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of logical templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Total number of compiled parts across all templates
    pub fn part_count(&self) -> usize {
        self.templates.values().map(Vec::len).sum()
    }
}
