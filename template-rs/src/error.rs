//! Error types for template-rs

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Boxed error returned by template compilers and compiled templates.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared error source.
///
/// Sources are reference counted so that a single failed initialization can be
/// handed to every caller waiting on it.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Template error types
#[derive(Error, Debug, Clone)]
pub enum TemplateError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template root or template directory could not be listed
    #[error("Failed to read template directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Template file could not be read
    #[error("Failed to read template file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Template source rejected by its compiler
    #[error("Failed to compile template {}: {source}", .path.display())]
    Compile {
        path: PathBuf,
        #[source]
        source: SharedError,
    },

    /// No template with this name
    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    /// Locals could not be serialized
    #[error("Invalid template locals: {0}")]
    InvalidLocals(String),

    /// A compiled part failed to render
    #[error("Failed to render template {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: SharedError,
    },

    /// CSS inlining error
    #[error("Failed to inline CSS for {}: {message}", .path.display())]
    Inlining { path: PathBuf, message: String },
}

impl TemplateError {
    pub(crate) fn directory_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryRead {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub(crate) fn compile(path: impl Into<PathBuf>, source: BoxError) -> Self {
        Self::Compile {
            path: path.into(),
            source: Arc::from(source),
        }
    }

    pub(crate) fn render(path: impl Into<PathBuf>, source: BoxError) -> Self {
        Self::Render {
            path: path.into(),
            source: Arc::from(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_compile_error_keeps_source() {
        let err = TemplateError::compile("/tmp/welcome/index.njk", "unexpected end of input".into());

        assert!(err.to_string().contains("/tmp/welcome/index.njk"));
        assert!(err.to_string().contains("unexpected end of input"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_errors_are_cloneable() {
        let err = TemplateError::directory_read(
            "/missing",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
        );
        let copy = err.clone();

        assert_eq!(err.to_string(), copy.to_string());
        assert!(matches!(copy, TemplateError::DirectoryRead { .. }));
    }
}
