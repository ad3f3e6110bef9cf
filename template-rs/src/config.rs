//! Configuration for template-rs

use crate::error::{Result, TemplateError};
use crate::registry::PRESETS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of environment variables overriding file settings
/// (e.g. `TEMPLATE_RS__TEMPLATES__ROOT`)
pub const ENV_PREFIX: &str = "TEMPLATE_RS";

/// Renderer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RendererConfig {
    /// Template discovery
    pub templates: TemplatesConfig,
    /// CSS inlining of HTML parts
    #[serde(default)]
    pub inlining: InliningConfig,
}

/// Template discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplatesConfig {
    /// Directory holding one sub-directory per template
    pub root: PathBuf,
    /// Built-in type preset (email, html, jinja, nunjucks, tera, text)
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Start a fresh load on the next render after a failed one
    #[serde(default = "default_true")]
    pub retry_failed_init: bool,
}

/// CSS inlining configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InliningConfig {
    /// Inline CSS into HTML parts
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Keep `<style>` elements after inlining
    #[serde(default)]
    pub keep_style_tags: bool,
    /// Keep `<link rel="stylesheet">` elements after inlining
    #[serde(default)]
    pub keep_link_tags: bool,
    /// Load stylesheets referenced by `<link>` relative to the template file
    #[serde(default = "default_true")]
    pub load_linked_stylesheets: bool,
}

fn default_preset() -> String {
    "email".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for InliningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_style_tags: false,
            keep_link_tags: false,
            load_linked_stylesheets: true,
        }
    }
}

impl RendererConfig {
    /// Configuration with defaults for the given template root
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            templates: TemplatesConfig {
                root: root.into(),
                preset: default_preset(),
                retry_failed_init: true,
            },
            inlining: InliningConfig::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TemplateError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| TemplateError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load configuration from a file, with `TEMPLATE_RS__*` environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| TemplateError::Config(format!("Failed to load config: {}", e)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.templates.root.as_os_str().is_empty() {
            return Err(TemplateError::Config(
                "A template directory is required".to_string(),
            ));
        }

        if !PRESETS.contains(&self.templates.preset.as_str()) {
            return Err(TemplateError::Config(format!(
                "Unknown template preset '{}' (expected one of: {})",
                self.templates.preset,
                PRESETS.join(", ")
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::new("./templates");
        assert_eq!(config.templates.preset, "email");
        assert!(config.templates.retry_failed_init);
        assert!(config.inlining.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[templates]
root = "/srv/mail/templates"
preset = "nunjucks"
retry_failed_init = false

[inlining]
keep_style_tags = true
"#;
        let config = RendererConfig::from_toml(toml).unwrap();
        assert_eq!(config.templates.root, PathBuf::from("/srv/mail/templates"));
        assert_eq!(config.templates.preset, "nunjucks");
        assert!(!config.templates.retry_failed_init);
        assert!(config.inlining.enabled);
        assert!(config.inlining.keep_style_tags);
        assert!(config.inlining.load_linked_stylesheets);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inlining_section_optional() {
        let config = RendererConfig::from_toml("[templates]\nroot = \"templates\"\n").unwrap();
        assert!(config.inlining.enabled);
        assert!(!config.inlining.keep_link_tags);
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let config = RendererConfig::new("");
        assert!(matches!(config.validate(), Err(TemplateError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_preset() {
        let mut config = RendererConfig::new("templates");
        config.templates.preset = "jade".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jade"));
    }

    #[test]
    fn test_missing_templates_section() {
        assert!(RendererConfig::from_toml("[inlining]\nenabled = false\n").is_err());
    }

    #[test]
    fn test_from_file_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("renderer.toml");
        std::fs::write(
            &path,
            "[templates]\nroot = \"mail\"\npreset = \"tera\"\n\n[inlining]\nenabled = false\n",
        )
        .unwrap();

        let config = RendererConfig::from_file(&path).unwrap();
        assert_eq!(config.templates.preset, "tera");
        assert!(!config.inlining.enabled);

        let layered = RendererConfig::load(&path).unwrap();
        assert_eq!(layered.templates.root, PathBuf::from("mail"));
        assert!(!layered.inlining.enabled);
    }

    #[test]
    fn test_from_file_missing() {
        let err = RendererConfig::from_file(Path::new("/nonexistent/renderer.toml")).unwrap_err();
        assert!(matches!(err, TemplateError::Config(_)));
    }
}
