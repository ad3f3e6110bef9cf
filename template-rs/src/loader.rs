//! Template discovery
//!
//! Every non-hidden directory under the template root is a logical template.
//! Directories are loaded one after the other; the files of a single directory
//! are read and compiled concurrently.

use crate::error::{Result, TemplateError};
use crate::registry::{TemplateType, TypeRegistry};
use crate::store::{CompiledPart, TemplateStore};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// A file claimed by a registered template type
struct SourceFile<'a> {
    path: PathBuf,
    file_name: String,
    template_type: &'a dyn TemplateType,
}

/// Load and compile every template under `root`
///
/// The first read or compile failure aborts the load.
pub async fn load(root: &Path, registry: &TypeRegistry) -> Result<TemplateStore> {
    info!("Loading templates from {}", root.display());

    let mut store = TemplateStore::new();
    for (name, dir) in template_dirs(root).await? {
        let parts = load_template(&dir, registry).await?;
        debug!("Template '{}': {} parts", name, parts.len());

        for part in parts {
            store.insert(name.clone(), part);
        }
    }

    info!(
        "Loaded {} templates ({} parts) from {}",
        store.len(),
        store.part_count(),
        root.display()
    );

    Ok(store)
}

/// List template directories under `root`, sorted by name
///
/// Hidden entries, non-directories and entries that cannot be stat'ed are
/// skipped.
async fn template_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = fs::read_dir(root)
        .await
        .map_err(|e| TemplateError::directory_read(root, e))?;

    let mut dirs = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TemplateError::directory_read(root, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            debug!("Skipping hidden entry {}", name);
            continue;
        }

        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => dirs.push((name, path)),
            Ok(_) => debug!("Skipping {}: not a directory", path.display()),
            Err(e) => debug!("Skipping {}: {}", path.display(), e),
        }
    }

    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// Compile every matched file of one template directory
async fn load_template(dir: &Path, registry: &TypeRegistry) -> Result<Vec<CompiledPart>> {
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| TemplateError::directory_read(dir, e))?;

    let mut sources = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| TemplateError::directory_read(dir, e))?
    {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(template_type) = registry.resolve(&file_name) else {
            debug!("No template type for {}", entry.path().display());
            continue;
        };

        // Sub-directories hold partials, not parts
        if matches!(entry.file_type().await, Ok(file_type) if file_type.is_dir()) {
            debug!("Skipping directory {}", entry.path().display());
            continue;
        }

        sources.push(SourceFile {
            path: entry.path(),
            file_name,
            template_type,
        });
    }

    let keys = output_keys(&sources);
    let mut pending: FuturesUnordered<_> = sources
        .iter()
        .zip(keys)
        .map(|(source, key)| compile_file(source, key))
        .collect();

    // Let every file settle before reporting the first failure
    let mut results = Vec::with_capacity(sources.len());
    while let Some(result) = pending.next().await {
        results.push(result);
    }

    results.into_iter().collect()
}

async fn compile_file(source: &SourceFile<'_>, output_key: String) -> Result<CompiledPart> {
    let text = fs::read_to_string(&source.path)
        .await
        .map_err(|e| TemplateError::file_read(&source.path, e))?;

    let template = source
        .template_type
        .compile(&text, &source.path)
        .map_err(|e| TemplateError::compile(&source.path, e))?;

    debug!(
        "Compiled {} as {} (key '{}')",
        source.path.display(),
        source.template_type.name(),
        output_key
    );

    Ok(CompiledPart::new(
        source.path.clone(),
        output_key,
        source.template_type.requires_inlining(),
        template,
    ))
}

/// Output keys for the files of one template
///
/// A key is the file name without its extension. Files whose stems collide
/// keep their full file name so that every part stays addressable.
fn output_keys(sources: &[SourceFile<'_>]) -> Vec<String> {
    let stems: Vec<String> = sources
        .iter()
        .map(|source| file_stem(&source.file_name))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for stem in &stems {
        *counts.entry(stem.as_str()).or_default() += 1;
    }

    sources
        .iter()
        .zip(&stems)
        .map(|(source, stem)| {
            if counts[stem.as_str()] > 1 {
                source.file_name.clone()
            } else {
                stem.clone()
            }
        })
        .collect()
}

fn file_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs as std_fs;

    fn write(root: &Path, relative: &str, contents: &[u8]) {
        let path = root.join(relative);
        std_fs::create_dir_all(path.parent().unwrap()).unwrap();
        std_fs::write(path, contents).unwrap();
    }

    fn keys(store: &TemplateStore, name: &str) -> Vec<String> {
        let mut keys: Vec<String> = store
            .get(name)
            .unwrap()
            .iter()
            .map(|part| part.output_key().to_string())
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("index.njk"), "index");
        assert_eq!(file_stem("body.txt"), "body");
        assert_eq!(file_stem("handler.rb.tera"), "handler.rb");
    }

    #[tokio::test]
    async fn test_load_templates() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "welcome/html.njk", b"<p>Hello {{ hello }}</p>");
        write(dir.path(), "welcome/text.txt", b"Hello {{ hello }}");
        write(dir.path(), "welcome/README.md", b"# not a template");
        write(dir.path(), "reset/index.tera", b"<p>{{ hello }}</p>");

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert_eq!(store.names(), vec!["reset", "welcome"]);
        assert_eq!(keys(&store, "welcome"), vec!["html", "text"]);
        assert_eq!(keys(&store, "reset"), vec!["index"]);

        let text = store
            .get("welcome")
            .unwrap()
            .iter()
            .find(|part| part.output_key() == "text")
            .unwrap();
        assert!(!text.requires_inlining());
        assert_eq!(text.render(&json!({ "hello": "world" })).unwrap(), "Hello world");
    }

    #[tokio::test]
    async fn test_skips_hidden_and_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".drafts/index.njk", b"draft");
        write(dir.path(), "notes.njk", b"not in a template directory");
        write(dir.path(), "welcome/index.njk", b"hello");

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert_eq!(store.names(), vec!["welcome"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_skips_entries_that_cannot_be_stated() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "welcome/index.njk", b"hello");
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert_eq!(store.names(), vec!["welcome"]);
    }

    #[tokio::test]
    async fn test_skips_partials_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "welcome/index.njk", b"{% include \"partials.njk/footer.njk\" %}");
        write(dir.path(), "welcome/partials.njk/footer.njk", b"footer");

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert_eq!(keys(&store, "welcome"), vec!["index"]);
    }

    #[tokio::test]
    async fn test_directory_without_matches_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "assets/style.css", b"p { color: red; }");

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_colliding_stems_keep_file_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "welcome/index.njk", b"<p>{{ hello }}</p>");
        write(dir.path(), "welcome/index.txt", b"{{ hello }}");
        write(dir.path(), "welcome/subject.txt", b"Welcome");

        let store = load(dir.path(), &TypeRegistry::email()).await.unwrap();

        assert_eq!(keys(&store, "welcome"), vec!["index.njk", "index.txt", "subject"]);
    }

    #[tokio::test]
    async fn test_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = load(&missing, &TypeRegistry::email()).await.unwrap_err();

        assert!(matches!(err, TemplateError::DirectoryRead { .. }));
    }

    #[tokio::test]
    async fn test_compile_error_aborts_load() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken/index.njk", b"{% if hello %}never closed");
        write(dir.path(), "welcome/index.njk", b"hello");

        let err = load(dir.path(), &TypeRegistry::email()).await.unwrap_err();

        match err {
            TemplateError::Compile { path, .. } => assert!(path.ends_with("broken/index.njk")),
            other => panic!("expected compile error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "welcome/index.txt", &[0xff, 0xfe, 0xfd]);

        let err = load(dir.path(), &TypeRegistry::email()).await.unwrap_err();

        assert!(matches!(err, TemplateError::FileRead { .. }));
    }
}
