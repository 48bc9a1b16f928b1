//! Documentation directories
//!
//! Each text file below a documentation root is a module whose whole text
//! is the documentation of one callable named [`DOC_CALLABLE`].

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::registry::Module;

/// Extensions scanned for transcripts
const DOC_EXTENSIONS: &[&str] = &["txt", "md", "rst"];

/// Callable name under which a file's text is registered
pub const DOC_CALLABLE: &str = "doc";

/// Module name for a file: root directory name plus the relative path,
/// separators and dots replaced by `.`, extension dropped.
pub fn module_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let mut parts: Vec<String> = Vec::new();
    if let Some(name) = root.file_name() {
        parts.push(name.to_string_lossy().into_owned());
    }
    parts.extend(
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().replace('.', "_")),
    );
    parts.join(".")
}

fn is_doc_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOC_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

fn load_file(name: &str, path: &Path) -> Result<Module> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    Ok(Module::new(name).doc(DOC_CALLABLE, text))
}

/// Load every documentation file under `root`, in file-name order.
///
/// Unreadable entries come back as errors paired with the best module name
/// available, so discovery can report them as broken units.
pub fn scan(root: &Path) -> Vec<(String, Result<Module>)> {
    let mut modules = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                let path = entry.path();
                if !entry.file_type().is_file() || !is_doc_file(path) {
                    continue;
                }
                let name = module_name(root, path);
                debug!("Loading documentation module {} from {}", name, path.display());
                let loaded = load_file(&name, path);
                modules.push((name, loaded));
            }
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from(root));
                let name = module_name(root, &path);
                let name = if name.is_empty() {
                    path.display().to_string()
                } else {
                    name
                };
                modules.push((
                    name,
                    Err(anyhow::Error::new(err).context(format!(
                        "Failed to walk {}",
                        path.display()
                    ))),
                ));
            }
        }
    }

    modules
}
