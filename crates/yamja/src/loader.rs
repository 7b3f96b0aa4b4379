//! File discovery and loading.
//!
//! Templates are discovered recursively and named by their path relative to
//! the templates directory, always with `/` separators (`partials/db.yaml`).
//! Variables are read one directory at a time. Symlinked directories are
//! never descended into, so a link cycle cannot recurse forever.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use yamja_render::{parse_document, Document, Node};

/// Recognized file extensions for templates and variables.
pub const YAML_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

/// A YAML file found under a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlFile {
    /// Path relative to the root, `/`-separated.
    pub name: String,
    /// Absolute or root-joined path on disk.
    pub path: PathBuf,
}

fn is_yaml(path: &Path) -> bool {
    let name = path.to_string_lossy();
    YAML_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Reads a file, or stdin when the path is `-`.
pub fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("reading template from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

/// Reads and parses a YAML file, keeping source locations.
pub fn load_document(path: &Path) -> Result<Document> {
    let text = read_source(path)?;
    parse_document(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Reads and parses a model file.
pub fn load_model(path: &Path) -> Result<Node> {
    load_document(path).map(Document::into_node)
}

/// All YAML files below `root`, sorted by name.
pub fn walk_yaml(root: &Path) -> Result<Vec<YamlFile>> {
    let mut files = Vec::new();
    walk_recursive(root, root, &mut files)?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn walk_recursive(current: &Path, root: &Path, files: &mut Vec<YamlFile>) -> Result<()> {
    let entries =
        fs::read_dir(current).with_context(|| format!("listing {}", current.display()))?;

    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", current.display()))?;
        let path = entry.path();

        if is_real_dir(&entry)? {
            walk_recursive(&path, root, files)?;
        } else if path.is_file() && is_yaml(&path) {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(YamlFile { name, path });
        }
    }

    Ok(())
}

/// YAML files directly inside `dir` (not recursive), sorted by file name.
pub fn yaml_files_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry.with_context(|| format!("listing {}", dir.display()))?.path();
        if path.is_file() && is_yaml(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Whether an entry is a directory itself, not a symlink to one.
fn is_real_dir(entry: &fs::DirEntry) -> Result<bool> {
    let file_type = entry
        .file_type()
        .with_context(|| format!("inspecting {}", entry.path().display()))?;
    Ok(file_type.is_dir())
}

/// Subdirectories directly inside `dir`, sorted by name. Symlinks are skipped.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        if is_real_dir(&entry)? {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_walk_yaml_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.yaml", "");
        touch(dir.path(), "a.yml", "");
        touch(dir.path(), "partials/x.yaml", "");
        touch(dir.path(), "notes.txt", "");

        let names: Vec<_> = walk_yaml(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["a.yml", "b.yaml", "partials/x.yaml"]);
    }

    #[test]
    fn test_yaml_files_in_is_flat() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "main.yaml", "");
        touch(dir.path(), "child/deep.yaml", "");

        let files = yaml_files_in(dir.path()).unwrap();
        assert_eq!(files, [dir.path().join("main.yaml")]);
        assert_eq!(subdirectories(dir.path()).unwrap(), [dir.path().join("child")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "level/main.yaml", "");
        // A link back to its own parent forms a cycle.
        std::os::unix::fs::symlink(dir.path(), dir.path().join("level/loop")).unwrap();

        assert_eq!(subdirectories(dir.path()).unwrap(), [dir.path().join("level")]);
        assert!(subdirectories(&dir.path().join("level")).unwrap().is_empty());

        let names: Vec<_> = walk_yaml(dir.path())
            .unwrap()
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, ["level/main.yaml"]);
    }

    #[test]
    fn test_load_model_names_file_on_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "bad.yaml", "a: [1\n");

        let err = load_model(&dir.path().join("bad.yaml")).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("bad.yaml"), "{message}");
        assert!(err.downcast_ref::<yamja_render::RenderError>().is_some());
    }

    #[test]
    fn test_missing_file() {
        let err = read_source(Path::new("/nonexistent/t.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/t.yaml"));
    }
}
