//! Directory-tree rendering ("stacks").
//!
//! A variables tree describes a set of stacks:
//!
//! ```text
//! vars/
//!   common.yaml            <- level ()
//!   production/
//!     main.yaml            <- level (production)
//!     eu/
//!       main.yaml          <- level (production, eu)   leaf
//!   staging/
//!     us/
//!       main.yaml          <- level (staging, us)      leaf
//! ```
//!
//! Every directory is a level, and its YAML files are that level's models.
//! Only the deepest levels are leaves. Each leaf renders the templates
//! directory into `<output>/<leaf path>/`, with its own files taking
//! precedence over its parent's, and so on up to the root. Inside one level,
//! later files (in name order) take precedence over earlier ones.
//!
//! The merged variables may pick templates by name (`templates: [app]`
//! selects `app.yaml`) and drop some (`exclude: [debug]`). Anything under
//! `partials/` is never rendered.
//!
//! Every template is rendered for every leaf before any file is written, so
//! a failure leaves the output directory untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use yamja_render::{to_yaml, Context, Document, Node, Renderer};

use crate::loader::{load_document, load_model, subdirectories, walk_yaml, yaml_files_in};

const PARTIALS_DIR: &str = "partials/";

/// The three directories a stack run works with.
#[derive(Debug, Clone)]
pub struct StackLayout {
    pub variables: PathBuf,
    pub templates: PathBuf,
    pub output: PathBuf,
}

/// A rendered file waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Renders every leaf and returns the files without writing them.
pub fn plan(
    layout: &StackLayout,
    renderer: &Renderer,
    overrides: &BTreeMap<String, String>,
) -> Result<Vec<RenderedFile>> {
    if !layout.templates.is_dir() {
        bail!("templates not found in {}", layout.templates.display());
    }
    if !layout.variables.is_dir() {
        bail!("variables not found in {}", layout.variables.display());
    }

    let templates = load_templates(&layout.templates)?;
    let levels = read_levels(&layout.variables)?;
    let max_depth = levels.keys().map(Vec::len).max().unwrap_or(0);
    tracing::info!(
        levels = levels.len(),
        templates = templates.len(),
        depth = max_depth,
        "read variables tree"
    );

    let mut files = Vec::new();
    for names in levels.keys().filter(|names| names.len() == max_depth) {
        let leaf = leaf_label(names);
        let ctx = Context::builder()
            .models(leaf_models(&levels, names))
            .env_overrides(overrides.clone())
            .build()
            .with_context(|| format!("merging variables for {leaf}"))?;

        let output_dir = names
            .iter()
            .fold(layout.output.clone(), |dir, name| dir.join(name));

        for name in select_templates(&ctx, &templates, &layout.templates)? {
            let Some(document) = templates.get(&name) else {
                continue;
            };
            tracing::debug!(leaf = %leaf, template = %name, "rendering");
            let rendered = renderer
                .render_document(document, &ctx)
                .and_then(|node| to_yaml(&node))
                .with_context(|| format!("rendering {name} for {leaf}"))?;
            files.push(RenderedFile {
                path: output_dir.join(&name),
                contents: rendered,
            });
        }
    }

    Ok(files)
}

/// Writes planned files, creating directories as needed.
pub fn write(files: &[RenderedFile]) -> Result<()> {
    for file in files {
        if let Some(parent) = file.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        fs::write(&file.path, &file.contents)
            .with_context(|| format!("writing {}", file.path.display()))?;
        tracing::info!(path = %file.path.display(), "wrote");
    }
    Ok(())
}

/// Plans and writes a whole stack run. Returns the number of files written.
pub fn run(
    layout: &StackLayout,
    renderer: &Renderer,
    overrides: &BTreeMap<String, String>,
) -> Result<usize> {
    let files = plan(layout, renderer, overrides)?;
    write(&files)?;
    Ok(files.len())
}

fn load_templates(dir: &Path) -> Result<BTreeMap<String, Document>> {
    walk_yaml(dir)?
        .into_iter()
        .filter(|file| !file.name.starts_with(PARTIALS_DIR))
        .map(|file| Ok((file.name, load_document(&file.path)?)))
        .collect()
}

/// Models per level, keyed by directory names from the variables root and
/// kept in file name order.
type Levels = BTreeMap<Vec<String>, Vec<Node>>;

fn read_levels(root: &Path) -> Result<Levels> {
    let mut levels = BTreeMap::new();
    read_level(root, Vec::new(), &mut levels)?;
    Ok(levels)
}

fn read_level(dir: &Path, names: Vec<String>, levels: &mut Levels) -> Result<()> {
    let models = yaml_files_in(dir)?
        .iter()
        .map(|path| load_model(path))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(level = %leaf_label(&names), files = models.len(), "read level");

    for child in subdirectories(dir)? {
        let mut child_names = names.clone();
        if let Some(name) = child.file_name() {
            child_names.push(name.to_string_lossy().into_owned());
        }
        read_level(&child, child_names, levels)?;
    }

    levels.insert(names, models);
    Ok(())
}

/// Models for a leaf, most specific first: the leaf's files in reverse name
/// order, then its parent's, up to the root.
fn leaf_models(levels: &Levels, leaf: &[String]) -> Vec<Node> {
    (0..=leaf.len())
        .rev()
        .filter_map(|len| levels.get(&leaf[..len]))
        .flat_map(|models| models.iter().rev().cloned())
        .collect()
}

/// Template names for one leaf, honoring `templates:` and `exclude:`.
fn select_templates(
    ctx: &Context,
    templates: &BTreeMap<String, Document>,
    dir: &Path,
) -> Result<Vec<String>> {
    let mut selected = match ctx.root().get("templates") {
        Some(list) => {
            let mut names = Vec::new();
            for name in template_names(list, "templates")? {
                if !templates.contains_key(&name) {
                    bail!("template {name} not found in {}", dir.display());
                }
                names.push(name);
            }
            names
        }
        None => templates.keys().cloned().collect(),
    };

    if let Some(list) = ctx.root().get("exclude") {
        let excluded = template_names(list, "exclude")?;
        selected.retain(|name| !excluded.contains(name));
    }

    Ok(selected)
}

/// Reads a `templates:`/`exclude:` list into file names (`app` -> `app.yaml`).
fn template_names(list: &Node, key: &str) -> Result<Vec<String>> {
    let Some(items) = list.as_sequence() else {
        bail!("'{key}' must be a list of template names");
    };
    items
        .iter()
        .map(|item| match item.as_scalar() {
            Some(scalar) if !item.is_null() => Ok(format!("{scalar}.yaml")),
            _ => bail!("'{key}' must be a list of template names"),
        })
        .collect()
}

fn leaf_label(names: &[String]) -> String {
    if names.is_empty() {
        "<root>".to_string()
    } else {
        names.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yamja_render::parse;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn layout(root: &Path) -> StackLayout {
        StackLayout {
            variables: root.join("vars"),
            templates: root.join("templates"),
            output: root.join("output"),
        }
    }

    fn plan_in(root: &Path) -> Result<Vec<RenderedFile>> {
        plan(&layout(root), &Renderer::new(), &BTreeMap::new())
    }

    #[test]
    fn test_leaf_precedence_over_ancestors() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/common.yaml", "region: none\nsize: 1\nname: base\n");
        touch(root, "vars/prod/main.yaml", "size: 2\n");
        touch(root, "vars/prod/eu/main.yaml", "region: eu\n");
        touch(root, "templates/app.yaml", "region: ${region}\nsize: ${size}\nname: ${name}\n");

        let files = plan_in(root).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, root.join("output/prod/eu/app.yaml"));
        assert_eq!(
            parse(&files[0].contents).unwrap(),
            parse("region: eu\nsize: 2\nname: base\n").unwrap()
        );
    }

    #[test]
    fn test_later_file_wins_within_level() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/a/first.yaml", "x: first\n");
        touch(root, "vars/a/second.yaml", "x: second\n");
        touch(root, "templates/t.yaml", "x: ${x}\n");

        let files = plan_in(root).unwrap();
        assert_eq!(parse(&files[0].contents).unwrap(), parse("x: second\n").unwrap());
    }

    #[test]
    fn test_only_deepest_levels_render() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/shallow/main.yaml", "v: 1\n");
        touch(root, "vars/deep/one/main.yaml", "v: 2\n");
        touch(root, "vars/deep/two/main.yaml", "v: 3\n");
        touch(root, "templates/t.yaml", "v: ${v}\n");

        let paths: Vec<_> = plan_in(root).unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(
            paths,
            [
                root.join("output/deep/one/t.yaml"),
                root.join("output/deep/two/t.yaml"),
            ]
        );
    }

    #[test]
    fn test_template_selection_and_partials() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/a/main.yaml", "templates: [one, two]\nexclude: [two]\n");
        touch(root, "templates/one.yaml", "k: 1\n");
        touch(root, "templates/two.yaml", "k: 2\n");
        touch(root, "templates/three.yaml", "k: 3\n");
        touch(root, "templates/partials/p.yaml", "k: ${undefined}\n");

        let paths: Vec<_> = plan_in(root).unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, [root.join("output/a/one.yaml")]);
    }

    #[test]
    fn test_unknown_selected_template() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/a/main.yaml", "templates: [missing]\n");
        touch(root, "templates/one.yaml", "k: 1\n");

        let err = plan_in(root).unwrap_err();
        assert!(err.to_string().contains("template missing.yaml not found"));
    }

    #[test]
    fn test_missing_directories() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let err = plan_in(root).unwrap_err();
        assert!(err.to_string().starts_with("templates not found in"));

        fs::create_dir_all(root.join("templates")).unwrap();
        let err = plan_in(root).unwrap_err();
        assert!(err.to_string().starts_with("variables not found in"));
    }

    #[test]
    fn test_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/a/main.yaml", "x: 1\n");
        touch(root, "vars/b/main.yaml", "y: 1\n");
        touch(root, "templates/t.yaml", "x: ${x}\n");

        let err = run(&layout(root), &Renderer::new(), &BTreeMap::new()).unwrap_err();
        assert!(format!("{err:#}").contains("for b"));
        assert!(!root.join("output").exists());
    }

    #[test]
    fn test_overrides_apply_to_every_leaf() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/a/main.yaml", "tag: a\n");
        touch(root, "vars/b/main.yaml", "tag: b\n");
        touch(root, "templates/t.yaml", "tag: ${tag}\n");

        let overrides = BTreeMap::from([("TAG".to_string(), "pinned".to_string())]);
        let written = run(&layout(root), &Renderer::new(), &overrides).unwrap();
        assert_eq!(written, 2);
        for leaf in ["a", "b"] {
            let text = fs::read_to_string(root.join("output").join(leaf).join("t.yaml")).unwrap();
            assert_eq!(text, "tag: pinned\n");
        }
    }

    #[test]
    fn test_root_only_tree_renders_into_output() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/main.yaml", "v: 1\n");
        touch(root, "templates/t.yaml", "v: ${v}\n");

        let files = plan_in(root).unwrap();
        assert_eq!(files[0].path, root.join("output/t.yaml"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_loop_in_variables_is_not_followed() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "vars/prod/main.yaml", "v: 1\n");
        touch(root, "templates/t.yaml", "v: ${v}\n");
        std::os::unix::fs::symlink(root.join("vars"), root.join("vars/prod/back")).unwrap();

        let paths: Vec<_> = plan_in(root).unwrap().into_iter().map(|f| f.path).collect();
        assert_eq!(paths, [root.join("output/prod/t.yaml")]);
    }
}
