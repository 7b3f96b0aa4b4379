//! Lookup context built from layered models and environment overrides.
//!
//! A [`Context`] is the single merged view that expressions are resolved
//! against. It is built once per render and never changes afterwards.
//!
//! # Precedence
//!
//! Models are given most specific first. When several models define the same
//! key, the earliest one wins ("first match wins"):
//!
//! - Mappings at the same path are merged key by key, recursively.
//! - Sequences and scalars are taken whole from the winning model; sequences
//!   are never concatenated.
//! - A mapping on one side and anything else on the other is a
//!   [`RenderError::MergeConflict`] rather than a silent pick.
//!
//! Environment overrides are applied last and always win.
//!
//! # Environment Overrides
//!
//! Override keys are flat names mapped to paths by splitting on `_` and
//! lowercasing: `DB_PRIMARY_HOST` sets `db.primary.host`. The value is stored
//! as a string scalar. Missing intermediate mappings are created; a numeric
//! segment that addresses an existing sequence element replaces that element.
//!
//! The core never reads the process environment; callers capture it and pass
//! the pairs in (the `yamja` binary strips its prefix first).
//!
//! # Example
//!
//! ```rust
//! use yamja_render::context::Context;
//! use yamja_render::tree::{parse, Node, Path};
//!
//! let specific = parse("replicas: 5\n").unwrap();
//! let defaults = parse("replicas: 1\nimage: web:latest\n").unwrap();
//!
//! let ctx = Context::builder()
//!     .model(specific)
//!     .model(defaults)
//!     .env_override("IMAGE", "web:1.2")
//!     .build()
//!     .unwrap();
//!
//! let lookup = |p: &str| ctx.lookup(&Path::parse(p).unwrap()).cloned();
//! assert_eq!(lookup("replicas"), Some(Node::from(5i64)));
//! assert_eq!(lookup("image"), Some(Node::from("web:1.2")));
//! ```

use std::collections::BTreeMap;

use indexmap::map::Entry;

use crate::error::{RenderError, Result};
use crate::tree::{Mapping, Node, NodeKind, Path, Scalar};

/// Merged, immutable view of all models plus environment overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    root: Mapping,
}

impl Context {
    /// Builds a context from models (most specific first) and overrides.
    pub fn build<M, E, K, V>(models: M, env_overrides: E) -> Result<Self>
    where
        M: IntoIterator<Item = Node>,
        E: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::builder()
            .models(models)
            .env_overrides(env_overrides)
            .build()
    }

    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    /// A context with no values.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The merged top-level mapping.
    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Resolves a path against the merged view.
    ///
    /// The root path itself does not resolve to a node.
    pub fn lookup(&self, path: &Path) -> Option<&Node> {
        let (first, rest) = path.segments().split_first()?;
        rest.iter()
            .try_fold(self.root.get(first)?, |node, segment| node.get(segment))
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

/// Incremental construction of a [`Context`].
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    models: Vec<Node>,
    overrides: BTreeMap<String, String>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model with lower precedence than every model added before it.
    pub fn model(mut self, model: Node) -> Self {
        self.models.push(model);
        self
    }

    pub fn models<I: IntoIterator<Item = Node>>(mut self, models: I) -> Self {
        self.models.extend(models);
        self
    }

    /// Adds one environment override, e.g. `("DB_HOST", "db.internal")`.
    pub fn env_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    pub fn env_overrides<E, K, V>(mut self, overrides: E) -> Self
    where
        E: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Merges the models and applies the overrides.
    ///
    /// Overrides are applied in lexical key order, so `A_B` is set before
    /// `A_B_C` and the deeper key wins.
    pub fn build(self) -> Result<Context> {
        let model_count = self.models.len();
        let mut root = Mapping::new();

        for (index, model) in self.models.into_iter().enumerate() {
            match model {
                Node::Mapping(entries) => merge_lower(&mut root, entries, &Path::root())?,
                Node::Scalar(Scalar::Null) => {
                    tracing::debug!(model = index, "skipping empty model");
                }
                other => {
                    return Err(RenderError::MergeConflict {
                        path: Path::root(),
                        existing: NodeKind::Mapping,
                        incoming: other.kind(),
                    })
                }
            }
        }

        let mut applied = 0;
        for (key, value) in self.overrides {
            let Some(path) = override_path(&key) else {
                tracing::warn!(key = %key, "ignoring environment override with an empty segment");
                continue;
            };
            tracing::trace!(key = %key, path = %path, "applying environment override");
            let mut node = Node::Mapping(std::mem::take(&mut root));
            set_path(&mut node, path.segments(), Node::from(value));
            if let Node::Mapping(entries) = node {
                root = entries;
            }
            applied += 1;
        }

        tracing::debug!(
            models = model_count,
            overrides = applied,
            keys = root.len(),
            "built context"
        );
        Ok(Context { root })
    }
}

/// Merges a lower-precedence mapping into `target`.
///
/// Keys already present in `target` keep their value unless both sides are
/// mappings, in which case they merge recursively.
fn merge_lower(target: &mut Mapping, lower: Mapping, path: &Path) -> Result<()> {
    for (key, incoming) in lower {
        match target.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
            Entry::Occupied(mut slot) => {
                let child_path = path.child(slot.key().clone());
                match (slot.get_mut(), incoming) {
                    (Node::Mapping(existing), Node::Mapping(incoming)) => {
                        merge_lower(existing, incoming, &child_path)?;
                    }
                    (existing, incoming)
                        if matches!(existing, Node::Mapping(_))
                            || matches!(incoming, Node::Mapping(_)) =>
                    {
                        return Err(RenderError::MergeConflict {
                            path: child_path,
                            existing: existing.kind(),
                            incoming: incoming.kind(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

/// Maps `A_B_C` to `a.b.c`; `None` if any segment is empty.
fn override_path(key: &str) -> Option<Path> {
    let segments: Vec<String> = key.split('_').map(str::to_lowercase).collect();
    if segments.iter().any(String::is_empty) {
        return None;
    }
    Some(Path::from_segments(segments))
}

fn set_path(node: &mut Node, segments: &[String], value: Node) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if let Node::Sequence(items) = node {
        if let Some(item) = first.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            set_path(item, rest, value);
            return;
        }
    }

    if !matches!(node, Node::Mapping(_)) {
        *node = Node::mapping();
    }
    if let Node::Mapping(entries) = node {
        let child = entries.entry(first.clone()).or_insert_with(Node::null);
        set_path(child, rest, value);
    }
}
