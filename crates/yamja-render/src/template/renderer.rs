//! Tree walk that resolves every expression in a template.

use crate::context::Context;
use crate::error::{RenderError, Result};
use crate::tree::{parse_document, Document, Mapping, Node, Path, Scalar, SourceMap};

use super::eval::{evaluate_at, interpolate};
use super::expr::{Piece, ScalarTemplate};

/// Default limit on template nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Resolves templates against a [`Context`].
///
/// A renderer holds only configuration, so one instance can be reused for
/// any number of templates and contexts.
///
/// # Example
///
/// ```rust
/// use yamja_render::context::Context;
/// use yamja_render::template::Renderer;
/// use yamja_render::tree::{parse, Node};
///
/// let ctx = Context::builder()
///     .model(parse("port: 8080\n").unwrap())
///     .build()
///     .unwrap();
///
/// let out = Renderer::new()
///     .max_depth(16)
///     .render(&parse("listen: ${port}\nurl: http://h:${port}\n").unwrap(), &ctx)
///     .unwrap();
///
/// assert_eq!(out.get("listen"), Some(&Node::from(8080i64)));
/// assert_eq!(out.get("url"), Some(&Node::from("http://h:8080")));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    max_depth: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the nesting limit. Nodes deeper than `depth` fail to render.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn limit(&self) -> usize {
        self.max_depth
    }

    /// Renders a bare tree. Errors carry no source location.
    pub fn render(&self, template: &Node, ctx: &Context) -> Result<Node> {
        self.walk(template, ctx, &SourceMap::new())
    }

    /// Renders a parsed document, locating errors in its source text.
    pub fn render_document(&self, document: &Document, ctx: &Context) -> Result<Node> {
        self.walk(&document.root, ctx, &document.source_map)
    }

    /// Parses and renders YAML text.
    pub fn render_str(&self, template: &str, ctx: &Context) -> Result<Node> {
        let document = parse_document(template)?;
        self.render_document(&document, ctx)
    }

    fn walk(&self, template: &Node, ctx: &Context, sources: &SourceMap) -> Result<Node> {
        tracing::debug!(limit = self.max_depth, "rendering template");
        let mut walk = Walk {
            ctx,
            sources,
            limit: self.max_depth,
            substitutions: 0,
        };
        let out = walk.node(template, &Path::root(), 0)?;
        tracing::debug!(substitutions = walk.substitutions, "rendered template");
        Ok(out)
    }
}

struct Walk<'a> {
    ctx: &'a Context,
    sources: &'a SourceMap,
    limit: usize,
    substitutions: usize,
}

impl Walk<'_> {
    fn node(&mut self, node: &Node, path: &Path, depth: usize) -> Result<Node> {
        if depth > self.limit {
            return Err(RenderError::TemplateTooDeep {
                limit: self.limit,
                path: path.clone(),
                location: self.sources.get(path),
            });
        }

        match node {
            Node::Scalar(Scalar::String(text)) => self.string(text, path),
            Node::Scalar(_) => Ok(node.clone()),
            Node::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.node(item, &path.child(index.to_string()), depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Node::Sequence),
            Node::Mapping(entries) => {
                let mut out = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    let rendered = self.node(value, &path.child(key.as_str()), depth + 1)?;
                    out.insert(key.clone(), rendered);
                }
                Ok(Node::Mapping(out))
            }
        }
    }

    fn string(&mut self, text: &str, path: &Path) -> Result<Node> {
        let location = self.sources.get(path);
        let template = ScalarTemplate::parse(text).map_err(|e| e.located(location))?;

        if let Some(expr) = template.whole() {
            let value = evaluate_at(expr, self.ctx, location)?;
            self.substitutions += 1;
            tracing::trace!(at = %path, expr = %expr, "whole-value substitution");
            return Ok(value);
        }

        let mut out = String::with_capacity(text.len());
        for piece in template.pieces() {
            match piece {
                Piece::Text(literal) => out.push_str(literal),
                Piece::Expr(expr) => {
                    let value = evaluate_at(expr, self.ctx, location)?;
                    out.push_str(&interpolate(expr, &value, location)?);
                    self.substitutions += 1;
                    tracing::trace!(at = %path, expr = %expr, "interpolated");
                }
            }
        }
        Ok(Node::from(out))
    }
}
