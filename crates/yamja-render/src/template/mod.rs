//! Template rendering: expressions, evaluation, and the tree walk.
//!
//! A template is an ordinary YAML tree. Any string scalar may contain
//! `${path}` or `${path | default(value)}` expressions (see [`expr`]):
//!
//! - A scalar that is exactly one expression is replaced by the resolved node,
//!   keeping its type. A mapping or sequence is spliced in whole.
//! - An expression inside longer text is interpolated as a string.
//!
//! Mapping keys, non-string scalars, and values spliced in from models are
//! never evaluated.
//!
//! ```rust
//! use yamja_render::context::Context;
//! use yamja_render::template::render_str;
//! use yamja_render::tree::{parse, Node};
//!
//! let ctx = Context::builder()
//!     .model(parse("db:\n  host: db1\n  port: 5432\n").unwrap())
//!     .build()
//!     .unwrap();
//!
//! let out = render_str("database: ${db}\ndsn: pg://${db.host}:${db.port}\n", &ctx).unwrap();
//! assert_eq!(out.get("database"), ctx.root().get("db"));
//! assert_eq!(out.get("dsn"), Some(&Node::from("pg://db1:5432")));
//! ```

pub mod expr;

mod eval;
mod renderer;

pub use eval::{evaluate, evaluate_at};
pub use expr::{Expression, Piece, ScalarTemplate};
pub use renderer::{Renderer, DEFAULT_MAX_DEPTH};

use crate::context::Context;
use crate::error::Result;
use crate::tree::{Document, Node};

/// Renders a tree with the default [`Renderer`].
pub fn render(template: &Node, ctx: &Context) -> Result<Node> {
    Renderer::new().render(template, ctx)
}

/// Renders a parsed document with the default [`Renderer`].
pub fn render_document(document: &Document, ctx: &Context) -> Result<Node> {
    Renderer::new().render_document(document, ctx)
}

/// Parses and renders YAML text with the default [`Renderer`].
pub fn render_str(template: &str, ctx: &Context) -> Result<Node> {
    Renderer::new().render_str(template, ctx)
}
