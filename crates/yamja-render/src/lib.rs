//! # Yamja Render - Structure-Preserving YAML Templates
//!
//! `yamja-render` fills YAML templates from layered YAML models. Templates are
//! parsed into a tree before anything is substituted, so values keep their
//! types and whole subtrees can be spliced in without indentation games.
//!
//! ## Core Concepts
//!
//! - [`Node`]: The YAML tree shared by templates, models and output
//! - [`Context`]: Models merged "first match wins", plus environment overrides
//! - [`Renderer`]: Walks a template and resolves every `${…}` expression
//! - [`RenderError`]: One terminal error, with path and source location
//!
//! ## Quick Start
//!
//! ```rust
//! use yamja_render::{parse, render_str, Context, Node};
//!
//! let cluster = parse("replicas: 3\n").unwrap();
//! let defaults = parse("replicas: 1\nimage:\n  name: web\n  tag: latest\n").unwrap();
//!
//! let ctx = Context::builder()
//!     .model(cluster)
//!     .model(defaults)
//!     .env_override("IMAGE_TAG", "1.4.2")
//!     .build()
//!     .unwrap();
//!
//! let out = render_str(
//!     "replicas: ${replicas}\nimage: ${image.name}:${image.tag}\nmode: ${mode | default(prod)}\n",
//!     &ctx,
//! )
//! .unwrap();
//!
//! assert_eq!(out.get("replicas"), Some(&Node::from(3i64)));
//! assert_eq!(out.get("image"), Some(&Node::from("web:1.4.2")));
//! assert_eq!(out.get("mode"), Some(&Node::from("prod")));
//! ```
//!
//! ## Expressions
//!
//! | Form | Result |
//! |------|--------|
//! | `${a.b}` alone | the node at `a.b`, any type |
//! | `text ${a.b}` | `a.b` interpolated as text |
//! | `${a \| default(x)}` | `x` when `a` is absent |
//! | `$${` | a literal `${` |
//!
//! ## Errors
//!
//! Each failure is a [`RenderError`] whose [`ErrorKind`] tells callers which
//! class of problem occurred. Nothing is emitted for a failed render.

pub mod context;
pub mod error;
pub mod template;
pub mod tree;

pub use context::{Context, ContextBuilder};
pub use error::{ErrorKind, RenderError, Result};
pub use template::{render, render_document, render_str, Expression, Renderer, DEFAULT_MAX_DEPTH};
pub use tree::{
    equals, parse, parse_document, to_json, to_yaml, Document, Location, Mapping, Node, NodeKind,
    Number, Path, Scalar,
};
