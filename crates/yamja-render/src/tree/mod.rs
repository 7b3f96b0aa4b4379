//! In-memory YAML tree shared by templates and models.
//!
//! A YAML document is represented as a [`Node`]: a scalar, a sequence, or a
//! mapping with string keys. Templates and models use the same type, so a value
//! looked up in a model can be spliced into a template without conversion.
//!
//! # Parsing
//!
//! [`parse`] turns YAML text into a bare [`Node`]. [`parse_document`] also keeps
//! a [`SourceMap`] from node paths to source locations, which the renderer uses
//! to point diagnostics at the template line that failed.
//!
//! ```rust
//! use yamja_render::tree::{parse, Node};
//!
//! let node = parse("replicas: 3\nname: web\n").unwrap();
//! assert_eq!(node.get("replicas"), Some(&Node::from(3i64)));
//! assert_eq!(node.get("name").and_then(Node::as_str), Some("web"));
//! ```
//!
//! # Equality
//!
//! Equality is structural. Mapping order is kept for output but ignored when
//! comparing, and `NaN` compares equal to itself so that rendering a document
//! containing `.nan` is still idempotent.

mod emit;
mod parse;
mod path;
mod scalar;

pub use emit::{to_json, to_yaml};
pub use parse::{
    parse, parse_document, Document, Location, SourceMap, MAX_ALIAS_NODES, MAX_PARSE_DEPTH,
};
pub use path::Path;
pub use scalar::{resolve_plain, resolve_tagged, CoreTag, Number, Scalar};

use indexmap::IndexMap;
use std::fmt;

/// Insertion-ordered mapping from string keys to nodes.
pub type Mapping = IndexMap<String, Node>;

/// A YAML value: scalar, sequence, or mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A single value (null, bool, number or string).
    Scalar(Scalar),
    /// An ordered list of nodes.
    Sequence(Vec<Node>),
    /// String-keyed nodes, keys unique.
    Mapping(Mapping),
}

/// The shape of a [`Node`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::Sequence => "sequence",
            NodeKind::Mapping => "mapping",
        };
        f.write_str(name)
    }
}

impl Node {
    /// Creates a null scalar.
    pub fn null() -> Self {
        Node::Scalar(Scalar::Null)
    }

    /// Creates an empty mapping.
    pub fn mapping() -> Self {
        Node::Mapping(Mapping::new())
    }

    /// Returns the shape of this node.
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Scalar(Scalar::Null) => NodeKind::Null,
            Node::Scalar(Scalar::Bool(_)) => NodeKind::Bool,
            Node::Scalar(Scalar::Number(_)) => NodeKind::Number,
            Node::Scalar(Scalar::String(_)) => NodeKind::String,
            Node::Sequence(_) => NodeKind::Sequence,
            Node::Mapping(_) => NodeKind::Mapping,
        }
    }

    /// Returns `true` for a null scalar.
    pub fn is_null(&self) -> bool {
        matches!(self, Node::Scalar(Scalar::Null))
    }

    /// Returns `true` for sequences and mappings.
    pub fn is_composite(&self) -> bool {
        matches!(self, Node::Sequence(_) | Node::Mapping(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Node]> {
        match self {
            Node::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up one path segment.
    ///
    /// Mappings are indexed by key. Sequences are indexed by a decimal
    /// position; any other segment misses.
    pub fn get(&self, segment: &str) -> Option<&Node> {
        match self {
            Node::Mapping(map) => map.get(segment),
            Node::Sequence(items) => items.get(segment.parse::<usize>().ok()?),
            Node::Scalar(_) => None,
        }
    }

    /// Mutable variant of [`Node::get`].
    pub fn get_mut(&mut self, segment: &str) -> Option<&mut Node> {
        match self {
            Node::Mapping(map) => map.get_mut(segment),
            Node::Sequence(items) => items.get_mut(segment.parse::<usize>().ok()?),
            Node::Scalar(_) => None,
        }
    }

    /// Resolves a full path from this node.
    pub fn lookup(&self, path: &Path) -> Option<&Node> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.get(segment))
    }
}

/// Structural equality of two trees.
///
/// Same as `a == b`; provided as a named operation for idempotence checks.
pub fn equals(a: &Node, b: &Node) -> bool {
    a == b
}

impl Default for Node {
    fn default() -> Self {
        Node::null()
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Scalar(Scalar::String(s))
    }
}

impl From<bool> for Node {
    fn from(b: bool) -> Self {
        Node::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for Node {
    fn from(n: i64) -> Self {
        Node::Scalar(Scalar::Number(Number::I64(n)))
    }
}

impl From<f64> for Node {
    fn from(n: f64) -> Self {
        Node::Scalar(Scalar::Number(Number::F64(n)))
    }
}

impl From<Vec<Node>> for Node {
    fn from(items: Vec<Node>) -> Self {
        Node::Sequence(items)
    }
}

impl From<Mapping> for Node {
    fn from(map: Mapping) -> Self {
        Node::Mapping(map)
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        Node::Mapping(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
