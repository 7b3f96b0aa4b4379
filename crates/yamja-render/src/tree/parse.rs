//! YAML text to [`Node`] trees, with source locations.
//!
//! Parsing is driven by `saphyr-parser`'s span-aware event stream. Events are
//! collected first, then folded into a tree with an explicit stack, so deeply
//! nested input cannot overflow the call stack while parsing.
//!
//! Aliases are expanded into copies of their anchored node. The total number
//! of copied nodes is capped by [`MAX_ALIAS_NODES`].

use std::collections::HashMap;
use std::fmt;

use saphyr_parser::{Event, Parser, ScalarStyle, Span, SpannedEventReceiver, Tag};

use super::scalar::{resolve_plain, resolve_tagged, CoreTag};
use super::{Mapping, Node, Path, Scalar};
use crate::error::{RenderError, Result};

/// Maximum container nesting accepted by the parser.
pub const MAX_PARSE_DEPTH: usize = 512;

/// Maximum number of nodes alias expansion may copy into one document.
pub const MAX_ALIAS_NODES: usize = 100_000;

const CORE_SCHEMA: &str = "tag:yaml.org,2002:";

/// A position in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    fn from_span(span: &Span) -> Self {
        Self {
            line: span.start.line(),
            column: span.start.col() + 1,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Node paths mapped to where each node starts in the source.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    locations: HashMap<Path, Location>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: Path, location: Location) {
        self.locations.insert(path, location);
    }

    pub fn get(&self, path: &Path) -> Option<Location> {
        self.locations.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// A parsed document: its tree and where each node came from.
///
/// Two documents are equal when their trees are; locations are ignored.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root: Node,
    pub source_map: SourceMap,
}

impl Document {
    /// Wraps a tree that has no source text (locations are unknown).
    pub fn from_node(root: Node) -> Self {
        Self {
            root,
            source_map: SourceMap::new(),
        }
    }

    pub fn location(&self, path: &Path) -> Option<Location> {
        self.source_map.get(path)
    }

    pub fn into_node(self) -> Node {
        self.root
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

/// Parses YAML text into a tree.
pub fn parse(text: &str) -> Result<Node> {
    parse_document(text).map(Document::into_node)
}

/// Parses YAML text into a tree plus its source map.
///
/// ```rust
/// use yamja_render::tree::{parse_document, Location, Path};
///
/// let doc = parse_document("spec:\n  replicas: 3\n").unwrap();
/// let path = Path::parse("spec.replicas").unwrap();
/// assert_eq!(doc.location(&path), Some(Location::new(2, 13)));
/// ```
pub fn parse_document(text: &str) -> Result<Document> {
    let mut collector = EventCollector::default();
    Parser::new_from_str(text)
        .load(&mut collector, true)
        .map_err(|e| {
            let marker = e.marker();
            RenderError::parse_at(
                e.info().to_string(),
                Location::new(marker.line(), marker.col() + 1),
            )
        })?;

    let mut builder = TreeBuilder::default();
    for (event, location) in collector.events {
        builder.on_event(event, location)?;
    }
    let document = builder.finish();
    tracing::trace!(nodes = document.source_map.len(), "parsed document");
    Ok(document)
}

/// Owned copy of the parser events the tree builder needs.
#[derive(Debug)]
enum OwnedEvent {
    DocumentStart,
    Alias(usize),
    Scalar {
        value: String,
        plain: bool,
        anchor: usize,
        tag: Option<NodeTag>,
    },
    SequenceStart {
        anchor: usize,
        tag: Option<NodeTag>,
    },
    SequenceEnd,
    MappingStart {
        anchor: usize,
        tag: Option<NodeTag>,
    },
    MappingEnd,
}

/// An explicit node tag, reduced to what the tree builder acts on.
#[derive(Debug, Clone, PartialEq)]
enum NodeTag {
    /// A scalar type from the core schema (`!!str`, `!!int`, ...).
    Core(CoreTag),
    Seq,
    Map,
    /// The bare `!` tag: the scalar is a string.
    NonSpecific,
    /// Anything else, kept as written for the error message.
    Other(String),
}

impl From<&Tag> for NodeTag {
    fn from(tag: &Tag) -> Self {
        let full = format!("{}{}", tag.handle, tag.suffix);
        if let Some(name) = full.strip_prefix(CORE_SCHEMA) {
            return match name {
                "seq" => NodeTag::Seq,
                "map" => NodeTag::Map,
                _ => CoreTag::from_suffix(name)
                    .map(NodeTag::Core)
                    .unwrap_or_else(|| NodeTag::Other(format!("!!{name}"))),
            };
        }
        if tag.handle.is_empty() && tag.suffix == "!" {
            return NodeTag::NonSpecific;
        }
        NodeTag::Other(full)
    }
}

fn unsupported_tag(tag: &NodeTag, what: &str, location: Location) -> RenderError {
    let name = match tag {
        NodeTag::Core(core) => core.to_string(),
        NodeTag::Seq => "!!seq".to_string(),
        NodeTag::Map => "!!map".to_string(),
        NodeTag::NonSpecific => "!".to_string(),
        NodeTag::Other(name) => name.clone(),
    };
    RenderError::parse_at(format!("tag '{name}' is not supported on {what}"), location)
}

/// Types a scalar from its text, quoting and tag.
fn resolve_scalar(
    value: String,
    plain: bool,
    tag: Option<NodeTag>,
    location: Location,
) -> Result<Scalar> {
    match tag {
        None if plain => Ok(resolve_plain(&value)),
        None | Some(NodeTag::NonSpecific) => Ok(Scalar::String(value)),
        Some(NodeTag::Core(core)) => resolve_tagged(&value, core).ok_or_else(|| {
            RenderError::parse_at(format!("'{value}' is not a valid {core} value"), location)
        }),
        Some(other) => Err(unsupported_tag(&other, "a scalar", location)),
    }
}

/// Number of nodes in a tree, counted without recursion.
fn node_count(node: &Node) -> usize {
    let mut count = 0;
    let mut pending = vec![node];
    while let Some(node) = pending.pop() {
        count += 1;
        match node {
            Node::Sequence(items) => pending.extend(items),
            Node::Mapping(entries) => pending.extend(entries.values()),
            Node::Scalar(_) => {}
        }
    }
    count
}

#[derive(Default)]
struct EventCollector {
    events: Vec<(OwnedEvent, Location)>,
}

impl SpannedEventReceiver<'_> for EventCollector {
    fn on_event(&mut self, event: Event<'_>, span: Span) {
        let owned = match event {
            Event::DocumentStart(_) => OwnedEvent::DocumentStart,
            Event::Alias(id) => OwnedEvent::Alias(id),
            Event::Scalar(value, style, anchor, tag) => OwnedEvent::Scalar {
                value: value.into_owned(),
                plain: matches!(style, ScalarStyle::Plain),
                anchor,
                tag: tag.as_deref().map(NodeTag::from),
            },
            Event::SequenceStart(anchor, tag) => OwnedEvent::SequenceStart {
                anchor,
                tag: tag.as_deref().map(NodeTag::from),
            },
            Event::SequenceEnd => OwnedEvent::SequenceEnd,
            Event::MappingStart(anchor, tag) => OwnedEvent::MappingStart {
                anchor,
                tag: tag.as_deref().map(NodeTag::from),
            },
            Event::MappingEnd => OwnedEvent::MappingEnd,
            Event::StreamStart | Event::StreamEnd | Event::DocumentEnd | Event::Nothing => return,
        };
        self.events.push((owned, Location::from_span(&span)));
    }
}

enum Frame {
    Sequence {
        items: Vec<Node>,
        anchor: usize,
        path: Path,
    },
    Mapping {
        entries: Mapping,
        pending_key: Option<String>,
        anchor: usize,
        path: Path,
    },
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Frame>,
    /// Anchored nodes with their node counts.
    anchors: HashMap<usize, (Node, usize)>,
    root: Option<Node>,
    source_map: SourceMap,
    documents: usize,
    /// Nodes copied by alias expansion so far.
    expanded: usize,
}

impl TreeBuilder {
    fn on_event(&mut self, event: OwnedEvent, location: Location) -> Result<()> {
        match event {
            OwnedEvent::DocumentStart => {
                self.documents += 1;
                if self.documents > 1 {
                    return Err(RenderError::parse_at(
                        "multiple documents in one stream are not supported",
                        location,
                    ));
                }
            }
            OwnedEvent::Scalar {
                value,
                plain,
                anchor,
                tag,
            } => {
                if self.awaiting_key() {
                    // Keys are stored as written; a tag only has to accept the text.
                    resolve_scalar(value.clone(), plain, tag, location)?;
                    if anchor != 0 {
                        self.anchors.insert(anchor, (Node::from(value.as_str()), 1));
                    }
                    return self.set_key(value, location);
                }
                let scalar = resolve_scalar(value, plain, tag, location)?;
                self.complete(Node::Scalar(scalar), anchor, location);
            }
            OwnedEvent::Alias(id) => {
                let node = self.expand(id, location)?;
                if self.awaiting_key() {
                    let key = match node {
                        Node::Scalar(Scalar::Null) => "null".to_string(),
                        Node::Scalar(scalar) => scalar.to_string(),
                        _ => {
                            return Err(RenderError::parse_at(
                                "mapping keys must be scalars",
                                location,
                            ))
                        }
                    };
                    return self.set_key(key, location);
                }
                self.complete(node, 0, location);
            }
            OwnedEvent::SequenceStart { anchor, tag } => {
                if let Some(tag) = tag.filter(|tag| *tag != NodeTag::Seq) {
                    return Err(unsupported_tag(&tag, "a sequence", location));
                }
                let path = self.open(location)?;
                self.stack.push(Frame::Sequence {
                    items: Vec::new(),
                    anchor,
                    path,
                });
            }
            OwnedEvent::MappingStart { anchor, tag } => {
                if let Some(tag) = tag.filter(|tag| *tag != NodeTag::Map) {
                    return Err(unsupported_tag(&tag, "a mapping", location));
                }
                let path = self.open(location)?;
                self.stack.push(Frame::Mapping {
                    entries: Mapping::new(),
                    pending_key: None,
                    anchor,
                    path,
                });
            }
            OwnedEvent::SequenceEnd | OwnedEvent::MappingEnd => {
                let (node, anchor) = match self.stack.pop() {
                    Some(Frame::Sequence { items, anchor, .. }) => (Node::Sequence(items), anchor),
                    Some(Frame::Mapping {
                        entries, anchor, ..
                    }) => (Node::Mapping(entries), anchor),
                    None => {
                        return Err(RenderError::parse_at(
                            "unbalanced collection end",
                            location,
                        ))
                    }
                };
                // Location was recorded when the collection opened.
                self.attach(node, anchor);
            }
        }
        Ok(())
    }

    /// Copies an anchored node, charging its size to the expansion budget.
    fn expand(&mut self, id: usize, location: Location) -> Result<Node> {
        let (node, size) = self.anchors.get(&id).ok_or_else(|| {
            RenderError::parse_at("alias refers to an undefined anchor", location)
        })?;
        self.expanded += size;
        if self.expanded > MAX_ALIAS_NODES {
            return Err(RenderError::parse_at(
                format!("alias expansion exceeds {MAX_ALIAS_NODES} nodes"),
                location,
            ));
        }
        Ok(node.clone())
    }

    fn awaiting_key(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame::Mapping {
                pending_key: None,
                ..
            })
        )
    }

    fn set_key(&mut self, key: String, location: Location) -> Result<()> {
        if let Some(Frame::Mapping {
            entries,
            pending_key,
            ..
        }) = self.stack.last_mut()
        {
            if entries.contains_key(&key) {
                return Err(RenderError::parse_at(
                    format!("duplicate mapping key '{key}'"),
                    location,
                ));
            }
            *pending_key = Some(key);
        }
        Ok(())
    }

    /// Path of the value about to be added to the innermost container.
    fn next_path(&self) -> Path {
        match self.stack.last() {
            None => Path::root(),
            Some(Frame::Sequence { items, path, .. }) => path.child(items.len().to_string()),
            Some(Frame::Mapping {
                pending_key, path, ..
            }) => path.child(pending_key.clone().unwrap_or_default()),
        }
    }

    /// Starts a collection: checks it may open here and records its location.
    fn open(&mut self, location: Location) -> Result<Path> {
        if self.awaiting_key() {
            return Err(RenderError::parse_at(
                "mapping keys must be scalars",
                location,
            ));
        }
        if self.stack.len() >= MAX_PARSE_DEPTH {
            return Err(RenderError::parse_at(
                format!("nesting exceeds {MAX_PARSE_DEPTH} levels"),
                location,
            ));
        }
        let path = self.next_path();
        self.source_map.insert(path.clone(), location);
        Ok(path)
    }

    fn complete(&mut self, node: Node, anchor: usize, location: Location) {
        self.source_map.insert(self.next_path(), location);
        self.attach(node, anchor);
    }

    fn attach(&mut self, node: Node, anchor: usize) {
        if anchor != 0 {
            self.anchors.insert(anchor, (node.clone(), node_count(&node)));
        }
        match self.stack.last_mut() {
            None => self.root = Some(node),
            Some(Frame::Sequence { items, .. }) => items.push(node),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => {
                if let Some(key) = pending_key.take() {
                    entries.insert(key, node);
                }
            }
        }
    }

    fn finish(self) -> Document {
        Document {
            root: self.root.unwrap_or_default(),
            source_map: self.source_map,
        }
    }
}
