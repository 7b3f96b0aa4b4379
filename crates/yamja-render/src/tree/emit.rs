//! Serializer boundary: resolved trees to YAML or JSON text.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::{Node, Number, Scalar};
use crate::error::{RenderError, Result};

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            Number::I64(n) => serializer.serialize_i64(n),
            Number::U64(n) => serializer.serialize_u64(n),
            Number::F64(n) => serializer.serialize_f64(n),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Number(n) => n.serialize(serializer),
            Scalar::String(s) => serializer.serialize_str(s),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(scalar) => scalar.serialize(serializer),
            Node::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Emits a tree as YAML.
///
/// Strings that would read back as another type are quoted, so parsing the
/// output yields an equal tree.
///
/// ```rust
/// use yamja_render::tree::{parse, to_yaml};
///
/// let node = parse("name: web\nreplicas: 3\n").unwrap();
/// assert_eq!(to_yaml(&node).unwrap(), "name: web\nreplicas: 3\n");
/// ```
pub fn to_yaml(node: &Node) -> Result<String> {
    serde_yaml::to_string(node).map_err(RenderError::from)
}

/// Emits a tree as pretty-printed JSON with a trailing newline.
///
/// JSON has no representation for non-finite floats; they become `null`.
pub fn to_json(node: &Node) -> Result<String> {
    let mut text = serde_json::to_string_pretty(node)?;
    text.push('\n');
    Ok(text)
}
