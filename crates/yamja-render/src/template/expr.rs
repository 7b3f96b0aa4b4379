//! Expression syntax embedded in template scalars.
//!
//! # Syntax
//!
//! - `${path}` - Look up a dotted path: `${db.host}`, `${servers.0.name}`
//! - `${path | default(literal)}` - Fall back to `literal` when `path` is absent
//! - `$${` - Escaped opener (renders as `${`)
//!
//! Path segments are identifiers (`[A-Za-z_][A-Za-z0-9_-]*`) or decimal
//! indices. The default literal is a YAML scalar: `'…'` and `"…"` are strings,
//! anything else is typed like a plain scalar (`default(5)` is a number).
//!
//! Whitespace inside the braces is ignored. Nothing else is supported: no
//! other filters, no operators, no function calls.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{RenderError, Result};
use crate::tree::{resolve_plain, Path, Scalar};

static SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*|[0-9]+)$").expect("valid regex"));

/// A parsed `${…}` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    path: Path,
    default: Option<Scalar>,
    source: String,
}

impl Expression {
    /// Parses the text between `${` and `}`.
    pub fn parse(body: &str) -> Result<Self> {
        let source = body.trim();
        let (path_text, filter) = match source.split_once('|') {
            Some((path, filter)) => (path.trim(), Some(filter.trim())),
            None => (source, None),
        };

        if path_text.is_empty() {
            return Err(RenderError::parse("empty expression"));
        }
        let path = Path::parse(path_text)
            .filter(|p| p.segments().iter().all(|s| SEGMENT.is_match(s)))
            .ok_or_else(|| RenderError::parse(format!("invalid variable path '{path_text}'")))?;

        let default = filter.map(parse_default).transpose()?;

        Ok(Self {
            path,
            default,
            source: source.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default(&self) -> Option<&Scalar> {
        self.default.as_ref()
    }
}

impl FromStr for Expression {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.source)
    }
}

/// Parses `default(<literal>)`.
fn parse_default(filter: &str) -> Result<Scalar> {
    let name_end = filter
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(filter.len());
    let name = &filter[..name_end];
    if name != "default" {
        return Err(RenderError::parse(format!(
            "unknown filter '{name}'; only default(...) is supported"
        )));
    }

    let args = filter[name_end..]
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| RenderError::parse("default expects one argument: default(<value>)"))?;

    parse_literal(args.trim())
}

fn parse_literal(text: &str) -> Result<Scalar> {
    if text.is_empty() {
        return Err(RenderError::parse("default() needs a value"));
    }
    if let Some(inner) = text.strip_prefix('\'') {
        let inner = inner
            .strip_suffix('\'')
            .ok_or_else(|| RenderError::parse(format!("unterminated string {text}")))?;
        return Ok(Scalar::String(inner.replace("''", "'")));
    }
    if let Some(inner) = text.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| RenderError::parse(format!("unterminated string {text}")))?;
        return unescape_double(inner).map(Scalar::String);
    }
    if text.contains(['(', ')', '|', '"', '\'']) {
        return Err(RenderError::parse(format!("invalid default value '{text}'")));
    }
    Ok(resolve_plain(text))
}

fn unescape_double(inner: &str) -> Result<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                return Err(RenderError::parse(format!(
                    "unknown escape '\\{other}' in default value"
                )))
            }
            None => return Err(RenderError::parse("dangling escape in default value")),
        }
    }
    Ok(out)
}

/// One run of a scalar's text: literal or expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece {
    Text(String),
    Expr(Expression),
}

/// A string scalar split into literal text and expressions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarTemplate {
    pieces: Vec<Piece>,
}

impl ScalarTemplate {
    /// Splits `text` into pieces.
    ///
    /// ```rust
    /// use yamja_render::template::ScalarTemplate;
    ///
    /// let tpl = ScalarTemplate::parse("http://${host}:${port | default(80)}").unwrap();
    /// assert_eq!(tpl.expressions().count(), 2);
    /// assert!(tpl.whole().is_none());
    ///
    /// let tpl = ScalarTemplate::parse("${cluster}").unwrap();
    /// assert_eq!(tpl.whole().unwrap().path().to_string(), "cluster");
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while let Some(pos) = rest.find('$') {
            literal.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("$${") {
                literal.push_str("${");
                rest = &tail[3..];
            } else if let Some(body_and_rest) = tail.strip_prefix("${") {
                let close = find_close(body_and_rest).ok_or_else(|| {
                    RenderError::parse(format!("unclosed expression in '{text}'"))
                })?;
                if !literal.is_empty() {
                    pieces.push(Piece::Text(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Expr(Expression::parse(&body_and_rest[..close])?));
                rest = &body_and_rest[close + 1..];
            } else {
                literal.push('$');
                rest = &tail[1..];
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            pieces.push(Piece::Text(literal));
        }

        Ok(Self { pieces })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// The expression, if the whole text is exactly one expression.
    pub fn whole(&self) -> Option<&Expression> {
        match self.pieces.as_slice() {
            [Piece::Expr(expr)] => Some(expr),
            _ => None,
        }
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expression> {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Expr(expr) => Some(expr),
            Piece::Text(_) => None,
        })
    }

    pub fn has_expressions(&self) -> bool {
        self.expressions().next().is_some()
    }
}

/// Byte offset of the first `}` outside a quoted literal.
fn find_close(body: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (index, ch) in body.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if ch == '\\' => escaped = true,
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == '}' => return Some(index),
            None => {}
        }
    }
    None
}
