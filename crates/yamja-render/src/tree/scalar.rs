//! Scalar values and plain-scalar type resolution.
//!
//! Plain (unquoted) scalars are typed with the YAML 1.2 core schema, the same
//! schema `serde_yaml` uses when reading. Quoted and block scalars are always
//! strings; that distinction is made by the parser, not here. Explicit core
//! tags (`!!str`, `!!int`, ...) override both rules through [`resolve_tagged`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static NULL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(~|null|Null|NULL)?$").expect("valid regex"));
static BOOL_TRUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(true|True|TRUE)$").expect("valid regex"));
static BOOL_FALSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(false|False|FALSE)$").expect("valid regex"));
static INT_DEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid regex"));
static INT_OCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0o([0-7]+)$").expect("valid regex"));
static INT_HEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0x([0-9a-fA-F]+)$").expect("valid regex"));
static FLOAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").expect("valid regex")
});
static INF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([-+]?)\.(inf|Inf|INF)$").expect("valid regex"));
static NAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.(nan|NaN|NAN)$").expect("valid regex"));

/// A YAML scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
}

/// Numeric value preserving integer vs float.
///
/// Integers that fit `i64` are `I64`; larger positive integers are `U64`.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer above `i64::MAX`.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => a == b,
            (Number::U64(a), Number::U64(b)) => a == b,
            (Number::F64(a), Number::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => false,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{n}"),
            Number::U64(n) => write!(f, "{n}"),
            Number::F64(n) if n.is_nan() => f.write_str(".nan"),
            Number::F64(n) if n.is_infinite() => {
                f.write_str(if n.is_sign_negative() { "-.inf" } else { ".inf" })
            }
            // Keep a fractional part so the text still reads back as a float.
            Number::F64(n) if n.abs() >= 1e16 || (*n != 0.0 && n.abs() < 1e-5) => {
                write!(f, "{n:e}")
            }
            Number::F64(n) if n.fract() == 0.0 => write!(f, "{n:.1}"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

/// String form used for partial interpolation: null is empty.
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Number(n) => write!(f, "{n}"),
            Scalar::String(s) => f.write_str(s),
        }
    }
}

/// Types an unquoted scalar.
///
/// ```rust
/// use yamja_render::tree::{resolve_plain, Number, Scalar};
///
/// assert_eq!(resolve_plain("~"), Scalar::Null);
/// assert_eq!(resolve_plain("TRUE"), Scalar::Bool(true));
/// assert_eq!(resolve_plain("0x1f"), Scalar::Number(Number::I64(31)));
/// assert_eq!(resolve_plain("web-1"), Scalar::String("web-1".into()));
/// ```
pub fn resolve_plain(text: &str) -> Scalar {
    if NULL.is_match(text) {
        return Scalar::Null;
    }
    if BOOL_TRUE.is_match(text) {
        return Scalar::Bool(true);
    }
    if BOOL_FALSE.is_match(text) {
        return Scalar::Bool(false);
    }
    if let Some(number) = resolve_number(text) {
        return Scalar::Number(number);
    }
    Scalar::String(text.to_string())
}

/// A type from the YAML core schema named by an explicit `!!` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreTag {
    Str,
    Int,
    Float,
    Bool,
    Null,
}

impl CoreTag {
    /// The tag for a core-schema suffix (`str`, `int`, ...).
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "str" => Some(CoreTag::Str),
            "int" => Some(CoreTag::Int),
            "float" => Some(CoreTag::Float),
            "bool" => Some(CoreTag::Bool),
            "null" => Some(CoreTag::Null),
            _ => None,
        }
    }
}

impl fmt::Display for CoreTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoreTag::Str => "!!str",
            CoreTag::Int => "!!int",
            CoreTag::Float => "!!float",
            CoreTag::Bool => "!!bool",
            CoreTag::Null => "!!null",
        })
    }
}

/// Types a scalar under an explicit tag, whatever its quoting.
///
/// Returns `None` when the text is not a value of the tagged type.
///
/// ```rust
/// use yamja_render::tree::{resolve_tagged, CoreTag, Number, Scalar};
///
/// assert_eq!(resolve_tagged("8080", CoreTag::Str), Some(Scalar::String("8080".into())));
/// assert_eq!(resolve_tagged("3", CoreTag::Float), Some(Scalar::Number(Number::F64(3.0))));
/// assert_eq!(resolve_tagged("web", CoreTag::Int), None);
/// ```
pub fn resolve_tagged(text: &str, tag: CoreTag) -> Option<Scalar> {
    match tag {
        CoreTag::Str => Some(Scalar::String(text.to_string())),
        CoreTag::Null => NULL.is_match(text).then_some(Scalar::Null),
        CoreTag::Bool if BOOL_TRUE.is_match(text) => Some(Scalar::Bool(true)),
        CoreTag::Bool if BOOL_FALSE.is_match(text) => Some(Scalar::Bool(false)),
        CoreTag::Bool => None,
        CoreTag::Int => resolve_int(text).map(Scalar::Number),
        CoreTag::Float => match resolve_number(text)? {
            Number::I64(n) => Some(Scalar::Number(Number::F64(n as f64))),
            Number::U64(n) => Some(Scalar::Number(Number::F64(n as f64))),
            float => Some(Scalar::Number(float)),
        },
    }
}

fn resolve_number(text: &str) -> Option<Number> {
    // Decimal integers too large for u64 are strings, not floats.
    if INT_DEC.is_match(text) || INT_OCT.is_match(text) || INT_HEX.is_match(text) {
        return resolve_int(text);
    }
    if FLOAT.is_match(text) {
        return text.parse::<f64>().ok().map(Number::F64);
    }
    if let Some(caps) = INF.captures(text) {
        let value = if &caps[1] == "-" {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return Some(Number::F64(value));
    }
    if NAN.is_match(text) {
        return Some(Number::F64(f64::NAN));
    }
    None
}

fn resolve_int(text: &str) -> Option<Number> {
    if INT_DEC.is_match(text) {
        let digits = text.strip_prefix('+').unwrap_or(text);
        if let Ok(n) = digits.parse::<i64>() {
            return Some(Number::I64(n));
        }
        return digits.parse::<u64>().ok().map(Number::U64);
    }
    if let Some(caps) = INT_OCT.captures(text) {
        return radix_number(&caps[1], 8);
    }
    if let Some(caps) = INT_HEX.captures(text) {
        return radix_number(&caps[1], 16);
    }
    None
}

fn radix_number(digits: &str, radix: u32) -> Option<Number> {
    let value = u64::from_str_radix(digits, radix).ok()?;
    Some(match i64::try_from(value) {
        Ok(n) => Number::I64(n),
        Err(_) => Number::U64(value),
    })
}
