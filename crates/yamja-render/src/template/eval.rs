//! Expression evaluation against a [`Context`].

use crate::context::Context;
use crate::error::{RenderError, Result};
use crate::tree::{Location, Node, Scalar};

use super::expr::Expression;

/// Evaluates an expression to the node it names.
///
/// The default applies only when the path is absent: a key explicitly set to
/// `null` resolves to null.
pub fn evaluate(expr: &Expression, ctx: &Context) -> Result<Node> {
    evaluate_at(expr, ctx, None)
}

/// Like [`evaluate`], with the template location attached to any error.
pub fn evaluate_at(expr: &Expression, ctx: &Context, location: Option<Location>) -> Result<Node> {
    if let Some(node) = ctx.lookup(expr.path()) {
        return Ok(node.clone());
    }
    match expr.default() {
        Some(default) => Ok(Node::Scalar(default.clone())),
        None => Err(RenderError::UnresolvedVariable {
            path: expr.path().clone(),
            location,
        }),
    }
}

/// Text form of an evaluated value, for interpolation inside a longer string.
pub(crate) fn interpolate(
    expr: &Expression,
    value: &Node,
    location: Option<Location>,
) -> Result<String> {
    match value {
        Node::Scalar(Scalar::String(s)) => Ok(s.clone()),
        Node::Scalar(scalar) => Ok(scalar.to_string()),
        Node::Sequence(_) | Node::Mapping(_) => Err(RenderError::TypeCoercion {
            path: expr.path().clone(),
            kind: value.kind(),
            location,
        }),
    }
}
