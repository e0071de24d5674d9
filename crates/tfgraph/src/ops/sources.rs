//! Graph sources: constants and placeholders.

use crate::graph::{DType, GraphResult, OpSpec, Output, Shape, TensorLiteral};
use crate::Scope;

use super::single_output;

optional_attrs! {
    /// Optional attributes of [`placeholder`].
    pub struct PlaceholderAttrs {
        /// Static shape of the fed value. Unknown rank when unset.
        shape: Shape,
    }
}

/// Embeds `value` in the graph. The `dtype` attribute is taken from the literal.
pub fn constant(scope: &Scope, value: TensorLiteral) -> GraphResult<Output> {
    let dtype = value.dtype();
    single_output(
        scope,
        OpSpec::new("Const").attr("value", value).attr("dtype", dtype),
    )
}

/// Declares a value that is fed when the graph is executed.
pub fn placeholder(scope: &Scope, dtype: DType, attrs: PlaceholderAttrs) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("Placeholder")
            .attr("dtype", dtype)
            .attrs(attrs.into_attrs()),
    )
}

pub fn scalar_str(scope: &Scope, value: impl Into<String>) -> GraphResult<Output> {
    constant(scope, TensorLiteral::scalar_str(value))
}

pub fn scalar_i32(scope: &Scope, value: i32) -> GraphResult<Output> {
    constant(scope, TensorLiteral::scalar_i32(value))
}

pub fn scalar_i64(scope: &Scope, value: i64) -> GraphResult<Output> {
    constant(scope, TensorLiteral::scalar_i64(value))
}

pub fn scalar_f64(scope: &Scope, value: f64) -> GraphResult<Output> {
    let literal = TensorLiteral::scalar_f64(value).inspect_err(|err| {
        scope.update_err("Const", err.clone());
    })?;
    constant(scope, literal)
}
