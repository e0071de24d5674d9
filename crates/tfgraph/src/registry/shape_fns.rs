//! Static shape functions for the builtin catalogue, plus the validation hooks that run even
//! when shape inference is off.
//!
//! Unknown ranks and unknown extents propagate as unknown; only contradictions between known
//! values are reported.

use crate::graph::{AttrValue, Dimension, GraphError, GraphResult, Shape};

use super::op_def::InferenceContext;

fn split_matrix(dims: &[Dimension]) -> (&[Dimension], Dimension, Dimension) {
    let rank = dims.len();
    (&dims[..rank - 2], dims[rank - 2], dims[rank - 1])
}

fn with_suffix(batch: &[Dimension], suffix: &[Dimension]) -> Shape {
    let mut dims = batch.to_vec();
    dims.extend_from_slice(suffix);
    Shape::new(dims)
}

/// `matrix: [..., M, M]`, `rhs: [..., M, K]` -> `[..., M, K]`.
pub(crate) fn square_solve(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let matrix = ctx.with_rank_at_least(0, 2)?;
    let rhs = ctx.with_rank_at_least(1, 2)?;
    let shape = match (matrix, rhs) {
        (Some(matrix), Some(rhs)) => {
            let (matrix_batch, rows, cols) = split_matrix(matrix);
            let (rhs_batch, rhs_rows, rhs_cols) = split_matrix(rhs);
            let order = ctx.merge_dim(rows, cols, "matrix must be square")?;
            let order = ctx.merge_dim(order, rhs_rows, "matrix and rhs row counts")?;
            let batch = ctx.merge_batch(matrix_batch, rhs_batch, "matrix and rhs batch")?;
            with_suffix(&batch, &[order, rhs_cols])
        }
        (Some(matrix), None) => {
            let (batch, rows, cols) = split_matrix(matrix);
            let order = ctx.merge_dim(rows, cols, "matrix must be square")?;
            with_suffix(
                &vec![Dimension::Unknown; batch.len()],
                &[order, Dimension::Unknown],
            )
        }
        (None, Some(rhs)) => Shape::new(rhs.to_vec()),
        (None, None) => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `matrix: [..., M, N]`, `rhs: [..., M, K]`, scalar regularizer -> `[..., N, K]`.
pub(crate) fn least_squares(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let matrix = ctx.with_rank_at_least(0, 2)?;
    let rhs = ctx.with_rank_at_least(1, 2)?;
    ctx.with_rank(2, 0)?;
    let shape = match (matrix, rhs) {
        (Some(matrix), Some(rhs)) => {
            let (matrix_batch, rows, cols) = split_matrix(matrix);
            let (rhs_batch, rhs_rows, rhs_cols) = split_matrix(rhs);
            ctx.merge_dim(rows, rhs_rows, "matrix and rhs row counts")?;
            let batch = ctx.merge_batch(matrix_batch, rhs_batch, "matrix and rhs batch")?;
            with_suffix(&batch, &[cols, rhs_cols])
        }
        (Some(matrix), None) => {
            let (batch, _, cols) = split_matrix(matrix);
            with_suffix(batch, &[cols, Dimension::Unknown])
        }
        (None, Some(rhs)) => {
            let (batch, _, rhs_cols) = split_matrix(rhs);
            with_suffix(batch, &[Dimension::Unknown, rhs_cols])
        }
        (None, None) => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `[..., M, M]` -> `[..., M, M]`.
pub(crate) fn square_unchanged(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let shape = match ctx.with_rank_at_least(0, 2)? {
        Some(input) => {
            let (batch, rows, cols) = split_matrix(input);
            let order = ctx.merge_dim(rows, cols, "input must be square")?;
            with_suffix(batch, &[order, order])
        }
        None => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `[..., M, M]` -> `[...]`.
pub(crate) fn determinant(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let shape = match ctx.with_rank_at_least(0, 2)? {
        Some(input) => {
            let (batch, rows, cols) = split_matrix(input);
            ctx.merge_dim(rows, cols, "input must be square")?;
            Shape::new(batch.to_vec())
        }
        None => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `[..., N]` -> `[..., N, N]`.
pub(crate) fn diag(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let shape = match ctx.with_rank_at_least(0, 1)? {
        Some(diagonal) => {
            let last = diagonal[diagonal.len() - 1];
            let mut dims = diagonal.to_vec();
            dims.push(last);
            Shape::new(dims)
        }
        None => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

fn min_dim(a: Dimension, b: Dimension) -> Dimension {
    match (a, b) {
        (Dimension::Known(a), Dimension::Known(b)) => Dimension::Known(a.min(b)),
        _ => Dimension::Unknown,
    }
}

/// `[..., M, N]` -> `[..., min(M, N)]`.
pub(crate) fn diag_part(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let shape = match ctx.with_rank_at_least(0, 2)? {
        Some(input) => {
            let (batch, rows, cols) = split_matrix(input);
            with_suffix(batch, &[min_dim(rows, cols)])
        }
        None => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `input: [..., M, N]`, `diagonal: [..., min(M, N)]` -> shape of `input`.
pub(crate) fn set_diag(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let input = ctx.with_rank_at_least(0, 2)?;
    let diagonal = ctx.with_rank_at_least(1, 1)?;
    let shape = match (input, diagonal) {
        (Some(input), Some(diagonal)) => {
            if diagonal.len() + 1 != input.len() {
                return Err(ctx.error(format!(
                    "diagonal must be rank {}, got rank {}",
                    input.len() - 1,
                    diagonal.len()
                )));
            }
            let (input_batch, rows, cols) = split_matrix(input);
            let (diag_batch, diag_len) = diagonal.split_at(diagonal.len() - 1);
            let batch = ctx.merge_batch(input_batch, diag_batch, "input and diagonal batch")?;
            ctx.merge_dim(min_dim(rows, cols), diag_len[0], "diagonal length")?;
            with_suffix(&batch, &[rows, cols])
        }
        (Some(input), None) => Shape::new(input.to_vec()),
        (None, Some(diagonal)) => Shape::unknown_dims(diagonal.len() + 1),
        (None, None) => Shape::unknown_rank(),
    };
    Ok(vec![shape])
}

/// `input` rank >= 2 with scalar band limits -> shape of `input`.
pub(crate) fn band_part(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let input = ctx.with_rank_at_least(0, 2)?;
    ctx.with_rank(1, 0)?;
    ctx.with_rank(2, 0)?;
    Ok(vec![input
        .map(|dims| Shape::new(dims.to_vec()))
        .unwrap_or_else(Shape::unknown_rank)])
}

/// Every input must be a scalar; produces one scalar.
pub(crate) fn scalar_inputs_scalar_output(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    for index in 0..ctx.num_inputs() {
        ctx.with_rank(index, 0)?;
    }
    Ok(vec![Shape::scalar()])
}

/// Two scalar inputs, no outputs.
pub(crate) fn write_file(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    ctx.with_rank(0, 0)?;
    ctx.with_rank(1, 0)?;
    Ok(Vec::new())
}

/// Scalar or vector of patterns -> vector of unknown length.
pub(crate) fn matching_files(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    ctx.with_rank_at_most(0, 1)?;
    Ok(vec![Shape::vector(Dimension::Unknown)])
}

pub(crate) fn scalar_output(_ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    Ok(vec![Shape::scalar()])
}

/// Shape of the embedded literal; its dtype must agree with the `dtype` attribute.
/// Checks that a `Const` literal is well formed and agrees with the `dtype` attribute.
pub(crate) fn constant_value(ctx: &InferenceContext<'_>) -> GraphResult<()> {
    let literal = ctx
        .attr("value")
        .and_then(AttrValue::as_tensor)
        .ok_or_else(|| ctx.error("missing tensor value"))?;
    let dtype = ctx
        .attr("dtype")
        .and_then(AttrValue::as_type)
        .ok_or_else(|| ctx.error("missing dtype attribute"))?;
    literal.validate()?;
    if literal.dtype() != dtype {
        return Err(GraphError::TypeMismatch {
            op: ctx.op().to_string(),
            arg: "value".to_string(),
            expected: dtype,
            found: literal.dtype(),
        });
    }
    Ok(())
}

pub(crate) fn constant(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    let literal = ctx
        .attr("value")
        .and_then(AttrValue::as_tensor)
        .ok_or_else(|| ctx.error("missing tensor value"))?;
    Ok(vec![literal.shape()])
}

pub(crate) fn placeholder(ctx: &InferenceContext<'_>) -> GraphResult<Vec<Shape>> {
    Ok(vec![ctx
        .attr("shape")
        .and_then(AttrValue::as_shape)
        .cloned()
        .unwrap_or_else(Shape::unknown_rank)])
}
