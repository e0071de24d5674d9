//! Dense linear-algebra ops over batches of matrices (`[..., M, N]`).

use crate::graph::{GraphResult, OpSpec, Output};
use crate::Scope;

use super::single_output;

optional_attrs! {
    /// Optional attributes of [`matrix_solve`].
    pub struct MatrixSolveAttrs {
        /// Solve with the adjoint of each matrix. Defaults to `false`.
        adjoint: bool,
    }
}

optional_attrs! {
    /// Optional attributes of [`matrix_solve_ls`].
    pub struct MatrixSolveLsAttrs {
        /// Use the Cholesky normal-equations path. Defaults to `true`.
        fast: bool,
    }
}

optional_attrs! {
    /// Optional attributes of [`matrix_triangular_solve`].
    pub struct MatrixTriangularSolveAttrs {
        /// Matrices are lower triangular. Defaults to `true`.
        lower: bool,
        /// Solve with the adjoint of each matrix. Defaults to `false`.
        adjoint: bool,
    }
}

optional_attrs! {
    /// Optional attributes of [`matrix_inverse`].
    pub struct MatrixInverseAttrs {
        /// Invert the adjoint of each matrix. Defaults to `false`.
        adjoint: bool,
    }
}

/// Solves `matrix * output = rhs` for square `matrix: [..., M, M]` and `rhs: [..., M, K]`.
pub fn matrix_solve(
    scope: &Scope,
    matrix: Output,
    rhs: Output,
    attrs: MatrixSolveAttrs,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixSolve")
            .input(matrix)
            .input(rhs)
            .attrs(attrs.into_attrs()),
    )
}

/// Least-squares solution `[..., N, K]` of `matrix: [..., M, N]` against `rhs: [..., M, K]`.
///
/// `l2_regularizer` is a scalar double.
pub fn matrix_solve_ls(
    scope: &Scope,
    matrix: Output,
    rhs: Output,
    l2_regularizer: Output,
    attrs: MatrixSolveLsAttrs,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixSolveLs")
            .input(matrix)
            .input(rhs)
            .input(l2_regularizer)
            .attrs(attrs.into_attrs()),
    )
}

/// Back-substitution against triangular `matrix: [..., M, M]`.
///
/// Only the triangle selected by `lower` is read.
pub fn matrix_triangular_solve(
    scope: &Scope,
    matrix: Output,
    rhs: Output,
    attrs: MatrixTriangularSolveAttrs,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixTriangularSolve")
            .input(matrix)
            .input(rhs)
            .attrs(attrs.into_attrs()),
    )
}

pub fn matrix_inverse(
    scope: &Scope,
    input: Output,
    attrs: MatrixInverseAttrs,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixInverse")
            .input(input)
            .attrs(attrs.into_attrs()),
    )
}

/// Determinants `[...]` of square matrices `[..., M, M]`.
pub fn matrix_determinant(scope: &Scope, input: Output) -> GraphResult<Output> {
    single_output(scope, OpSpec::new("MatrixDeterminant").input(input))
}

/// Batched diagonal matrices `[..., N, N]` built from `diagonal: [..., N]`.
pub fn matrix_diag(scope: &Scope, diagonal: Output) -> GraphResult<Output> {
    single_output(scope, OpSpec::new("MatrixDiag").input(diagonal))
}

pub fn matrix_diag_part(scope: &Scope, input: Output) -> GraphResult<Output> {
    single_output(scope, OpSpec::new("MatrixDiagPart").input(input))
}

/// Replaces the main diagonal of `input: [..., M, N]` with `diagonal: [..., min(M, N)]`.
pub fn matrix_set_diag(scope: &Scope, input: Output, diagonal: Output) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixSetDiag").input(input).input(diagonal),
    )
}

/// Keeps `num_lower` sub-diagonals and `num_upper` super-diagonals of each matrix and zeroes
/// the rest. A negative count keeps the whole triangle.
pub fn matrix_band_part(
    scope: &Scope,
    input: Output,
    num_lower: Output,
    num_upper: Output,
) -> GraphResult<Output> {
    single_output(
        scope,
        OpSpec::new("MatrixBandPart")
            .input(input)
            .input(num_lower)
            .input(num_upper),
    )
}
