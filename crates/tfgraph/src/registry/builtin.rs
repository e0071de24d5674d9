//! Signatures of the ops exposed by [`crate::ops`].

use crate::graph::{AttrKind, DType, Shape};

use super::op_def::{ArgType, AttrDef, OpDef};
use super::shape_fns;

/// Element types accepted by the dense solvers and decompositions.
pub const LINALG_TYPES: &[DType] = &[
    DType::Double,
    DType::Float,
    DType::Half,
    DType::Complex64,
    DType::Complex128,
];

pub const INDEX_TYPES: &[DType] = &[DType::Int32, DType::Int64];

fn t() -> ArgType {
    ArgType::attr("T")
}

fn string() -> ArgType {
    ArgType::Fixed(DType::String)
}

fn linalg_t() -> AttrDef {
    AttrDef::type_attr("T").allowed(LINALG_TYPES)
}

pub(crate) fn builtin_ops() -> Vec<OpDef> {
    vec![
        OpDef::new("Const")
            .summary("Produces a constant tensor.")
            .output("output", ArgType::attr("dtype"))
            .attr(AttrDef::new("value", AttrKind::Tensor))
            .attr(AttrDef::type_attr("dtype"))
            .validate_fn(shape_fns::constant_value)
            .shape_fn(shape_fns::constant),
        OpDef::new("Placeholder")
            .summary("Stands in for a value fed at execution time.")
            .output("output", ArgType::attr("dtype"))
            .attr(AttrDef::type_attr("dtype"))
            .attr(AttrDef::new("shape", AttrKind::Shape).default(Shape::unknown_rank()))
            .shape_fn(shape_fns::placeholder),
        // file i/o
        OpDef::new("ReadFile")
            .summary("Reads and outputs the entire contents of the input filename.")
            .input("filename", string())
            .output("contents", string())
            .shape_fn(shape_fns::scalar_inputs_scalar_output),
        OpDef::new("WriteFile")
            .summary("Writes contents to the file at input filename, creating it if missing.")
            .input("filename", string())
            .input("contents", string())
            .stateful()
            .shape_fn(shape_fns::write_file),
        OpDef::new("MatchingFiles")
            .summary("Returns the set of files matching one or more glob patterns.")
            .input("pattern", string())
            .output("filenames", string())
            .shape_fn(shape_fns::matching_files),
        OpDef::new("ShardedFilename")
            .summary("Generates a sharded filename formatted as %s-%05d-of-%05d.")
            .input("basename", string())
            .input("shard", ArgType::Fixed(DType::Int32))
            .input("num_shards", ArgType::Fixed(DType::Int32))
            .output("filename", string())
            .shape_fn(shape_fns::scalar_inputs_scalar_output),
        OpDef::new("ShardedFilespec")
            .summary("Generates a glob pattern matching all sharded file names.")
            .input("basename", string())
            .input("num_shards", ArgType::Fixed(DType::Int32))
            .output("filename", string())
            .shape_fn(shape_fns::scalar_inputs_scalar_output),
        OpDef::new("WholeFileReaderV2")
            .summary("A reader that outputs the entire contents of a file as a value.")
            .output("reader_handle", ArgType::Fixed(DType::Resource))
            .attr(AttrDef::new("container", AttrKind::String).default(""))
            .attr(AttrDef::new("shared_name", AttrKind::String).default(""))
            .stateful()
            .shape_fn(shape_fns::scalar_output),
        // dense linear algebra
        OpDef::new("MatrixSolve")
            .summary("Solves systems of linear equations.")
            .input("matrix", t())
            .input("rhs", t())
            .output("output", t())
            .attr(AttrDef::new("adjoint", AttrKind::Bool).default(false))
            .attr(linalg_t())
            .shape_fn(shape_fns::square_solve),
        OpDef::new("MatrixSolveLs")
            .summary("Solves one or more linear least-squares problems.")
            .input("matrix", t())
            .input("rhs", t())
            .input("l2_regularizer", ArgType::Fixed(DType::Double))
            .output("output", t())
            .attr(linalg_t())
            .attr(AttrDef::new("fast", AttrKind::Bool).default(true))
            .shape_fn(shape_fns::least_squares),
        OpDef::new("MatrixTriangularSolve")
            .summary("Solves triangular systems of linear equations by backsubstitution.")
            .input("matrix", t())
            .input("rhs", t())
            .output("output", t())
            .attr(AttrDef::new("lower", AttrKind::Bool).default(true))
            .attr(AttrDef::new("adjoint", AttrKind::Bool).default(false))
            .attr(linalg_t())
            .shape_fn(shape_fns::square_solve),
        OpDef::new("MatrixInverse")
            .summary("Computes the inverse of square invertible matrices or their adjoints.")
            .input("input", t())
            .output("output", t())
            .attr(AttrDef::new("adjoint", AttrKind::Bool).default(false))
            .attr(linalg_t())
            .shape_fn(shape_fns::square_unchanged),
        OpDef::new("MatrixDeterminant")
            .summary("Computes the determinant of one or more square matrices.")
            .input("input", t())
            .output("output", t())
            .attr(linalg_t())
            .shape_fn(shape_fns::determinant),
        OpDef::new("MatrixDiag")
            .summary("Returns a batched diagonal tensor with the given batched diagonal values.")
            .input("diagonal", t())
            .output("output", t())
            .attr(AttrDef::type_attr("T"))
            .shape_fn(shape_fns::diag),
        OpDef::new("MatrixDiagPart")
            .summary("Returns the batched diagonal part of a batched tensor.")
            .input("input", t())
            .output("diagonal", t())
            .attr(AttrDef::type_attr("T"))
            .shape_fn(shape_fns::diag_part),
        OpDef::new("MatrixSetDiag")
            .summary("Returns a batched matrix tensor with new batched diagonal values.")
            .input("input", t())
            .input("diagonal", t())
            .output("output", t())
            .attr(AttrDef::type_attr("T"))
            .shape_fn(shape_fns::set_diag),
        OpDef::new("MatrixBandPart")
            .summary("Copies a tensor, zeroing everything outside a central band of each matrix.")
            .input("input", t())
            .input("num_lower", ArgType::attr("Tindex"))
            .input("num_upper", ArgType::attr("Tindex"))
            .output("band", t())
            .attr(AttrDef::type_attr("T"))
            .attr(
                AttrDef::type_attr("Tindex")
                    .allowed(INDEX_TYPES)
                    .default(DType::Int64),
            )
            .shape_fn(shape_fns::band_part),
    ]
}
