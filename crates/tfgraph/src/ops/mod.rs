//! Typed bindings that append operation descriptors to a [`Scope`](crate::Scope).
//!
//! Every wrapper takes the scope, its positional inputs and, for ops with optional attributes,
//! an attribute struct whose fields start unset. Only fields set by the caller reach the
//! descriptor; the registry fills in the documented defaults when the node is recorded.
//!
//! ```ignore
//! let scope = Scope::new();
//! let a = placeholder(&scope, DType::Double, PlaceholderAttrs::default())?;
//! let b = placeholder(&scope, DType::Double, PlaceholderAttrs::default())?;
//! let x = matrix_solve(&scope, a, b, MatrixSolveAttrs::default().adjoint(true))?;
//! ```

/// Declares an optional-attribute struct: every field is `Option<T>`, starts unset and has a
/// chainable setter. `into_attrs` keeps only the fields that were set, keyed by field name.
macro_rules! optional_attrs {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident: $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            $(
                $(#[$field_meta])*
                pub $field: Option<$ty>,
            )*
        }

        impl $name {
            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.$field = Some(value.into());
                    self
                }
            )*

            pub(crate) fn into_attrs(self) -> $crate::graph::AttrMap {
                #[allow(unused_mut)]
                let mut attrs = $crate::graph::AttrMap::new();
                $(
                    if let Some(value) = self.$field {
                        attrs.insert(stringify!($field).to_string(), value.into());
                    }
                )*
                attrs
            }
        }
    };
}

mod file;
mod matrix;
mod sources;

pub use file::{
    matching_files, read_file, sharded_filename, sharded_filespec, whole_file_reader_v2,
    write_file, WholeFileReaderV2Attrs,
};
pub use matrix::{
    matrix_band_part, matrix_determinant, matrix_diag, matrix_diag_part, matrix_inverse,
    matrix_set_diag, matrix_solve, matrix_solve_ls, matrix_triangular_solve, MatrixInverseAttrs,
    MatrixSolveAttrs, MatrixSolveLsAttrs, MatrixTriangularSolveAttrs,
};
pub use sources::{
    constant, placeholder, scalar_f64, scalar_i32, scalar_i64, scalar_str, PlaceholderAttrs,
};

use crate::graph::{GraphResult, OpSpec, Output};
use crate::Scope;

/// Submits `spec` and returns its single output handle.
fn single_output(scope: &Scope, spec: OpSpec) -> GraphResult<Output> {
    scope.add_operation(spec)?.output(0)
}
