pub mod graph;
pub mod ops;
pub mod registry;
pub mod scope;
mod env;

pub use graph::{
    DType, Graph, GraphDef, GraphError, GraphOptions, GraphResult, OpSpec, Operation, Output,
    Shape, TensorLiteral,
};
pub use registry::OpRegistry;
pub use scope::Scope;
