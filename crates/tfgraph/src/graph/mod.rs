//! Graph model and builder.
//!
//! Descriptors ([`OpSpec`]) are validated against the op registry and frozen into [`NodeDef`]
//! records inside a shared [`Graph`]. Frozen graphs serialize to [`GraphDef`] (JSON or bincode)
//! and can be replayed into another graph with [`Graph::import_graph_def`].
mod arena;
mod import;
mod spec;
mod state;

pub(crate) use arena::NodeContext;
pub use arena::{Graph, GraphOptions, Operation};
pub use spec::{
    AttrKind, AttrMap, AttrValue, DType, Dimension, Endpoint, GraphDef, GraphError, GraphId,
    GraphIoError, GraphResult, GraphSerdeError, LiteralValues, NodeDef, NodeId, OpSpec, Output,
    Shape, TensorLiteral, TensorSpec, GRAPH_DEF_VERSION,
};
