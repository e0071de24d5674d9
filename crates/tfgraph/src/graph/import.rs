//! Replaying serialized graph definitions into a live graph.

use std::collections::HashMap;

use super::arena::{Graph, NodeContext, Operation};
use super::spec::{GraphDef, GraphError, GraphResult, NodeDef, NodeId, OpSpec};
use super::state::GraphInner;

impl Graph {
    /// Imports every node of `def`, running the same validation as freshly built nodes.
    ///
    /// Node names are prefixed with `prefix/` when a prefix is given. The import is
    /// all-or-nothing: on failure the graph is rolled back to its previous contents.
    pub fn import_graph_def(
        &self,
        def: &GraphDef,
        prefix: Option<&str>,
    ) -> GraphResult<Vec<Operation>> {
        let mut inner = self.lock()?;
        let start = inner.nodes.len();

        let mut remap: HashMap<NodeId, Operation> = HashMap::with_capacity(def.nodes.len());
        let mut imported = Vec::with_capacity(def.nodes.len());
        for node in &def.nodes {
            match self.import_node(&mut inner, node, &remap, prefix) {
                Ok(op) => {
                    if op.node_def().outputs != node.outputs {
                        tracing::debug!(
                            node = %op.name(),
                            "re-inferred output types differ from the serialized ones"
                        );
                    }
                    remap.insert(node.id, op.clone());
                    imported.push(op);
                }
                Err(err) => {
                    tracing::warn!(
                        node = %node.name,
                        error = %err,
                        "graph import failed, rolling back"
                    );
                    inner.truncate(start);
                    return Err(err);
                }
            }
        }

        Ok(imported)
    }

    /// Builds a fresh graph over the builtin registry from a definition.
    pub fn from_graph_def(def: &GraphDef) -> GraphResult<Graph> {
        let graph = Graph::new();
        graph.import_graph_def(def, None)?;
        Ok(graph)
    }

    fn import_node(
        &self,
        inner: &mut GraphInner,
        node: &NodeDef,
        remap: &HashMap<NodeId, Operation>,
        prefix: Option<&str>,
    ) -> GraphResult<Operation> {
        let mut spec = OpSpec::new(node.op_type.clone());
        for (index, endpoint) in node.inputs.iter().enumerate() {
            let producer = remap
                .get(&endpoint.node)
                .ok_or_else(|| GraphError::DanglingInput {
                    op: node.name.clone(),
                    index,
                    endpoint: *endpoint,
                })?;
            spec.inputs.push(producer.output(endpoint.index)?);
        }
        spec.attrs = node.attrs.clone();

        let control_inputs = node
            .control_inputs
            .iter()
            .map(|id| {
                remap
                    .get(id)
                    .cloned()
                    .ok_or_else(|| GraphError::DanglingControl {
                        op: node.name.clone(),
                        node: *id,
                    })
            })
            .collect::<GraphResult<Vec<_>>>()?;

        let name = match prefix {
            Some(prefix) => format!("{prefix}/{}", node.name),
            None => node.name.clone(),
        };
        let ctx = NodeContext {
            name,
            control_inputs,
            device: node.device.clone(),
        };
        self.insert_locked(inner, spec, ctx)
    }
}
