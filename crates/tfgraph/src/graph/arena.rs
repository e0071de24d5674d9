//! Shared arena that stores constructed operation graphs.
//!
//! A [`Graph`] owns an append-only list of frozen nodes. Descriptors reach it through a
//! [`Scope`](crate::Scope), which supplies the unique node name, control inputs and device; the
//! graph then validates the descriptor against its [`OpRegistry`], infers output types and
//! records the node.
//!
//! ```text
//! ops::* wrapper
//!      |
//!      | OpSpec (type, inputs, explicit attrs)
//!      v
//! Scope  -- sticky error, naming, control deps, device
//!      |
//!      v
//! Graph  -- registry resolution, shape inference, node record
//! ```

use std::fmt;
use std::sync::{
    atomic::{AtomicUsize, Ordering as AtomicOrdering},
    Arc, Mutex, MutexGuard, PoisonError,
};

use crate::env;
use crate::registry::OpRegistry;

use super::spec::{
    AttrMap, AttrValue, Endpoint, GraphDef, GraphError, GraphId, GraphResult, NodeDef, NodeId,
    OpSpec, Output, TensorSpec,
};
use super::state::GraphInner;

static GRAPH_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Per-graph construction switches. Defaults come from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphOptions {
    /// Run registry shape functions when adding nodes (`TFGRAPH_SHAPE_INFERENCE`).
    pub shape_inference: bool,
    /// Reject colliding explicit names instead of suffixing them (`TFGRAPH_STRICT_NAMES`).
    pub strict_names: bool,
}

impl GraphOptions {
    pub fn from_env() -> Self {
        Self {
            shape_inference: env::shape_inference_enabled(),
            strict_names: env::strict_names_enabled(),
        }
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Placement and ordering context the scope attaches to a descriptor.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeContext {
    pub(crate) name: String,
    pub(crate) control_inputs: Vec<Operation>,
    pub(crate) device: Option<String>,
}

/// Graph under construction. Shared through `Arc` by every scope that builds into it.
pub struct Graph {
    id: GraphId,
    registry: Arc<OpRegistry>,
    options: GraphOptions,
    inner: Mutex<GraphInner>,
}

impl Graph {
    /// Empty graph over the builtin registry.
    pub fn new() -> Self {
        Self::with_registry(OpRegistry::global())
    }

    pub fn with_registry(registry: Arc<OpRegistry>) -> Self {
        Self {
            id: GraphId(GRAPH_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed)),
            registry,
            options: GraphOptions::default(),
            inner: Mutex::new(GraphInner::new()),
        }
    }

    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn registry(&self) -> &Arc<OpRegistry> {
        &self.registry
    }

    pub fn options(&self) -> GraphOptions {
        self.options
    }

    pub(super) fn lock(&self) -> GraphResult<MutexGuard<'_, GraphInner>> {
        self.inner.lock().map_err(|_| GraphError::Poisoned)
    }

    // Nodes are frozen before they are pushed, so a poisoned lock still guards a consistent list.
    fn read(&self) -> MutexGuard<'_, GraphInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add_operation(&self, spec: OpSpec, ctx: NodeContext) -> GraphResult<Operation> {
        let mut inner = self.lock()?;
        self.insert_locked(&mut inner, spec, ctx)
    }

    /// Validates a descriptor and records it. The caller holds the graph lock.
    pub(super) fn insert_locked(
        &self,
        inner: &mut GraphInner,
        spec: OpSpec,
        ctx: NodeContext,
    ) -> GraphResult<Operation> {
        let def = Arc::clone(self.registry.lookup(&spec.op_type)?);
        if inner.by_name.contains_key(&ctx.name) {
            return Err(GraphError::DuplicateName(ctx.name));
        }

        let mut input_specs: Vec<TensorSpec> = Vec::with_capacity(spec.inputs.len());
        let mut endpoints: Vec<Endpoint> = Vec::with_capacity(spec.inputs.len());
        for (index, input) in spec.inputs.iter().enumerate() {
            if input.graph != self.id {
                return Err(GraphError::ForeignInput {
                    op: ctx.name.clone(),
                    index,
                });
            }
            let output_spec = inner
                .node(input.endpoint.node)
                .and_then(|producer| producer.outputs.get(input.endpoint.index))
                .ok_or_else(|| GraphError::DanglingInput {
                    op: ctx.name.clone(),
                    index,
                    endpoint: input.endpoint,
                })?;
            input_specs.push(output_spec.clone());
            endpoints.push(input.endpoint);
        }

        let mut control_inputs = Vec::with_capacity(ctx.control_inputs.len());
        for control in &ctx.control_inputs {
            if control.graph != self.id || inner.node(control.id()).is_none() {
                return Err(GraphError::DanglingControl {
                    op: ctx.name.clone(),
                    node: control.id(),
                });
            }
            if !control_inputs.contains(&control.id()) {
                control_inputs.push(control.id());
            }
        }

        let attrs = def.resolve(&spec, &input_specs)?;
        let outputs = def.output_specs(&input_specs, &attrs, self.options.shape_inference)?;

        let id = NodeId(inner.nodes.len() as u32);
        let node = Arc::new(NodeDef {
            id,
            name: ctx.name,
            op_type: spec.op_type,
            inputs: endpoints,
            control_inputs,
            device: ctx.device,
            attrs,
            outputs,
        });
        inner.push(Arc::clone(&node));
        tracing::debug!(
            graph = self.id.0,
            node = %id,
            name = %node.name,
            op = %node.op_type,
            "added operation"
        );

        Ok(Operation {
            graph: self.id,
            node,
        })
    }

    pub fn operation(&self, id: NodeId) -> Option<Operation> {
        self.read().node(id).map(|node| self.wrap(node))
    }

    pub fn operation_by_name(&self, name: &str) -> Option<Operation> {
        let inner = self.read();
        let id = inner.by_name.get(name)?;
        inner.node(*id).map(|node| self.wrap(node))
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.read().by_name.contains_key(name)
    }

    /// Reserves `base`, or the first free `base_N`. Every scope building into this graph draws
    /// from the same table, so independent root scopes never hand out the same name.
    pub(crate) fn unique_name(&self, base: &str) -> String {
        self.read().reserve_unique(base)
    }

    /// Like [`Graph::unique_name`]. With `exact`, a `base` that is already reserved or recorded
    /// fails with [`GraphError::DuplicateName`] instead of being suffixed.
    pub(crate) fn reserve_name(&self, base: &str, exact: bool) -> GraphResult<String> {
        let mut inner = self.read();
        if exact && inner.is_taken(base) {
            return Err(GraphError::DuplicateName(base.to_string()));
        }
        Ok(inner.reserve_unique(base))
    }

    /// All operations in insertion order, which is also a valid topological order.
    pub fn operations(&self) -> Vec<Operation> {
        self.read().nodes.iter().map(|node| self.wrap(node)).collect()
    }

    pub fn num_operations(&self) -> usize {
        self.read().nodes.len()
    }

    /// Operations reading `output`, paired with the input slot they read it through.
    pub fn consumers(&self, output: Output) -> Vec<(Operation, usize)> {
        if output.graph != self.id {
            return Vec::new();
        }
        let inner = self.read();
        let mut consumers = Vec::new();
        for node in &inner.nodes {
            for (slot, endpoint) in node.inputs.iter().enumerate() {
                if *endpoint == output.endpoint {
                    consumers.push((self.wrap(node), slot));
                }
            }
        }
        consumers
    }

    /// Monotonic counter bumped on every structural change.
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Snapshot of every node recorded so far.
    pub fn to_graph_def(&self) -> GraphDef {
        let nodes = self
            .read()
            .nodes
            .iter()
            .map(|node| NodeDef::clone(node))
            .collect();
        GraphDef::new(nodes)
    }

    fn wrap(&self, node: &Arc<NodeDef>) -> Operation {
        Operation {
            graph: self.id,
            node: Arc::clone(node),
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id.0)
            .field("operations", &self.num_operations())
            .field("options", &self.options)
            .finish()
    }
}

/// Handle to a recorded node. The node is frozen: every accessor reads the immutable record.
#[derive(Debug, Clone)]
pub struct Operation {
    graph: GraphId,
    node: Arc<NodeDef>,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        self.graph == other.graph && self.node.id == other.node.id
    }
}

impl Eq for Operation {}

impl Operation {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn graph_id(&self) -> GraphId {
        self.graph
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    pub fn op_type(&self) -> &str {
        &self.node.op_type
    }

    pub fn num_outputs(&self) -> usize {
        self.node.outputs.len()
    }

    /// Symbolic handle for output slot `index`.
    pub fn output(&self, index: usize) -> GraphResult<Output> {
        if index >= self.node.outputs.len() {
            return Err(GraphError::OutputIndex {
                op: self.node.name.clone(),
                index,
                count: self.node.outputs.len(),
            });
        }
        Ok(self.handle(index))
    }

    pub fn outputs(&self) -> Vec<Output> {
        (0..self.node.outputs.len())
            .map(|index| self.handle(index))
            .collect()
    }

    pub fn output_spec(&self, index: usize) -> Option<&TensorSpec> {
        self.node.outputs.get(index)
    }

    /// Handles of the outputs this node reads, in positional order.
    pub fn inputs(&self) -> Vec<Output> {
        self.node
            .inputs
            .iter()
            .map(|endpoint| Output {
                graph: self.graph,
                endpoint: *endpoint,
            })
            .collect()
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.node.attrs.get(name)
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.node.attrs
    }

    pub fn control_inputs(&self) -> &[NodeId] {
        &self.node.control_inputs
    }

    pub fn device(&self) -> Option<&str> {
        self.node.device.as_deref()
    }

    pub fn node_def(&self) -> &NodeDef {
        &self.node
    }

    fn handle(&self, index: usize) -> Output {
        Output {
            graph: self.graph,
            endpoint: Endpoint {
                node: self.node.id,
                index,
            },
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.node.name, self.node.op_type)
    }
}
