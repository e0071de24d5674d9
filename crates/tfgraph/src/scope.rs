//! Graph-construction context handed to every op wrapper.
//!
//! A [`Scope`] bundles the target graph with the naming namespace, control dependencies and
//! device that new nodes inherit. Node names are reserved in the graph, so every scope over the
//! same graph sees one name table. Derived scopes share the error slot of the scope they came
//! from, so the first failure anywhere in a scope tree stops the whole tree.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::graph::{Graph, GraphError, GraphResult, NodeContext, OpSpec, Operation};

type ErrorSlot = Arc<Mutex<Option<GraphError>>>;

/// Builder context: graph, namespace, control dependencies, device, sticky error.
#[derive(Debug, Clone)]
pub struct Scope {
    graph: Arc<Graph>,
    namespace: Option<String>,
    err: ErrorSlot,
    control_deps: Vec<Operation>,
    device: Option<String>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Scope {
    /// Root scope over a fresh graph.
    pub fn new() -> Self {
        Self::with_graph(Arc::new(Graph::new()))
    }

    /// Root scope over an existing graph. Names already present or reserved in the graph are
    /// skipped when generating new ones. Its error slot is independent of other root scopes.
    pub fn with_graph(graph: Arc<Graph>) -> Self {
        Self {
            graph,
            namespace: None,
            err: Arc::new(Mutex::new(None)),
            control_deps: Vec::new(),
            device: None,
        }
    }

    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn control_dependencies(&self) -> &[Operation] {
        &self.control_deps
    }

    /// Derived scope whose nodes live under `namespace/`. Repeated namespaces are suffixed
    /// (`layer`, `layer_1`, ...).
    pub fn sub_scope(&self, namespace: &str) -> Scope {
        let namespace = self.graph.unique_name(&self.qualify(namespace));
        Scope {
            namespace: Some(namespace),
            ..self.clone()
        }
    }

    /// Derived scope whose nodes also wait on `ops`.
    pub fn with_control_dependencies(&self, ops: &[Operation]) -> Scope {
        let mut control_deps = self.control_deps.clone();
        for op in ops {
            if !control_deps.contains(op) {
                control_deps.push(op.clone());
            }
        }
        Scope {
            control_deps,
            ..self.clone()
        }
    }

    /// Derived scope whose nodes are placed on `device`.
    pub fn with_device(&self, device: impl Into<String>) -> Scope {
        Scope {
            device: Some(device.into()),
            ..self.clone()
        }
    }

    /// First error recorded anywhere in this scope tree.
    pub fn err(&self) -> Option<GraphError> {
        guard(&self.err).clone()
    }

    pub fn is_ok(&self) -> bool {
        guard(&self.err).is_none()
    }

    /// Records `err` unless an earlier error is already set.
    pub fn update_err(&self, op: &str, err: GraphError) {
        let err = match err {
            GraphError::Upstream(inner) => *inner,
            err => err,
        };
        let mut slot = guard(&self.err);
        if slot.is_none() {
            tracing::warn!(op, error = %err, "graph construction failed");
            *slot = Some(err);
        }
    }

    /// Submits a descriptor to the graph under this scope's context.
    ///
    /// Fails with [`GraphError::Upstream`] without touching the graph once the scope tree has
    /// recorded an error; a fresh failure is recorded and returned as is.
    pub fn add_operation(&self, spec: OpSpec) -> GraphResult<Operation> {
        if let Some(err) = self.err() {
            return Err(GraphError::Upstream(Box::new(err)));
        }
        let op_type = spec.op_type.clone();
        let result = self.node_name(&spec).and_then(|name| {
            let ctx = NodeContext {
                name,
                control_inputs: self.control_deps.clone(),
                device: self.device.clone(),
            };
            self.graph.add_operation(spec, ctx)
        });
        if let Err(err) = &result {
            self.update_err(&op_type, err.clone());
        }
        result
    }

    /// Hands back the graph, or the first error recorded while building it.
    pub fn finalize(self) -> GraphResult<Arc<Graph>> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(self.graph),
        }
    }

    fn qualify(&self, name: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}/{name}"),
            None => name.to_string(),
        }
    }

    fn node_name(&self, spec: &OpSpec) -> GraphResult<String> {
        match &spec.name {
            Some(name) => self
                .graph
                .reserve_name(&self.qualify(name), self.graph.options().strict_names),
            None => Ok(self.graph.unique_name(&self.qualify(&spec.op_type))),
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
