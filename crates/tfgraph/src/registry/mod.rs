//! Op registry: the engine's op-registration contract expressed as data.
//!
//! Every node added to a graph is checked against the [`OpDef`] registered under its type name.
//! The global registry carries the builtin catalogue; graphs can be created over custom
//! registries that extend it.

mod builtin;
mod op_def;
mod shape_fns;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::graph::{GraphError, GraphResult};

pub use builtin::{INDEX_TYPES, LINALG_TYPES};
pub use op_def::{ArgDef, ArgType, AttrDef, InferenceContext, OpDef, ShapeFn, ValidateFn};

static GLOBAL_REGISTRY: OnceLock<Arc<OpRegistry>> = OnceLock::new();

/// Name-indexed collection of op definitions.
#[derive(Debug, Clone, Default)]
pub struct OpRegistry {
    defs: HashMap<String, Arc<OpDef>>,
}

impl OpRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the builtin catalogue.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for def in builtin::builtin_ops() {
            registry.defs.insert(def.name.clone(), Arc::new(def));
        }
        registry
    }

    /// Shared builtin registry used by graphs that do not specify one.
    pub fn global() -> Arc<OpRegistry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(OpRegistry::with_builtins())))
    }

    /// Adds a definition; names must be unique.
    pub fn register(&mut self, def: OpDef) -> GraphResult<()> {
        if self.defs.contains_key(&def.name) {
            return Err(GraphError::DuplicateOpDef(def.name));
        }
        tracing::debug!(op = %def.name, "registered op definition");
        self.defs.insert(def.name.clone(), Arc::new(def));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<OpDef>> {
        self.defs.get(name)
    }

    /// Like [`OpRegistry::get`] but reports unknown names as [`GraphError::UnknownOp`].
    pub fn lookup(&self, name: &str) -> GraphResult<&Arc<OpDef>> {
        self.defs
            .get(name)
            .ok_or_else(|| GraphError::UnknownOp(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.defs.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Definitions in lexical name order.
    pub fn defs(&self) -> Vec<&Arc<OpDef>> {
        let mut defs = self.defs.values().collect::<Vec<_>>();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
