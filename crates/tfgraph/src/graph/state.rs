//! Internal graph bookkeeping shared by node insertion and import.

use std::collections::HashMap;
use std::sync::Arc;

use super::spec::{NodeDef, NodeId};

/// Mutable graph storage protected by a mutex inside [`Graph`](super::Graph).
/// Nodes are append-only and frozen behind `Arc` once recorded.
pub(super) struct GraphInner {
    pub(super) nodes: Vec<Arc<NodeDef>>,
    pub(super) by_name: HashMap<String, NodeId>,
    pub(super) version: u64,
    /// Names handed out to builders, with the next suffix to try for each base.
    pub(super) reserved: HashMap<String, usize>,
}

impl GraphInner {
    pub(super) fn new() -> Self {
        GraphInner {
            nodes: Vec::new(),
            by_name: HashMap::new(),
            version: 0,
            reserved: HashMap::new(),
        }
    }

    pub(super) fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub(super) fn node(&self, id: NodeId) -> Option<&Arc<NodeDef>> {
        self.nodes.get(id.0 as usize)
    }

    pub(super) fn push(&mut self, node: Arc<NodeDef>) {
        self.by_name.insert(node.name.clone(), node.id);
        self.nodes.push(node);
        self.bump_version();
    }

    pub(super) fn is_taken(&self, name: &str) -> bool {
        self.reserved.contains_key(name) || self.by_name.contains_key(name)
    }

    /// Reserves `base`, or the first free `base_N`, for a node about to be built.
    pub(super) fn reserve_unique(&mut self, base: &str) -> String {
        loop {
            let count = self.reserved.entry(base.to_string()).or_insert(0);
            let candidate = suffixed(base, *count);
            *count += 1;
            if self.by_name.contains_key(&candidate) {
                continue;
            }
            if candidate != base {
                // A suffixed name is itself a base for later explicit requests.
                if self.reserved.contains_key(&candidate) {
                    continue;
                }
                self.reserved.insert(candidate.clone(), 1);
            }
            return candidate;
        }
    }

    /// Drops every node recorded after the first `len`, used to roll back a failed import.
    pub(super) fn truncate(&mut self, len: usize) {
        if len >= self.nodes.len() {
            return;
        }
        for node in self.nodes.drain(len..) {
            self.by_name.remove(&node.name);
        }
        self.bump_version();
    }
}

fn suffixed(base: &str, count: usize) -> String {
    if count == 0 {
        base.to_string()
    } else {
        format!("{base}_{count}")
    }
}

#[cfg(test)]
mod tests {
    use super::{suffixed, GraphInner};

    #[test]
    fn suffix_starts_at_one() {
        assert_eq!(suffixed("MatrixSolve", 0), "MatrixSolve");
        assert_eq!(suffixed("MatrixSolve", 1), "MatrixSolve_1");
        assert_eq!(suffixed("outer/ReadFile", 3), "outer/ReadFile_3");
    }

    #[test]
    fn reserved_suffixes_are_not_reused_as_bases() {
        let mut inner = GraphInner::new();
        assert_eq!(inner.reserve_unique("Const"), "Const");
        assert_eq!(inner.reserve_unique("Const"), "Const_1");
        assert!(inner.is_taken("Const_1"));
        assert_eq!(inner.reserve_unique("Const_1"), "Const_1_1");
        assert_eq!(inner.reserve_unique("Const"), "Const_2");
    }
}
