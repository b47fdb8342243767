//! Task-graph builder.
//!
//! A single process-wide directed multigraph, guarded by one mutex on
//! structural mutations. Built on `petgraph` rather than a hand-rolled
//! adjacency list: a DAG with cheap node/edge insertion and a DOT exporter
//! already written.

pub mod export;
pub mod node;

pub use node::{EnclosingContext, NodeKind, NodePayload, NodeRef};

use std::sync::Mutex;

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;

use node::NodeData;

pub struct TaskGraph {
    inner: Mutex<DiGraph<NodeData, ()>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self { inner: Mutex::new(DiGraph::new()) }
    }

    pub fn add_node(&self, kind: NodeKind, payload: NodePayload) -> NodeRef {
        let mut g = self.inner.lock().expect("task graph mutex poisoned");
        NodeRef(g.add_node(NodeData { kind, payload }))
    }

    /// Declares a directed edge. Multi-edges are allowed; no cycle check
    /// is performed.
    pub fn add_edge(&self, src: NodeRef, dst: NodeRef) {
        let mut g = self.inner.lock().expect("task graph mutex poisoned");
        g.add_edge(src.0, dst.0, ());
    }

    pub fn has_outgoing_edges(&self, node: NodeRef) -> bool {
        let g = self.inner.lock().expect("task graph mutex poisoned");
        g.edges(node.0).next().is_some()
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().expect("task graph mutex poisoned").node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.lock().expect("task graph mutex poisoned").edge_count()
    }

    /// Moves all nodes and edges of `sub` into `self`, leaving `sub`
    /// empty. No edges are synthesised across the seam; callers add them
    /// explicitly.
    pub fn attach_subgraph(&self, sub: &TaskGraph) -> std::collections::HashMap<NodeRef, NodeRef> {
        let mut dst = self.inner.lock().expect("task graph mutex poisoned");
        let mut src = sub.inner.lock().expect("task graph mutex poisoned");

        let mut remap = std::collections::HashMap::new();
        for idx in src.node_indices().collect::<Vec<_>>() {
            let data = src[idx].clone();
            let new_idx = dst.add_node(data);
            remap.insert(NodeRef(idx), NodeRef(new_idx));
        }
        for edge in src.edge_references().collect::<Vec<_>>() {
            let new_src = remap[&NodeRef(edge.source())];
            let new_dst = remap[&NodeRef(edge.target())];
            dst.add_edge(new_src.0, new_dst.0, ());
        }
        *src = DiGraph::new();
        remap
    }
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_then_edge_is_visible() {
        let g = TaskGraph::new();
        let a = g.add_node(NodeKind::TaskInitial, NodePayload::None);
        let b = g.add_node(NodeKind::TaskExplicit, NodePayload::None);
        assert!(!g.has_outgoing_edges(a));
        g.add_edge(a, b);
        assert!(g.has_outgoing_edges(a));
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn multi_edges_are_allowed() {
        let g = TaskGraph::new();
        let a = g.add_node(NodeKind::TaskInitial, NodePayload::None);
        let b = g.add_node(NodeKind::TaskExplicit, NodePayload::None);
        g.add_edge(a, b);
        g.add_edge(a, b);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn attach_subgraph_moves_nodes_and_empties_source() {
        let main = TaskGraph::new();
        let sub = TaskGraph::new();
        let x = sub.add_node(NodeKind::TaskExplicit, NodePayload::None);
        let y = sub.add_node(NodeKind::TaskExplicit, NodePayload::None);
        sub.add_edge(x, y);

        let remap = main.attach_subgraph(&sub);
        assert_eq!(main.node_count(), 2);
        assert_eq!(main.edge_count(), 1);
        assert_eq!(sub.node_count(), 0);
        assert!(main.has_outgoing_edges(remap[&x]));
    }
}
