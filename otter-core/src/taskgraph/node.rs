//! Task-graph node kinds, mirroring `task_graph_node_type_t` in
//! `task-graph.h` but replacing its `FLAG_NODE_TYPE_END` high-bit trick
//! with an explicit [`Endpoint`] on every paired kind.

use std::sync::{Arc, Mutex};

use petgraph::graph::NodeIndex;

use crate::domain::types::Endpoint;
use crate::ids::{RegionRef, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    TaskInitial,
    TaskImplicit,
    TaskExplicit,
    TaskTarget,
    ScopeParallel(Endpoint),
    ScopeSections(Endpoint),
    ScopeSingle(Endpoint),
    ScopeLoop(Endpoint),
    ScopeTaskloop(Endpoint),
    ScopeTaskgroup(Endpoint),
    SyncBarrier,
    SyncBarrierImplicit,
    SyncBarrierExplicit,
    SyncBarrierImplementation,
    SyncTaskwait,
    SyncTaskgroup,
    SyncReduction,
}

impl NodeKind {
    /// Label for the node-attribute CSV export.
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::TaskInitial => "task_initial",
            NodeKind::TaskImplicit => "task_implicit",
            NodeKind::TaskExplicit => "task_explicit",
            NodeKind::TaskTarget => "task_target",
            NodeKind::ScopeParallel(Endpoint::Begin) => "scope_parallel_begin",
            NodeKind::ScopeParallel(Endpoint::End) => "scope_parallel_end",
            NodeKind::ScopeSections(Endpoint::Begin) => "scope_sections_begin",
            NodeKind::ScopeSections(Endpoint::End) => "scope_sections_end",
            NodeKind::ScopeSingle(Endpoint::Begin) => "scope_single_begin",
            NodeKind::ScopeSingle(Endpoint::End) => "scope_single_end",
            NodeKind::ScopeLoop(Endpoint::Begin) => "scope_loop_begin",
            NodeKind::ScopeLoop(Endpoint::End) => "scope_loop_end",
            NodeKind::ScopeTaskloop(Endpoint::Begin) => "scope_taskloop_begin",
            NodeKind::ScopeTaskloop(Endpoint::End) => "scope_taskloop_end",
            NodeKind::ScopeTaskgroup(Endpoint::Begin) => "scope_taskgroup_begin",
            NodeKind::ScopeTaskgroup(Endpoint::End) => "scope_taskgroup_end",
            NodeKind::SyncBarrier => "sync_barrier",
            NodeKind::SyncBarrierImplicit => "sync_barrier_implicit",
            NodeKind::SyncBarrierExplicit => "sync_barrier_explicit",
            NodeKind::SyncBarrierImplementation => "sync_barrier_implementation",
            NodeKind::SyncTaskwait => "sync_taskwait",
            NodeKind::SyncTaskgroup => "sync_taskgroup",
            NodeKind::SyncReduction => "sync_reduction",
        }
    }

    pub fn is_task(self) -> bool {
        matches!(
            self,
            NodeKind::TaskInitial | NodeKind::TaskImplicit | NodeKind::TaskExplicit | NodeKind::TaskTarget
        )
    }
}

/// Opaque data a node carries, analogous to `task-graph.h`'s `void* data`
/// pointer into a region/task object — here an owned, typed value instead
/// of a pointer a separate `free_fn` must be told how to release.
#[derive(Debug, Clone)]
pub enum NodePayload {
    Task(TaskId),
    Region(RegionRef),
    None,
}

/// A stable handle to a node, independent of any particular graph
/// instance's internal indices once `attach_subgraph` reindexes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub(super) NodeIndex);

#[derive(Debug, Clone)]
pub(super) struct NodeData {
    pub kind: NodeKind,
    pub payload: NodePayload,
}

/// The nearest parallel-region or task-generating worksharing scope a
/// thread is inside, used to source edges for tasks parented to an
/// implicit task (mirrors `region_context_t`). Shared across every thread
/// in the team, so the list of task nodes created under the scope is
/// mutex-guarded.
#[derive(Debug)]
pub struct EnclosingContext {
    pub begin_node: NodeRef,
    children: Mutex<Vec<NodeRef>>,
}

impl EnclosingContext {
    pub fn new(begin_node: NodeRef) -> Arc<Self> {
        Arc::new(Self { begin_node, children: Mutex::new(Vec::new()) })
    }

    pub fn record_child(&self, node: NodeRef) {
        self.children.lock().expect("enclosing context mutex poisoned").push(node);
    }

    pub fn take_children(&self) -> Vec<NodeRef> {
        std::mem::take(&mut self.children.lock().expect("enclosing context mutex poisoned"))
    }
}
