//! Per-thread recorder state.
//!
//! Every field here is touched only by the thread that owns this
//! `Location` — the engine never shares a `Location` across threads, so
//! none of it needs a lock.

use std::sync::Arc;

use crate::containers::{Queue, Stack};
use crate::ids::{IdSource, LocationRef, RegionRef, TaskId, ThreadId, ROOT_TASK_ID};
use crate::taskgraph::{EnclosingContext, NodeRef};

use super::region::StackEntry;
use super::types::ThreadKind;

pub struct Location {
    pub id: ThreadId,
    pub location_ref: LocationRef,
    pub kind: ThreadKind,
    pub events: u64,

    /// LIFO of regions currently entered on this thread.
    pub region_stack: Stack<StackEntry>,
    /// Region refs whose definitions await a flush to the trace sink.
    pub rgn_defs: Queue<RegionRef>,
    /// Suspended `rgn_defs` queues for nested parallel regions.
    pub rgn_defs_stack: Stack<Queue<RegionRef>>,

    /// Enclosing-context stack the task-graph builder consults to source
    /// edges for newly created tasks.
    pub context_stack: Stack<Arc<EnclosingContext>>,

    /// The task currently executing on this thread, as tracked through
    /// implicit-task-begin/end and task-schedule callbacks.
    pub current_task: TaskId,
    /// Recorded once, by the first implicit-task-begin on the initial
    /// thread, so later callbacks can still find the initial task's graph
    /// node without re-deriving it (mirrors `thread_data->initial_task_graph_node_ref`).
    pub initial_task_graph_node: Option<NodeRef>,
}

impl Location {
    pub fn new(ids: &IdSource, id: ThreadId, kind: ThreadKind) -> Self {
        Self {
            id,
            location_ref: ids.next_location_ref(),
            kind,
            events: 0,
            region_stack: Stack::new(),
            rgn_defs: Queue::new(),
            rgn_defs_stack: Stack::new(),
            context_stack: Stack::new(),
            current_task: ROOT_TASK_ID,
            initial_task_graph_node: None,
        }
    }

    pub fn record_event(&mut self) {
        self.events += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_location_has_empty_stacks() {
        let ids = IdSource::new();
        let loc = Location::new(&ids, ThreadId(0), ThreadKind::Initial);
        assert!(loc.region_stack.is_empty());
        assert!(loc.rgn_defs.is_empty());
        assert!(loc.rgn_defs_stack.is_empty());
        assert_eq!(loc.events, 0);
    }

    #[test]
    fn record_event_increments_count() {
        let ids = IdSource::new();
        let mut loc = Location::new(&ids, ThreadId(0), ThreadKind::Initial);
        loc.record_event();
        loc.record_event();
        assert_eq!(loc.events, 2);
    }
}
