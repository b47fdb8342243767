//! Callback dispatcher, grounded in `ompt-core-callbacks.c`'s
//! `on_ompt_callback_*` family. Every method here drives *both* the
//! per-thread [`Recorder`] (trace emission) and the [`TaskGraph`] from the
//! same callback, unconditionally.
//!
//! These methods are plain Rust methods that take and return typed handles
//! (`ParallelData`, `TaskHandle`) rather than reaching shared state through
//! raw `ompt_data_t.ptr` pointers the runtime hands back on every call. The
//! `entry` module is the thin `extern "C"` layer that stores these handles
//! in the runtime's opaque slots and retrieves them on subsequent calls;
//! nothing here assumes it is being called from behind FFI, which is what
//! lets tests drive the engine with synthetic callback sequences.

use std::sync::Arc;

use log::warn;

use crate::domain::region::TaskPayload;
use crate::domain::types::{Endpoint, SyncKind, TaskKind, ThreadKind, WorkKind};
use crate::domain::ParallelRegion;
use crate::ids::{IdSource, LocationRef, RegionRef};
use crate::recorder::{Recorder, ThreadContext};
use crate::taskgraph::{EnclosingContext, NodeKind, NodePayload, NodeRef, TaskGraph};
use crate::trace::TraceSink;

/// The shared state a parallel region carries beyond what [`ParallelRegion`]
/// already tracks: its task-graph scope context and which location created
/// it, so later callbacks on that same location can tell master from
/// worker when each worker reads this in its own implicit-task-begin.
pub struct ParallelData {
    pub region: Arc<ParallelRegion>,
    pub context: Arc<EnclosingContext>,
    pub master_location: LocationRef,
    end_node: std::sync::Mutex<Option<NodeRef>>,
}

/// Stands in for `task-graph.h`'s `task_data_t*` stashed in a task's
/// `ompt_data_t.ptr`.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    pub payload: TaskPayload,
    pub node: NodeRef,
}

pub struct Dispatcher {
    ids: Arc<IdSource>,
    recorder: Recorder,
    graph: Arc<TaskGraph>,
}

impl Dispatcher {
    pub fn new(ids: Arc<IdSource>, sink: Arc<TraceSink>, graph: Arc<TaskGraph>) -> Self {
        let recorder = Recorder::new(ids.clone(), sink);
        Self { ids, recorder, graph }
    }

    pub fn graph(&self) -> &Arc<TaskGraph> {
        &self.graph
    }

    // -- thread lifecycle -------------------------------------------------

    pub fn on_thread_begin(&self, kind: ThreadKind) -> ThreadContext {
        let id = self.ids.next_thread_id();
        self.recorder.begin_thread(id, kind)
    }

    pub fn on_thread_end(&self, ctx: ThreadContext) {
        self.recorder.end_thread(ctx);
    }

    // -- parallel regions ---------------------------------------------------

    /// Mints the shared region, records this thread's enter, and adds the
    /// scope-begin graph node. The caller (the master thread) stores the
    /// returned handle in the runtime's `parallel` data slot so workers can
    /// reach the same region in their own implicit-task-begin.
    pub fn on_parallel_begin(
        &self,
        ctx: &mut ThreadContext,
        requested_parallelism: u32,
        is_league: bool,
    ) -> Arc<ParallelData> {
        let region = ParallelRegion::new(&self.ids, ctx.location.current_task, requested_parallelism, is_league);
        self.recorder.enter_parallel(ctx, region.clone());

        let begin_node = self.graph.add_node(
            NodeKind::ScopeParallel(Endpoint::Begin),
            NodePayload::Region(region.region_ref),
        );
        // Mirrors `on_ompt_callback_parallel_begin`'s edge from the thread's
        // initial task node to the new parallel-begin node.
        if let Some(initial) = ctx.location.initial_task_graph_node {
            self.graph.add_edge(initial, begin_node);
        }

        Arc::new(ParallelData {
            region,
            context: EnclosingContext::new(begin_node),
            master_location: ctx.location.location_ref,
            end_node: std::sync::Mutex::new(None),
        })
    }

    /// Records this (master) thread's leave and closes the scope in the
    /// task graph. Only the master thread calls this — workers close out
    /// their side of the region in `on_implicit_task_end`.
    pub fn on_parallel_end(&self, ctx: &mut ThreadContext, parallel: &Arc<ParallelData>) {
        let destroyed = self.recorder.leave_parallel(ctx);
        self.close_parallel_scope(parallel);
        if destroyed {
            self.destroy_parallel_region(parallel);
        }
    }

    fn close_parallel_scope(&self, parallel: &Arc<ParallelData>) {
        let mut end_node_slot = parallel.end_node.lock().expect("parallel end-node mutex poisoned");
        if end_node_slot.is_some() {
            // Another thread already closed this scope (can't happen under
            // the current OMPT contract, since only the master ever calls
            // parallel-end, but implicit-task-end on a worker never closes
            // the scope either — kept for defensiveness against a future
            // runtime that calls this from more than one place).
            return;
        }
        let end_node = self.graph.add_node(
            NodeKind::ScopeParallel(Endpoint::End),
            NodePayload::Region(parallel.region.region_ref),
        );
        close_scope(&self.graph, &parallel.context, end_node);
        *end_node_slot = Some(end_node);
    }

    fn destroy_parallel_region(&self, parallel: &Arc<ParallelData>) {
        // `rgn_defs` were already written to the global def writer eagerly
        // at region-definition time (as soon as a `Region` is minted); the
        // queue that would otherwise await a batched flush is therefore
        // empty bookkeeping at this point, not a deferred write. See
        // DESIGN.md for the eager-vs-batched-flush tradeoff.
        let pending = parallel.region.ref_count();
        debug_assert_eq!(pending, 0, "destroy_parallel_region called before ref_count reached zero");
    }

    // -- implicit tasks -------------------------------------------------

    /// `existing` models whatever the runtime's task data slot already
    /// held. If it is already `Some`, this call reuses it and logs a
    /// warning instead of minting a duplicate task — tolerating runtimes
    /// that fire `implicit_task_begin` twice for the same task without a
    /// compile-time or runtime switch.
    pub fn on_implicit_task_begin(
        &self,
        ctx: &mut ThreadContext,
        parallel: Option<&Arc<ParallelData>>,
        existing: Option<Arc<TaskHandle>>,
        flags: i32,
        is_initial: bool,
    ) -> Arc<TaskHandle> {
        if let Some(handle) = existing {
            warn!("task was previously allocated task data");
            ctx.location.current_task = handle.payload.id;
            return handle;
        }

        let id = self.ids.next_task_id();
        let kind = if is_initial { TaskKind::Initial } else { TaskKind::Implicit };
        let payload = TaskPayload {
            id,
            kind,
            flags,
            parent_id: None,
            parent_kind: None,
            has_dependences: false,
        };

        let node = if is_initial {
            let node = self.graph.add_node(NodeKind::TaskInitial, NodePayload::Task(id));
            ctx.location.initial_task_graph_node = Some(node);
            node
        } else {
            let parallel = parallel.expect("implicit task begin without enclosing parallel region");
            let node = self.graph.add_node(NodeKind::TaskImplicit, NodePayload::Task(id));

            if ctx.location.location_ref != parallel.master_location {
                // Workers were not present at parallel-begin; record their
                // own region-stack enter here.
                self.recorder.enter_parallel(ctx, parallel.region.clone());
            }
            ctx.location.context_stack.push(parallel.context.clone());
            node
        };

        ctx.location.current_task = id;
        Arc::new(TaskHandle { payload, node })
    }

    /// Workers record their parallel-region leave here (the master already
    /// did so in `on_parallel_end`).
    pub fn on_implicit_task_end(&self, ctx: &mut ThreadContext, parallel: Option<&Arc<ParallelData>>, task: &Arc<TaskHandle>) {
        if task.payload.kind != TaskKind::Implicit {
            return;
        }
        let parallel = parallel.expect("implicit task end without enclosing parallel region");
        ctx.location.context_stack.pop();

        if ctx.location.location_ref != parallel.master_location {
            let destroyed = self.recorder.leave_parallel(ctx);
            if destroyed {
                self.close_parallel_scope(parallel);
                self.destroy_parallel_region(parallel);
            }
        }
    }

    // -- explicit/target tasks -------------------------------------------

    /// Creates an explicit or target task and derives its graph edge.
    pub fn on_task_create(
        &self,
        ctx: &mut ThreadContext,
        encountering_task: Option<&Arc<TaskHandle>>,
        flags: i32,
        has_dependences: bool,
        is_target: bool,
    ) -> Arc<TaskHandle> {
        let id = self.ids.next_task_id();
        let kind = if is_target { TaskKind::Target } else { TaskKind::Explicit };
        let payload = TaskPayload {
            id,
            kind,
            flags,
            parent_id: encountering_task.map(|t| t.payload.id),
            parent_kind: encountering_task.map(|t| t.payload.kind),
            has_dependences,
        };

        let (_region_ref, payload) = self.recorder.record_task_create(ctx, payload);

        let node_kind = if is_target { NodeKind::TaskTarget } else { NodeKind::TaskExplicit };
        let node = self.graph.add_node(node_kind, NodePayload::Task(id));

        // Every newly created task is tracked by the nearest enclosing
        // context so a scope-end can close any dangling edge, regardless
        // of which policy sources its own edge.
        if let Some(context) = ctx.location.context_stack.peek() {
            context.record_child(node);
        }

        match encountering_task {
            None => {
                // Policy 1: parent is the initial task.
                let initial = ctx
                    .location
                    .initial_task_graph_node
                    .expect("task-create with no encountering task before an initial task exists");
                self.graph.add_edge(initial, node);
            }
            Some(parent) if parent.payload.kind == TaskKind::Implicit => {
                // Policy 2: parent is implicit -> source from the enclosing
                // parallel scope-begin.
                let context = ctx
                    .location
                    .context_stack
                    .peek()
                    .expect("task-create under an implicit task with no enclosing context");
                self.graph.add_edge(context.begin_node, node);
            }
            Some(parent) => {
                // Policy 3: parent is explicit or target.
                self.graph.add_edge(parent.node, node);
            }
        }

        Arc::new(TaskHandle { payload, node })
    }

    // -- worksharing -------------------------------------------------

    pub fn on_work_begin(&self, ctx: &mut ThreadContext, kind: WorkKind, count: u64) -> RegionRef {
        let encountering_task = ctx.location.current_task;
        let region_ref = self.recorder.enter_workshare(ctx, encountering_task, kind, count);
        if kind.is_task_generating() {
            let begin_node =
                self.graph.add_node(NodeKind::ScopeTaskloop(Endpoint::Begin), NodePayload::Region(region_ref));
            ctx.location.context_stack.push(EnclosingContext::new(begin_node));
        }
        region_ref
    }

    /// Closes the taskloop scope opened by the matching `on_work_begin`
    /// before popping the workshare region off the location's region
    /// stack, so the scope's end-node can still read the region ref being
    /// popped.
    pub fn on_work_end(&self, ctx: &mut ThreadContext, kind: WorkKind) {
        if kind.is_task_generating() {
            let region_ref = ctx
                .location
                .region_stack
                .peek()
                .expect("taskloop scope end without a workshare region on the stack")
                .region_ref();
            let context = ctx.location.context_stack.pop().expect("taskloop scope end without matching begin");
            let end_node =
                self.graph.add_node(NodeKind::ScopeTaskloop(Endpoint::End), NodePayload::Region(region_ref));
            close_scope(&self.graph, &context, end_node);
        }
        self.recorder.leave_workshare(ctx);
    }

    // -- synchronisation -------------------------------------------------

    pub fn on_sync_region_begin(&self, ctx: &mut ThreadContext, kind: SyncKind) -> RegionRef {
        let encountering_task = ctx.location.current_task;
        self.recorder.enter_sync(ctx, encountering_task, kind)
    }

    pub fn on_sync_region_end(&self, ctx: &mut ThreadContext) {
        self.recorder.leave_sync(ctx);
    }
}

/// Closes out every begin-generated node with no outgoing edges by linking
/// it to `end_node`; if none were generated, link begin straight to end.
fn close_scope(graph: &TaskGraph, context: &Arc<EnclosingContext>, end_node: NodeRef) {
    let children = context.take_children();
    if children.is_empty() {
        graph.add_edge(context.begin_node, end_node);
        return;
    }
    for child in children {
        if !graph.has_outgoing_edges(child) {
            graph.add_edge(child, end_node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TaskKind;
    use crate::ids::IdSource;
    use crate::taskgraph::TaskGraph;
    use otter_sys::ompt::{OMPT_TASK_IMPLICIT, OMPT_TASK_INITIAL};

    fn new_dispatcher() -> (Dispatcher, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(TraceSink::open(dir.path().to_str().unwrap(), "test").unwrap());
        let ids = Arc::new(IdSource::new());
        let graph = Arc::new(TaskGraph::new());
        (Dispatcher::new(ids, sink, graph), dir)
    }

    fn begin_initial_task(d: &Dispatcher, ctx: &mut ThreadContext) -> Arc<TaskHandle> {
        d.on_implicit_task_begin(ctx, None, None, OMPT_TASK_INITIAL, true)
    }

    #[test]
    fn explicit_task_with_no_encountering_task_sources_edge_from_initial_task() {
        let (d, _dir) = new_dispatcher();
        let mut ctx = d.on_thread_begin(ThreadKind::Initial);
        begin_initial_task(&d, &mut ctx);

        let task = d.on_task_create(&mut ctx, None, 0, false, false);
        assert_eq!(task.payload.kind, TaskKind::Explicit);
        assert_eq!(d.graph().node_count(), 2);
        assert_eq!(d.graph().edge_count(), 1);
    }

    #[test]
    fn nested_explicit_task_sources_edge_from_parent_task_node() {
        let (d, _dir) = new_dispatcher();
        let mut ctx = d.on_thread_begin(ThreadKind::Initial);
        begin_initial_task(&d, &mut ctx);

        let parent = d.on_task_create(&mut ctx, None, 0, false, false);
        let child = d.on_task_create(&mut ctx, Some(&parent), 0, false, false);

        assert_eq!(child.payload.parent_id, Some(parent.payload.id));
        assert_eq!(d.graph().node_count(), 3);
        assert_eq!(d.graph().edge_count(), 2);
    }

    #[test]
    fn parallel_region_round_trip_closes_scope_and_drains_ref_count() {
        let (d, _dir) = new_dispatcher();

        let mut master = d.on_thread_begin(ThreadKind::Initial);
        begin_initial_task(&d, &mut master);

        let parallel = d.on_parallel_begin(&mut master, 3, false);
        let master_task = d.on_implicit_task_begin(&mut master, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

        let mut worker_a = d.on_thread_begin(ThreadKind::Worker);
        let task_a =
            d.on_implicit_task_begin(&mut worker_a, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);
        let mut worker_b = d.on_thread_begin(ThreadKind::Worker);
        let task_b =
            d.on_implicit_task_begin(&mut worker_b, Some(&parallel), None, OMPT_TASK_IMPLICIT, false);

        assert_eq!(parallel.region.ref_count(), 3);

        d.on_implicit_task_end(&mut worker_b, Some(&parallel), &task_b);
        d.on_thread_end(worker_b);
        d.on_implicit_task_end(&mut worker_a, Some(&parallel), &task_a);
        d.on_thread_end(worker_a);
        assert_eq!(parallel.region.ref_count(), 1);

        d.on_implicit_task_end(&mut master, Some(&parallel), &master_task);
        d.on_parallel_end(&mut master, &parallel);
        d.on_thread_end(master);

        assert_eq!(parallel.region.ref_count(), 0);
        // initial, parallel-begin, 3 implicit tasks, parallel-end.
        assert_eq!(d.graph().node_count(), 6);
    }

    #[test]
    fn implicit_task_begin_is_idempotent_when_data_already_present() {
        let (d, _dir) = new_dispatcher();
        let mut ctx = d.on_thread_begin(ThreadKind::Initial);
        let first = begin_initial_task(&d, &mut ctx);
        let before = d.graph().node_count();

        let second = d.on_implicit_task_begin(&mut ctx, None, Some(first.clone()), OMPT_TASK_INITIAL, true);

        assert_eq!(first.payload.id, second.payload.id);
        assert_eq!(d.graph().node_count(), before, "reusing existing task data must not mint a node");
    }
}
