//! Per-thread event recorder, implementing the enter/leave algorithms
//! exactly, plus thread-begin/end and task-create trace emission.

use std::sync::Arc;

use log::error;

use crate::domain::region::{Region, RegionKind, TaskPayload};
use crate::domain::types::{RegionRole, SyncKind, ThreadKind, WorkKind};
use crate::domain::{Location, ParallelRegion, StackEntry};
use crate::ids::{IdSource, RegionRef, TaskId, ThreadId};
use crate::trace::{AttributeKey, AttributeList, EvtWriter, TraceSink};
use otter_sys::otf2::OTF2_RegionRole;

/// A `Location` paired with the trace-writer handles that belong to it.
/// Kept out of `domain::Location` so the domain layer never depends on
/// the trace layer (`trace::sink` depends on `domain::OtterError`, not
/// the reverse).
pub struct ThreadContext {
    pub location: Location,
    evt_writer: EvtWriter,
    attrs: AttributeList,
}

pub struct Recorder {
    ids: Arc<IdSource>,
    sink: Arc<TraceSink>,
}

impl Recorder {
    pub fn new(ids: Arc<IdSource>, sink: Arc<TraceSink>) -> Self {
        Self { ids, sink }
    }

    pub fn begin_thread(&self, id: ThreadId, kind: ThreadKind) -> ThreadContext {
        let location = Location::new(&self.ids, id, kind);
        if let Err(e) = self.sink.write_location(location.location_ref.0, &format!("thread {}", id.0)) {
            error!("failed to register location definition: {e}");
        }
        let evt_writer = match self.sink.evt_writer_for(location.location_ref.0) {
            Ok(w) => w,
            Err(e) => {
                error!("fatal: could not obtain event writer for new thread: {e}");
                std::process::abort();
            }
        };
        let mut ctx = ThreadContext { location, evt_writer, attrs: AttributeList::new() };

        ctx.attrs.clear();
        ctx.attrs.add_uint64(AttributeKey::Cpu, id.0);
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.thread_begin(&mut ctx.attrs, time);
        ctx
    }

    pub fn end_thread(&self, mut ctx: ThreadContext) {
        if !ctx.location.region_stack.is_empty() {
            error!(
                "fatal: thread {} reached thread-end with non-empty region stack",
                ctx.location.id
            );
            std::process::abort();
        }
        ctx.attrs.clear();
        ctx.attrs.add_uint64(AttributeKey::Cpu, ctx.location.id.0);
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.thread_end(&mut ctx.attrs, time);
    }

    /// Enter algorithm for a parallel region: suspends the location's
    /// pending definitions, registers the region, and emits the enter
    /// event.
    pub fn enter_parallel(&self, ctx: &mut ThreadContext, region: Arc<ParallelRegion>) {
        let suspended = std::mem::take(&mut ctx.location.rgn_defs);
        ctx.location.rgn_defs_stack.push(suspended);

        if let Err(e) = self.sink.write_region_def(
            region.region_ref.0,
            "parallel",
            OTF2_RegionRole::OTF2_REGION_ROLE_PARALLEL,
        ) {
            error!("failed to register parallel region definition: {e}");
        }

        region.on_enter();

        self.fill_common_attrs(ctx, RegionRole::Parallel, "parallel", "enter");
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.enter(&mut ctx.attrs, time, region.region_ref.0);
        ctx.location.record_event();
        ctx.location.region_stack.push(StackEntry::Parallel(region));
    }

    /// Leave algorithm for a parallel region. Returns `true` if this call
    /// observed `ref_count == 0` and thus owns destruction.
    pub fn leave_parallel(&self, ctx: &mut ThreadContext) -> bool {
        let entry = match ctx.location.region_stack.pop() {
            Some(e) => e,
            None => self.fatal_nesting_violation(ctx, "leave_parallel: region stack empty"),
        };
        let region = match entry {
            StackEntry::Parallel(r) => r,
            StackEntry::Plain(_) => {
                self.fatal_nesting_violation(ctx, "leave_parallel: top of stack is not a parallel region")
            }
        };

        self.fill_common_attrs(ctx, RegionRole::Parallel, "parallel", "leave");
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.leave(&mut ctx.attrs, time, region.region_ref.0);
        ctx.location.record_event();

        let (ref_count, _flushed) = region.on_leave(&mut ctx.location.rgn_defs);
        if let Some(restored) = ctx.location.rgn_defs_stack.pop() {
            ctx.location.rgn_defs = restored;
        }
        ref_count == 0
    }

    pub fn enter_workshare(
        &self,
        ctx: &mut ThreadContext,
        encountering_task: TaskId,
        kind: WorkKind,
        count: u64,
    ) -> RegionRef {
        let region = Region::new_workshare(&self.ids, encountering_task, kind, count);
        let region_ref = region.region_ref;
        if let Err(e) =
            self.sink.write_region_def(region_ref.0, "workshare", OTF2_RegionRole::OTF2_REGION_ROLE_LOOP)
        {
            error!("failed to register workshare region definition: {e}");
        }
        self.fill_common_attrs(ctx, RegionRole::Workshare, kind.label(), "enter");
        ctx.attrs.add_uint64(AttributeKey::WorkCount, count);
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.enter(&mut ctx.attrs, time, region_ref.0);
        ctx.location.record_event();
        ctx.location.region_stack.push(StackEntry::Plain(region));
        region_ref
    }

    pub fn leave_workshare(&self, ctx: &mut ThreadContext) {
        let entry = match ctx.location.region_stack.pop() {
            Some(e) => e,
            None => self.fatal_nesting_violation(ctx, "leave_workshare: region stack empty"),
        };
        let region = match entry {
            StackEntry::Plain(r) if matches!(r.kind, RegionKind::Workshare { .. }) => r,
            _ => self.fatal_nesting_violation(ctx, "leave_workshare: top of stack is not a workshare region"),
        };
        let label = match region.kind {
            RegionKind::Workshare { kind, .. } => kind.label(),
            _ => unreachable!("checked above"),
        };
        self.fill_common_attrs(ctx, RegionRole::Workshare, label, "leave");
        if let RegionKind::Workshare { count, .. } = region.kind {
            ctx.attrs.add_uint64(AttributeKey::WorkCount, count);
        }
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.leave(&mut ctx.attrs, time, region.region_ref.0);
        ctx.location.record_event();
    }

    pub fn enter_sync(&self, ctx: &mut ThreadContext, encountering_task: TaskId, kind: SyncKind) -> RegionRef {
        let region = Region::new_sync(&self.ids, encountering_task, kind);
        let region_ref = region.region_ref;
        if let Err(e) =
            self.sink.write_region_def(region_ref.0, "sync", OTF2_RegionRole::OTF2_REGION_ROLE_BARRIER)
        {
            error!("failed to register sync region definition: {e}");
        }
        self.fill_common_attrs(ctx, RegionRole::Sync, kind.attribute_label(), "enter");
        let sync_type_ref = self.sink.intern_string(kind.attribute_label());
        ctx.attrs.add_string_ref(AttributeKey::SyncType, sync_type_ref);
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.enter(&mut ctx.attrs, time, region_ref.0);
        ctx.location.record_event();
        ctx.location.region_stack.push(StackEntry::Plain(region));
        region_ref
    }

    pub fn leave_sync(&self, ctx: &mut ThreadContext) {
        let entry = match ctx.location.region_stack.pop() {
            Some(e) => e,
            None => self.fatal_nesting_violation(ctx, "leave_sync: region stack empty"),
        };
        let region = match entry {
            StackEntry::Plain(r) if matches!(r.kind, RegionKind::Sync { .. }) => r,
            _ => self.fatal_nesting_violation(ctx, "leave_sync: top of stack is not a sync region"),
        };
        let label = match region.kind {
            RegionKind::Sync { kind } => kind.attribute_label(),
            _ => unreachable!("checked above"),
        };
        self.fill_common_attrs(ctx, RegionRole::Sync, label, "leave");
        let sync_type_ref = self.sink.intern_string(label);
        ctx.attrs.add_string_ref(AttributeKey::SyncType, sync_type_ref);
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.leave(&mut ctx.attrs, time, region.region_ref.0);
        ctx.location.record_event();
    }

    /// Emits a task-create event. Graph-node/edge bookkeeping is the
    /// dispatcher's job; this only produces the trace
    /// event and mints the task's region ref.
    pub fn record_task_create(
        &self,
        ctx: &mut ThreadContext,
        payload: TaskPayload,
    ) -> (RegionRef, TaskPayload) {
        let region = Region::new_task(&self.ids, ctx.location.current_task, payload.clone());
        ctx.attrs.clear();
        ctx.attrs.add_int64(AttributeKey::TaskFlags, payload.flags as i64);
        if let Some(parent) = payload.parent_id {
            ctx.attrs.add_uint64(AttributeKey::ParentTaskId, parent.0);
        }
        let time = self.ids.timestamp_ns();
        ctx.evt_writer.task_create(&mut ctx.attrs, time, ctx.location.id.0 as u32, payload.id.0 as u32);
        ctx.location.record_event();
        (region.region_ref, payload)
    }

    /// Fills the attributes common to every enter/leave event. `event_type`
    /// names the kind of thing being entered or left (e.g. `"parallel"`,
    /// `"loop"`, `"barrier"`); `endpoint` is always the literal `"enter"`
    /// or `"leave"`.
    fn fill_common_attrs(&self, ctx: &mut ThreadContext, role: RegionRole, event_type: &str, endpoint: &str) {
        let region_type_ref = self.sink.intern_string(role.attribute_label());
        let event_type_ref = self.sink.intern_string(event_type);
        let endpoint_ref = self.sink.intern_string(endpoint);

        ctx.attrs.clear();
        ctx.attrs.add_uint64(AttributeKey::Cpu, ctx.location.id.0);
        ctx.attrs.add_uint64(AttributeKey::EncounteringTask, ctx.location.current_task.0);
        ctx.attrs.add_string_ref(AttributeKey::RegionType, region_type_ref);
        ctx.attrs.add_string_ref(AttributeKey::EventType, event_type_ref);
        ctx.attrs.add_string_ref(AttributeKey::Endpoint, endpoint_ref);
    }

    fn fatal_nesting_violation(&self, ctx: &ThreadContext, reason: &str) -> ! {
        error!("fatal nesting violation on thread {}: {reason}", ctx.location.id);
        std::process::abort();
    }
}
