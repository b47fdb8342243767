//! Region and parallel-region objects, modeled as a tagged variant over
//! kind: `RegionKind` carries the kind-specific payload, `Region` the
//! fields common to every kind.

use std::sync::{Arc, Mutex};

use crate::containers::Queue;
use crate::ids::{IdSource, ParallelId, RegionRef, TaskId};

use super::types::{RegionRole, SyncKind, TaskKind, WorkKind};

/// Kind-specific payload for a non-parallel region. Parallel regions are
/// modeled separately as [`ParallelRegion`] since they carry shared,
/// mutex-guarded state rather than purely thread-local fields.
#[derive(Debug, Clone)]
pub enum RegionKind {
    Workshare { kind: WorkKind, count: u64 },
    Sync { kind: SyncKind },
    Task(TaskPayload),
    Master { thread: crate::ids::ThreadId },
}

#[derive(Debug, Clone)]
pub struct TaskPayload {
    pub id: TaskId,
    pub kind: TaskKind,
    pub flags: i32,
    pub parent_id: Option<TaskId>,
    pub parent_kind: Option<TaskKind>,
    pub has_dependences: bool,
}

/// A thread-local region: fields common to every non-parallel kind, plus
/// its kind-specific payload.
#[derive(Debug, Clone)]
pub struct Region {
    pub region_ref: RegionRef,
    pub role: RegionRole,
    pub encountering_task: TaskId,
    pub kind: RegionKind,
}

impl Region {
    pub fn new_workshare(
        ids: &IdSource,
        encountering_task: TaskId,
        kind: WorkKind,
        count: u64,
    ) -> Self {
        Self {
            region_ref: ids.next_region_ref(),
            role: RegionRole::Workshare,
            encountering_task,
            kind: RegionKind::Workshare { kind, count },
        }
    }

    pub fn new_sync(ids: &IdSource, encountering_task: TaskId, kind: SyncKind) -> Self {
        Self {
            region_ref: ids.next_region_ref(),
            role: RegionRole::Sync,
            encountering_task,
            kind: RegionKind::Sync { kind },
        }
    }

    pub fn new_task(ids: &IdSource, encountering_task: TaskId, payload: TaskPayload) -> Self {
        Self {
            region_ref: ids.next_region_ref(),
            role: RegionRole::Task,
            encountering_task,
            kind: RegionKind::Task(payload),
        }
    }

    pub fn new_master(
        ids: &IdSource,
        encountering_task: TaskId,
        thread: crate::ids::ThreadId,
    ) -> Self {
        Self {
            region_ref: ids.next_region_ref(),
            role: RegionRole::Master,
            encountering_task,
            kind: RegionKind::Master { thread },
        }
    }
}

/// Mutable, mutex-guarded fields of a parallel region:
/// `ref_count`, `enter_count`, and the FIFO of region refs awaiting a
/// flush of their definitions to the global trace writer.
#[derive(Debug, Default)]
struct ParallelRegionState {
    ref_count: u64,
    enter_count: u64,
    rgn_defs: Queue<RegionRef>,
}

/// The shared parallel-region object. Created by the master thread in
/// parallel-begin, reached by workers through the runtime's opaque data
/// slot, and referenced everywhere as `Arc<ParallelRegion>` so region ids
/// never need to cross thread boundaries as raw pointers.
#[derive(Debug)]
pub struct ParallelRegion {
    pub id: ParallelId,
    pub region_ref: RegionRef,
    pub encountering_task: TaskId,
    pub requested_parallelism: u32,
    pub is_league: bool,
    state: Mutex<ParallelRegionState>,
}

impl ParallelRegion {
    pub fn new(
        ids: &IdSource,
        encountering_task: TaskId,
        requested_parallelism: u32,
        is_league: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: ids.next_parallel_id(),
            region_ref: ids.next_region_ref(),
            encountering_task,
            requested_parallelism,
            is_league,
            state: Mutex::new(ParallelRegionState::default()),
        })
    }

    /// Called on enter: increments `ref_count`/`enter_count` and returns
    /// the values after the increment.
    pub fn on_enter(&self) -> (u64, u64) {
        let mut state = self.state.lock().expect("parallel region mutex poisoned");
        state.ref_count += 1;
        state.enter_count += 1;
        (state.ref_count, state.enter_count)
    }

    /// Called on leave: merges `location_defs` into this region's queue
    /// and decrements `ref_count`. Returns the post-decrement `ref_count`
    /// — the caller destroys the region (and flushes `rgn_defs`) iff this
    /// is zero.
    pub fn on_leave(&self, location_defs: &mut Queue<RegionRef>) -> (u64, Queue<RegionRef>) {
        let mut state = self.state.lock().expect("parallel region mutex poisoned");
        state.rgn_defs.append(location_defs);
        state.ref_count -= 1;
        let ref_count = state.ref_count;
        let flushed = if ref_count == 0 {
            std::mem::take(&mut state.rgn_defs)
        } else {
            Queue::new()
        };
        (ref_count, flushed)
    }

    pub fn ref_count(&self) -> u64 {
        self.state.lock().expect("parallel region mutex poisoned").ref_count
    }

    pub fn enter_count(&self) -> u64 {
        self.state.lock().expect("parallel region mutex poisoned").enter_count
    }
}

/// An entry on a location's `region_stack`: either a shared parallel
/// region or a thread-local region value.
#[derive(Debug, Clone)]
pub enum StackEntry {
    Parallel(Arc<ParallelRegion>),
    Plain(Region),
}

impl StackEntry {
    pub fn region_ref(&self) -> RegionRef {
        match self {
            StackEntry::Parallel(p) => p.region_ref,
            StackEntry::Plain(r) => r.region_ref,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parallel_region_enter_increments_both_counters() {
        let ids = IdSource::new();
        let region = ParallelRegion::new(&ids, TaskId(0), 2, false);
        assert_eq!(region.on_enter(), (1, 1));
        assert_eq!(region.on_enter(), (2, 2));
        assert_eq!(region.ref_count(), 2);
        assert_eq!(region.enter_count(), 2);
    }

    #[test]
    fn parallel_region_leave_decrements_ref_count_and_flushes_at_zero() {
        let ids = IdSource::new();
        let region = ParallelRegion::new(&ids, TaskId(0), 2, false);
        region.on_enter();
        region.on_enter();

        let mut defs_a = Queue::new();
        defs_a.push(RegionRef(10));
        let (ref_count, flushed) = region.on_leave(&mut defs_a);
        assert_eq!(ref_count, 1);
        assert_eq!(flushed.len(), 0);

        let mut defs_b = Queue::new();
        defs_b.push(RegionRef(11));
        let (ref_count, flushed) = region.on_leave(&mut defs_b);
        assert_eq!(ref_count, 0);
        assert_eq!(flushed.len(), 2);
    }

    #[test]
    fn enter_count_never_decreases_across_nested_enters() {
        let ids = IdSource::new();
        let region = ParallelRegion::new(&ids, TaskId(0), 2, false);
        let (_, e1) = region.on_enter();
        let mut empty = Queue::new();
        region.on_leave(&mut empty);
        let (_, e2) = region.on_enter();
        assert!(e2 >= e1);
    }
}
