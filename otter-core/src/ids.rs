//! Unique ID and timestamp source.
//!
//! Every kind of ID — thread, parallel region, task, location ref, region
//! ref — gets its own monotonic counter so that exhausting one kind never
//! perturbs another, and so the type system keeps the kinds from being
//! mixed up at call sites. String refs are interned separately by
//! [`crate::trace::TraceSink`], which owns its own counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

newtype_id!(ThreadId);
newtype_id!(ParallelId);
newtype_id!(TaskId);
newtype_id!(LocationRef);
newtype_id!(RegionRef);

/// The task-graph root is reserved at id 0; the implicit enclosing region
/// shares that convention for parallel ids.
pub const ROOT_TASK_ID: TaskId = TaskId(0);
pub const IMPLICIT_PARALLEL_ID: ParallelId = ParallelId(0);

/// Monotonic counters, one per ID kind, plus the process-start epoch used
/// to convert [`Instant`] readings into nanoseconds-since-epoch.
pub struct IdSource {
    next_thread: AtomicU64,
    next_parallel: AtomicU64,
    next_task: AtomicU64,
    next_location_ref: AtomicU64,
    next_region_ref: AtomicU64,
    epoch: Instant,
}

impl IdSource {
    pub fn new() -> Self {
        Self {
            next_thread: AtomicU64::new(0),
            next_parallel: AtomicU64::new(1),
            next_task: AtomicU64::new(1),
            next_location_ref: AtomicU64::new(0),
            next_region_ref: AtomicU64::new(0),
            epoch: Instant::now(),
        }
    }

    pub fn next_thread_id(&self) -> ThreadId {
        ThreadId(self.next_thread.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_parallel_id(&self) -> ParallelId {
        ParallelId(self.next_parallel.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_task_id(&self) -> TaskId {
        TaskId(self.next_task.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_location_ref(&self) -> LocationRef {
        LocationRef(self.next_location_ref.fetch_add(1, Ordering::Relaxed))
    }

    pub fn next_region_ref(&self) -> RegionRef {
        RegionRef(self.next_region_ref.fetch_add(1, Ordering::Relaxed))
    }

    /// Nanoseconds elapsed since this `IdSource` (and thus the tool) was
    /// initialised. Matches `CLOCK_MONOTONIC` semantics: strictly
    /// non-decreasing per-process, not tied to wall-clock time.
    pub fn timestamp_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Number of threads minted so far. Read-only, unlike the counters
    /// above — used only for the end-of-run resource report.
    pub fn thread_count(&self) -> u64 {
        self.next_thread.load(Ordering::Relaxed)
    }

    /// Parallel regions minted so far, including the implicit enclosing
    /// region (id 0) that `next_parallel` starts counting from 1 to
    /// account for — unlike `task_count`, no `- 1` here: `otter.c`'s
    /// `print_resource_usage` prints `get_unique_parallel_id()` raw.
    pub fn parallel_count(&self) -> u64 {
        self.next_parallel.load(Ordering::Relaxed)
    }

    /// Tasks minted so far; `next_task` starts at 1 (id 0 is reserved for
    /// the task-graph root), matching `ids.c`'s `get_unique_task_id()
    /// - 1`.
    pub fn task_count(&self) -> u64 {
        self.next_task.load(Ordering::Relaxed) - 1
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_start_at_zero_and_increase() {
        let ids = IdSource::new();
        assert_eq!(ids.next_thread_id(), ThreadId(0));
        assert_eq!(ids.next_thread_id(), ThreadId(1));
    }

    #[test]
    fn parallel_ids_start_at_one() {
        let ids = IdSource::new();
        assert_eq!(ids.next_parallel_id(), ParallelId(1));
    }

    #[test]
    fn task_ids_start_at_one_leaving_zero_for_the_graph_root() {
        let ids = IdSource::new();
        assert_eq!(ids.next_task_id(), TaskId(1));
        assert_eq!(ROOT_TASK_ID, TaskId(0));
    }

    #[test]
    fn distinct_counters_do_not_interfere() {
        let ids = IdSource::new();
        let t = ids.next_thread_id();
        let p = ids.next_parallel_id();
        assert_eq!(t, ThreadId(0));
        assert_eq!(p, ParallelId(1));
    }

    #[test]
    fn counts_reflect_minted_ids_without_minting_more() {
        let ids = IdSource::new();
        ids.next_thread_id();
        ids.next_thread_id();
        ids.next_parallel_id();
        ids.next_task_id();
        assert_eq!(ids.thread_count(), 2);
        assert_eq!(ids.parallel_count(), 2);
        assert_eq!(ids.task_count(), 1);
        assert_eq!(ids.thread_count(), 2, "reading counts must not mint more ids");
    }

    #[test]
    fn parallel_count_with_no_explicit_parallel_region_is_one() {
        let ids = IdSource::new();
        assert_eq!(ids.parallel_count(), 1, "the implicit enclosing region alone should count as 1");
    }

    #[test]
    fn timestamps_are_non_decreasing() {
        let ids = IdSource::new();
        let a = ids.timestamp_ns();
        let b = ids.timestamp_ns();
        assert!(b >= a);
    }
}
