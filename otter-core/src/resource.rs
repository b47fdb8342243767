//! Resource-usage report, grounded in `print_resource_usage`
//! in `otter.c`. Printed once at `tool_finalise`, after the trace archive
//! and task graph have been written.

use std::mem::MaybeUninit;

/// Final tallies reported alongside the `getrusage(2)` summary, mirroring
/// the counters `print_resource_usage` reads back from the ID source
/// (`get_unique_thread_id()`, `get_unique_parallel_id()`,
/// `get_unique_task_id() - 1`).
pub struct FinalCounts {
    pub threads: u64,
    pub parallel_regions: u64,
    pub tasks: u64,
}

/// Writes the process resource-usage summary to stderr, in the same shape
/// as `print_resource_usage`'s `fprintf(stderr, "%35s: %8lu %s\n", ...)` table.
pub fn report(counts: &FinalCounts) {
    let mut usage = MaybeUninit::<libc::rusage>::zeroed();
    let status = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if status != 0 {
        log::warn!("getrusage failed with status {status}; skipping resource usage report");
        return;
    }
    let usage = unsafe { usage.assume_init() };

    eprintln!();
    eprintln!("PROCESS RESOURCE USAGE:");
    eprintln!("{:>35}: {:>8} kb", "maximum resident set size", usage.ru_maxrss);
    eprintln!("{:>35}: {:>8}", "page reclaims (soft page faults)", usage.ru_minflt);
    eprintln!("{:>35}: {:>8}", "page faults (hard page faults)", usage.ru_majflt);
    eprintln!("{:>35}: {:>8}", "block input operations", usage.ru_inblock);
    eprintln!("{:>35}: {:>8}", "block output operations", usage.ru_oublock);
    eprintln!();
    eprintln!("{:>35}: {:>8}", "threads", counts.threads);
    eprintln!("{:>35}: {:>8}", "parallel regions", counts.parallel_regions);
    eprintln!("{:>35}: {:>8}", "tasks", counts.tasks);
}
