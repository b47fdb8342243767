//! Enumerated kinds carried by regions and task-graph nodes, grounded in
//! `task-graph.h` and the `ompt_*_t` enums `otter-sys::ompt` declares.

/// `Location::kind` — the thread role the OMPT runtime reported at
/// thread-begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadKind {
    Initial,
    Worker,
    Unknown,
}

/// The kind of task a `Region::Task` payload describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Initial,
    Implicit,
    Explicit,
    Target,
}

/// Worksharing scope kinds, mirroring `ompt_work_t` (the
/// `single_executor`/`single_other` distinction is kept as separate
/// variants here rather than a field, matching how every other kind is
/// already a plain variant).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    Loop,
    Sections,
    SingleExecutor,
    SingleOther,
    Workshare,
    Distribute,
    Taskloop,
    Scope,
}

impl WorkKind {
    /// Label used for the `event_type` attribute and for the workshare
    /// region's trace name.
    pub fn label(self) -> &'static str {
        match self {
            WorkKind::Loop => "loop",
            WorkKind::Sections => "sections",
            WorkKind::SingleExecutor => "single_executor",
            WorkKind::SingleOther => "single_other",
            WorkKind::Workshare => "workshare",
            WorkKind::Distribute => "distribute",
            WorkKind::Taskloop => "taskloop",
            WorkKind::Scope => "scope",
        }
    }

    /// Only `taskloop` generates tasks, so only it needs a task-graph
    /// scope; the rest are transparent to edge-sourcing.
    pub fn is_task_generating(self) -> bool {
        matches!(self, WorkKind::Taskloop)
    }
}

/// Synchronisation region kinds (`ompt_sync_region_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Barrier,
    BarrierImplicit,
    BarrierExplicit,
    BarrierImplementation,
    Taskwait,
    Taskgroup,
    Reduction,
}

impl SyncKind {
    /// Label used for the `sync_type` attribute.
    pub fn attribute_label(self) -> &'static str {
        match self {
            SyncKind::Barrier => "barrier",
            SyncKind::BarrierImplicit => "barrier_implicit",
            SyncKind::BarrierExplicit => "barrier_explicit",
            SyncKind::BarrierImplementation => "barrier_implementation",
            SyncKind::Taskwait => "taskwait",
            SyncKind::Taskgroup => "taskgroup",
            SyncKind::Reduction => "reduction",
        }
    }
}

/// Pairs begin/end task-graph nodes of the same scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Begin,
    End,
}

/// Region role, used as a common attribute on every emitted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRole {
    Parallel,
    Workshare,
    Sync,
    Task,
    Master,
}

impl RegionRole {
    pub fn attribute_label(self) -> &'static str {
        match self {
            RegionRole::Parallel => "parallel",
            RegionRole::Workshare => "workshare",
            RegionRole::Sync => "sync",
            RegionRole::Task => "task",
            RegionRole::Master => "master",
        }
    }
}
