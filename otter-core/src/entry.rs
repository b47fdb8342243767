//! FFI entry point, grounded in `tool_setup`/`tool_finalise` and the
//! `on_ompt_callback_*` trampolines of `otter.c`/`ompt-core-callbacks.c`.
//!
//! Everything in [`dispatcher`](crate::dispatcher) is plain Rust, callable
//! without a live OMPT runtime; this module is the thin adapter that turns
//! the OMPT C ABI into calls against it. It owns two pieces of process-wide
//! state the runtime has no notion of:
//!
//! - a single [`Engine`], built once in `initialize` and read by every
//!   callback thereafter;
//! - a per-OS-thread [`ThreadContext`], since [`Location`](crate::domain::Location)
//!   is exclusively thread-owned.
//!
//! Task and parallel-region handles cross the FFI boundary as raw pointers
//! stashed in `ompt_data_t.ptr`, following the `Arc::into_raw`/`Arc::from_raw`
//! round-trip: a "store" leaks a strong reference into the slot, a "take"
//! reclaims and drops it, and a "borrow" clones-then-forgets to read the
//! slot without disturbing its lifetime. Explicit/target task handles are
//! stored but never taken, since `ompt_callback_task_schedule` is not
//! registered — those allocations live for the process lifetime, the same
//! bounded leak `task-graph.h`'s own `task_data_t` tolerates.

use std::cell::RefCell;
use std::ffi::{c_int, c_uint, c_void};
use std::sync::{Arc, OnceLock};

use log::{error, info};

use otter_sys::ompt::{
    ompt_callback_implicit_task_t, ompt_callback_parallel_begin_t, ompt_callback_parallel_end_t,
    ompt_callback_sync_region_t, ompt_callback_task_create_t, ompt_callback_thread_begin_t,
    ompt_callback_thread_end_t, ompt_callback_work_t, ompt_callbacks_t, ompt_data_t,
    ompt_frame_t, ompt_function_lookup_t, ompt_scope_endpoint_t, ompt_set_callback_t,
    ompt_start_tool_result_t, ompt_sync_region_t, ompt_thread_t, ompt_work_t, OMPT_PARALLEL_LEAGUE,
    OMPT_TASK_INITIAL, OMPT_TASK_TARGET,
};

use crate::config::Config;
use crate::dispatcher::{Dispatcher, ParallelData, TaskHandle};
use crate::domain::types::{SyncKind, ThreadKind, WorkKind};
use crate::ids::IdSource;
use crate::recorder::ThreadContext;
use crate::resource::{self, FinalCounts};
use crate::taskgraph::TaskGraph;
use crate::trace::TraceSink;

struct Engine {
    config: Config,
    ids: Arc<IdSource>,
    sink: Arc<TraceSink>,
    graph: Arc<TaskGraph>,
    dispatcher: Dispatcher,
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

thread_local! {
    static THREAD_CTX: RefCell<Option<ThreadContext>> = const { RefCell::new(None) };
}

fn engine() -> &'static Engine {
    ENGINE.get().expect("ompt callback fired before tool initialize() ran")
}

fn with_ctx<R>(f: impl FnOnce(&mut ThreadContext) -> R) -> R {
    THREAD_CTX.with(|cell| {
        let mut borrow = cell.borrow_mut();
        let ctx = borrow.as_mut().expect("ompt callback fired on a thread with no thread-begin recorded");
        f(ctx)
    })
}

// -- Arc<T> <-> ompt_data_t round-tripping -----------------------------------

unsafe fn store_arc<T>(data: *mut ompt_data_t, value: Arc<T>) {
    (*data).ptr = Arc::into_raw(value).cast_mut().cast::<c_void>();
}

unsafe fn take_arc<T>(data: *mut ompt_data_t) -> Arc<T> {
    let ptr = (*data).ptr.cast_const().cast::<T>();
    Arc::from_raw(ptr)
}

/// Reads an `Arc<T>` out of the slot without taking ownership: clones the
/// reference, then forgets the clone's counterpart so the slot's own
/// reference count is left untouched. Returns `None` if the slot was never
/// written (pointer still null).
unsafe fn borrow_arc<T>(data: *const ompt_data_t) -> Option<Arc<T>> {
    let ptr = (*data).ptr;
    if ptr.is_null() {
        return None;
    }
    let borrowed = Arc::from_raw(ptr.cast_const().cast::<T>());
    let owned = borrowed.clone();
    std::mem::forget(borrowed);
    Some(owned)
}

fn work_kind(wstype: ompt_work_t) -> WorkKind {
    match wstype {
        ompt_work_t::ompt_work_loop => WorkKind::Loop,
        ompt_work_t::ompt_work_sections => WorkKind::Sections,
        ompt_work_t::ompt_work_single_executor => WorkKind::SingleExecutor,
        ompt_work_t::ompt_work_single_other => WorkKind::SingleOther,
        ompt_work_t::ompt_work_distribute => WorkKind::Distribute,
        ompt_work_t::ompt_work_taskloop => WorkKind::Taskloop,
        ompt_work_t::ompt_work_workshare => WorkKind::Workshare,
        ompt_work_t::ompt_work_scope => WorkKind::Scope,
    }
}

fn sync_kind(kind: ompt_sync_region_t) -> SyncKind {
    match kind {
        ompt_sync_region_t::ompt_sync_region_barrier => SyncKind::Barrier,
        ompt_sync_region_t::ompt_sync_region_barrier_implicit => SyncKind::BarrierImplicit,
        ompt_sync_region_t::ompt_sync_region_barrier_explicit => SyncKind::BarrierExplicit,
        ompt_sync_region_t::ompt_sync_region_barrier_implementation => SyncKind::BarrierImplementation,
        ompt_sync_region_t::ompt_sync_region_taskwait => SyncKind::Taskwait,
        ompt_sync_region_t::ompt_sync_region_taskgroup => SyncKind::Taskgroup,
        ompt_sync_region_t::ompt_sync_region_reduction => SyncKind::Reduction,
    }
}

// -- callback trampolines -----------------------------------------------

unsafe extern "C" fn on_thread_begin(thread_type: ompt_thread_t, _thread_data: *mut ompt_data_t) {
    let kind = match thread_type {
        ompt_thread_t::ompt_thread_initial => ThreadKind::Initial,
        ompt_thread_t::ompt_thread_worker => ThreadKind::Worker,
        ompt_thread_t::ompt_thread_other | ompt_thread_t::ompt_thread_unknown => ThreadKind::Unknown,
    };
    let ctx = engine().dispatcher.on_thread_begin(kind);
    THREAD_CTX.with(|cell| *cell.borrow_mut() = Some(ctx));
}

unsafe extern "C" fn on_thread_end(_thread_data: *mut ompt_data_t) {
    let ctx = THREAD_CTX.with(|cell| cell.borrow_mut().take()).expect("thread-end without thread-begin");
    engine().dispatcher.on_thread_end(ctx);
}

unsafe extern "C" fn on_parallel_begin(
    _encountering_task_data: *mut ompt_data_t,
    _encountering_task_frame: *const ompt_frame_t,
    parallel_data: *mut ompt_data_t,
    requested_parallelism: u32,
    flags: c_int,
    _codeptr_ra: *const c_void,
) {
    let is_league = flags & OMPT_PARALLEL_LEAGUE != 0;
    let parallel = with_ctx(|ctx| engine().dispatcher.on_parallel_begin(ctx, requested_parallelism, is_league));
    store_arc(parallel_data, parallel);
}

unsafe extern "C" fn on_parallel_end(
    parallel_data: *mut ompt_data_t,
    _encountering_task_data: *mut ompt_data_t,
    _flags: c_int,
    _codeptr_ra: *const c_void,
) {
    let parallel: Arc<ParallelData> = take_arc(parallel_data);
    with_ctx(|ctx| engine().dispatcher.on_parallel_end(ctx, &parallel));
}

unsafe extern "C" fn on_task_create(
    encountering_task_data: *mut ompt_data_t,
    _encountering_task_frame: *const ompt_frame_t,
    new_task_data: *mut ompt_data_t,
    flags: c_int,
    has_dependences: c_int,
    _codeptr_ra: *const c_void,
) {
    let encountering: Option<Arc<TaskHandle>> = borrow_arc(encountering_task_data);
    let is_target = flags & OMPT_TASK_TARGET != 0;
    let handle = with_ctx(|ctx| {
        engine().dispatcher.on_task_create(ctx, encountering.as_ref(), flags, has_dependences != 0, is_target)
    });
    store_arc(new_task_data, handle);
}

unsafe extern "C" fn on_implicit_task(
    endpoint: ompt_scope_endpoint_t,
    parallel_data: *mut ompt_data_t,
    task_data: *mut ompt_data_t,
    _actual_parallelism: u32,
    _index: u32,
    flags: c_int,
) {
    let is_initial = flags & OMPT_TASK_INITIAL != 0;
    let parallel: Option<Arc<ParallelData>> = if is_initial { None } else { borrow_arc(parallel_data) };

    match endpoint {
        ompt_scope_endpoint_t::ompt_scope_begin | ompt_scope_endpoint_t::ompt_scope_beginend => {
            let existing: Option<Arc<TaskHandle>> = borrow_arc(task_data);
            let had_existing = existing.is_some();
            let handle = with_ctx(|ctx| {
                engine().dispatcher.on_implicit_task_begin(ctx, parallel.as_ref(), existing, flags, is_initial)
            });
            if !had_existing {
                store_arc(task_data, handle);
            }
        }
        ompt_scope_endpoint_t::ompt_scope_end => {}
    }

    if matches!(endpoint, ompt_scope_endpoint_t::ompt_scope_end | ompt_scope_endpoint_t::ompt_scope_beginend) {
        let task: Arc<TaskHandle> = take_arc(task_data);
        with_ctx(|ctx| engine().dispatcher.on_implicit_task_end(ctx, parallel.as_ref(), &task));
    }
}

unsafe extern "C" fn on_work(
    wstype: ompt_work_t,
    endpoint: ompt_scope_endpoint_t,
    _parallel_data: *mut ompt_data_t,
    _task_data: *mut ompt_data_t,
    count: u64,
    _codeptr_ra: *const c_void,
) {
    let kind = work_kind(wstype);
    match endpoint {
        ompt_scope_endpoint_t::ompt_scope_begin | ompt_scope_endpoint_t::ompt_scope_beginend => {
            with_ctx(|ctx| {
                engine().dispatcher.on_work_begin(ctx, kind, count);
            });
        }
        ompt_scope_endpoint_t::ompt_scope_end => {}
    }
    if matches!(endpoint, ompt_scope_endpoint_t::ompt_scope_end | ompt_scope_endpoint_t::ompt_scope_beginend) {
        with_ctx(|ctx| engine().dispatcher.on_work_end(ctx, kind));
    }
}

unsafe extern "C" fn on_sync_region(
    kind: ompt_sync_region_t,
    endpoint: ompt_scope_endpoint_t,
    _parallel_data: *mut ompt_data_t,
    _task_data: *mut ompt_data_t,
    _codeptr_ra: *const c_void,
) {
    let kind = sync_kind(kind);
    match endpoint {
        ompt_scope_endpoint_t::ompt_scope_begin | ompt_scope_endpoint_t::ompt_scope_beginend => {
            with_ctx(|ctx| {
                engine().dispatcher.on_sync_region_begin(ctx, kind);
            });
        }
        ompt_scope_endpoint_t::ompt_scope_end => {}
    }
    if matches!(endpoint, ompt_scope_endpoint_t::ompt_scope_end | ompt_scope_endpoint_t::ompt_scope_beginend) {
        with_ctx(|ctx| engine().dispatcher.on_sync_region_end(ctx));
    }
}

// -- tool_setup / tool_finalise -----------------------------------------

/// Looks up and registers one callback, logging (not failing) on a runtime
/// that can't honor it — mirrors `include_callback` in `otter.c`.
unsafe fn register_callback(lookup: ompt_function_lookup_t, which: ompt_callbacks_t, callback: *const c_void) {
    let set_callback = lookup(c"ompt_set_callback".as_ptr().cast());
    if set_callback.is_null() {
        error!("runtime did not provide ompt_set_callback; tracing will be incomplete");
        return;
    }
    let set_callback: ompt_set_callback_t = std::mem::transmute(set_callback);
    let result = set_callback(which, callback);
    info!("registered {which:?}: {result:?}");
}

unsafe extern "C" fn tool_initialize(
    lookup: ompt_function_lookup_t,
    _initial_device_num: c_int,
    _tool_data: *mut ompt_data_t,
) -> c_int {
    let _ = env_logger::try_init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("invalid configuration: {e}");
            return 0;
        }
    };

    let pid = std::process::id();
    let archive_name = config.archive_name(pid);
    let sink = match TraceSink::open(&config.trace_output_path, &archive_name) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to open trace archive: {e}");
            return 0;
        }
    };

    let ids = Arc::new(IdSource::new());
    let graph = Arc::new(TaskGraph::new());
    let dispatcher = Dispatcher::new(ids.clone(), sink.clone(), graph.clone());

    if ENGINE.set(Engine { config, ids, sink, graph, dispatcher }).is_err() {
        error!("tool_initialize called more than once");
        return 0;
    }

    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_thread_begin,
        on_thread_begin as ompt_callback_thread_begin_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_thread_end,
        on_thread_end as ompt_callback_thread_end_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_parallel_begin,
        on_parallel_begin as ompt_callback_parallel_begin_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_parallel_end,
        on_parallel_end as ompt_callback_parallel_end_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_task_create,
        on_task_create as ompt_callback_task_create_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_implicit_task,
        on_implicit_task as ompt_callback_implicit_task_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_work,
        on_work as ompt_callback_work_t as *const c_void,
    );
    register_callback(
        lookup,
        ompt_callbacks_t::ompt_callback_sync_region,
        on_sync_region as ompt_callback_sync_region_t as *const c_void,
    );

    info!("otter tool initialized, writing archive {archive_name} to {}", engine().config.trace_output_path);
    1
}

unsafe extern "C" fn tool_finalize(_tool_data: *mut ompt_data_t) {
    let engine = engine();
    engine.sink.close();

    if let Some(path) = &engine.config.task_graph_output {
        match std::fs::File::create(path) {
            Ok(file) => {
                let result = match engine.config.task_graph_format {
                    crate::config::TaskGraphFormat::Dot => engine.graph.write_dot(file),
                };
                if let Err(e) = result {
                    error!("failed to write task graph to {path}: {e}");
                }
            }
            Err(e) => error!("failed to create task graph output file {path}: {e}"),
        }
    }
    if let Some(path) = &engine.config.task_graph_nodeattr {
        match std::fs::File::create(path) {
            Ok(file) => {
                if let Err(e) = engine.graph.write_node_attr_csv(file) {
                    error!("failed to write task graph node attributes to {path}: {e}");
                }
            }
            Err(e) => error!("failed to create node attribute file {path}: {e}"),
        }
    }

    resource::report(&FinalCounts {
        threads: engine.ids.thread_count(),
        parallel_regions: engine.ids.parallel_count(),
        tasks: engine.ids.task_count(),
    });
}

/// The symbol every OMPT-capable runtime `dlsym`s for at startup. The
/// returned box is intentionally never freed: the runtime holds this
/// pointer for the remainder of the process.
#[no_mangle]
pub extern "C" fn ompt_start_tool(
    _omp_version: c_uint,
    _runtime_version: *const std::os::raw::c_char,
) -> *const ompt_start_tool_result_t {
    Box::into_raw(Box::new(ompt_start_tool_result_t {
        initialize: Some(tool_initialize),
        finalize: Some(tool_finalize),
        tool_data: ompt_data_t::NONE,
    }))
}
