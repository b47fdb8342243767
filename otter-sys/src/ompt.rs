//! OMPT (OpenMP Tools Interface) ABI, as defined by the OpenMP
//! specification (`omp-tools.h`). Only the subset used by
//! `otter-core`'s callback dispatcher is declared.

use std::os::raw::{c_int, c_void};

/// Opaque per-entity data slot the runtime hands the tool a pointer to.
/// The tool is free to stash a pointer or an integer in `.ptr`/`.value`;
/// the runtime never inspects it.
#[repr(C)]
#[derive(Clone, Copy)]
pub union ompt_data_t {
    pub value: u64,
    pub ptr: *mut c_void,
}

impl ompt_data_t {
    pub const NONE: Self = Self { value: 0 };
}

#[repr(C)]
pub struct ompt_frame_t {
    pub exit_frame: ompt_data_t,
    pub enter_frame: ompt_data_t,
    pub exit_frame_flags: c_int,
    pub enter_frame_flags: c_int,
}

pub type ompt_id_t = u64;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_scope_endpoint_t {
    ompt_scope_begin = 1,
    ompt_scope_end = 2,
    ompt_scope_beginend = 3,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_thread_t {
    ompt_thread_initial = 1,
    ompt_thread_worker = 2,
    ompt_thread_other = 3,
    ompt_thread_unknown = 4,
}

/// `ompt_task_flag_t` — bitmask, not an exhaustive enum.
pub const OMPT_TASK_INITIAL: c_int = 0x0000_0001;
pub const OMPT_TASK_IMPLICIT: c_int = 0x0000_0002;
pub const OMPT_TASK_EXPLICIT: c_int = 0x0000_0004;
pub const OMPT_TASK_TARGET: c_int = 0x0000_0008;
pub const OMPT_TASK_UNDEFERRED: c_int = 0x0800_0000u32 as c_int;
pub const OMPT_TASK_UNTIED: c_int = 0x1000_0000u32 as c_int;
pub const OMPT_TASK_FINAL: c_int = 0x2000_0000u32 as c_int;
pub const OMPT_TASK_MERGEABLE: c_int = 0x4000_0000u32 as c_int;
pub const OMPT_TASK_MERGED: c_int = 0x8000_0000u32 as c_int;

/// `ompt_parallel_flag_t` — bitmask.
pub const OMPT_PARALLEL_TEAM: c_int = 0x0000_0001;
pub const OMPT_PARALLEL_LEAGUE: c_int = 0x4000_0000u32 as c_int;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_work_t {
    ompt_work_loop = 1,
    ompt_work_sections = 2,
    ompt_work_single_executor = 3,
    ompt_work_single_other = 4,
    ompt_work_workshare = 5,
    ompt_work_distribute = 6,
    ompt_work_taskloop = 7,
    ompt_work_scope = 8,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_sync_region_t {
    ompt_sync_region_barrier = 1,
    ompt_sync_region_barrier_implicit = 2,
    ompt_sync_region_barrier_explicit = 3,
    ompt_sync_region_barrier_implementation = 4,
    ompt_sync_region_taskwait = 5,
    ompt_sync_region_taskgroup = 6,
    ompt_sync_region_reduction = 7,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_task_status_t {
    ompt_task_complete = 1,
    ompt_task_yield = 2,
    ompt_task_cancel = 3,
    ompt_task_detach = 4,
    ompt_task_early_fulfill = 5,
    ompt_task_late_fulfill = 6,
    ompt_task_switch = 7,
}

/// Callback function-pointer typedefs — one per OMPT event this tool
/// registers. Parameter shapes match the OMPT spec's
/// `ompt_callback_*_t` typedefs.
pub type ompt_callback_thread_begin_t =
    unsafe extern "C" fn(thread_type: ompt_thread_t, thread_data: *mut ompt_data_t);
pub type ompt_callback_thread_end_t = unsafe extern "C" fn(thread_data: *mut ompt_data_t);

pub type ompt_callback_parallel_begin_t = unsafe extern "C" fn(
    encountering_task_data: *mut ompt_data_t,
    encountering_task_frame: *const ompt_frame_t,
    parallel_data: *mut ompt_data_t,
    requested_parallelism: u32,
    flags: c_int,
    codeptr_ra: *const c_void,
);
pub type ompt_callback_parallel_end_t = unsafe extern "C" fn(
    parallel_data: *mut ompt_data_t,
    encountering_task_data: *mut ompt_data_t,
    flags: c_int,
    codeptr_ra: *const c_void,
);

pub type ompt_callback_task_create_t = unsafe extern "C" fn(
    encountering_task_data: *mut ompt_data_t,
    encountering_task_frame: *const ompt_frame_t,
    new_task_data: *mut ompt_data_t,
    flags: c_int,
    has_dependences: c_int,
    codeptr_ra: *const c_void,
);

pub type ompt_callback_implicit_task_t = unsafe extern "C" fn(
    endpoint: ompt_scope_endpoint_t,
    parallel_data: *mut ompt_data_t,
    task_data: *mut ompt_data_t,
    actual_parallelism: u32,
    index: u32,
    flags: c_int,
);

pub type ompt_callback_work_t = unsafe extern "C" fn(
    wstype: ompt_work_t,
    endpoint: ompt_scope_endpoint_t,
    parallel_data: *mut ompt_data_t,
    task_data: *mut ompt_data_t,
    count: u64,
    codeptr_ra: *const c_void,
);

pub type ompt_callback_sync_region_t = unsafe extern "C" fn(
    kind: ompt_sync_region_t,
    endpoint: ompt_scope_endpoint_t,
    parallel_data: *mut ompt_data_t,
    task_data: *mut ompt_data_t,
    codeptr_ra: *const c_void,
);

pub type ompt_callback_task_schedule_t = unsafe extern "C" fn(
    prior_task_data: *mut ompt_data_t,
    prior_task_status: ompt_task_status_t,
    next_task_data: *mut ompt_data_t,
);

/// Identifiers for `ompt_set_callback`; values follow the order callbacks
/// are declared in `omp-tools.h`. Only the handful this tool registers
/// are named; the rest of the real enum is elided.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_callbacks_t {
    ompt_callback_thread_begin = 1,
    ompt_callback_thread_end = 2,
    ompt_callback_parallel_begin = 3,
    ompt_callback_parallel_end = 4,
    ompt_callback_task_create = 5,
    ompt_callback_task_schedule = 6,
    ompt_callback_implicit_task = 7,
    ompt_callback_work = 20,
    ompt_callback_sync_region = 23,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ompt_set_result_t {
    ompt_set_error = 0,
    ompt_set_never = 1,
    ompt_set_impossible = 2,
    ompt_set_sometimes = 3,
    ompt_set_sometimes_paired = 4,
    ompt_set_always = 5,
}

pub type ompt_callback_t = *const c_void;
pub type ompt_set_callback_t =
    unsafe extern "C" fn(which: ompt_callbacks_t, callback: ompt_callback_t) -> ompt_set_result_t;
pub type ompt_function_lookup_t =
    unsafe extern "C" fn(interface_function_name: *const i8) -> *const c_void;
pub type ompt_get_thread_data_t = unsafe extern "C" fn() -> *mut ompt_data_t;

/// The runtime hands the tool one of these at `ompt_start_tool` time.
#[repr(C)]
pub struct ompt_start_tool_result_t {
    pub initialize: Option<
        unsafe extern "C" fn(
            lookup: ompt_function_lookup_t,
            initial_device_num: c_int,
            tool_data: *mut ompt_data_t,
        ) -> c_int,
    >,
    pub finalize: Option<unsafe extern "C" fn(tool_data: *mut ompt_data_t)>,
    pub tool_data: ompt_data_t,
}
