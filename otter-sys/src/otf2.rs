//! Bindings to the subset of libotf2's C API the trace sink adapter
//! calls. Mirrors the real OTF2 API (`otf2/otf2.h`) used by the
//! original's `trace-core.c`: archive lifecycle, the global definition
//! writer, per-location event writers, and attribute lists.

use libc::{c_char, c_void};

pub type OTF2_TimeStamp = u64;
pub type OTF2_StringRef = u32;
pub type OTF2_RegionRef = u32;
pub type OTF2_LocationRef = u64;
pub type OTF2_LocationGroupRef = u32;
pub type OTF2_SystemTreeNodeRef = u32;
pub type OTF2_AttributeRef = u32;
pub type OTF2_CommRef = u32;

pub const OTF2_UNDEFINED_SYSTEM_TREE_NODE: OTF2_SystemTreeNodeRef = u32::MAX;
pub const OTF2_UNDEFINED_COMM: OTF2_CommRef = u32::MAX;
pub const OTF2_UNDEFINED_UINT32: u32 = u32::MAX;

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_FileMode {
    OTF2_FILEMODE_WRITE = 0,
    OTF2_FILEMODE_READ = 1,
    OTF2_FILEMODE_MODIFY = 2,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_FileSubstrate {
    OTF2_SUBSTRATE_UNDEFINED = 0,
    OTF2_SUBSTRATE_POSIX = 1,
    OTF2_SUBSTRATE_SION = 2,
    OTF2_SUBSTRATE_NONE = 3,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_Compression {
    OTF2_COMPRESSION_UNDEFINED = 0,
    OTF2_COMPRESSION_NONE = 1,
    OTF2_COMPRESSION_ZLIB = 2,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_LocationType {
    OTF2_LOCATION_TYPE_UNKNOWN = 0,
    OTF2_LOCATION_TYPE_CPU_THREAD = 1,
    OTF2_LOCATION_TYPE_GPU = 2,
    OTF2_LOCATION_TYPE_METRIC = 3,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_LocationGroupType {
    OTF2_LOCATION_GROUP_TYPE_UNKNOWN = 0,
    OTF2_LOCATION_GROUP_TYPE_PROCESS = 1,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_RegionRole {
    OTF2_REGION_ROLE_FUNCTION = 0,
    OTF2_REGION_ROLE_PARALLEL = 11,
    OTF2_REGION_ROLE_TASK = 25,
    OTF2_REGION_ROLE_LOOP = 14,
    OTF2_REGION_ROLE_SECTIONS = 19,
    OTF2_REGION_ROLE_BARRIER = 2,
    OTF2_REGION_ROLE_CRITICAL = 5,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_Type {
    OTF2_TYPE_UINT8 = 2,
    OTF2_TYPE_UINT32 = 4,
    OTF2_TYPE_UINT64 = 5,
    OTF2_TYPE_INT64 = 8,
    OTF2_TYPE_STRING = 10,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_FlushType {
    OTF2_FLUSH = 1,
    OTF2_NO_FLUSH = 0,
}

#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OTF2_FileType {
    OTF2_FILETYPE_EVENTS = 3,
    OTF2_FILETYPE_DEFINITIONS = 4,
}

/// Opaque handles — never dereferenced on the Rust side, only passed
/// back into the C API that owns them.
#[repr(C)]
pub struct OTF2_Archive {
    _opaque: [u8; 0],
}
#[repr(C)]
pub struct OTF2_GlobalDefWriter {
    _opaque: [u8; 0],
}
#[repr(C)]
pub struct OTF2_EvtWriter {
    _opaque: [u8; 0],
}
#[repr(C)]
pub struct OTF2_AttributeList {
    _opaque: [u8; 0],
}

pub type OTF2_FlushCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    file_type: OTF2_FileType,
    location: OTF2_LocationRef,
    caller_data: *mut c_void,
    r#final: bool,
) -> OTF2_FlushType;

pub type OTF2_PostFlushCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    file_type: OTF2_FileType,
    location: OTF2_LocationRef,
) -> OTF2_TimeStamp;

#[repr(C)]
pub struct OTF2_FlushCallbacks {
    pub otf2_pre_flush: Option<OTF2_FlushCallback>,
    pub otf2_post_flush: Option<OTF2_PostFlushCallback>,
}

extern "C" {
    pub fn OTF2_Archive_Open(
        archive_path: *const c_char,
        archive_name: *const c_char,
        file_mode: OTF2_FileMode,
        chunk_size_events: u32,
        chunk_size_definitions: u32,
        file_substrate: OTF2_FileSubstrate,
        compression: OTF2_Compression,
    ) -> *mut OTF2_Archive;

    pub fn OTF2_Archive_Close(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_SetFlushCallbacks(
        archive: *mut OTF2_Archive,
        flush_callbacks: *const OTF2_FlushCallbacks,
        user_data: *mut c_void,
    ) -> i32;
    pub fn OTF2_Archive_SetSerialCollectiveCallbacks(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_OpenEvtFiles(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_CloseEvtFiles(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_OpenDefFiles(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_CloseDefFiles(archive: *mut OTF2_Archive) -> i32;
    pub fn OTF2_Archive_GetGlobalDefWriter(archive: *mut OTF2_Archive)
        -> *mut OTF2_GlobalDefWriter;
    pub fn OTF2_Archive_GetEvtWriter(
        archive: *mut OTF2_Archive,
        location: OTF2_LocationRef,
    ) -> *mut OTF2_EvtWriter;
    pub fn OTF2_Archive_CloseEvtWriter(
        archive: *mut OTF2_Archive,
        writer: *mut OTF2_EvtWriter,
    ) -> i32;

    pub fn OTF2_GlobalDefWriter_WriteClockProperties(
        writer: *mut OTF2_GlobalDefWriter,
        timer_resolution: u64,
        global_offset: u64,
        trace_length: u64,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteString(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_StringRef,
        string: *const c_char,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteSystemTreeNode(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_SystemTreeNodeRef,
        name: OTF2_StringRef,
        class_name: OTF2_StringRef,
        parent: OTF2_SystemTreeNodeRef,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteLocationGroup(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_LocationGroupRef,
        name: OTF2_StringRef,
        location_group_type: OTF2_LocationGroupType,
        system_tree_parent: OTF2_SystemTreeNodeRef,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteLocation(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_LocationRef,
        name: OTF2_StringRef,
        location_type: OTF2_LocationType,
        number_of_events: u64,
        location_group: OTF2_LocationGroupRef,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteRegion(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_RegionRef,
        name: OTF2_StringRef,
        canonical_name: OTF2_StringRef,
        description: OTF2_StringRef,
        region_role: OTF2_RegionRole,
        paradigm: u32,
        region_flags: u32,
        source_file: OTF2_StringRef,
        begin_line_number: u32,
        end_line_number: u32,
    ) -> i32;
    pub fn OTF2_GlobalDefWriter_WriteAttribute(
        writer: *mut OTF2_GlobalDefWriter,
        self_ref: OTF2_AttributeRef,
        name: OTF2_StringRef,
        description: OTF2_StringRef,
        attr_type: OTF2_Type,
    ) -> i32;

    pub fn OTF2_AttributeList_New() -> *mut OTF2_AttributeList;
    pub fn OTF2_AttributeList_Delete(list: *mut OTF2_AttributeList);
    pub fn OTF2_AttributeList_RemoveAllAttributes(list: *mut OTF2_AttributeList);
    pub fn OTF2_AttributeList_AddStringRef(
        list: *mut OTF2_AttributeList,
        attribute: OTF2_AttributeRef,
        value: OTF2_StringRef,
    ) -> i32;
    pub fn OTF2_AttributeList_AddUint64(
        list: *mut OTF2_AttributeList,
        attribute: OTF2_AttributeRef,
        value: u64,
    ) -> i32;
    pub fn OTF2_AttributeList_AddInt64(
        list: *mut OTF2_AttributeList,
        attribute: OTF2_AttributeRef,
        value: i64,
    ) -> i32;

    pub fn OTF2_EvtWriter_Enter(
        writer: *mut OTF2_EvtWriter,
        attributes: *mut OTF2_AttributeList,
        time: OTF2_TimeStamp,
        region: OTF2_RegionRef,
    ) -> i32;
    pub fn OTF2_EvtWriter_Leave(
        writer: *mut OTF2_EvtWriter,
        attributes: *mut OTF2_AttributeList,
        time: OTF2_TimeStamp,
        region: OTF2_RegionRef,
    ) -> i32;
    pub fn OTF2_EvtWriter_ThreadBegin(
        writer: *mut OTF2_EvtWriter,
        attributes: *mut OTF2_AttributeList,
        time: OTF2_TimeStamp,
        thread_contingent: OTF2_CommRef,
        sequence_count: u64,
    ) -> i32;
    pub fn OTF2_EvtWriter_ThreadEnd(
        writer: *mut OTF2_EvtWriter,
        attributes: *mut OTF2_AttributeList,
        time: OTF2_TimeStamp,
        thread_contingent: OTF2_CommRef,
        sequence_count: u64,
    ) -> i32;
    pub fn OTF2_EvtWriter_ThreadTaskCreate(
        writer: *mut OTF2_EvtWriter,
        attributes: *mut OTF2_AttributeList,
        time: OTF2_TimeStamp,
        thread_contingent: OTF2_CommRef,
        creating_thread: u32,
        generation_number: u32,
    ) -> i32;
}
