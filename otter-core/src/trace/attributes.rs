//! Attribute keys and the scratch attribute-list builder.
//!
//! Every emitted event carries a handful of `(key, type, value)` triples.
//! The keys below are the fixed, process-wide attribute definitions the
//! sink registers once at archive-open time; `AttributeList` is the
//! per-event scratch buffer built fresh (cleared and refilled) before each
//! `Enter`/`Leave`/`ThreadBegin`/`ThreadEnd`/`ThreadTaskCreate` call.

use otter_sys::otf2::{
    OTF2_AttributeList, OTF2_AttributeList_AddInt64, OTF2_AttributeList_AddStringRef,
    OTF2_AttributeList_AddUint64, OTF2_AttributeList_Delete, OTF2_AttributeList_New,
    OTF2_AttributeList_RemoveAllAttributes, OTF2_AttributeRef, OTF2_Type,
};

/// The fixed set of attribute definitions this tool writes once to the
/// global def writer and then references by ref on every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKey {
    Cpu,
    EncounteringTask,
    RegionType,
    EventType,
    Endpoint,
    SyncType,
    WorkCount,
    TaskFlags,
    ParentTaskId,
}

impl AttributeKey {
    pub const ALL: [AttributeKey; 9] = [
        AttributeKey::Cpu,
        AttributeKey::EncounteringTask,
        AttributeKey::RegionType,
        AttributeKey::EventType,
        AttributeKey::Endpoint,
        AttributeKey::SyncType,
        AttributeKey::WorkCount,
        AttributeKey::TaskFlags,
        AttributeKey::ParentTaskId,
    ];

    pub fn as_ref(self) -> OTF2_AttributeRef {
        match self {
            AttributeKey::Cpu => 0,
            AttributeKey::EncounteringTask => 1,
            AttributeKey::RegionType => 2,
            AttributeKey::EventType => 3,
            AttributeKey::Endpoint => 4,
            AttributeKey::SyncType => 5,
            AttributeKey::WorkCount => 6,
            AttributeKey::TaskFlags => 7,
            AttributeKey::ParentTaskId => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeKey::Cpu => "cpu",
            AttributeKey::EncounteringTask => "encountering_task_id",
            AttributeKey::RegionType => "region_type",
            AttributeKey::EventType => "event_type",
            AttributeKey::Endpoint => "endpoint",
            AttributeKey::SyncType => "sync_type",
            AttributeKey::WorkCount => "work_count",
            AttributeKey::TaskFlags => "task_flags",
            AttributeKey::ParentTaskId => "parent_task_id",
        }
    }

    pub fn otf2_type(self) -> OTF2_Type {
        match self {
            AttributeKey::Cpu
            | AttributeKey::EncounteringTask
            | AttributeKey::WorkCount
            | AttributeKey::ParentTaskId => OTF2_Type::OTF2_TYPE_UINT64,
            AttributeKey::RegionType | AttributeKey::EventType | AttributeKey::Endpoint
            | AttributeKey::SyncType => OTF2_Type::OTF2_TYPE_STRING,
            AttributeKey::TaskFlags => OTF2_Type::OTF2_TYPE_INT64,
        }
    }
}

/// An owned, reusable attribute list backing one `OTF2_AttributeList`.
/// Raw pointer, but exclusively owned and touched by the thread that
/// created it — never shared, so `Send` is safe despite the `unsafe impl`.
pub struct AttributeList {
    raw: *mut OTF2_AttributeList,
}

unsafe impl Send for AttributeList {}

impl AttributeList {
    pub fn new() -> Self {
        let raw = unsafe { OTF2_AttributeList_New() };
        Self { raw }
    }

    pub fn clear(&mut self) {
        unsafe { OTF2_AttributeList_RemoveAllAttributes(self.raw) };
    }

    pub fn add_string_ref(&mut self, key: AttributeKey, value: otter_sys::otf2::OTF2_StringRef) {
        unsafe { OTF2_AttributeList_AddStringRef(self.raw, key.as_ref(), value) };
    }

    pub fn add_uint64(&mut self, key: AttributeKey, value: u64) {
        unsafe { OTF2_AttributeList_AddUint64(self.raw, key.as_ref(), value) };
    }

    pub fn add_int64(&mut self, key: AttributeKey, value: i64) {
        unsafe { OTF2_AttributeList_AddInt64(self.raw, key.as_ref(), value) };
    }

    pub(crate) fn as_ptr(&mut self) -> *mut OTF2_AttributeList {
        self.raw
    }
}

impl Default for AttributeList {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AttributeList {
    fn drop(&mut self) {
        unsafe { OTF2_AttributeList_Delete(self.raw) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_keys_have_stable_distinct_refs() {
        let refs: Vec<_> = AttributeKey::ALL.iter().map(|k| k.as_ref()).collect();
        let mut sorted = refs.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), refs.len(), "attribute refs must be unique");
    }
}
