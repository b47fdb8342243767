//! Trace sink adapter, grounded in `trace_initialise_archive`
//! and the `trace_event_*` functions of `trace-core.c`. The opaque wall
//! between the engine and libotf2: nothing outside this module ever sees
//! an `otter_sys::otf2` pointer.

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use log::{error, warn};
use otter_sys::otf2::{
    OTF2_Archive, OTF2_Archive_Close, OTF2_Archive_CloseDefFiles, OTF2_Archive_CloseEvtFiles,
    OTF2_Archive_GetEvtWriter, OTF2_Archive_GetGlobalDefWriter, OTF2_Archive_Open,
    OTF2_Archive_OpenDefFiles, OTF2_Archive_OpenEvtFiles, OTF2_Archive_SetSerialCollectiveCallbacks,
    OTF2_Compression, OTF2_EvtWriter, OTF2_EvtWriter_Enter, OTF2_EvtWriter_Leave,
    OTF2_EvtWriter_ThreadBegin, OTF2_EvtWriter_ThreadEnd, OTF2_EvtWriter_ThreadTaskCreate,
    OTF2_FileMode, OTF2_FileSubstrate, OTF2_GlobalDefWriter, OTF2_GlobalDefWriter_WriteAttribute,
    OTF2_GlobalDefWriter_WriteClockProperties, OTF2_GlobalDefWriter_WriteLocation,
    OTF2_GlobalDefWriter_WriteLocationGroup, OTF2_GlobalDefWriter_WriteRegion,
    OTF2_GlobalDefWriter_WriteString, OTF2_GlobalDefWriter_WriteSystemTreeNode,
    OTF2_LocationGroupType, OTF2_LocationRef, OTF2_LocationType, OTF2_RegionRef, OTF2_RegionRole,
    OTF2_StringRef, OTF2_TimeStamp, OTF2_UNDEFINED_SYSTEM_TREE_NODE,
};

use crate::domain::OtterError;

const CHUNK_SIZE_EVENTS_DEFAULT: u32 = 1024 * 1024;
const CHUNK_SIZE_DEFINITIONS_DEFAULT: u32 = 4 * 1024 * 1024;

struct ArchiveHandle(*mut OTF2_Archive);
unsafe impl Send for ArchiveHandle {}

struct DefWriterHandle(*mut OTF2_GlobalDefWriter);
unsafe impl Send for DefWriterHandle {}

/// Per-location event writer. Exclusively owned by the thread whose
/// `Location` holds it — never shared — so `Send` is sound.
pub struct EvtWriter(*mut OTF2_EvtWriter);
unsafe impl Send for EvtWriter {}

impl EvtWriter {
    pub fn enter(
        &self,
        attrs: &mut super::attributes::AttributeList,
        time: u64,
        region: OTF2_RegionRef,
    ) {
        let status = unsafe { OTF2_EvtWriter_Enter(self.0, attrs.as_ptr(), time as OTF2_TimeStamp, region) };
        if status != 0 {
            error!("OTF2_EvtWriter_Enter failed with status {status} for region {region}");
        }
    }

    pub fn leave(
        &self,
        attrs: &mut super::attributes::AttributeList,
        time: u64,
        region: OTF2_RegionRef,
    ) {
        let status = unsafe { OTF2_EvtWriter_Leave(self.0, attrs.as_ptr(), time as OTF2_TimeStamp, region) };
        if status != 0 {
            error!("OTF2_EvtWriter_Leave failed with status {status} for region {region}");
        }
    }

    pub fn thread_begin(&self, attrs: &mut super::attributes::AttributeList, time: u64) {
        let status = unsafe {
            OTF2_EvtWriter_ThreadBegin(self.0, attrs.as_ptr(), time as OTF2_TimeStamp, 0, 0)
        };
        if status != 0 {
            error!("OTF2_EvtWriter_ThreadBegin failed with status {status}");
        }
    }

    pub fn thread_end(&self, attrs: &mut super::attributes::AttributeList, time: u64) {
        let status = unsafe {
            OTF2_EvtWriter_ThreadEnd(self.0, attrs.as_ptr(), time as OTF2_TimeStamp, 0, 0)
        };
        if status != 0 {
            error!("OTF2_EvtWriter_ThreadEnd failed with status {status}");
        }
    }

    pub fn task_create(
        &self,
        attrs: &mut super::attributes::AttributeList,
        time: u64,
        creating_thread: u32,
        generation_number: u32,
    ) {
        let status = unsafe {
            OTF2_EvtWriter_ThreadTaskCreate(
                self.0,
                attrs.as_ptr(),
                time as OTF2_TimeStamp,
                0,
                creating_thread,
                generation_number,
            )
        };
        if status != 0 {
            error!("OTF2_EvtWriter_ThreadTaskCreate failed with status {status}");
        }
    }
}

/// The opaque sink: an archive handle and a global-definition-writer
/// handle, each behind its own mutex. Construction performs exactly the
/// sequence in `trace_initialise_archive`.
pub struct TraceSink {
    archive: Mutex<ArchiveHandle>,
    def_writer: Mutex<DefWriterHandle>,
    interned: Mutex<HashMap<String, OTF2_StringRef>>,
    next_interned_ref: AtomicU32,
}

/// Interned strings live above every reserved static ref range (attribute
/// names, location names, region names) so the two schemes never collide.
const INTERNED_STRING_BASE: u32 = 1_000_000;

impl TraceSink {
    pub fn open(archive_path: &str, archive_name: &str) -> Result<Self, OtterError> {
        let path_c = CString::new(archive_path).map_err(|e| OtterError::ArchiveOpenFailed {
            path: archive_path.to_string(),
            reason: e.to_string(),
        })?;
        let name_c = CString::new(archive_name).map_err(|e| OtterError::ArchiveOpenFailed {
            path: archive_path.to_string(),
            reason: e.to_string(),
        })?;

        let archive = unsafe {
            OTF2_Archive_Open(
                path_c.as_ptr(),
                name_c.as_ptr(),
                OTF2_FileMode::OTF2_FILEMODE_WRITE,
                CHUNK_SIZE_EVENTS_DEFAULT,
                CHUNK_SIZE_DEFINITIONS_DEFAULT,
                OTF2_FileSubstrate::OTF2_SUBSTRATE_POSIX,
                OTF2_Compression::OTF2_COMPRESSION_NONE,
            )
        };
        if archive.is_null() {
            return Err(OtterError::ArchiveOpenFailed {
                path: archive_path.to_string(),
                reason: "OTF2_Archive_Open returned null".to_string(),
            });
        }

        unsafe {
            OTF2_Archive_SetSerialCollectiveCallbacks(archive);
            OTF2_Archive_OpenEvtFiles(archive);
            OTF2_Archive_OpenDefFiles(archive);
        }

        let def_writer = unsafe { OTF2_Archive_GetGlobalDefWriter(archive) };
        if def_writer.is_null() {
            return Err(OtterError::ArchiveOpenFailed {
                path: archive_path.to_string(),
                reason: "OTF2_Archive_GetGlobalDefWriter returned null".to_string(),
            });
        }

        let sink = Self {
            archive: Mutex::new(ArchiveHandle(archive)),
            def_writer: Mutex::new(DefWriterHandle(def_writer)),
            interned: Mutex::new(HashMap::new()),
            next_interned_ref: AtomicU32::new(INTERNED_STRING_BASE),
        };
        sink.write_bootstrap_definitions()?;
        Ok(sink)
    }

    /// Interns `value`, writing a new string definition the first time it
    /// is seen and returning the cached ref on every later call. Backs the
    /// `region_type`/`event_type`/`endpoint`/`sync_type` attribute values
    /// which otherwise have no string ref of their own.
    pub fn intern_string(&self, value: &str) -> OTF2_StringRef {
        let mut interned = self.interned.lock().expect("interned strings mutex poisoned");
        if let Some(&string_ref) = interned.get(value) {
            return string_ref;
        }
        let string_ref = self.next_interned_ref.fetch_add(1, Ordering::Relaxed);
        let writer = self.def_writer.lock().expect("def writer mutex poisoned").0;
        if let Err(e) = self.write_string_locked(writer, string_ref, value) {
            error!("failed to intern string {value:?}: {e}");
        }
        interned.insert(value.to_string(), string_ref);
        string_ref
    }

    /// Writes clock properties, the empty string at ref 0, the default
    /// system-tree node, and the default location group — exactly the
    /// bootstrap sequence `trace_initialise_archive` performs before any
    /// per-thread definitions are written.
    fn write_bootstrap_definitions(&self) -> Result<(), OtterError> {
        let writer = self.def_writer.lock().expect("def writer mutex poisoned").0;

        let status = unsafe {
            OTF2_GlobalDefWriter_WriteClockProperties(writer, 1_000_000_000, 0, u64::MAX)
        };
        self.check("OTF2_GlobalDefWriter_WriteClockProperties", status)?;

        self.write_string_locked(writer, 0, "")?;
        self.write_string_locked(writer, 1, "node")?;

        let status = unsafe {
            OTF2_GlobalDefWriter_WriteSystemTreeNode(
                writer,
                0,
                1,
                1,
                OTF2_UNDEFINED_SYSTEM_TREE_NODE,
            )
        };
        self.check("OTF2_GlobalDefWriter_WriteSystemTreeNode", status)?;

        self.write_string_locked(writer, 2, "process")?;
        let status = unsafe {
            OTF2_GlobalDefWriter_WriteLocationGroup(
                writer,
                0,
                2,
                OTF2_LocationGroupType::OTF2_LOCATION_GROUP_TYPE_PROCESS,
                0,
            )
        };
        self.check("OTF2_GlobalDefWriter_WriteLocationGroup", status)?;

        for key in crate::trace::attributes::AttributeKey::ALL {
            let name_ref = 10 + key.as_ref();
            self.write_string_locked(writer, name_ref, key.name())?;
            let status = unsafe {
                OTF2_GlobalDefWriter_WriteAttribute(
                    writer,
                    key.as_ref(),
                    name_ref,
                    0,
                    key.otf2_type(),
                )
            };
            self.check("OTF2_GlobalDefWriter_WriteAttribute", status)?;
        }

        Ok(())
    }

    fn write_string_locked(
        &self,
        writer: *mut OTF2_GlobalDefWriter,
        string_ref: OTF2_StringRef,
        value: &str,
    ) -> Result<(), OtterError> {
        let c = CString::new(value).unwrap_or_default();
        let status = unsafe { OTF2_GlobalDefWriter_WriteString(writer, string_ref, c.as_ptr()) };
        self.check("OTF2_GlobalDefWriter_WriteString", status)
    }

    pub fn write_location(&self, location_ref: OTF2_LocationRef, name: &str) -> Result<(), OtterError> {
        let writer = self.def_writer.lock().expect("def writer mutex poisoned").0;
        self.write_string_locked(writer, 100 + location_ref as u32, name)?;
        let status = unsafe {
            OTF2_GlobalDefWriter_WriteLocation(
                writer,
                location_ref,
                100 + location_ref as u32,
                OTF2_LocationType::OTF2_LOCATION_TYPE_CPU_THREAD,
                0,
                0,
            )
        };
        self.check("OTF2_GlobalDefWriter_WriteLocation", status)
    }

    /// Registers a region definition so its ref can be used as the
    /// `region` argument of `Enter`/`Leave`. Called once per region at
    /// construction time, mirroring `trace-core.c` emitting a
    /// region definition lazily the first time a given kind is traced.
    pub fn write_region_def(
        &self,
        region_ref: OTF2_RegionRef,
        name: &str,
        role: OTF2_RegionRole,
    ) -> Result<(), OtterError> {
        let writer = self.def_writer.lock().expect("def writer mutex poisoned").0;
        let name_ref = 1000 + region_ref;
        self.write_string_locked(writer, name_ref, name)?;
        let status = unsafe {
            OTF2_GlobalDefWriter_WriteRegion(
                writer, region_ref, name_ref, name_ref, name_ref, role, 0, 0, 0, 0, 0,
            )
        };
        self.check("OTF2_GlobalDefWriter_WriteRegion", status)
    }

    pub fn evt_writer_for(&self, location_ref: OTF2_LocationRef) -> Result<EvtWriter, OtterError> {
        let archive = self.archive.lock().expect("archive mutex poisoned").0;
        let writer = unsafe { OTF2_Archive_GetEvtWriter(archive, location_ref) };
        if writer.is_null() {
            return Err(OtterError::TraceWriterFailed { call: "OTF2_Archive_GetEvtWriter", status: -1 });
        }
        Ok(EvtWriter(writer))
    }

    fn check(&self, call: &'static str, status: i32) -> Result<(), OtterError> {
        if status != 0 {
            warn!("{call} returned non-zero status {status}");
            return Err(OtterError::TraceWriterFailed { call, status });
        }
        Ok(())
    }

    pub fn close(&self) {
        let archive = self.archive.lock().expect("archive mutex poisoned").0;
        unsafe {
            OTF2_Archive_CloseEvtFiles(archive);
            OTF2_Archive_CloseDefFiles(archive);
            let status = OTF2_Archive_Close(archive);
            if status != 0 {
                error!("OTF2_Archive_Close failed with status {status}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_writes_bootstrap_definitions_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TraceSink::open(dir.path().to_str().unwrap(), "test").unwrap();
        sink.close();
    }

    #[test]
    fn interning_the_same_string_twice_returns_the_same_ref() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TraceSink::open(dir.path().to_str().unwrap(), "test").unwrap();
        let a = sink.intern_string("parallel");
        let b = sink.intern_string("parallel");
        let c = sink.intern_string("enter");
        assert_eq!(a, b);
        assert_ne!(a, c);
        sink.close();
    }

    #[test]
    fn interned_refs_stay_clear_of_the_bootstrap_attribute_range() {
        let dir = tempfile::tempdir().unwrap();
        let sink = TraceSink::open(dir.path().to_str().unwrap(), "test").unwrap();
        let r = sink.intern_string("loop");
        assert!(r >= INTERNED_STRING_BASE);
        sink.close();
    }
}
