//! Raw FFI surface consumed by `otter-core`.
//!
//! Two external ABIs are bound here, neither reimplemented:
//!
//! - [`ompt`]: the subset of the OMPT (OpenMP Tools Interface) C ABI the
//!   engine consumes as callback arguments. These types come from the
//!   OpenMP specification, not from us; we only declare the layouts and
//!   typedefs our callbacks need.
//! - [`otf2`]: the subset of the OTF2 trace-writer C API the engine calls
//!   into as an opaque sink. Function bodies live in `libotf2.so`, located
//!   at build time by `build.rs` via pkg-config.
//!
//! Nothing in this crate interprets or reimplements either ABI's
//! semantics; it only describes memory layout and symbols so `otter-core`
//! can call across the boundary safely.

#![allow(non_camel_case_types)]

pub mod ompt;
pub mod otf2;
