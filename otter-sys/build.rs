//! Locates the system libotf2 via pkg-config.
//!
//! otf2 ships a `otf2.pc` file with every install (including the
//! `otf2-config` wrapper most HPC sites use instead); pkg-config is the
//! standard way a `-sys` crate picks up a C library's include/link flags
//! without vendoring or guessing a path.

fn main() {
    match pkg_config::probe_library("otf2") {
        Ok(_) => {}
        Err(e) => {
            println!("cargo:warning=could not locate libotf2 via pkg-config: {e}");
            println!("cargo:rustc-link-lib=dylib=otf2");
        }
    }
}
