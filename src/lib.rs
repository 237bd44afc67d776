//! # jvmti-graft
//!
//! Hot-patches a class inside a JVM that is already running in the current
//! process, injects a companion class with native methods into the same class
//! loader, and runs a reload call on the host's render thread whenever a key
//! toggles the feature.
//!
//! ## Quick Start
//!
//! **1. Create a library crate that builds a `cdylib`:**
//! ```toml
//! [lib]
//! crate-type = ["cdylib"]
//!
//! [dependencies]
//! jvmti-graft = "0.1"
//! ```
//!
//! **2. Export the graft with the two class blobs:**
//! ```rust,ignore
//! jvmti_graft::export_graft! {
//!     patched: include_bytes!("../classes/Block.class"),
//!     companion: include_bytes!("../classes/JNIBridge.class"),
//! }
//! ```
//!
//! **3. Load it into the host**, either by injecting the library (Windows,
//! `DllMain`) or through the JVM attach API (`Agent_OnAttach`) with options
//! such as `key=X,log=debug`.
//!
//! ## What happens on attach
//!
//! 1. The running JVM is located and the calling thread attached.
//! 2. `can_redefine_classes` is requested and the target class found among
//!    the loaded classes by signature.
//! 3. The target is redefined from the patched blob.
//! 4. The companion class is defined in the target's loader and its natives
//!    (`allowBlock`, `xrayOn`) are bound.
//! 5. The handles for `getMinecraft().renderGlobal.loadRenderers()` are
//!    resolved once and cached.
//! 6. `glOrtho` is detoured. When the key poller has requested a reload, the
//!    next `glOrtho` call on the render thread performs it before forwarding.
//!
//! Each step runs only if the previous one succeeded. Failures are logged
//! through `tracing` and never take the host down.
//!
//! ## Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`sys`] | Raw JNI/JVMTI tables |
//! | [`env`] | `Runtime`/`Jni`/`Instrumentation` seams and reference guards |
//! | [`locator`] | VM discovery, thread attachment guard |
//! | [`session`] | Capabilities, class lookup |
//! | [`patcher`], [`bridge`] | Redefinition, companion injection |
//! | [`cache`], [`trigger`] | Resolved handles, deferred reload |
//! | [`hook`], [`render_hook`] | Interception |
//! | [`poller`] | Key polling |
//! | [`pipeline`], [`entry`] | Installation sequence, process entry points |

pub mod sys;
pub mod env;

#[doc(hidden)]
pub mod jni_wrapper;
#[doc(hidden)]
pub mod jvmti_wrapper;

pub mod bridge;
pub mod cache;
pub mod class_loader;
pub mod classfile;
pub mod config;
pub mod entry;
pub mod error;
pub mod graft;
pub mod hook;
pub mod locator;
pub mod logging;
pub mod module;
pub mod patcher;
pub mod payload;
pub mod pipeline;
pub mod poller;
pub mod prelude;
pub mod render_hook;
pub mod session;
pub mod trigger;
pub mod vm;

pub use crate::config::GraftConfig;
pub use crate::error::{CallError, GraftError};
pub use crate::graft::{Graft, Stage};
pub use crate::payload::Payload;
pub use crate::sys::jni;

/// Exports the host-facing entry points for a graft library.
///
/// Generates `Agent_OnAttach` on every platform and `DllMain` on Windows.
/// Both start the graft with the given class blobs.
///
/// ```rust,ignore
/// jvmti_graft::export_graft! {
///     patched: include_bytes!("../classes/Block.class"),
///     companion: include_bytes!("../classes/JNIBridge.class"),
/// }
/// ```
#[macro_export]
macro_rules! export_graft {
    (patched: $patched:expr, companion: $companion:expr $(,)?) => {
        fn __graft_payload() -> $crate::Payload<'static> {
            $crate::Payload {
                patched_class: $patched,
                companion_class: $companion,
            }
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnAttach(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let options = $crate::entry::options_str(options);
            $crate::entry::attach_with_vm(vm, options, __graft_payload())
        }

        #[cfg(windows)]
        #[no_mangle]
        pub extern "system" fn DllMain(
            _module: *mut std::ffi::c_void,
            reason: u32,
            _reserved: *mut std::ffi::c_void,
        ) -> i32 {
            $crate::entry::dll_main(reason, __graft_payload()) as i32
        }
    };
}
