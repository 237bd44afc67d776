//! Process-level entry points used by [`export_graft!`](crate::export_graft).
//!
//! Attach does as little as possible on the loader's thread: it builds the
//! process-wide [`Graft`] and starts two threads, one that installs the graft
//! and one that polls the toggle key.
//!
//! Only the first start in a process takes effect. When the JVM loads the
//! library as an agent, `DllMain` leaves the start to `Agent_OnAttach` so the
//! agent's options and VM are the ones used.

use crate::config::GraftConfig;
use crate::env::{JavaVm, Runtime};
use crate::error::Result;
use crate::graft::{Graft, Stage};
use crate::hook;
use crate::locator;
use crate::logging;
use crate::payload::Payload;
use crate::pipeline;
use crate::render_hook;
use crate::sys::jni;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::sync::OnceLock;
use std::thread;
use tracing::{error, info, warn};

static GRAFT: OnceLock<Graft<JavaVm>> = OnceLock::new();

/// The process-wide graft, once attach has run.
pub fn graft() -> Option<&'static Graft<JavaVm>> {
    GRAFT.get()
}

enum RuntimeSource {
    Discover,
    Provided(JavaVm),
}

/// Starts the graft from a plain library load (e.g. `DllMain`).
pub fn process_attach(payload: Payload<'static>, options: &str) -> bool {
    start(payload, options, RuntimeSource::Discover)
}

/// Starts the graft from `Agent_OnAttach`.
///
/// Returns `JNI_ERR` if the graft could not be started, including when an
/// earlier start in this process already claimed it.
///
/// # Safety
///
/// `vm` must be the live `JavaVM*` the JVM passed to the agent.
pub unsafe fn attach_with_vm(vm: *mut jni::JavaVM, options: &str, payload: Payload<'static>) -> jni::jint {
    if vm.is_null() {
        return jni::JNI_ERR;
    }
    let config = load_config(options);
    let vm = JavaVm::from_raw(vm, config.jni_version);
    if start_with(config, payload, RuntimeSource::Provided(vm)) {
        jni::JNI_OK
    } else {
        error!(options, "agent attach refused, options not applied");
        jni::JNI_ERR
    }
}

/// Whether the calling thread is already attached to `runtime`.
///
/// The JVM loads agent libraries on one of its own threads; an injected
/// library is loaded on a foreign one.
pub fn on_runtime_thread<R: Runtime>(runtime: &R) -> bool {
    matches!(runtime.get_env(), Ok(Some(_)))
}

/// Removes the hook. Called on process detach.
pub fn process_detach() {
    if let Some(graft) = GRAFT.get() {
        graft.shutdown();
    }
}

/// The agent options string, empty if null or not UTF-8.
///
/// # Safety
///
/// `options` must be null or a NUL-terminated string that outlives `'a`.
pub unsafe fn options_str<'a>(options: *const c_char) -> &'a str {
    if options.is_null() {
        ""
    } else {
        CStr::from_ptr(options).to_str().unwrap_or("")
    }
}

fn load_config(options: &str) -> GraftConfig {
    match GraftConfig::from_options(options) {
        Ok(config) => {
            logging::init(&config);
            config
        }
        Err(e) => {
            let config = GraftConfig::default();
            logging::init(&config);
            warn!(error = %e, options, "ignoring agent options");
            config
        }
    }
}

fn start(payload: Payload<'static>, options: &str, source: RuntimeSource) -> bool {
    let config = load_config(options);
    start_with(config, payload, source)
}

fn start_with(config: GraftConfig, payload: Payload<'static>, source: RuntimeSource) -> bool {
    if GRAFT.set(Graft::new(config, hook::default_backend())).is_err() {
        warn!("graft already started in this process");
        return false;
    }
    let Some(graft) = GRAFT.get() else {
        return false;
    };

    let init = thread::Builder::new()
        .name("graft-init".to_string())
        .spawn(move || initialize(graft, payload, source));
    if let Err(e) = init {
        error!(error = %e, "failed to spawn init thread");
        return false;
    }

    start_poller(graft);
    true
}

fn initialize(graft: &'static Graft<JavaVm>, payload: Payload<'static>, source: RuntimeSource) {
    match install(graft, &payload, source) {
        Ok(stage) => info!(?stage, "initialization finished"),
        Err(e) => error!(error = %e, stage = ?graft.stage(), "initialization aborted"),
    }
}

fn install(graft: &Graft<JavaVm>, payload: &Payload<'_>, source: RuntimeSource) -> Result<Stage> {
    let vm = match source {
        RuntimeSource::Discover => locator::discover(graft.config().jni_version)?,
        RuntimeSource::Provided(vm) => vm,
    };
    graft.install_runtime(vm)?;
    let site = render_hook::site(graft.config());
    pipeline::run(graft, payload, &site)
}

#[cfg(windows)]
fn start_poller(graft: &'static Graft<JavaVm>) {
    use crate::poller::{AsyncKeyState, Poller};

    let config = graft.config();
    let poller = Poller::new(AsyncKeyState::new(config.toggle_key), config.poll_interval);
    match poller.spawn(graft.toggle(), graft.signal()) {
        Ok(_) => info!(key = config.toggle_key, "key poller started"),
        Err(e) => error!(error = %e, "failed to spawn key poller"),
    }
}

#[cfg(not(windows))]
fn start_poller(_graft: &'static Graft<JavaVm>) {
    info!("no key source on this platform; toggle with the embedder's own poller");
}

/// `DllMain` body: attach on process attach unless the JVM is loading the
/// library as an agent, tear down on process detach.
#[cfg(windows)]
pub fn dll_main(reason: u32, payload: Payload<'static>) -> bool {
    use windows::Win32::System::SystemServices::{DLL_PROCESS_ATTACH, DLL_PROCESS_DETACH};

    match reason {
        DLL_PROCESS_ATTACH => {
            if loaded_as_agent() {
                info!("loaded by the JVM, waiting for Agent_OnAttach");
            } else {
                process_attach(payload, "");
            }
        }
        DLL_PROCESS_DETACH => process_detach(),
        _ => {}
    }
    true
}

// Runs under the loader lock: module lookup and GetEnv only read state.
#[cfg(windows)]
fn loaded_as_agent() -> bool {
    JavaVm::discover(GraftConfig::default().jni_version)
        .map(|vm| on_runtime_thread(&vm))
        .unwrap_or(false)
}
