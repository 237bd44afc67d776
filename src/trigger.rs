//! The cross-thread reload request and the call it fires.
//!
//! The poller arms [`DeferredSignal`]; the intercepted host call takes it.
//! `take` swaps the flag to false before any JVM call is made, so an arm that
//! lands while a reload is running is kept for the next host call, and no
//! arm is consumed twice.

use crate::cache::{HandleCache, ResolvedHandles};
use crate::env::{Jni, LocalRef, Runtime};
use crate::error::{CallError, GraftError, Result};
use crate::locator::ExecutionContext;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

#[derive(Debug, Default)]
pub struct DeferredSignal {
    armed: AtomicBool,
}

impl DeferredSignal {
    pub const fn new() -> Self {
        DeferredSignal {
            armed: AtomicBool::new(false),
        }
    }

    pub fn arm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// Clears the signal, returning whether it was armed.
    pub fn take(&self) -> bool {
        self.armed.swap(false, Ordering::AcqRel)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

/// The feature flag read by the companion's `xrayOn()`.
#[derive(Debug, Default)]
pub struct FeatureToggle {
    enabled: AtomicBool,
}

impl FeatureToggle {
    pub const fn new() -> Self {
        FeatureToggle {
            enabled: AtomicBool::new(false),
        }
    }

    /// Inverts the toggle and returns the new value.
    pub fn flip(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::AcqRel)
    }

    pub fn get(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

/// Runs the reload chain on the calling thread.
///
/// Attaches the thread if needed and detaches it again on every path. Never
/// populates `cache`.
pub fn fire<R: Runtime>(runtime: &R, cache: &HandleCache) -> Result<()> {
    let cx = ExecutionContext::acquire(runtime)?;
    let handles = cache.get()?;
    invoke_reload(cx.env(), handles)?;
    debug!(attached = cx.is_owned(), "deferred reload completed");
    Ok(())
}

fn step<T>(step: &'static str, result: std::result::Result<T, CallError>) -> Result<T> {
    result.map_err(|source| GraftError::DeferredCallFailed { step, source })
}

/// singleton → nested subsystem → reload().
pub fn invoke_reload<J: Jni + ?Sized>(jni: &J, handles: &ResolvedHandles) -> Result<()> {
    let instance = LocalRef::new(
        jni,
        step(
            "instance",
            jni.call_static_object_method(handles.owner_class, handles.instance_method, &[]),
        )?,
    );
    let nested = LocalRef::new(
        jni,
        step("nested field", jni.get_object_field(instance.get(), handles.nested_field))?,
    );
    step("reload", jni.call_void_method(nested.get(), handles.reload_method, &[]))
}
