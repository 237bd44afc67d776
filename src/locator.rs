//! Finding the JVM and binding the calling thread to it.

use crate::env::{JavaVm, Runtime};
use crate::error::{GraftError, Result};
use crate::sys::jni;
use tracing::{debug, info, warn};

/// Discovers the JVM already running in this process.
pub fn discover(jni_version: jni::jint) -> Result<JavaVm> {
    let vm = JavaVm::discover(jni_version)?;
    info!(vm = ?vm.java_vm_ptr(), "found running JVM");
    Ok(vm)
}

/// The calling thread's binding to the JVM.
///
/// A thread that was already attached keeps its attachment; a thread this
/// guard attached is detached when the guard drops, on every exit path.
pub struct ExecutionContext<'rt, R: Runtime> {
    runtime: &'rt R,
    env: R::Env,
    owned: bool,
}

impl<'rt, R: Runtime> ExecutionContext<'rt, R> {
    pub fn acquire(runtime: &'rt R) -> Result<Self> {
        match runtime.get_env() {
            Ok(Some(env)) => Ok(ExecutionContext {
                runtime,
                env,
                owned: false,
            }),
            Ok(None) => {
                let env = runtime.attach_current_thread().map_err(GraftError::AttachFailed)?;
                debug!("attached current thread");
                Ok(ExecutionContext {
                    runtime,
                    env,
                    owned: true,
                })
            }
            Err(code) => Err(GraftError::EnvLookupFailed(code)),
        }
    }

    pub fn env(&self) -> &R::Env {
        &self.env
    }

    /// Whether this guard attached the thread and will detach it.
    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

impl<R: Runtime> Drop for ExecutionContext<'_, R> {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        match self.runtime.detach_current_thread() {
            Ok(()) => debug!("detached current thread"),
            Err(code) => warn!(code, "DetachCurrentThread failed"),
        }
    }
}
