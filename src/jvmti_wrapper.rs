//! [`Instrumentation`] over a raw `jvmtiEnv` pointer.

use crate::env::Instrumentation;
use crate::sys::jni;
use crate::sys::jvmti;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use tracing::warn;

/// A JVMTI environment.
///
/// The environment itself is process-wide and may be used from any attached
/// thread.
pub struct Jvmti {
    env: *mut jvmti::jvmtiEnv,
}

// Missing table entries are reported the way the VM reports an absent function.
macro_rules! ti_fn {
    ($self:ident, $func:ident) => {
        (*(*$self.env).functions)
            .$func
            .ok_or(jvmti::jvmtiError::NOT_AVAILABLE)?
    };
}

impl Jvmti {
    /// Retrieves a JVMTI environment from the VM.
    ///
    /// # Safety
    ///
    /// `vm` must be a live `JavaVM*`.
    pub unsafe fn new(vm: *mut jni::JavaVM, version: jni::jint) -> Result<Self, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();
        let res = ((**vm).GetEnv)(vm, &mut env_ptr, version);
        if res != jni::JNI_OK {
            return Err(res);
        }
        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }
        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    /// # Safety
    ///
    /// `env` must be a live `jvmtiEnv*` that outlives the returned handle.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let err = ti_fn!(self, Deallocate)(self.env, mem);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn redefine_classes(&self, class_definitions: &[jvmti::jvmtiClassDefinition]) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let err = ti_fn!(self, RedefineClasses)(
                self.env,
                class_definitions.len() as jni::jint,
                class_definitions.as_ptr(),
            );
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Instrumentation for Jvmti {
    fn add_capabilities(&self, caps: &jvmti::jvmtiCapabilities) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let err = ti_fn!(self, AddCapabilities)(self.env, caps);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    fn get_capabilities(&self) -> Result<jvmti::jvmtiCapabilities, jvmti::jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();
        unsafe {
            let err = ti_fn!(self, GetCapabilities)(self.env, &mut caps);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(caps)
    }

    fn get_loaded_classes(&self) -> Result<Vec<jni::jclass>, jvmti::jvmtiError> {
        let mut class_count: jni::jint = 0;
        let mut classes_ptr: *mut jni::jclass = ptr::null_mut();

        unsafe {
            let err = ti_fn!(self, GetLoadedClasses)(self.env, &mut class_count, &mut classes_ptr);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
            if classes_ptr.is_null() {
                return Ok(Vec::new());
            }

            let classes = std::slice::from_raw_parts(classes_ptr, class_count.max(0) as usize).to_vec();
            // A failed free must not drop the live references with it.
            if let Err(e) = self.deallocate(classes_ptr as *mut u8) {
                warn!(error = %e, count = classes.len(), "failed to free the loaded-class array");
            }
            Ok(classes)
        }
    }

    fn get_class_signature(&self, class: jni::jclass) -> Result<String, jvmti::jvmtiError> {
        let mut sig_ptr: *mut c_char = ptr::null_mut();
        let mut gen_ptr: *mut c_char = ptr::null_mut();

        unsafe {
            let err = ti_fn!(self, GetClassSignature)(self.env, class, &mut sig_ptr, &mut gen_ptr);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            let signature = if sig_ptr.is_null() {
                String::new()
            } else {
                CStr::from_ptr(sig_ptr).to_string_lossy().into_owned()
            };
            // Both strings are released even if the first release fails.
            let sig_freed = self.deallocate(sig_ptr as *mut u8);
            let gen_freed = self.deallocate(gen_ptr as *mut u8);
            sig_freed.and(gen_freed)?;
            Ok(signature)
        }
    }

    fn redefine_class(&self, class: jni::jclass, bytes: &[u8]) -> Result<(), jvmti::jvmtiError> {
        let definition = jvmti::jvmtiClassDefinition {
            klass: class,
            class_byte_count: bytes.len() as jni::jint,
            class_bytes: bytes.as_ptr(),
        };
        self.redefine_classes(std::slice::from_ref(&definition))
    }

    fn get_class_loader(&self, class: jni::jclass) -> Result<jni::jobject, jvmti::jvmtiError> {
        let mut loader: jni::jobject = ptr::null_mut();
        unsafe {
            let err = ti_fn!(self, GetClassLoader)(self.env, class, &mut loader);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(loader)
    }
}
