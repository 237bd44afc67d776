//! [`Runtime`] over the `JavaVM*` already running in this process.

use crate::env::{JniEnv, Jvmti, Runtime};
use crate::error::{GraftError, Result};
use crate::module;
use crate::sys::{jni, jvmti};
use std::ptr;

/// Handle to the JVM already running in this process.
///
/// Unlike an embedded VM this handle never destroys the VM; the host owns it.
pub struct JavaVm {
    vm: *mut jni::JavaVM,
    version: jni::jint,
}

// `JavaVM*` is process-wide and its invocation interface is thread-safe.
unsafe impl Send for JavaVm {}
unsafe impl Sync for JavaVm {}

impl JavaVm {
    /// # Safety
    ///
    /// `vm` must be a live `JavaVM*` that outlives the returned handle.
    pub unsafe fn from_raw(vm: *mut jni::JavaVM, version: jni::jint) -> Self {
        JavaVm { vm, version }
    }

    /// Finds the VM through `JNI_GetCreatedJavaVMs` in the loaded JVM library.
    pub fn discover(version: jni::jint) -> Result<Self> {
        let lib_name = module::libjvm_filename();
        let lib = module::open_loaded(lib_name)
            .map_err(|e| GraftError::RuntimeUnavailable(format!("{lib_name} is not loaded: {e}")))?;

        let get_created: libloading::Symbol<jni::GetCreatedJavaVMsFn> = unsafe {
            lib.get(b"JNI_GetCreatedJavaVMs\0")
                .map_err(|e| GraftError::RuntimeUnavailable(format!("JNI_GetCreatedJavaVMs: {e}")))?
        };

        let mut vm: *mut jni::JavaVM = ptr::null_mut();
        let mut count: jni::jsize = 0;
        let res = unsafe { get_created(&mut vm, 1, &mut count) };
        if res != jni::JNI_OK {
            return Err(GraftError::RuntimeUnavailable(format!(
                "JNI_GetCreatedJavaVMs failed with status {res}"
            )));
        }
        if count == 0 || vm.is_null() {
            return Err(GraftError::RuntimeUnavailable("no JVM has been created".to_string()));
        }
        Ok(JavaVm { vm, version })
    }

    pub fn java_vm_ptr(&self) -> *mut jni::JavaVM {
        self.vm
    }
}

impl Runtime for JavaVm {
    type Env = JniEnv;
    type Tooling = Jvmti;

    fn get_env(&self) -> std::result::Result<Option<JniEnv>, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();
        let res = unsafe { crate::jvm_call!(self.vm, GetEnv, &mut env_ptr, self.version) };
        match res {
            jni::JNI_OK if !env_ptr.is_null() => Ok(Some(unsafe { JniEnv::from_raw(env_ptr as *mut jni::JNIEnv) })),
            jni::JNI_EDETACHED => Ok(None),
            jni::JNI_OK => Err(jni::JNI_ERR),
            code => Err(code),
        }
    }

    fn attach_current_thread(&self) -> std::result::Result<JniEnv, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();
        let res = unsafe { crate::jvm_call!(self.vm, AttachCurrentThread, &mut env_ptr, ptr::null_mut()) };
        if res != jni::JNI_OK {
            return Err(res);
        }
        if env_ptr.is_null() {
            return Err(jni::JNI_ERR);
        }
        Ok(unsafe { JniEnv::from_raw(env_ptr as *mut jni::JNIEnv) })
    }

    fn detach_current_thread(&self) -> std::result::Result<(), jni::jint> {
        let res = unsafe { crate::jvm_call!(self.vm, DetachCurrentThread) };
        if res != jni::JNI_OK {
            return Err(res);
        }
        Ok(())
    }

    fn instrumentation(&self) -> std::result::Result<Jvmti, jni::jint> {
        unsafe { Jvmti::new(self.vm, jvmti::JVMTI_VERSION_1_2) }
    }
}
