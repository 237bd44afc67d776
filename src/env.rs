//! Seams between the graft logic and the JVM.
//!
//! Every component is written against three traits:
//!
//! - [`Runtime`]: the process-wide `JavaVM` (thread attachment, environment lookup)
//! - [`Jni`]: a thread-bound JNI environment
//! - [`Instrumentation`]: a JVMTI environment
//!
//! [`JavaVm`], [`JniEnv`] and [`Jvmti`] implement them over the raw function
//! tables. Tests implement them with in-memory fakes.
//!
//! # Reference Guards
//!
//! [`LocalRef`] and [`GlobalRef`] delete their reference when dropped, on
//! every exit path:
//!
//! ```rust,ignore
//! use jvmti_graft::prelude::*;
//!
//! fn owner_class<J: Jni>(jni: &J, obj: jni::jobject) -> Result<(), CallError> {
//!     let class = LocalRef::new(jni, jni.get_object_class(obj)?);
//!     let method = jni.get_method_id(class.get(), "toString", "()Ljava/lang/String;")?;
//!     // class is deleted here
//!     Ok(())
//! }
//! ```

use crate::error::CallError;
use crate::sys::jni::{jclass, jfieldID, jint, jmethodID, jobject, jstring, jvalue};
use crate::sys::jvmti::{jvmtiCapabilities, jvmtiError};
use std::ffi::c_void;

pub use crate::jni_wrapper::JniEnv;
pub use crate::jvmti_wrapper::Jvmti;
pub use crate::vm::JavaVm;

/// A native method to bind on the companion class.
#[derive(Debug, Clone, Copy)]
pub struct NativeBinding {
    pub name: &'static str,
    pub signature: &'static str,
    pub fn_ptr: *mut c_void,
}

/// The process-wide JVM handle.
pub trait Runtime: Send + Sync {
    type Env: Jni;
    type Tooling: Instrumentation;

    /// The environment of the calling thread, `Ok(None)` if it is not attached.
    fn get_env(&self) -> Result<Option<Self::Env>, jint>;

    fn attach_current_thread(&self) -> Result<Self::Env, jint>;

    fn detach_current_thread(&self) -> Result<(), jint>;

    fn instrumentation(&self) -> Result<Self::Tooling, jint>;
}

/// Thread-bound JNI calls.
///
/// Each call checks for a pending Java exception afterwards and clears it,
/// reporting [`CallError::ExceptionPending`]. Calls that must produce a
/// reference or ID report [`CallError::NullResult`] instead of returning null.
pub trait Jni {
    fn define_class(&self, name: &str, loader: jobject, bytes: &[u8]) -> Result<jclass, CallError>;

    fn get_object_class(&self, obj: jobject) -> Result<jclass, CallError>;

    fn get_method_id(&self, class: jclass, name: &str, sig: &str) -> Result<jmethodID, CallError>;

    fn get_static_method_id(&self, class: jclass, name: &str, sig: &str) -> Result<jmethodID, CallError>;

    fn get_field_id(&self, class: jclass, name: &str, sig: &str) -> Result<jfieldID, CallError>;

    fn new_string_utf(&self, s: &str) -> Result<jstring, CallError>;

    fn call_object_method(&self, obj: jobject, method: jmethodID, args: &[jvalue]) -> Result<jobject, CallError>;

    fn call_static_object_method(
        &self,
        class: jclass,
        method: jmethodID,
        args: &[jvalue],
    ) -> Result<jobject, CallError>;

    fn call_void_method(&self, obj: jobject, method: jmethodID, args: &[jvalue]) -> Result<(), CallError>;

    fn get_object_field(&self, obj: jobject, field: jfieldID) -> Result<jobject, CallError>;

    /// Binds all `methods` in one `RegisterNatives` call.
    fn register_natives(&self, class: jclass, methods: &[NativeBinding]) -> Result<(), CallError>;

    fn new_global_ref(&self, obj: jobject) -> Result<jobject, CallError>;

    fn delete_global_ref(&self, obj: jobject);

    fn delete_local_ref(&self, obj: jobject);

    /// Clears a pending exception left by code outside these wrappers.
    /// Returns whether one was pending.
    fn clear_pending_exception(&self) -> bool;
}

/// The JVMTI calls the graft needs.
///
/// JVMTI-allocated buffers are copied and deallocated before returning.
pub trait Instrumentation {
    fn add_capabilities(&self, caps: &jvmtiCapabilities) -> Result<(), jvmtiError>;

    fn get_capabilities(&self) -> Result<jvmtiCapabilities, jvmtiError>;

    /// Snapshot of every loaded class as local references.
    fn get_loaded_classes(&self) -> Result<Vec<jclass>, jvmtiError>;

    fn get_class_signature(&self, class: jclass) -> Result<String, jvmtiError>;

    fn redefine_class(&self, class: jclass, bytes: &[u8]) -> Result<(), jvmtiError>;

    /// Defining loader as a local reference. Null means the bootstrap loader.
    fn get_class_loader(&self, class: jclass) -> Result<jobject, jvmtiError>;
}

// =========================================================================
// Reference Guards
// =========================================================================

/// Deletes a local reference when dropped.
pub struct LocalRef<'a, J: Jni + ?Sized> {
    jni: &'a J,
    obj: jobject,
}

impl<'a, J: Jni + ?Sized> LocalRef<'a, J> {
    pub fn new(jni: &'a J, obj: jobject) -> Self {
        LocalRef { jni, obj }
    }

    pub fn get(&self) -> jobject {
        self.obj
    }

    /// Releases the guard without deleting the reference.
    pub fn into_inner(self) -> jobject {
        let obj = self.obj;
        std::mem::forget(self);
        obj
    }
}

impl<J: Jni + ?Sized> Drop for LocalRef<'_, J> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.jni.delete_local_ref(self.obj);
        }
    }
}

/// Deletes a global reference when dropped, unless kept with [`GlobalRef::into_inner`].
pub struct GlobalRef<'a, J: Jni + ?Sized> {
    jni: &'a J,
    obj: jobject,
}

impl<'a, J: Jni + ?Sized> GlobalRef<'a, J> {
    /// Promotes `local` to a global reference. The local reference is left alone.
    pub fn new(jni: &'a J, local: jobject) -> Result<Self, CallError> {
        let obj = jni.new_global_ref(local)?;
        Ok(GlobalRef { jni, obj })
    }

    pub fn get(&self) -> jobject {
        self.obj
    }

    pub fn into_inner(self) -> jobject {
        let obj = self.obj;
        std::mem::forget(self);
        obj
    }
}

impl<J: Jni + ?Sized> Drop for GlobalRef<'_, J> {
    fn drop(&mut self) {
        if !self.obj.is_null() {
            self.jni.delete_global_ref(self.obj);
        }
    }
}

/// `jvalue` holding an object reference.
pub fn object_arg(obj: jobject) -> jvalue {
    jvalue { l: obj }
}
