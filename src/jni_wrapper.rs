//! [`Jni`] over a raw `JNIEnv` pointer.
//!
//! # Example
//!
//! ```rust,ignore
//! use jvmti_graft::prelude::*;
//!
//! extern "system" fn native_entry(env: *mut jni::JNIEnv, _class: jni::jclass, name: jni::jstring) -> jni::jboolean {
//!     let env = unsafe { JniEnv::from_raw(env) };
//!     match env.get_string_utf_bytes(name) {
//!         Some(name) if name.ends_with(b"_ore}") => jni::JNI_TRUE,
//!         _ => jni::JNI_FALSE,
//!     }
//! }
//! ```

use crate::env::{Jni, NativeBinding};
use crate::error::CallError;
use crate::sys::jni;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// A JNI environment pointer for the current thread.
///
/// # Thread Safety
///
/// A `JniEnv` is tied to the thread it was obtained on and is neither `Send`
/// nor `Sync`.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

fn c_string(s: &str, call: &'static str) -> Result<CString, CallError> {
    CString::new(s).map_err(|_| CallError::InteriorNul(call))
}

impl JniEnv {
    /// # Safety
    ///
    /// The pointer must be a valid `JNIEnv*` belonging to the current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    // =========================================================================
    // Exceptions
    // =========================================================================

    pub fn exception_check(&self) -> bool {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionCheck)(self.env) != jni::JNI_FALSE
        }
    }

    /// Prints the pending exception and its stack trace to the JVM's stderr.
    pub fn exception_describe(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionDescribe)(self.env)
        }
    }

    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env)
        }
    }

    /// Describes and clears a pending exception left by `call`.
    fn check(&self, call: &'static str) -> Result<(), CallError> {
        if self.exception_check() {
            self.exception_describe();
            self.exception_clear();
            return Err(CallError::ExceptionPending(call));
        }
        Ok(())
    }

    /// Like [`check`](Self::check), and also rejects a null result.
    ///
    /// A reference returned alongside a pending exception is deleted.
    fn checked_ref(&self, obj: jni::jobject, call: &'static str) -> Result<jni::jobject, CallError> {
        if let Err(err) = self.check(call) {
            if !obj.is_null() {
                self.delete_local_ref(obj);
            }
            return Err(err);
        }
        if obj.is_null() {
            return Err(CallError::NullResult(call));
        }
        Ok(obj)
    }

    fn checked_id(&self, id: *mut std::ffi::c_void, call: &'static str) -> Result<*mut std::ffi::c_void, CallError> {
        self.check(call)?;
        if id.is_null() {
            return Err(CallError::NullResult(call));
        }
        Ok(id)
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Copies a Java string's modified UTF-8 bytes, without the terminator.
    ///
    /// The bytes are returned as the VM encodes them: supplementary
    /// characters arrive as surrogate pairs and NUL as `C0 80`, so they are
    /// generally not valid UTF-8. Returns `None` for a null string.
    pub fn get_string_utf_bytes(&self, s: jni::jstring) -> Option<Vec<u8>> {
        if s.is_null() {
            return None;
        }
        unsafe {
            let vtable = *self.env;
            let chars = ((*vtable).GetStringUTFChars)(self.env, s, ptr::null_mut());
            if chars.is_null() {
                self.check("GetStringUTFChars").ok();
                return None;
            }
            let result = CStr::from_ptr(chars).to_bytes().to_vec();
            ((*vtable).ReleaseStringUTFChars)(self.env, s, chars);
            Some(result)
        }
    }
}

impl Jni for JniEnv {
    // =========================================================================
    // Classes
    // =========================================================================

    fn define_class(&self, name: &str, loader: jni::jobject, bytes: &[u8]) -> Result<jni::jclass, CallError> {
        let c_name = c_string(name, "DefineClass")?;
        let class = unsafe {
            let vtable = *self.env;
            ((*vtable).DefineClass)(
                self.env,
                c_name.as_ptr(),
                loader,
                bytes.as_ptr() as *const jni::jbyte,
                bytes.len() as jni::jsize,
            )
        };
        self.checked_ref(class, "DefineClass")
    }

    fn get_object_class(&self, obj: jni::jobject) -> Result<jni::jclass, CallError> {
        let class = unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectClass)(self.env, obj)
        };
        self.checked_ref(class, "GetObjectClass")
    }

    // =========================================================================
    // Member IDs
    // =========================================================================

    fn get_method_id(&self, class: jni::jclass, name: &str, sig: &str) -> Result<jni::jmethodID, CallError> {
        let c_name = c_string(name, "GetMethodID")?;
        let c_sig = c_string(sig, "GetMethodID")?;
        let id = unsafe {
            let vtable = *self.env;
            ((*vtable).GetMethodID)(self.env, class, c_name.as_ptr(), c_sig.as_ptr())
        };
        self.checked_id(id, "GetMethodID")
    }

    fn get_static_method_id(&self, class: jni::jclass, name: &str, sig: &str) -> Result<jni::jmethodID, CallError> {
        let c_name = c_string(name, "GetStaticMethodID")?;
        let c_sig = c_string(sig, "GetStaticMethodID")?;
        let id = unsafe {
            let vtable = *self.env;
            ((*vtable).GetStaticMethodID)(self.env, class, c_name.as_ptr(), c_sig.as_ptr())
        };
        self.checked_id(id, "GetStaticMethodID")
    }

    fn get_field_id(&self, class: jni::jclass, name: &str, sig: &str) -> Result<jni::jfieldID, CallError> {
        let c_name = c_string(name, "GetFieldID")?;
        let c_sig = c_string(sig, "GetFieldID")?;
        let id = unsafe {
            let vtable = *self.env;
            ((*vtable).GetFieldID)(self.env, class, c_name.as_ptr(), c_sig.as_ptr())
        };
        self.checked_id(id, "GetFieldID")
    }

    // =========================================================================
    // Calls and Fields
    // =========================================================================

    fn new_string_utf(&self, s: &str) -> Result<jni::jstring, CallError> {
        let c_str = c_string(s, "NewStringUTF")?;
        let jstr = unsafe {
            let vtable = *self.env;
            ((*vtable).NewStringUTF)(self.env, c_str.as_ptr())
        };
        self.checked_ref(jstr, "NewStringUTF")
    }

    fn call_object_method(
        &self,
        obj: jni::jobject,
        method: jni::jmethodID,
        args: &[jni::jvalue],
    ) -> Result<jni::jobject, CallError> {
        let result = unsafe {
            let vtable = *self.env;
            ((*vtable).CallObjectMethodA)(self.env, obj, method, args.as_ptr())
        };
        self.checked_ref(result, "CallObjectMethodA")
    }

    fn call_static_object_method(
        &self,
        class: jni::jclass,
        method: jni::jmethodID,
        args: &[jni::jvalue],
    ) -> Result<jni::jobject, CallError> {
        let result = unsafe {
            let vtable = *self.env;
            ((*vtable).CallStaticObjectMethodA)(self.env, class, method, args.as_ptr())
        };
        self.checked_ref(result, "CallStaticObjectMethodA")
    }

    fn call_void_method(&self, obj: jni::jobject, method: jni::jmethodID, args: &[jni::jvalue]) -> Result<(), CallError> {
        unsafe {
            let vtable = *self.env;
            ((*vtable).CallVoidMethodA)(self.env, obj, method, args.as_ptr())
        };
        self.check("CallVoidMethodA")
    }

    fn get_object_field(&self, obj: jni::jobject, field: jni::jfieldID) -> Result<jni::jobject, CallError> {
        let value = unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectField)(self.env, obj, field)
        };
        self.checked_ref(value, "GetObjectField")
    }

    // =========================================================================
    // Native Method Registration
    // =========================================================================

    fn register_natives(&self, class: jni::jclass, methods: &[NativeBinding]) -> Result<(), CallError> {
        let names = methods
            .iter()
            .map(|m| Ok((c_string(m.name, "RegisterNatives")?, c_string(m.signature, "RegisterNatives")?)))
            .collect::<Result<Vec<_>, CallError>>()?;
        let table: Vec<jni::JNINativeMethod> = names
            .iter()
            .zip(methods)
            .map(|((name, sig), m)| jni::JNINativeMethod {
                name: name.as_ptr() as *mut c_char,
                signature: sig.as_ptr() as *mut c_char,
                fnPtr: m.fn_ptr,
            })
            .collect();

        let status = unsafe {
            let vtable = *self.env;
            ((*vtable).RegisterNatives)(self.env, class, table.as_ptr(), table.len() as jni::jint)
        };
        self.check("RegisterNatives")?;
        if status != jni::JNI_OK {
            return Err(CallError::Status { call: "RegisterNatives", code: status });
        }
        Ok(())
    }

    // =========================================================================
    // References
    // =========================================================================

    fn new_global_ref(&self, obj: jni::jobject) -> Result<jni::jobject, CallError> {
        let global = unsafe {
            let vtable = *self.env;
            ((*vtable).NewGlobalRef)(self.env, obj)
        };
        self.check("NewGlobalRef")?;
        if global.is_null() {
            return Err(CallError::NullResult("NewGlobalRef"));
        }
        Ok(global)
    }

    fn delete_global_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteGlobalRef)(self.env, obj)
        }
    }

    fn delete_local_ref(&self, obj: jni::jobject) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj)
        }
    }

    fn clear_pending_exception(&self) -> bool {
        if self.exception_check() {
            self.exception_describe();
            self.exception_clear();
            true
        } else {
            false
        }
    }
}
