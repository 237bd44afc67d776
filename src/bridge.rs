//! Companion class injection and its native methods.
//!
//! The companion is defined in the target's own loader so the redefined
//! target can link against it. Its two native methods are:
//!
//! - `allowBlock(String)`: whether a name passes the suffix policy
//! - `xrayOn()`: the current feature toggle

use crate::class_loader::LoaderHandle;
use crate::env::{Jni, JniEnv, LocalRef, NativeBinding};
use crate::error::{GraftError, Result};
use crate::sys::jni::{self, jboolean, jclass, jobject, jstring};
use std::ffi::c_void;
use tracing::{info, warn};

pub const POLICY_NATIVE: &str = "allowBlock";
pub const POLICY_NATIVE_SIG: &str = "(Ljava/lang/String;)Z";
pub const TOGGLE_NATIVE: &str = "xrayOn";
pub const TOGGLE_NATIVE_SIG: &str = "()Z";

/// The bindings registered on the companion, in registration order.
pub fn companion_natives() -> [NativeBinding; 2] {
    [
        NativeBinding {
            name: POLICY_NATIVE,
            signature: POLICY_NATIVE_SIG,
            fn_ptr: allow_block as *mut c_void,
        },
        NativeBinding {
            name: TOGGLE_NATIVE,
            signature: TOGGLE_NATIVE_SIG,
            fn_ptr: feature_enabled as *mut c_void,
        },
    ]
}

/// The suffix policy behind `allowBlock`, on the name's modified UTF-8 bytes.
pub fn policy_allows(name: &[u8], suffix: &str) -> bool {
    if suffix.bytes().all(|b| b != 0 && b.is_ascii()) {
        return name.ends_with(suffix.as_bytes());
    }
    name.ends_with(&to_modified_utf8(suffix))
}

/// Encodes `s` the way the VM hands strings to native code: NUL as `C0 80`
/// and each supplementary character as two three-byte surrogates.
pub fn to_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\0' => out.extend_from_slice(&[0xC0, 0x80]),
            c if c.len_utf16() == 2 => {
                let mut units = [0u16; 2];
                for &unit in c.encode_utf16(&mut units).iter() {
                    out.extend_from_slice(&[
                        0xE0 | (unit >> 12) as u8,
                        0x80 | ((unit >> 6) & 0x3F) as u8,
                        0x80 | (unit & 0x3F) as u8,
                    ]);
                }
            }
            c => out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes()),
        }
    }
    out
}

unsafe extern "system" fn allow_block(env: *mut jni::JNIEnv, _class: jclass, name: jstring) -> jboolean {
    let Some(graft) = crate::entry::graft() else {
        return jni::JNI_FALSE;
    };
    let env = JniEnv::from_raw(env);
    match env.get_string_utf_bytes(name) {
        Some(name) if policy_allows(&name, &graft.config().policy_suffix) => jni::JNI_TRUE,
        _ => jni::JNI_FALSE,
    }
}

unsafe extern "system" fn feature_enabled(_env: *mut jni::JNIEnv, _class: jclass) -> jboolean {
    match crate::entry::graft() {
        Some(graft) if graft.toggle().get() => jni::JNI_TRUE,
        _ => jni::JNI_FALSE,
    }
}

/// The injected class, bound and ready to be called from managed code.
pub struct CompanionType<'a, J: Jni + ?Sized> {
    pub name: String,
    class: LocalRef<'a, J>,
}

impl<J: Jni + ?Sized> CompanionType<'_, J> {
    pub fn class(&self) -> jclass {
        self.class.get()
    }
}

/// Defines `name` from `bytes` in `loader` and binds `natives` to it.
///
/// A definition rejected by the VM falls back to a class of the same name
/// already visible through `loader`, which is what a second injection into
/// the same process sees. Binding is a single batch: if it fails, no
/// companion is returned.
pub fn inject<'a, J: Jni + ?Sized>(
    jni: &'a J,
    loader: jobject,
    name: &str,
    bytes: &[u8],
    natives: &[NativeBinding],
) -> Result<CompanionType<'a, J>> {
    if jni.clear_pending_exception() {
        warn!("cleared a stale pending exception before DefineClass");
    }

    let class = match jni.define_class(name, loader, bytes) {
        Ok(class) => {
            info!(name, len = bytes.len(), "companion class defined");
            LocalRef::new(jni, class)
        }
        Err(define_err) => {
            warn!(name, %define_err, "DefineClass failed, looking for an existing definition");
            let existing = LoaderHandle::new(jni, loader).and_then(|l| l.load(&name.replace('/', ".")));
            match existing {
                Ok(class) => {
                    info!(name, "reusing companion class already in the loader");
                    class
                }
                Err(_) => {
                    return Err(GraftError::CompanionDefinitionFailed {
                        name: name.to_string(),
                        source: define_err,
                    })
                }
            }
        }
    };

    jni.register_natives(class.get(), natives)
        .map_err(|source| GraftError::NativeBindingFailed {
            name: name.to_string(),
            source,
        })?;
    info!(name, count = natives.len(), "natives bound");

    Ok(CompanionType {
        name: name.to_string(),
        class,
    })
}
