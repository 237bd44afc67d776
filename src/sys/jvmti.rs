// JVMTI (JVM Tool Interface) layouts.
//
// Field k of `jvmtiInterface_1_` is function slot k of jvmti.h (slot 1 is
// reserved). Unused slots are padding.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use super::jni::{jclass, jint, jobject};
use std::ffi::c_void;
use std::fmt;
use std::os::raw::{c_char, c_uchar};

pub const JVMTI_VERSION_1_2: jint = 0x30010200;

// =============================================================================
// Error Codes
// =============================================================================

/// A JVMTI error code.
///
/// Transparent over the C enum so codes this crate does not name still
/// round-trip safely.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct jvmtiError(pub u32);

impl jvmtiError {
    pub const NONE: Self = Self(0);
    pub const INVALID_THREAD: Self = Self(10);
    pub const INVALID_OBJECT: Self = Self(20);
    pub const INVALID_CLASS: Self = Self(21);
    pub const CLASS_NOT_PREPARED: Self = Self(22);
    pub const INVALID_CLASS_FORMAT: Self = Self(60);
    pub const CIRCULAR_CLASS_DEFINITION: Self = Self(61);
    pub const FAILS_VERIFICATION: Self = Self(62);
    pub const UNSUPPORTED_REDEFINITION_METHOD_ADDED: Self = Self(63);
    pub const UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED: Self = Self(64);
    pub const INVALID_TYPESTATE: Self = Self(65);
    pub const UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED: Self = Self(66);
    pub const UNSUPPORTED_REDEFINITION_METHOD_DELETED: Self = Self(67);
    pub const UNSUPPORTED_VERSION: Self = Self(68);
    pub const NAMES_DONT_MATCH: Self = Self(69);
    pub const UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED: Self = Self(70);
    pub const UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED: Self = Self(71);
    pub const UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED: Self = Self(72);
    pub const UNMODIFIABLE_CLASS: Self = Self(79);
    pub const NOT_AVAILABLE: Self = Self(98);
    pub const MUST_POSSESS_CAPABILITY: Self = Self(99);
    pub const NULL_POINTER: Self = Self(100);
    pub const ABSENT_INFORMATION: Self = Self(101);
    pub const ILLEGAL_ARGUMENT: Self = Self(103);
    pub const OUT_OF_MEMORY: Self = Self(110);
    pub const ACCESS_DENIED: Self = Self(111);
    pub const WRONG_PHASE: Self = Self(112);
    pub const INTERNAL: Self = Self(113);
    pub const UNATTACHED_THREAD: Self = Self(115);
    pub const INVALID_ENVIRONMENT: Self = Self(116);

    /// The `JVMTI_ERROR_*` suffix for known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::NONE => "NONE",
            Self::INVALID_THREAD => "INVALID_THREAD",
            Self::INVALID_OBJECT => "INVALID_OBJECT",
            Self::INVALID_CLASS => "INVALID_CLASS",
            Self::CLASS_NOT_PREPARED => "CLASS_NOT_PREPARED",
            Self::INVALID_CLASS_FORMAT => "INVALID_CLASS_FORMAT",
            Self::CIRCULAR_CLASS_DEFINITION => "CIRCULAR_CLASS_DEFINITION",
            Self::FAILS_VERIFICATION => "FAILS_VERIFICATION",
            Self::UNSUPPORTED_REDEFINITION_METHOD_ADDED => "UNSUPPORTED_REDEFINITION_METHOD_ADDED",
            Self::UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED => "UNSUPPORTED_REDEFINITION_SCHEMA_CHANGED",
            Self::INVALID_TYPESTATE => "INVALID_TYPESTATE",
            Self::UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED => {
                "UNSUPPORTED_REDEFINITION_HIERARCHY_CHANGED"
            }
            Self::UNSUPPORTED_REDEFINITION_METHOD_DELETED => "UNSUPPORTED_REDEFINITION_METHOD_DELETED",
            Self::UNSUPPORTED_VERSION => "UNSUPPORTED_VERSION",
            Self::NAMES_DONT_MATCH => "NAMES_DONT_MATCH",
            Self::UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED => {
                "UNSUPPORTED_REDEFINITION_CLASS_MODIFIERS_CHANGED"
            }
            Self::UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED => {
                "UNSUPPORTED_REDEFINITION_METHOD_MODIFIERS_CHANGED"
            }
            Self::UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED => {
                "UNSUPPORTED_REDEFINITION_CLASS_ATTRIBUTE_CHANGED"
            }
            Self::UNMODIFIABLE_CLASS => "UNMODIFIABLE_CLASS",
            Self::NOT_AVAILABLE => "NOT_AVAILABLE",
            Self::MUST_POSSESS_CAPABILITY => "MUST_POSSESS_CAPABILITY",
            Self::NULL_POINTER => "NULL_POINTER",
            Self::ABSENT_INFORMATION => "ABSENT_INFORMATION",
            Self::ILLEGAL_ARGUMENT => "ILLEGAL_ARGUMENT",
            Self::OUT_OF_MEMORY => "OUT_OF_MEMORY",
            Self::ACCESS_DENIED => "ACCESS_DENIED",
            Self::WRONG_PHASE => "WRONG_PHASE",
            Self::INTERNAL => "INTERNAL",
            Self::UNATTACHED_THREAD => "UNATTACHED_THREAD",
            Self::INVALID_ENVIRONMENT => "INVALID_ENVIRONMENT",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "JVMTI_ERROR_{} ({})", name, self.0),
            None => write!(f, "JVMTI error {}", self.0),
        }
    }
}

impl fmt::Debug for jvmtiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// =============================================================================
// Structures
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiClassDefinition {
    pub klass: jclass,
    pub class_byte_count: jint,
    pub class_bytes: *const c_uchar,
}

#[repr(C)]
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl jvmtiCapabilities {
    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    fn get_bit(&self, bit_offset: usize) -> bool {
        (self.bits[bit_offset / 32] & (1 << (bit_offset % 32))) != 0
    }

    // [9]
    pub fn set_can_redefine_classes(&mut self, v: bool) { self.set_bit(9, v); }
    pub fn can_redefine_classes(&self) -> bool { self.get_bit(9) }

    // [21]
    pub fn set_can_redefine_any_class(&mut self, v: bool) { self.set_bit(21, v); }
    pub fn can_redefine_any_class(&self) -> bool { self.get_bit(21) }

    // [37]
    pub fn can_retransform_classes(&self) -> bool { self.get_bit(37) }
}

impl fmt::Debug for jvmtiCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("jvmtiCapabilities")
            .field("can_redefine_classes", &self.can_redefine_classes())
            .field("can_redefine_any_class", &self.can_redefine_any_class())
            .field("can_retransform_classes", &self.can_retransform_classes())
            .finish()
    }
}

// =============================================================================
// Function Table
// =============================================================================

type Slot = *const c_void;

#[repr(C)]
pub struct jvmtiInterface_1_ {
    // 1-45: reserved, events, threads, frames, heap, locals, breakpoints, watches
    _pad_1: [Slot; 45],

    // 46-48
    pub Allocate: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, size: i64, mem_ptr: *mut *mut c_uchar) -> jvmtiError,
    >,
    pub Deallocate: Option<unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError>,
    pub GetClassSignature: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            klass: jclass,
            signature_ptr: *mut *mut c_char,
            generic_ptr: *mut *mut c_char,
        ) -> jvmtiError,
    >,

    // 49-56: class status, source file, modifiers, methods, fields, interfaces
    _pad_49: [Slot; 8],

    // 57
    pub GetClassLoader: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, klass: jclass, classloader_ptr: *mut jobject) -> jvmtiError,
    >,

    // 58-77: object, field and method queries
    _pad_58: [Slot; 20],

    // 78
    pub GetLoadedClasses: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            class_count_ptr: *mut jint,
            classes_ptr: *mut *mut jclass,
        ) -> jvmtiError,
    >,

    // 79-86: GetClassLoaderClasses, frames, raw monitors
    _pad_79: [Slot; 8],

    // 87
    pub RedefineClasses: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            class_count: jint,
            class_definitions: *const jvmtiClassDefinition,
        ) -> jvmtiError,
    >,

    // 88: GetVersionNumber
    _pad_88: [Slot; 1],

    // 89
    pub GetCapabilities:
        Option<unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *mut jvmtiCapabilities) -> jvmtiError>,

    // 90-141: source debug extension, timers, extension functions,
    // DisposeEnvironment, GetErrorName, JLocation format, system properties,
    // phase, potential capabilities
    _pad_90: [Slot; 52],

    // 142
    pub AddCapabilities: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, capabilities_ptr: *const jvmtiCapabilities) -> jvmtiError,
    >,

    // 143-156: RelinquishCapabilities .. GetLocalInstance, heap iteration, modules
    _pad_143: [Slot; 14],
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}
