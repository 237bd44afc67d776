//! Raw JNI and JVMTI layouts.
//!
//! Only the function-table slots this crate calls are named. Every other slot
//! is kept as padding so that named slots sit at the offsets the JDK headers
//! define.

pub mod jni;
pub mod jvmti;
