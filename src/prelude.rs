//! Common imports for code built on the graft.

pub use crate::env::{GlobalRef, Instrumentation, JavaVm, Jni, JniEnv, Jvmti, LocalRef, NativeBinding, Runtime};
pub use crate::error::{CallError, GraftError};
pub use crate::export_graft;
pub use crate::graft::{Graft, Stage};
pub use crate::payload::Payload;
pub use crate::sys::{jni, jvmti};
