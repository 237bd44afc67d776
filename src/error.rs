//! Error types.
//!
//! [`CallError`] is the result of a single JNI call. [`GraftError`] is what
//! the install pipeline and the deferred call report.

use crate::sys::jni::jint;
use crate::sys::jvmti::jvmtiError;

/// Outcome of one failed JNI call.
///
/// A pending Java exception is detected and cleared by the wrapper before
/// this value is returned, so callers never see sticky exception state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("{0} raised a Java exception (cleared)")]
    ExceptionPending(&'static str),

    #[error("{0} returned null")]
    NullResult(&'static str),

    #[error("{call} failed with status {code}")]
    Status { call: &'static str, code: jint },

    #[error("argument to {0} contains an interior NUL byte")]
    InteriorNul(&'static str),
}

/// Stage of the hook installation protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Initialize,
    Create,
    Enable,
}

impl std::fmt::Display for HookStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HookStage::Initialize => "initialize",
            HookStage::Create => "create",
            HookStage::Enable => "enable",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GraftError {
    #[error("no running JVM found: {0}")]
    RuntimeUnavailable(String),

    #[error("GetEnv failed with status {0}")]
    EnvLookupFailed(jint),

    #[error("AttachCurrentThread failed with status {0}")]
    AttachFailed(jint),

    #[error("JVMTI environment unavailable (status {0})")]
    InstrumentationUnavailable(jint),

    #[error("could not add can_redefine_classes: {0}")]
    CapabilityGrantFailed(jvmtiError),

    #[error("could not enumerate loaded classes: {0}")]
    EnumerationFailed(jvmtiError),

    #[error("no loaded class has signature {signature}")]
    TargetTypeNotFound { signature: String },

    #[error("{blob} class bytes rejected: {reason}")]
    InvalidPayload { blob: &'static str, reason: String },

    #[error("RedefineClasses failed: {0}")]
    RedefinitionFailed(jvmtiError),

    #[error("defining loader unavailable: {0}")]
    LoaderUnavailable(String),

    #[error("could not define {name}: {source}")]
    CompanionDefinitionFailed {
        name: String,
        #[source]
        source: CallError,
    },

    #[error("RegisterNatives on {name} failed: {source}")]
    NativeBindingFailed {
        name: String,
        #[source]
        source: CallError,
    },

    #[error("handle resolution failed at {step}: {source}")]
    CacheResolutionFailed {
        step: &'static str,
        #[source]
        source: CallError,
    },

    #[error("handle cache is not populated")]
    CacheNotReady,

    #[error("hook {stage} failed: {reason}")]
    HookInstallFailed { stage: HookStage, reason: String },

    #[error("deferred call failed at {step}: {source}")]
    DeferredCallFailed {
        step: &'static str,
        #[source]
        source: CallError,
    },
}

pub type Result<T> = std::result::Result<T, GraftError>;
