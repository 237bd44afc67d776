//! In-place class redefinition.

use crate::env::{Instrumentation, Jni};
use crate::error::{GraftError, Result};
use crate::session::TypeDescriptor;
use tracing::info;

/// Replaces the bytecode of `target` with `bytes` in one `RedefineClasses`
/// call.
///
/// The class object keeps its identity. On failure the VM leaves the old
/// definition in place.
pub fn redefine<T, J>(ti: &T, target: &TypeDescriptor<'_, J>, bytes: &[u8]) -> Result<()>
where
    T: Instrumentation,
    J: Jni + ?Sized,
{
    ti.redefine_class(target.class(), bytes)
        .map_err(GraftError::RedefinitionFailed)?;
    info!(signature = %target.signature, len = bytes.len(), "class redefined");
    Ok(())
}
