//! The detour on the host's `glOrtho`.
//!
//! The host sets up its 2D projection through `glOrtho` once per frame on
//! its render thread, which makes the call a safe point to run a pending
//! reload before the original function executes.

use crate::config::GraftConfig;
use crate::env::Runtime;
use crate::graft::Graft;
use crate::hook::SymbolSite;

pub type GlOrthoFn = unsafe extern "system" fn(f64, f64, f64, f64, f64, f64);

/// Runs a pending reload, then forwards the untouched arguments.
pub unsafe extern "system" fn gl_ortho_detour(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) {
    // The hook is only enabled through the process-wide graft, after the
    // original entry is published.
    let forwarded = match crate::entry::graft() {
        Some(graft) => forward_gl_ortho(graft, left, right, bottom, top, near, far),
        None => false,
    };
    debug_assert!(forwarded, "glOrtho detour ran before the hook was installed");
}

/// Handles one intercepted `glOrtho` on `graft` and calls the original.
///
/// Returns `false` without calling anything if no original is published.
///
/// # Safety
///
/// The original published by `graft`'s interceptor must be a [`GlOrthoFn`].
pub unsafe fn forward_gl_ortho<R: Runtime>(
    graft: &Graft<R>,
    left: f64,
    right: f64,
    bottom: f64,
    top: f64,
    near: f64,
    far: f64,
) -> bool {
    graft.on_intercept();
    let Some(original) = graft.interceptor().original() else {
        return false;
    };
    let original: GlOrthoFn = std::mem::transmute(original);
    original(left, right, bottom, top, near, far);
    true
}

pub fn site(config: &GraftConfig) -> SymbolSite {
    SymbolSite {
        module: config.hook_module.clone(),
        symbol: config.hook_symbol.clone(),
        detour: gl_ortho_detour as *const (),
    }
}
