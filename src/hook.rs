//! Function interception.
//!
//! An [`Interceptor`] owns one hook through a [`HookBackend`] and walks it
//! through initialize → create → enable, and back down on teardown. The
//! original entry point is published before the hook is enabled, so a detour
//! can always forward.

use crate::error::{GraftError, HookStage, Result};
use crate::module;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// The patching mechanism behind an [`Interceptor`].
pub trait HookBackend: Send {
    fn initialize(&mut self) -> std::result::Result<(), BackendError>;

    /// Prepares `target` to jump to `detour`. Returns the entry point that
    /// runs the original code.
    ///
    /// # Safety
    ///
    /// `target` and `detour` must be functions with identical signatures and
    /// calling conventions.
    unsafe fn create(&mut self, target: *const (), detour: *const ()) -> std::result::Result<*const (), BackendError>;

    fn enable(&mut self) -> std::result::Result<(), BackendError>;

    fn disable(&mut self) -> std::result::Result<(), BackendError>;

    /// Releases everything `initialize` and `create` set up.
    fn uninitialize(&mut self);
}

/// A function to intercept and the detour to route it through.
#[derive(Debug, Clone, Copy)]
pub struct HookTarget {
    pub target: *const (),
    pub detour: *const (),
}

/// Where a hook goes, resolved at install time.
pub trait HookSite {
    fn resolve(&self) -> Result<HookTarget>;
}

/// An exported symbol of a module the host already loaded.
pub struct SymbolSite {
    pub module: String,
    pub symbol: String,
    pub detour: *const (),
}

impl HookSite for SymbolSite {
    fn resolve(&self) -> Result<HookTarget> {
        let (lib, target) = module::find_symbol(&self.module, &self.symbol).map_err(|e| GraftError::HookInstallFailed {
            stage: HookStage::Create,
            reason: format!("{}!{}: {e}", self.module, self.symbol),
        })?;
        // The detour patches code in this module; it must never unload.
        std::mem::forget(lib);
        debug!(module = %self.module, symbol = %self.symbol, ?target, "resolved hook target");
        Ok(HookTarget {
            target,
            detour: self.detour,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Idle,
    Initialized,
    Created,
    Enabled,
    Released,
}

struct Inner {
    backend: Box<dyn HookBackend>,
    state: HookState,
}

/// One interception point.
pub struct Interceptor {
    inner: Mutex<Inner>,
    original: AtomicUsize,
}

impl Interceptor {
    pub fn new(backend: Box<dyn HookBackend>) -> Self {
        Interceptor {
            inner: Mutex::new(Inner {
                backend,
                state: HookState::Idle,
            }),
            original: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> HookState {
        self.inner.lock().state
    }

    /// The original entry point, once the hook has been created.
    pub fn original(&self) -> Option<*const ()> {
        match self.original.load(Ordering::Acquire) {
            0 => None,
            addr => Some(addr as *const ()),
        }
    }

    /// Installs the hook. Any failing step rolls back what was set up and
    /// leaves the interceptor released.
    pub fn install(&self, site: HookTarget) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state != HookState::Idle {
            return Err(GraftError::HookInstallFailed {
                stage: HookStage::Initialize,
                reason: format!("interceptor is {:?}", inner.state),
            });
        }

        if let Err(e) = inner.backend.initialize() {
            inner.state = HookState::Released;
            return Err(fail(HookStage::Initialize, e));
        }
        inner.state = HookState::Initialized;

        let original = match unsafe { inner.backend.create(site.target, site.detour) } {
            Ok(original) => original,
            Err(e) => {
                roll_back(&mut inner);
                return Err(fail(HookStage::Create, e));
            }
        };
        self.original.store(original as usize, Ordering::Release);
        inner.state = HookState::Created;

        if let Err(e) = inner.backend.enable() {
            roll_back(&mut inner);
            self.original.store(0, Ordering::Release);
            return Err(fail(HookStage::Enable, e));
        }
        inner.state = HookState::Enabled;
        info!(target = ?site.target, "hook installed");
        Ok(())
    }

    /// Disables and releases the hook. Safe from any state and idempotent.
    pub fn teardown(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            HookState::Idle | HookState::Released => {}
            HookState::Enabled => {
                if let Err(e) = inner.backend.disable() {
                    warn!(error = %e, "failed to disable hook");
                }
                roll_back(&mut inner);
                info!("hook removed");
            }
            HookState::Initialized | HookState::Created => roll_back(&mut inner),
        }
        inner.state = HookState::Released;
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn roll_back(inner: &mut Inner) {
    inner.backend.uninitialize();
    inner.state = HookState::Released;
}

fn fail(stage: HookStage, e: BackendError) -> GraftError {
    GraftError::HookInstallFailed {
        stage,
        reason: e.to_string(),
    }
}

// =========================================================================
// Backends
// =========================================================================

/// Inline detours on x86 and x86_64.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[derive(Default)]
pub struct RetourBackend {
    detour: Option<RawDetour>,
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
struct RawDetour(retour::RawDetour);

// The detour only holds code addresses and a trampoline buffer.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
unsafe impl Send for RawDetour {}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl RetourBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn detour(&self) -> std::result::Result<&retour::RawDetour, BackendError> {
        self.detour.as_ref().map(|d| &d.0).ok_or_else(|| "no detour created".into())
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl HookBackend for RetourBackend {
    fn initialize(&mut self) -> std::result::Result<(), BackendError> {
        Ok(())
    }

    unsafe fn create(&mut self, target: *const (), detour: *const ()) -> std::result::Result<*const (), BackendError> {
        let raw = retour::RawDetour::new(target, detour)?;
        let original = raw.trampoline() as *const ();
        self.detour = Some(RawDetour(raw));
        Ok(original)
    }

    fn enable(&mut self) -> std::result::Result<(), BackendError> {
        unsafe { self.detour()?.enable()? };
        Ok(())
    }

    fn disable(&mut self) -> std::result::Result<(), BackendError> {
        unsafe { self.detour()?.disable()? };
        Ok(())
    }

    fn uninitialize(&mut self) {
        // Dropping a RawDetour restores the target if it is still enabled.
        self.detour = None;
    }
}

/// Backend for architectures without an inline detour implementation.
#[derive(Default)]
pub struct UnsupportedBackend;

impl HookBackend for UnsupportedBackend {
    fn initialize(&mut self) -> std::result::Result<(), BackendError> {
        Err(format!("function interception is not supported on {}", std::env::consts::ARCH).into())
    }

    unsafe fn create(&mut self, _: *const (), _: *const ()) -> std::result::Result<*const (), BackendError> {
        Err("not initialized".into())
    }

    fn enable(&mut self) -> std::result::Result<(), BackendError> {
        Err("not initialized".into())
    }

    fn disable(&mut self) -> std::result::Result<(), BackendError> {
        Ok(())
    }

    fn uninitialize(&mut self) {}
}

/// The backend for the current architecture.
pub fn default_backend() -> Box<dyn HookBackend> {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        Box::new(RetourBackend::new())
    }
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        Box::new(UnsupportedBackend)
    }
}
