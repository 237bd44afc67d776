//! The shared state behind one graft: config, runtime, handles and the hook.

use crate::cache::HandleCache;
use crate::config::GraftConfig;
use crate::env::Runtime;
use crate::error::{GraftError, Result};
use crate::hook::{HookBackend, Interceptor};
use crate::trigger::{self, DeferredSignal, FeatureToggle};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// How far installation got. Stages are never rolled back.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    NotStarted = 0,
    Located,
    Instrumented,
    TargetFound,
    Redefined,
    BridgeBound,
    HandlesResolved,
    HookInstalled,
}

impl Stage {
    fn from_u8(v: u8) -> Stage {
        match v {
            1 => Stage::Located,
            2 => Stage::Instrumented,
            3 => Stage::TargetFound,
            4 => Stage::Redefined,
            5 => Stage::BridgeBound,
            6 => Stage::HandlesResolved,
            7 => Stage::HookInstalled,
            _ => Stage::NotStarted,
        }
    }
}

/// Everything the graft shares between the init thread, the poller and the
/// host's intercepted calls.
pub struct Graft<R: Runtime> {
    config: GraftConfig,
    runtime: OnceLock<R>,
    cache: HandleCache,
    signal: DeferredSignal,
    toggle: FeatureToggle,
    interceptor: Interceptor,
    stage: AtomicU8,
}

impl<R: Runtime> Graft<R> {
    pub fn new(config: GraftConfig, backend: Box<dyn HookBackend>) -> Self {
        Graft {
            config,
            runtime: OnceLock::new(),
            cache: HandleCache::new(),
            signal: DeferredSignal::new(),
            toggle: FeatureToggle::new(),
            interceptor: Interceptor::new(backend),
            stage: AtomicU8::new(Stage::NotStarted as u8),
        }
    }

    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    /// Stores the runtime handle. The first handle stored is kept for the
    /// life of the graft.
    pub fn install_runtime(&self, runtime: R) -> Result<&R> {
        if self.runtime.set(runtime).is_err() {
            warn!("runtime already located, keeping the first handle");
        } else {
            self.advance(Stage::Located);
        }
        self.runtime()
    }

    pub fn runtime(&self) -> Result<&R> {
        self.runtime
            .get()
            .ok_or_else(|| GraftError::RuntimeUnavailable("runtime not located yet".to_string()))
    }

    pub fn cache(&self) -> &HandleCache {
        &self.cache
    }

    pub fn signal(&self) -> &DeferredSignal {
        &self.signal
    }

    pub fn toggle(&self) -> &FeatureToggle {
        &self.toggle
    }

    pub fn interceptor(&self) -> &Interceptor {
        &self.interceptor
    }

    pub fn stage(&self) -> Stage {
        Stage::from_u8(self.stage.load(Ordering::Acquire))
    }

    pub(crate) fn advance(&self, stage: Stage) {
        self.stage.fetch_max(stage as u8, Ordering::AcqRel);
        debug!(?stage, "stage reached");
    }

    /// Called on every intercepted host call. Fires at most once per arm.
    pub fn on_intercept(&self) {
        if !self.signal.take() {
            return;
        }
        let result = self.runtime().and_then(|runtime| trigger::fire(runtime, &self.cache));
        match result {
            Ok(()) => info!(enabled = self.toggle.get(), "deferred reload fired"),
            Err(e) => warn!(error = %e, "deferred reload aborted"),
        }
    }

    /// Removes the hook. Safe to call more than once.
    pub fn shutdown(&self) {
        self.interceptor.teardown();
    }
}
