//! Handles for the deferred reload call, resolved once ahead of time.

use crate::class_loader::LoaderHandle;
use crate::config::LookupChain;
use crate::env::{GlobalRef, Jni, LocalRef};
use crate::error::{CallError, GraftError, Result};
use crate::sys::jni::{jclass, jfieldID, jmethodID, jobject};
use std::sync::OnceLock;
use tracing::{debug, info};

/// The resolved chain: owner class, its singleton accessor, the nested
/// subsystem field and the subsystem's reload method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedHandles {
    /// Global reference, kept for the life of the process.
    pub owner_class: jclass,
    pub instance_method: jmethodID,
    pub nested_field: jfieldID,
    pub reload_method: jmethodID,
}

// Global references and member IDs are valid on every attached thread.
unsafe impl Send for ResolvedHandles {}
unsafe impl Sync for ResolvedHandles {}

/// Write-once store for [`ResolvedHandles`].
#[derive(Default)]
pub struct HandleCache {
    handles: OnceLock<ResolvedHandles>,
}

impl HandleCache {
    pub const fn new() -> Self {
        HandleCache {
            handles: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<&ResolvedHandles> {
        self.handles.get().ok_or(GraftError::CacheNotReady)
    }

    pub fn is_ready(&self) -> bool {
        self.handles.get().is_some()
    }

    /// Resolves `chain` through `loader` unless the cache is already populated.
    ///
    /// A failing step leaves the cache untouched and releases the global
    /// reference taken on the owner class.
    pub fn resolve<J: Jni + ?Sized>(&self, jni: &J, loader: jobject, chain: &LookupChain) -> Result<&ResolvedHandles> {
        if let Some(handles) = self.handles.get() {
            debug!("handle cache already populated");
            return Ok(handles);
        }

        let owner = resolve_chain(jni, loader, chain)?;
        let handles = ResolvedHandles {
            owner_class: owner.class.get(),
            instance_method: owner.instance_method,
            nested_field: owner.nested_field,
            reload_method: owner.reload_method,
        };

        match self.handles.set(handles) {
            Ok(()) => {
                owner.class.into_inner();
                info!(owner = %chain.owner_class, "handle cache populated");
            }
            // Lost a race with another resolver; `owner` drops its global ref.
            Err(_) => debug!("handle cache populated concurrently"),
        }
        self.get()
    }
}

struct Resolved<'a, J: Jni + ?Sized> {
    class: GlobalRef<'a, J>,
    instance_method: jmethodID,
    nested_field: jfieldID,
    reload_method: jmethodID,
}

fn step<T>(step: &'static str, result: std::result::Result<T, CallError>) -> Result<T> {
    result.map_err(|source| GraftError::CacheResolutionFailed { step, source })
}

fn resolve_chain<'a, J: Jni + ?Sized>(jni: &'a J, loader: jobject, chain: &LookupChain) -> Result<Resolved<'a, J>> {
    let loader = step("loader", LoaderHandle::new(jni, loader))?;

    let owner_local = step("owner class", loader.load(&chain.owner_class))?;
    let class = step("owner class", GlobalRef::new(jni, owner_local.get()))?;
    drop(owner_local);

    let instance_method = step(
        "instance method",
        jni.get_static_method_id(class.get(), &chain.instance_method.name, &chain.instance_method.signature),
    )?;
    let nested_field = step(
        "nested field",
        jni.get_field_id(class.get(), &chain.nested_field.name, &chain.nested_field.signature),
    )?;

    let nested_class: LocalRef<'a, J> = step("nested class", loader.load(&chain.nested_class))?;
    let reload_method = step(
        "reload method",
        jni.get_method_id(nested_class.get(), &chain.reload_method.name, &chain.reload_method.signature),
    )?;

    Ok(Resolved {
        class,
        instance_method,
        nested_field,
        reload_method,
    })
}
