//! Capability setup and class lookup through JVMTI.

use crate::env::{Instrumentation, Jni, LocalRef};
use crate::error::{GraftError, Result};
use crate::sys::jni::{jclass, jobject};
use crate::sys::jvmti::{jvmtiCapabilities, jvmtiError};
use tracing::{debug, info, warn};

/// A loaded class found by signature. Owns its local reference.
pub struct TypeDescriptor<'a, J: Jni + ?Sized> {
    pub signature: String,
    class: LocalRef<'a, J>,
}

impl<J: Jni + ?Sized> TypeDescriptor<'_, J> {
    pub fn class(&self) -> jclass {
        self.class.get()
    }
}

/// Returns the first element of `snapshot` accepted by `predicate`.
///
/// Elements after the match are not visited.
pub fn find_first<T, I, F>(snapshot: I, mut predicate: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> bool,
{
    snapshot.into_iter().find(|item| predicate(item))
}

pub struct IntrospectionSession<T: Instrumentation> {
    ti: T,
}

impl<T: Instrumentation> IntrospectionSession<T> {
    pub fn new(ti: T) -> Self {
        IntrospectionSession { ti }
    }

    pub fn tooling(&self) -> &T {
        &self.ti
    }

    /// Adds `can_redefine_classes`.
    ///
    /// `NOT_AVAILABLE` is only logged: some VMs refuse the request yet still
    /// accept the redefinition. Any other error aborts.
    pub fn request_redefinition(&self) -> Result<()> {
        let mut caps = jvmtiCapabilities::default();
        caps.set_can_redefine_classes(true);

        match self.ti.add_capabilities(&caps) {
            Ok(()) => {}
            Err(jvmtiError::NOT_AVAILABLE) => {
                warn!("can_redefine_classes not available, continuing without it");
            }
            Err(err) => return Err(GraftError::CapabilityGrantFailed(err)),
        }

        match self.ti.get_capabilities() {
            Ok(held) => info!(
                can_redefine_classes = held.can_redefine_classes(),
                can_redefine_any_class = held.can_redefine_any_class(),
                "capabilities"
            ),
            Err(err) => debug!(%err, "GetCapabilities failed"),
        }
        Ok(())
    }

    /// Scans the loaded classes for one whose signature equals `signature`.
    ///
    /// Every class reference in the snapshot other than the match is deleted,
    /// whether or not a match is found.
    pub fn find_type<'a, J: Jni + ?Sized>(&self, jni: &'a J, signature: &str) -> Result<TypeDescriptor<'a, J>> {
        let classes = self.ti.get_loaded_classes().map_err(GraftError::EnumerationFailed)?;
        let total = classes.len();

        let refs: Vec<LocalRef<'a, J>> = classes.into_iter().map(|class| LocalRef::new(jni, class)).collect();
        let mut scanned = 0usize;
        // References not returned are dropped with the consumed snapshot.
        let found = find_first(refs, |class| {
            scanned += 1;
            match self.ti.get_class_signature(class.get()) {
                Ok(sig) => sig == signature,
                Err(err) => {
                    debug!(%err, "GetClassSignature failed, skipping class");
                    false
                }
            }
        });

        match found {
            Some(class) => {
                info!(signature, scanned, total, "found target class");
                Ok(TypeDescriptor {
                    signature: signature.to_string(),
                    class,
                })
            }
            None => Err(GraftError::TargetTypeNotFound {
                signature: signature.to_string(),
            }),
        }
    }

    /// The class loader that defined `target`.
    pub fn defining_loader<'a, J: Jni + ?Sized>(
        &self,
        jni: &'a J,
        target: &TypeDescriptor<'_, J>,
    ) -> Result<LocalRef<'a, J>> {
        let loader: jobject = self
            .ti
            .get_class_loader(target.class())
            .map_err(|err| GraftError::LoaderUnavailable(err.to_string()))?;
        if loader.is_null() {
            return Err(GraftError::LoaderUnavailable(format!(
                "{} is defined by the bootstrap loader",
                target.signature
            )));
        }
        Ok(LocalRef::new(jni, loader))
    }
}
