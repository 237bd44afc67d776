//! Loading classes through a specific `ClassLoader` instance.

use crate::env::{object_arg, Jni, LocalRef};
use crate::error::CallError;
use crate::sys::jni::{jclass, jmethodID, jobject};

const LOAD_CLASS: &str = "loadClass";
const LOAD_CLASS_SIG: &str = "(Ljava/lang/String;)Ljava/lang/Class;";

/// `ClassLoader.loadClass` on a specific loader instance.
pub struct LoaderHandle<'a, J: Jni + ?Sized> {
    jni: &'a J,
    loader: jobject,
    load_class: jmethodID,
}

impl<'a, J: Jni + ?Sized> LoaderHandle<'a, J> {
    pub fn new(jni: &'a J, loader: jobject) -> Result<Self, CallError> {
        let loader_class = LocalRef::new(jni, jni.get_object_class(loader)?);
        let load_class = jni.get_method_id(loader_class.get(), LOAD_CLASS, LOAD_CLASS_SIG)?;
        Ok(LoaderHandle {
            jni,
            loader,
            load_class,
        })
    }

    /// Loads `binary_name` (`a.b.C`) through the loader's delegation chain.
    pub fn load(&self, binary_name: &str) -> Result<LocalRef<'a, J>, CallError> {
        let name = LocalRef::new(self.jni, self.jni.new_string_utf(binary_name)?);
        let class: jclass = self
            .jni
            .call_object_method(self.loader, self.load_class, &[object_arg(name.get())])?;
        Ok(LocalRef::new(self.jni, class))
    }
}
