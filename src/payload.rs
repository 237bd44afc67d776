//! The two class blobs the graft installs.

use crate::classfile::ClassFile;
use crate::config::GraftConfig;
use crate::env::NativeBinding;
use crate::error::{GraftError, Result};
use tracing::debug;

/// Replacement bytes for the target class and the companion class definition.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    pub patched_class: &'a [u8],
    pub companion_class: &'a [u8],
}

impl Payload<'_> {
    /// Checks both blobs against the configuration before anything is sent
    /// to the VM.
    ///
    /// The patched class must carry the target's name. The companion must
    /// carry the companion name and declare every binding as a native method
    /// with the same descriptor.
    pub fn validate(&self, config: &GraftConfig, natives: &[NativeBinding]) -> Result<()> {
        let patched = parse("patched", self.patched_class)?;
        let name = class_name("patched", &patched)?;
        if name != config.target_internal_name() {
            return Err(GraftError::InvalidPayload {
                blob: "patched",
                reason: format!("declares {name}, expected {}", config.target_internal_name()),
            });
        }

        let companion = parse("companion", self.companion_class)?;
        let name = class_name("companion", &companion)?;
        if name != config.companion_name {
            return Err(GraftError::InvalidPayload {
                blob: "companion",
                reason: format!("declares {name}, expected {}", config.companion_name),
            });
        }
        for binding in natives {
            match companion.find_method(binding.name, binding.signature) {
                Some(method) if method.is_native() => {}
                Some(_) => {
                    return Err(GraftError::InvalidPayload {
                        blob: "companion",
                        reason: format!("{}{} is not native", binding.name, binding.signature),
                    })
                }
                None => {
                    return Err(GraftError::InvalidPayload {
                        blob: "companion",
                        reason: format!("no method {}{}", binding.name, binding.signature),
                    })
                }
            }
        }

        debug!(
            patched_len = self.patched_class.len(),
            companion_len = self.companion_class.len(),
            "class payload validated"
        );
        Ok(())
    }
}

fn parse(blob: &'static str, bytes: &[u8]) -> Result<ClassFile> {
    ClassFile::parse(bytes).map_err(|e| GraftError::InvalidPayload {
        blob,
        reason: e.to_string(),
    })
}

fn class_name<'c>(blob: &'static str, class: &'c ClassFile) -> Result<&'c str> {
    class.class_name().map_err(|e| GraftError::InvalidPayload {
        blob,
        reason: e.to_string(),
    })
}
