//! Graft configuration.
//!
//! [`GraftConfig::default`] targets the block renderer of the stock client.
//! Agent options override individual values:
//!
//! ```text
//! -agentpath:graft.so=target=Lcom/example/Block;,key=Z,poll_ms=50,log=debug
//! ```

use crate::sys::jni;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("option `{0}` needs a value")]
    MissingValue(String),

    #[error("invalid value `{value}` for option `{key}`")]
    InvalidValue { key: String, value: String },
}

/// A member looked up by name and JNI descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub signature: String,
}

impl Member {
    pub fn new(name: &str, signature: &str) -> Self {
        Member {
            name: name.to_string(),
            signature: signature.to_string(),
        }
    }
}

/// The fixed chain resolved once into the handle cache.
///
/// Class names are binary names (`a.b.C`) as accepted by `ClassLoader.loadClass`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupChain {
    pub owner_class: String,
    /// Static, returns the owner singleton.
    pub instance_method: Member,
    /// Instance field on the owner holding the nested subsystem.
    pub nested_field: Member,
    pub nested_class: String,
    /// `()V` on the nested subsystem.
    pub reload_method: Member,
}

impl Default for LookupChain {
    fn default() -> Self {
        LookupChain {
            owner_class: "net.minecraft.client.Minecraft".to_string(),
            instance_method: Member::new("getMinecraft", "()Lnet/minecraft/client/Minecraft;"),
            nested_field: Member::new("renderGlobal", "Lnet/minecraft/client/renderer/RenderGlobal;"),
            nested_class: "net.minecraft.client.renderer.RenderGlobal".to_string(),
            reload_method: Member::new("loadRenderers", "()V"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraftConfig {
    /// JVM type signature of the class to redefine, `Lpkg/Target;`.
    pub target_signature: String,
    /// Internal name of the injected companion class.
    pub companion_name: String,
    /// Names accepted by the companion's policy predicate end with this.
    pub policy_suffix: String,
    pub lookup: LookupChain,
    pub hook_module: String,
    pub hook_symbol: String,
    /// Virtual-key code sampled by the poller.
    pub toggle_key: u16,
    pub poll_interval: Duration,
    pub jni_version: jni::jint,
    pub log_level: Level,
    /// Allocate a console window when the host has none (Windows only).
    pub console: bool,
}

impl Default for GraftConfig {
    fn default() -> Self {
        GraftConfig {
            target_signature: "Lnet/minecraft/block/Block;".to_string(),
            companion_name: "JNIBridge".to_string(),
            policy_suffix: "_ore}".to_string(),
            lookup: LookupChain::default(),
            hook_module: crate::module::opengl_filename().to_string(),
            hook_symbol: "glOrtho".to_string(),
            toggle_key: b'X' as u16,
            poll_interval: Duration::from_millis(80),
            jni_version: jni::JNI_VERSION_1_8,
            log_level: Level::INFO,
            console: cfg!(windows),
        }
    }
}

impl GraftConfig {
    /// Applies `key=value` pairs separated by commas on top of the defaults.
    pub fn from_options(options: &str) -> Result<Self, ConfigError> {
        let mut config = GraftConfig::default();
        for pair in options.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => return Err(ConfigError::MissingValue(pair.to_string())),
            };
            if value.is_empty() {
                return Err(ConfigError::MissingValue(key.to_string()));
            }
            config.apply(key, value)?;
        }
        Ok(config)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key {
            "target" => {
                if !(value.starts_with('L') && value.ends_with(';')) {
                    return Err(invalid());
                }
                self.target_signature = value.to_string();
            }
            "companion" => self.companion_name = value.replace('.', "/"),
            "suffix" => self.policy_suffix = value.to_string(),
            "hook_module" => self.hook_module = value.to_string(),
            "hook_symbol" => self.hook_symbol = value.to_string(),
            "key" => self.toggle_key = parse_key(value).ok_or_else(invalid)?,
            "poll_ms" => {
                let ms: u64 = value.parse().map_err(|_| invalid())?;
                if ms == 0 {
                    return Err(invalid());
                }
                self.poll_interval = Duration::from_millis(ms);
            }
            "log" => self.log_level = Level::from_str(value).map_err(|_| invalid())?,
            "console" => self.console = value.parse().map_err(|_| invalid())?,
            _ => return Err(ConfigError::UnknownOption(key.to_string())),
        }
        Ok(())
    }

    /// Internal name of the target class, `pkg/Target`.
    pub fn target_internal_name(&self) -> &str {
        self.target_signature
            .strip_prefix('L')
            .and_then(|s| s.strip_suffix(';'))
            .unwrap_or(&self.target_signature)
    }
}

/// A single letter or digit, or a numeric virtual-key code (`0x58`, `88`).
fn parse_key(value: &str) -> Option<u16> {
    let mut chars = value.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphanumeric() {
            return Some(c.to_ascii_uppercase() as u16);
        }
    }
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
