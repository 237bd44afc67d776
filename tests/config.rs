use jvmti_graft::config::{ConfigError, GraftConfig, LookupChain};
use std::time::Duration;
use tracing::Level;

#[test]
fn defaults_target_the_block_renderer() {
    let config = GraftConfig::default();
    assert_eq!(config.target_signature, "Lnet/minecraft/block/Block;");
    assert_eq!(config.target_internal_name(), "net/minecraft/block/Block");
    assert_eq!(config.companion_name, "JNIBridge");
    assert_eq!(config.policy_suffix, "_ore}");
    assert_eq!(config.hook_symbol, "glOrtho");
    assert_eq!(config.toggle_key, b'X' as u16);
    assert_eq!(config.poll_interval, Duration::from_millis(80));
    assert_eq!(config.log_level, Level::INFO);
    assert_eq!(config.lookup, LookupChain::default());
    assert_eq!(config.lookup.reload_method.signature, "()V");
}

#[test]
fn empty_options_keep_defaults() {
    assert_eq!(GraftConfig::from_options("").unwrap(), GraftConfig::default());
    assert_eq!(GraftConfig::from_options(" , ,").unwrap(), GraftConfig::default());
}

#[test]
fn options_override_values() {
    let config = GraftConfig::from_options(
        "target=Lcom/example/Tile;, companion=com.example.Bridge, suffix=_gem, key=z, poll_ms=50, log=debug, console=false",
    )
    .unwrap();

    assert_eq!(config.target_signature, "Lcom/example/Tile;");
    assert_eq!(config.target_internal_name(), "com/example/Tile");
    assert_eq!(config.companion_name, "com/example/Bridge");
    assert_eq!(config.policy_suffix, "_gem");
    assert_eq!(config.toggle_key, b'Z' as u16);
    assert_eq!(config.poll_interval, Duration::from_millis(50));
    assert_eq!(config.log_level, Level::DEBUG);
    assert!(!config.console);
}

#[test]
fn key_accepts_virtual_key_codes() {
    assert_eq!(GraftConfig::from_options("key=0x72").unwrap().toggle_key, 0x72);
    assert_eq!(GraftConfig::from_options("key=0X2D").unwrap().toggle_key, 0x2D);
    assert_eq!(GraftConfig::from_options("key=45").unwrap().toggle_key, 45);
    assert_eq!(GraftConfig::from_options("key=7").unwrap().toggle_key, b'7' as u16);
}

#[test]
fn hook_location_is_configurable() {
    let config = GraftConfig::from_options("hook_module=libGLX.so.0,hook_symbol=glViewport").unwrap();
    assert_eq!(config.hook_module, "libGLX.so.0");
    assert_eq!(config.hook_symbol, "glViewport");
}

#[test]
fn rejects_bad_options() {
    assert_eq!(
        GraftConfig::from_options("speed=3").unwrap_err(),
        ConfigError::UnknownOption("speed".to_string())
    );
    assert_eq!(
        GraftConfig::from_options("key").unwrap_err(),
        ConfigError::MissingValue("key".to_string())
    );
    assert_eq!(
        GraftConfig::from_options("suffix=").unwrap_err(),
        ConfigError::MissingValue("suffix".to_string())
    );

    for bad in [
        "target=net/minecraft/block/Block",
        "poll_ms=0",
        "poll_ms=fast",
        "key=0xZZ",
        "key=F12",
        "log=loud",
        "console=yes",
    ] {
        assert!(
            matches!(GraftConfig::from_options(bad), Err(ConfigError::InvalidValue { .. })),
            "{bad}"
        );
    }
}
