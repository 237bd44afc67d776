//! Log sink.
//!
//! A `tracing-subscriber` fmt layer writing to stderr, installed on first use.
//! `JVMTI_GRAFT_LOG` overrides the configured level with a full filter
//! directive.

use crate::config::GraftConfig;
use std::sync::OnceLock;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "JVMTI_GRAFT_LOG";

pub fn init(config: &GraftConfig) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        #[cfg(windows)]
        if config.console {
            console::open("jvmti-graft");
        }

        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(config.log_level).into())
            .with_env_var(LOG_ENV)
            .from_env_lossy();
        // A host that already installed a subscriber keeps it.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(true)
            .try_init();
    });
}

#[cfg(windows)]
mod console {
    use windows::core::HSTRING;
    use windows::Win32::System::Console::{AllocConsole, GetConsoleWindow, SetConsoleTitleW};

    /// Gives a GUI host a console for stderr.
    pub fn open(title: &str) {
        unsafe {
            if !GetConsoleWindow().0.is_null() {
                return;
            }
            if AllocConsole().is_ok() {
                let _ = SetConsoleTitleW(&HSTRING::from(title));
            }
        }
    }
}
