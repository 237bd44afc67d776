//! Key polling.
//!
//! Samples one key at a fixed interval. Each press (a rising edge) flips the
//! feature toggle and then arms the deferred signal, so the reload that the
//! signal triggers observes the new toggle value.

use crate::trigger::{DeferredSignal, FeatureToggle};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

pub trait KeySource: Send {
    fn is_down(&mut self) -> bool;
}

#[derive(Debug, Default)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    /// True when `down` follows an up sample.
    pub fn rising(&mut self, down: bool) -> bool {
        let rising = down && !self.previous;
        self.previous = down;
        rising
    }
}

pub struct Poller<S: KeySource> {
    source: S,
    interval: Duration,
    edge: EdgeDetector,
}

impl<S: KeySource + 'static> Poller<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Poller {
            source,
            interval,
            edge: EdgeDetector::default(),
        }
    }

    /// Takes one sample. Returns whether it was a press.
    pub fn step(&mut self, toggle: &FeatureToggle, signal: &DeferredSignal) -> bool {
        if !self.edge.rising(self.source.is_down()) {
            return false;
        }
        let enabled = toggle.flip();
        signal.arm();
        info!(enabled, "toggle flipped, reload requested");
        true
    }

    /// Polls forever on a named thread.
    pub fn spawn(mut self, toggle: &'static FeatureToggle, signal: &'static DeferredSignal) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name("graft-poller".to_string()).spawn(move || {
            debug!(interval_ms = self.interval.as_millis() as u64, "poller started");
            loop {
                self.step(toggle, signal);
                thread::sleep(self.interval);
            }
        })
    }
}

/// `GetAsyncKeyState` for one virtual key.
#[cfg(windows)]
pub struct AsyncKeyState {
    vkey: i32,
}

#[cfg(windows)]
impl AsyncKeyState {
    pub fn new(vkey: u16) -> Self {
        AsyncKeyState { vkey: vkey as i32 }
    }
}

#[cfg(windows)]
impl KeySource for AsyncKeyState {
    fn is_down(&mut self) -> bool {
        let state = unsafe { windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState(self.vkey) };
        (state as u16) & 0x8000 != 0
    }
}
