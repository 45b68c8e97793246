//! Output session state
//!
//! A session tracks what every outgoing report must carry:
//! - The 4-bit packet counter (advances once per report, wraps mod 16)
//! - The last rumble pattern (echoed until replaced)

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::{
    command::Command,
    constants::PACKET_COUNTER_MODULUS,
    packet::OutputReport,
    rumble::RumbleData,
};

/// Session manager
///
/// Shared between every command path of one device. Thread-safe and can be
/// cloned cheaply (Arc internally). Framing a report and writing it should
/// happen under one lock so counter order matches wire order.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Counter value for the next report
    counter: AtomicU8,
    
    /// Last rumble pattern sent
    rumble: parking_lot::RwLock<RumbleData>,
}

impl Session {
    /// Create a session with counter 0 and the default rumble pattern
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SessionInner {
                counter: AtomicU8::new(0),
                rumble: parking_lot::RwLock::new(RumbleData::default()),
            }),
        }
    }
    
    /// Take the current counter value and advance it
    ///
    /// Wraps from 15 back to 0.
    pub fn next_counter(&self) -> u8 {
        let result = self.inner.counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| {
            Some((c + 1) % PACKET_COUNTER_MODULUS)
        });
        // the closure never returns None
        match result {
            Ok(previous) | Err(previous) => previous,
        }
    }
    
    /// Counter value the next report will carry
    pub fn peek_counter(&self) -> u8 {
        self.inner.counter.load(Ordering::Acquire)
    }
    
    pub fn rumble(&self) -> RumbleData {
        *self.inner.rumble.read()
    }
    
    /// Frame `command` with the next counter and the current rumble
    pub fn frame(&self, command: Command) -> OutputReport {
        let report = OutputReport::subcommand(self.next_counter(), self.rumble(), command);
        trace!(counter = report.counter, %command, "Framed subcommand");
        report
    }
    
    /// Replace the rumble state and frame a rumble-only report carrying it
    pub fn frame_rumble(&self, rumble: RumbleData) -> OutputReport {
        *self.inner.rumble.write() = rumble;
        let report = OutputReport::rumble(self.next_counter(), rumble);
        trace!(counter = report.counter, ?rumble, "Framed rumble");
        report
    }
    
    /// Reset counter and rumble to power-on values (used in testing)
    #[cfg(test)]
    pub fn reset(&self) {
        self.inner.counter.store(0, Ordering::Release);
        *self.inner.rumble.write() = RumbleData::default();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
