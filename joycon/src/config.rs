//! Device configuration

use std::time::Duration;

use joycon_core::constants::{
    DEFAULT_REPLY_TIMEOUT_MS, DEFAULT_SHUTDOWN_TIMEOUT_MS, HANDSHAKE_DELAY_MS, MAX_RETRIES,
};

/// Timing and retry policy for one device
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use joycon::DeviceConfig;
///
/// let config = DeviceConfig::default()
///     .with_reply_timeout(Duration::from_millis(250))
///     .with_max_retries(1);
/// assert_eq!(config.max_retries, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// How long to wait for one subcommand reply
    pub reply_timeout: Duration,
    
    /// Resends after a timed-out reply before giving up
    pub max_retries: usize,
    
    /// Pause between the two open-handshake commands
    pub handshake_delay: Duration,
    
    /// Upper bound on joining the reader task in [`close`](crate::Device::close)
    pub shutdown_timeout: Duration,
    
    /// Wait for the acknowledgement of LED, vibration, IMU and mode commands
    ///
    /// When off, those commands are written and forgotten. Their replies then
    /// arrive with nobody waiting and are dropped, and a reply that lands
    /// while a later read is pending fails that read as a mismatch.
    pub confirm_commands: bool,
}

impl DeviceConfig {
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
    
    pub fn with_max_retries(mut self, retries: usize) -> Self {
        self.max_retries = retries;
        self
    }
    
    pub fn with_handshake_delay(mut self, delay: Duration) -> Self {
        self.handshake_delay = delay;
        self
    }
    
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
    
    pub fn with_confirm_commands(mut self, confirm: bool) -> Self {
        self.confirm_commands = confirm;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_millis(DEFAULT_REPLY_TIMEOUT_MS),
            max_retries: MAX_RETRIES,
            handshake_delay: Duration::from_millis(HANDSHAKE_DELAY_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            confirm_commands: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = DeviceConfig::default();
        assert_eq!(config.reply_timeout, Duration::from_secs(1));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.handshake_delay, Duration::from_millis(20));
        assert!(config.confirm_commands);
    }

    #[test]
    fn test_builder() {
        let config = DeviceConfig::default()
            .with_shutdown_timeout(Duration::from_millis(10))
            .with_confirm_commands(false);
        assert_eq!(config.shutdown_timeout, Duration::from_millis(10));
        assert!(!config.confirm_commands);
    }
}
