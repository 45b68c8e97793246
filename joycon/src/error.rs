//! High-level error types

use joycon_core::Subcommand;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Core protocol error: {0}")]
    Core(#[from] joycon_core::Error),
    
    #[error("Transport error: {0}")]
    Transport(#[from] joycon_transport::Error),
    
    #[error("Type error: {0}")]
    Types(#[from] joycon_types::Error),
    
    #[error("No reply to {subcommand} after {attempts} attempts")]
    Timeout {
        subcommand: Subcommand,
        attempts: usize,
    },
    
    #[error("Device disconnected")]
    Disconnected,
    
    #[error("No full-state report received yet")]
    NoReport,
}

impl Error {
    /// Check if the caller passed a bad argument (player number, read size)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_invalid_argument())
    }
    
    /// Check if request/reply state is out of sync
    ///
    /// The open handshake should be re-issued before sending more commands.
    pub fn requires_handshake(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_protocol_desync())
    }
    
    /// Check if the device is still usable after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::NoReport => true,
            Self::Core(_) | Self::Types(_) => true,
            Self::Transport(_) | Self::Disconnected => false,
        }
    }
}
