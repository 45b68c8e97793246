//! Transport errors

use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Connection closed by remote")]
    ConnectionClosed,
    
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    
    #[error("Short write: {written} of {expected} bytes")]
    ShortWrite {
        written: usize,
        expected: usize,
    },
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Copy of this error for reporting one failure to several callers
    ///
    /// `Io` keeps the kind and message of the source error.
    pub fn replicate(&self) -> Self {
        match self {
            Self::NotConnected => Self::NotConnected,
            Self::ConnectionClosed => Self::ConnectionClosed,
            Self::DeviceNotFound(name) => Self::DeviceNotFound(name.clone()),
            Self::ShortWrite { written, expected } => Self::ShortWrite {
                written: *written,
                expected: *expected,
            },
            Self::Io(e) => Self::Io(io::Error::new(e.kind(), e.to_string())),
        }
    }
}
