//! Error types for joycon-core

/// Result type alias for joycon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Report is too short to be valid
    #[error("Report too short: expected at least {expected} bytes, got {actual} bytes")]
    ReportTooShort {
        expected: usize,
        actual: usize,
    },
    
    /// Player number outside 1..=8
    #[error("Invalid player number: {0} (expected 1-8)")]
    InvalidPlayerNumber(u8),
    
    /// SPI read larger than a single reply can carry
    #[error("SPI read too large: {size} bytes (max: {max} bytes)")]
    SpiReadTooLarge {
        size: u8,
        max: u8,
    },
    
    /// IMU sample index outside 0..3
    #[error("IMU sample index out of range: {0}")]
    SampleIndexOutOfRange(usize),
    
    /// Unknown subcommand id
    #[error("Unknown subcommand: 0x{0:02X}")]
    UnknownSubcommand(u8),
    
    /// Report id differs from the one required
    #[error("Unexpected report id: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedReport {
        expected: u8,
        actual: u8,
    },
    
    /// Reply ack bit unset
    #[error("Subcommand 0x{subcommand:02X} was not acknowledged")]
    NotAcknowledged {
        subcommand: u8,
    },
    
    /// Reply belongs to another subcommand
    #[error("Reply for subcommand 0x{actual:02X} while awaiting 0x{expected:02X}")]
    SubcommandMismatch {
        expected: u8,
        actual: u8,
    },
    
    /// Ack byte has an unexpected value
    #[error("Unexpected ack byte: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedAck {
        expected: u8,
        actual: u8,
    },
    
    /// Echoed request arguments differ from what was sent
    #[error("Echo mismatch: sent {sent}, device echoed {echoed}")]
    EchoMismatch {
        sent: String,
        echoed: String,
    },
}

impl Error {
    /// Check if error is a caller mistake (never worth retrying)
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidPlayerNumber(_)
                | Self::SpiReadTooLarge { .. }
                | Self::SampleIndexOutOfRange(_)
        )
    }
    
    /// Check if error means request/reply state can no longer be trusted
    ///
    /// The connection stays open, but the open handshake should be
    /// re-issued before further commands.
    pub fn is_protocol_desync(&self) -> bool {
        matches!(
            self,
            Self::NotAcknowledged { .. }
                | Self::SubcommandMismatch { .. }
                | Self::UnexpectedAck { .. }
                | Self::EchoMismatch { .. }
                | Self::UnexpectedReport { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::InvalidPlayerNumber(9).is_invalid_argument());
        assert!(!Error::InvalidPlayerNumber(9).is_protocol_desync());
        
        let err = Error::EchoMismatch {
            sent: "5060000006".into(),
            echoed: "5160000006".into(),
        };
        assert!(err.is_protocol_desync());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_error_display() {
        let err = Error::SpiReadTooLarge { size: 0x20, max: 0x1D };
        assert_eq!(err.to_string(), "SPI read too large: 32 bytes (max: 29 bytes)");
    }
}
