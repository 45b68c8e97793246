//! SPI flash reads
//!
//! A read is subcommand `0x10` with arguments `[address (LE u32), size]`.
//! The reply echoes those five bytes before the payload, which lets the
//! caller detect a reply that belongs to a different request.
//!
//! ```text
//! reply byte: 13    14    15..19            20..20+size
//!             0x90  0x10  address, size     payload
//! ```

use bytes::Bytes;
use tracing::debug;

use crate::{
    command::{Command, Subcommand},
    constants::flash,
    error::{Error, Result},
    report::SubcommandReply,
};

/// Validated SPI flash read request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiRead {
    address: u32,
    size: u8,
}

impl SpiRead {
    /// Create a read of `size` bytes at `address`
    ///
    /// # Errors
    ///
    /// Returns [`Error::SpiReadTooLarge`] if `size > 0x1D`.
    pub fn new(address: u32, size: u8) -> Result<Self> {
        Command::spi_flash_read(address, size)?;
        Ok(Self { address, size })
    }
    
    pub fn address(&self) -> u32 {
        self.address
    }
    
    pub fn size(&self) -> u8 {
        self.size
    }
    
    pub fn command(&self) -> Command {
        Command::SpiFlashRead {
            address: self.address,
            size: self.size,
        }
    }
    
    /// The five argument bytes the reply must echo
    pub fn echo(&self) -> [u8; 5] {
        let a = self.address.to_le_bytes();
        [a[0], a[1], a[2], a[3], self.size]
    }
    
    /// Validate a reply and extract the payload
    ///
    /// # Errors
    ///
    /// - [`Error::SubcommandMismatch`] / [`Error::NotAcknowledged`] from the
    ///   generic reply checks
    /// - [`Error::UnexpectedAck`] if the ack byte isn't the data-bearing `0x90`
    /// - [`Error::EchoMismatch`] if the echoed address/size differ
    pub fn parse_reply(&self, reply: &SubcommandReply) -> Result<Bytes> {
        reply.validate(Subcommand::SpiFlashRead)?;
        
        if reply.ack_byte() != flash::READ_ACK {
            return Err(Error::UnexpectedAck {
                expected: flash::READ_ACK,
                actual: reply.ack_byte(),
            });
        }
        
        let data = reply.data();
        let echo = self.echo();
        let end = echo.len() + usize::from(self.size);
        if data.len() < end {
            return Err(Error::ReportTooShort {
                expected: end,
                actual: data.len(),
            });
        }
        
        if data[..echo.len()] != echo {
            return Err(Error::EchoMismatch {
                sent: hex::encode(echo),
                echoed: hex::encode(&data[..echo.len()]),
            });
        }
        
        debug!(
            address = format!("0x{:04X}", self.address),
            size = self.size,
            "SPI read complete"
        );
        
        Ok(data.slice(echo.len()..end))
    }
}

/// Which flash region holds the IMU calibration in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImuCalibrationSource {
    /// User calibration at `0x8028`
    User,
    
    /// Factory calibration at `0x6020`
    Factory,
}

impl ImuCalibrationSource {
    /// Choose a region from the two marker bytes read at `0x8026`
    pub fn from_marker(marker: &[u8]) -> Self {
        if marker == flash::USER_IMU_MARKER {
            Self::User
        } else {
            Self::Factory
        }
    }
    
    pub fn address(self) -> u32 {
        match self {
            Self::User => flash::USER_IMU_ADDRESS,
            Self::Factory => flash::FACTORY_IMU_ADDRESS,
        }
    }
    
    /// Read request for the calibration block in this region
    pub fn read(self) -> SpiRead {
        SpiRead {
            address: self.address(),
            size: flash::IMU_CALIBRATION_SIZE,
        }
    }
}
