//! Controller information structures

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::identity::DeviceIdentity;

/// 24-bit RGB color as stored in controller flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Shell colors read from SPI flash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerColors {
    /// Body (shell) color
    pub body: Rgb,
    
    /// Button color
    pub buttons: Rgb,
}

impl ControllerColors {
    /// Parse the 6-byte color block (body RGB followed by button RGB)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 6 {
            return Err(Error::Parse(format!(
                "color block needs 6 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            body: Rgb { r: bytes[0], g: bytes[1], b: bytes[2] },
            buttons: Rgb { r: bytes[3], g: bytes[4], b: bytes[5] },
        })
    }
}

/// Controller information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    /// Vendor/product/serial
    pub identity: DeviceIdentity,
    
    /// Shell colors
    pub colors: ControllerColors,
    
    /// Whether user IMU calibration was found (factory data otherwise)
    pub user_calibration: bool,
    
    /// When the open handshake completed
    pub connected_at: DateTime<Utc>,
}

impl ControllerInfo {
    pub fn new(identity: DeviceIdentity, colors: ControllerColors, user_calibration: bool) -> Self {
        Self {
            identity,
            colors,
            user_calibration,
            connected_at: Utc::now(),
        }
    }
}

impl fmt::Display for ControllerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JoyCon[{}, body: {}, buttons: {}]",
            self.identity, self.colors.body, self.colors.buttons
        )
    }
}
