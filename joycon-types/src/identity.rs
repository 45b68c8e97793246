//! Controller identity (vendor, product, serial)

use std::fmt;

use crate::error::{Error, Result};

/// Nintendo USB/Bluetooth vendor id
pub const VENDOR_ID: u16 = 0x057E;

/// Left Joy-Con product id
pub const LEFT_PRODUCT_ID: u16 = 0x2006;

/// Right Joy-Con product id
pub const RIGHT_PRODUCT_ID: u16 = 0x2007;

/// Which half of the pair a controller is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

/// Stable identity of one physical controller
///
/// Construction validates the vendor and product ids, so every
/// `DeviceIdentity` refers to a supported Joy-Con.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    vendor_id: u16,
    product_id: u16,
    serial: Option<String>,
}

impl DeviceIdentity {
    /// Create an identity, rejecting unknown vendor or product ids
    pub fn new(vendor_id: u16, product_id: u16, serial: Option<String>) -> Result<Self> {
        if vendor_id != VENDOR_ID {
            return Err(Error::Validation(format!(
                "vendor_id 0x{:04X} is invalid",
                vendor_id
            )));
        }
        if product_id != LEFT_PRODUCT_ID && product_id != RIGHT_PRODUCT_ID {
            return Err(Error::Validation(format!(
                "product_id 0x{:04X} is invalid",
                product_id
            )));
        }
        Ok(Self {
            vendor_id,
            product_id,
            serial: serial.filter(|s| !s.is_empty()),
        })
    }

    pub fn left(serial: Option<String>) -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: LEFT_PRODUCT_ID,
            serial: serial.filter(|s| !s.is_empty()),
        }
    }

    pub fn right(serial: Option<String>) -> Self {
        Self {
            vendor_id: VENDOR_ID,
            product_id: RIGHT_PRODUCT_ID,
            serial: serial.filter(|s| !s.is_empty()),
        }
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    pub fn side(&self) -> Side {
        if self.product_id == LEFT_PRODUCT_ID {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn is_left(&self) -> bool {
        self.side() == Side::Left
    }

    pub fn is_right(&self) -> bool {
        self.side() == Side::Right
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vendor_id, self.product_id)?;
        if let Some(serial) = &self.serial {
            write!(f, " ({})", serial)?;
        }
        Ok(())
    }
}
