//! Rumble patterns
//!
//! Every output report carries 8 rumble bytes. The controller resets its
//! actuators when they change, so the last pattern must be echoed verbatim.

use std::fmt;

/// Eight bytes of encoded rumble (two 4-byte halves, left and right actuator)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RumbleData([u8; 8]);

impl RumbleData {
    /// Power-on default; actuators idle
    pub const STOP: Self = Self([0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40]);
    
    /// Short sharp pulse
    pub const BUMP: Self = Self([0x98, 0x1E, 0xC1, 0x51, 0x98, 0x1E, 0xC1, 0x12]);
    
    /// Sustained buzz
    pub const SIMPLE: Self = Self([0x98, 0x2E, 0xC6, 0x48, 0x98, 0x1E, 0xC6, 0x47]);
    
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
    
    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl Default for RumbleData {
    fn default() -> Self {
        Self::STOP
    }
}

impl From<[u8; 8]> for RumbleData {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for RumbleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RumbleData({})", hex::encode(self.0))
    }
}
