//! Joy-Con subcommand definitions

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    constants::flash,
    error::{Error, Result},
};

/// Subcommand ids multiplexed inside output report `0x01`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Subcommand {
    SetInputMode = 0x03,
    SetHciState = 0x06,
    SpiFlashRead = 0x10,
    SetPlayerLights = 0x30,
    EnableImu = 0x40,
    EnableVibration = 0x48,
}

impl Subcommand {
    /// Get subcommand name
    pub fn name(self) -> &'static str {
        match self {
            Self::SetInputMode => "SET_INPUT_MODE",
            Self::SetHciState => "SET_HCI_STATE",
            Self::SpiFlashRead => "SPI_FLASH_READ",
            Self::SetPlayerLights => "SET_PLAYER_LIGHTS",
            Self::EnableImu => "ENABLE_IMU",
            Self::EnableVibration => "ENABLE_VIBRATION",
        }
    }
}

impl From<Subcommand> for u8 {
    fn from(sub: Subcommand) -> u8 {
        sub as u8
    }
}

impl TryFrom<u8> for Subcommand {
    type Error = Error;
    
    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x03 => Ok(Self::SetInputMode),
            0x06 => Ok(Self::SetHciState),
            0x10 => Ok(Self::SpiFlashRead),
            0x30 => Ok(Self::SetPlayerLights),
            0x40 => Ok(Self::EnableImu),
            0x48 => Ok(Self::EnableVibration),
            _ => Err(Error::UnknownSubcommand(value)),
        }
    }
}

impl fmt::Display for Subcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

/// Player lamp nibbles for players 1-8
const PLAYER_CODES: [u8; 8] = [1, 3, 7, 15, 9, 10, 11, 6];

/// Lamp nibble for `player` (1-8)
///
/// # Errors
///
/// Returns [`Error::InvalidPlayerNumber`] for anything outside 1..=8.
pub fn player_code(player: u8) -> Result<u8> {
    match player {
        1..=8 => Ok(PLAYER_CODES[usize::from(player - 1)]),
        _ => Err(Error::InvalidPlayerNumber(player)),
    }
}

/// A typed subcommand with its arguments
///
/// # Examples
///
/// ```
/// use joycon_core::{Command, Subcommand};
///
/// let cmd = Command::player_flashing(4).unwrap();
/// assert_eq!(cmd.subcommand(), Subcommand::SetPlayerLights);
/// assert_eq!(cmd.arguments().as_ref(), &[0xF0]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Turn the 6-axis sensor on or off
    EnableImu(bool),
    
    /// Select the input report mode
    SetInputMode(u8),
    
    /// Player lamp byte (low nibble steady, high nibble flashing)
    SetPlayerLights(u8),
    
    /// Turn the rumble actuator on or off
    EnableVibration(bool),
    
    /// Drop the Bluetooth link
    Disconnect,
    
    /// Read `size` bytes of SPI flash at `address`
    SpiFlashRead { address: u32, size: u8 },
}

impl Command {
    /// Lamps lit according to the low nibble of `pattern`
    pub fn player_lights_on(pattern: u8) -> Self {
        Self::SetPlayerLights(pattern & 0x0F)
    }
    
    /// Steady lamps showing player number `player`
    pub fn player(player: u8) -> Result<Self> {
        Ok(Self::SetPlayerLights(player_code(player)? & 0x0F))
    }
    
    /// Flashing lamps showing player number `player`
    pub fn player_flashing(player: u8) -> Result<Self> {
        Ok(Self::SetPlayerLights((player_code(player)? & 0x0F) << 4))
    }
    
    /// SPI flash read, rejecting sizes a single reply can't carry
    pub fn spi_flash_read(address: u32, size: u8) -> Result<Self> {
        if size > flash::MAX_READ_SIZE {
            return Err(Error::SpiReadTooLarge {
                size,
                max: flash::MAX_READ_SIZE,
            });
        }
        Ok(Self::SpiFlashRead { address, size })
    }
    
    pub fn subcommand(&self) -> Subcommand {
        match self {
            Self::EnableImu(_) => Subcommand::EnableImu,
            Self::SetInputMode(_) => Subcommand::SetInputMode,
            Self::SetPlayerLights(_) => Subcommand::SetPlayerLights,
            Self::EnableVibration(_) => Subcommand::EnableVibration,
            Self::Disconnect => Subcommand::SetHciState,
            Self::SpiFlashRead { .. } => Subcommand::SpiFlashRead,
        }
    }
    
    /// Argument bytes that follow the subcommand id
    pub fn arguments(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5);
        match *self {
            Self::EnableImu(enable) | Self::EnableVibration(enable) => buf.put_u8(enable as u8),
            Self::SetInputMode(mode) => buf.put_u8(mode),
            Self::SetPlayerLights(lights) => buf.put_u8(lights),
            Self::Disconnect => buf.put_u8(0x00),
            Self::SpiFlashRead { address, size } => {
                buf.put_u32_le(address);
                buf.put_u8(size);
            }
        }
        buf.freeze()
    }
    
    /// Parse a subcommand id and its argument bytes
    pub fn decode(subcommand: u8, args: &[u8]) -> Result<Self> {
        let sub = Subcommand::try_from(subcommand)?;
        let needed = if sub == Subcommand::SpiFlashRead { 5 } else { 1 };
        if args.len() < needed {
            return Err(Error::ReportTooShort {
                expected: needed,
                actual: args.len(),
            });
        }
        
        match sub {
            Subcommand::EnableImu => Ok(Self::EnableImu(args[0] != 0)),
            Subcommand::SetInputMode => Ok(Self::SetInputMode(args[0])),
            Subcommand::SetPlayerLights => Ok(Self::SetPlayerLights(args[0])),
            Subcommand::EnableVibration => Ok(Self::EnableVibration(args[0] != 0)),
            Subcommand::SetHciState => Ok(Self::Disconnect),
            Subcommand::SpiFlashRead => {
                let address = u32::from_le_bytes([args[0], args[1], args[2], args[3]]);
                Self::spi_flash_read(address, args[4])
            }
        }
    }
    
    /// Whether the controller answers this subcommand before acting on it
    ///
    /// The link drops on `Disconnect`, so no reply can be expected.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Self::Disconnect)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.subcommand(), hex::encode(self.arguments()))
    }
}
