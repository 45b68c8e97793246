//! Output report framing
//!
//! # Report Structure
//!
//! ```text
//! ┌──────────┬──────────┬───────────────┬──────────────┬──────────────┐
//! │ ReportID │ Counter  │ Rumble        │ Subcommand   │ Arguments    │
//! │ 1 byte   │ 1 byte   │ 8 bytes       │ 1 byte       │ N bytes      │
//! │ 0x01/0x10│ (0..16)  │ (last pattern)│ (0x01 only)  │ (0x01 only)  │
//! └──────────┴──────────┴───────────────┴──────────────┴──────────────┘
//! ```
//!
//! Report `0x10` carries rumble only and ends after the rumble bytes.

use std::fmt;

use bytes::{BufMut, BytesMut};

use crate::{
    command::Command,
    constants::output_ids,
    error::{Error, Result},
    rumble::RumbleData,
};

/// Output report type
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// `0x01`: rumble followed by a subcommand
    Subcommand,
    
    /// `0x10`: rumble only
    Rumble,
}

impl OutputKind {
    pub fn id(self) -> u8 {
        match self {
            Self::Subcommand => output_ids::SUBCOMMAND,
            Self::Rumble => output_ids::RUMBLE,
        }
    }
}

/// One framed output report
///
/// # Examples
///
/// ```
/// use joycon_core::{Command, OutputReport, RumbleData};
///
/// let report = OutputReport::subcommand(3, RumbleData::STOP, Command::EnableVibration(true));
/// let bytes = report.encode();
/// assert_eq!(&bytes[..2], &[0x01, 0x03]);
/// assert_eq!(&bytes[10..], &[0x48, 0x01]);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct OutputReport {
    pub kind: OutputKind,
    
    /// 4-bit packet counter
    pub counter: u8,
    
    /// Rumble bytes echoed in every report
    pub rumble: RumbleData,
    
    /// Present for [`OutputKind::Subcommand`] only
    pub command: Option<Command>,
}

impl OutputReport {
    /// Header size: id + counter + rumble
    pub const HEADER_SIZE: usize = 10;
    
    pub fn subcommand(counter: u8, rumble: RumbleData, command: Command) -> Self {
        Self {
            kind: OutputKind::Subcommand,
            counter: counter & 0x0F,
            rumble,
            command: Some(command),
        }
    }
    
    pub fn rumble(counter: u8, rumble: RumbleData) -> Self {
        Self {
            kind: OutputKind::Rumble,
            counter: counter & 0x0F,
            rumble,
            command: None,
        }
    }
    
    /// Encode report to bytes
    pub fn encode(&self) -> BytesMut {
        let args = self.command.map(|cmd| cmd.arguments());
        let extra = args.as_ref().map_or(0, |a| 1 + a.len());
        let mut buf = BytesMut::with_capacity(Self::HEADER_SIZE + extra);
        
        buf.put_u8(self.kind.id());
        buf.put_u8(self.counter);
        buf.put_slice(self.rumble.as_bytes());
        
        if let (Some(cmd), Some(args)) = (self.command, args) {
            buf.put_u8(cmd.subcommand().into());
            buf.put_slice(&args);
        }
        
        buf
    }
    
    /// Decode an output report (the controller's view of what was sent)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Buffer is shorter than the header (or lacks the subcommand id)
    /// - Report id is neither `0x01` nor `0x10`
    /// - Subcommand id or arguments are invalid
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::HEADER_SIZE {
            return Err(Error::ReportTooShort {
                expected: Self::HEADER_SIZE,
                actual: data.len(),
            });
        }
        
        let mut rumble = [0u8; 8];
        rumble.copy_from_slice(&data[2..Self::HEADER_SIZE]);
        let rumble = RumbleData::new(rumble);
        let counter = data[1];
        
        match data[0] {
            output_ids::RUMBLE => Ok(Self::rumble(counter, rumble)),
            output_ids::SUBCOMMAND => {
                if data.len() <= Self::HEADER_SIZE {
                    return Err(Error::ReportTooShort {
                        expected: Self::HEADER_SIZE + 1,
                        actual: data.len(),
                    });
                }
                let command = Command::decode(data[Self::HEADER_SIZE], &data[Self::HEADER_SIZE + 1..])?;
                Ok(Self::subcommand(counter, rumble, command))
            }
            other => Err(Error::UnexpectedReport {
                expected: output_ids::SUBCOMMAND,
                actual: other,
            }),
        }
    }
}

impl fmt::Debug for OutputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputReport")
            .field("id", &format!("0x{:02X}", self.kind.id()))
            .field("counter", &self.counter)
            .field("rumble", &self.rumble)
            .field("command", &self.command)
            .finish()
    }
}
