//! Joy-Con input reports
//!
//! Every read from the controller yields a fixed 49-byte buffer whose first
//! byte identifies the report type.
//!
//! ```text
//! ┌────┬───────┬─────────┬─────────────┬───────────────┬────────────────────────┐
//! │ id │ timer │ battery │ buttons (3) │ sticks (6)    │ 13..49                 │
//! │ 0  │ 1     │ 2       │ 3..6        │ 6..12         │ IMU x3 (0x30)          │
//! │    │       │         │             │               │ ack, sub, data (0x21)  │
//! └────┴───────┴─────────┴─────────────┴───────────────┴────────────────────────┘
//! ```

use std::fmt;

use bytes::Bytes;
use joycon_types::Buttons;

use crate::{
    bitfield,
    command::Subcommand,
    constants::{input_ids, offsets},
    error::{Error, Result},
    INPUT_REPORT_SIZE,
};

/// Report type carried in byte 0
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ReportId {
    /// `0x21`: reply to a subcommand
    SubcommandReply,
    
    /// `0x30`: periodic full-state report
    FullState,
    
    /// Anything else; never produced in full-state mode
    Other(u8),
}

impl From<u8> for ReportId {
    fn from(value: u8) -> Self {
        match value {
            input_ids::SUBCOMMAND_REPLY => Self::SubcommandReply,
            input_ids::FULL_STATE => Self::FullState,
            other => Self::Other(other),
        }
    }
}

impl From<ReportId> for u8 {
    fn from(id: ReportId) -> u8 {
        match id {
            ReportId::SubcommandReply => input_ids::SUBCOMMAND_REPLY,
            ReportId::FullState => input_ids::FULL_STATE,
            ReportId::Other(other) => other,
        }
    }
}

/// One raw 49-byte input report
///
/// `Copy` so snapshots can be handed out without tearing.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InputReport([u8; INPUT_REPORT_SIZE]);

impl InputReport {
    pub const SIZE: usize = INPUT_REPORT_SIZE;
    
    pub fn new(bytes: [u8; INPUT_REPORT_SIZE]) -> Self {
        Self(bytes)
    }
    
    /// Build a report from a slice of at least 49 bytes
    ///
    /// Trailing bytes beyond the report size are ignored.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::ReportTooShort {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut bytes = [0u8; INPUT_REPORT_SIZE];
        bytes.copy_from_slice(&data[..Self::SIZE]);
        Ok(Self(bytes))
    }
    
    pub fn id(&self) -> ReportId {
        ReportId::from(self.0[0])
    }
    
    pub fn is_full_state(&self) -> bool {
        self.id() == ReportId::FullState
    }
    
    pub fn is_subcommand_reply(&self) -> bool {
        self.id() == ReportId::SubcommandReply
    }
    
    /// Free-running timer byte set by the controller
    pub fn timer(&self) -> u8 {
        self.0[1]
    }
    
    pub fn as_bytes(&self) -> &[u8; INPUT_REPORT_SIZE] {
        &self.0
    }
    
    /// Interpret this report as a subcommand reply
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedReport`] when the id isn't `0x21`.
    pub fn reply(&self) -> Result<SubcommandReply> {
        if !self.is_subcommand_reply() {
            return Err(Error::UnexpectedReport {
                expected: input_ids::SUBCOMMAND_REPLY,
                actual: self.0[0],
            });
        }
        Ok(SubcommandReply {
            ack: self.0[offsets::REPLY_ACK],
            subcommand: self.0[offsets::REPLY_SUBCOMMAND],
            data: Bytes::copy_from_slice(&self.0[offsets::REPLY_DATA..]),
        })
    }
}

impl AsRef<[u8]> for InputReport {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InputReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputReport")
            .field("id", &self.id())
            .field("timer", &self.timer())
            .field("bytes", &hex::encode(self.0))
            .finish()
    }
}

/// Parsed `0x21` reply
///
/// Layout from byte 13: `[ack, subcommand, data...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandReply {
    ack: u8,
    subcommand: u8,
    data: Bytes,
}

impl SubcommandReply {
    /// Raw ack byte (bit 7 set when acknowledged, low bits describe data)
    pub fn ack_byte(&self) -> u8 {
        self.ack
    }
    
    pub fn is_ack(&self) -> bool {
        self.ack & 0x80 != 0
    }
    
    /// Subcommand id echoed by the controller
    pub fn subcommand(&self) -> u8 {
        self.subcommand
    }
    
    /// Reply data following the echoed subcommand id
    pub fn data(&self) -> &Bytes {
        &self.data
    }
    
    /// Check that this reply answers `expected` and was acknowledged
    ///
    /// # Errors
    ///
    /// - [`Error::SubcommandMismatch`] when the echoed id differs
    /// - [`Error::NotAcknowledged`] when the ack bit is clear
    pub fn validate(&self, expected: Subcommand) -> Result<()> {
        let expected = u8::from(expected);
        if self.subcommand != expected {
            return Err(Error::SubcommandMismatch {
                expected,
                actual: self.subcommand,
            });
        }
        if !self.is_ack() {
            return Err(Error::NotAcknowledged {
                subcommand: self.subcommand,
            });
        }
        Ok(())
    }
}

/// Builder for synthetic input reports
///
/// Used by simulated controllers and tests; the layout matches what the
/// decoder in [`crate::decode`] reads.
///
/// # Examples
///
/// ```
/// use joycon_core::{ReportBuilder, ReportId};
///
/// let report = ReportBuilder::full_state()
///     .left_stick(2048, 2048)
///     .build();
/// assert_eq!(report.id(), ReportId::FullState);
/// ```
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    buf: [u8; INPUT_REPORT_SIZE],
}

impl ReportBuilder {
    /// Start a `0x30` full-state report
    pub fn full_state() -> Self {
        let mut buf = [0u8; INPUT_REPORT_SIZE];
        buf[0] = input_ids::FULL_STATE;
        Self { buf }
    }
    
    /// Start a `0x21` reply carrying `ack` and the echoed `subcommand`
    pub fn reply(ack: u8, subcommand: u8) -> Self {
        let mut buf = [0u8; INPUT_REPORT_SIZE];
        buf[0] = input_ids::SUBCOMMAND_REPLY;
        buf[offsets::REPLY_ACK] = ack;
        buf[offsets::REPLY_SUBCOMMAND] = subcommand;
        Self { buf }
    }
    
    /// Start a report with an arbitrary id
    pub fn with_id(id: u8) -> Self {
        let mut buf = [0u8; INPUT_REPORT_SIZE];
        buf[0] = id;
        Self { buf }
    }
    
    pub fn timer(mut self, timer: u8) -> Self {
        self.buf[1] = timer;
        self
    }
    
    pub fn battery(mut self, level: u8, charging: bool) -> Self {
        bitfield::insert(&mut self.buf, offsets::BATTERY, 4, 1, charging as u8);
        bitfield::insert(&mut self.buf, offsets::BATTERY, 5, 3, level);
        self
    }
    
    pub fn buttons(mut self, buttons: Buttons) -> Self {
        let bits = buttons.bits().to_le_bytes();
        self.buf[offsets::BUTTONS..offsets::BUTTONS + 3].copy_from_slice(&bits[..3]);
        self
    }
    
    pub fn left_stick(mut self, horizontal: u16, vertical: u16) -> Self {
        pack_stick(&mut self.buf, offsets::LEFT_STICK, horizontal, vertical);
        self
    }
    
    pub fn right_stick(mut self, horizontal: u16, vertical: u16) -> Self {
        pack_stick(&mut self.buf, offsets::RIGHT_STICK, horizontal, vertical);
        self
    }
    
    /// Raw IMU counts for all three samples: `[ax, ay, az, gx, gy, gz]` each
    pub fn imu_raw(mut self, samples: [[i16; 6]; 3]) -> Self {
        for (index, sample) in samples.iter().enumerate() {
            let base = offsets::IMU + index * offsets::IMU_STRIDE;
            for (axis, value) in sample.iter().enumerate() {
                let at = base + axis * 2;
                self.buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
            }
        }
        self
    }
    
    /// Copy reply data starting at byte 15, truncated to fit
    pub fn reply_data(mut self, data: &[u8]) -> Self {
        let room = INPUT_REPORT_SIZE - offsets::REPLY_DATA;
        let n = data.len().min(room);
        self.buf[offsets::REPLY_DATA..offsets::REPLY_DATA + n].copy_from_slice(&data[..n]);
        self
    }
    
    pub fn build(self) -> InputReport {
        InputReport(self.buf)
    }
}

fn pack_stick(buf: &mut [u8], base: usize, horizontal: u16, vertical: u16) {
    let h = horizontal & 0x0FFF;
    let v = vertical & 0x0FFF;
    buf[base] = (h & 0xFF) as u8;
    buf[base + 1] = ((h >> 8) as u8 & 0x0F) | (((v & 0x0F) as u8) << 4);
    buf[base + 2] = (v >> 4) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_report_id_conversion() {
        assert_eq!(ReportId::from(0x21), ReportId::SubcommandReply);
        assert_eq!(ReportId::from(0x30), ReportId::FullState);
        assert_eq!(ReportId::from(0x3F), ReportId::Other(0x3F));
        assert_eq!(u8::from(ReportId::Other(0x3F)), 0x3F);
    }

    #[test]
    fn test_from_slice_too_short() {
        let result = InputReport::from_slice(&[0x30; 12]);
        assert!(matches!(
            result,
            Err(Error::ReportTooShort { expected: 49, actual: 12 })
        ));
    }

    #[test]
    fn test_from_slice_ignores_trailing_bytes() {
        let mut data = vec![0u8; 64];
        data[0] = 0x30;
        let report = InputReport::from_slice(&data).unwrap();
        assert!(report.is_full_state());
    }

    #[test]
    fn test_reply_layout() {
        let report = ReportBuilder::reply(0x90, 0x10)
            .reply_data(&[0x50, 0x60, 0x00, 0x00, 0x02, 0xAA, 0xBB])
            .build();
        
        assert_eq!(report.as_bytes()[13], 0x90);
        assert_eq!(report.as_bytes()[14], 0x10);
        assert_eq!(report.as_bytes()[15], 0x50);
        
        let reply = report.reply().unwrap();
        assert!(reply.is_ack());
        assert_eq!(reply.subcommand(), 0x10);
        assert_eq!(&reply.data()[..7], &[0x50, 0x60, 0x00, 0x00, 0x02, 0xAA, 0xBB]);
        assert_eq!(reply.data().len(), 34);
    }

    #[test]
    fn test_reply_on_full_state_report() {
        let report = ReportBuilder::full_state().build();
        assert!(matches!(
            report.reply(),
            Err(Error::UnexpectedReport { expected: 0x21, actual: 0x30 })
        ));
    }

    #[test]
    fn test_validate_reply() {
        let acked = ReportBuilder::reply(0x80, 0x48).build().reply().unwrap();
        assert!(acked.validate(Subcommand::EnableVibration).is_ok());
        assert!(matches!(
            acked.validate(Subcommand::SetPlayerLights),
            Err(Error::SubcommandMismatch { expected: 0x30, actual: 0x48 })
        ));
        
        let nacked = ReportBuilder::reply(0x00, 0x48).build().reply().unwrap();
        assert!(matches!(
            nacked.validate(Subcommand::EnableVibration),
            Err(Error::NotAcknowledged { subcommand: 0x48 })
        ));
    }

    #[test]
    fn test_stick_packing() {
        let report = ReportBuilder::full_state().left_stick(0x123, 0xABC).build();
        let bytes = report.as_bytes();
        assert_eq!(bytes[6], 0x23);
        assert_eq!(bytes[7], 0xC1);
        assert_eq!(bytes[8], 0xAB);
    }

    #[test]
    fn test_buttons_packing() {
        let report = ReportBuilder::full_state()
            .buttons(Buttons::A | Buttons::HOME | Buttons::ZL)
            .build();
        let bytes = report.as_bytes();
        assert_eq!(bytes[3], 0b0000_1000);
        assert_eq!(bytes[4], 0b0001_0000);
        assert_eq!(bytes[5], 0b1000_0000);
    }
}
