//! # joycon-core
//!
//! Core protocol implementation for Nintendo Joy-Con controllers.
//!
//! This crate provides the low-level protocol primitives:
//! - Bit-field extraction from input reports
//! - Input report parsing and status decoding
//! - IMU calibration model
//! - Subcommand definitions and output report framing
//! - SPI flash read requests and reply validation
//! - Packet counter / rumble session state

pub mod bitfield;
pub mod calibration;
pub mod command;
pub mod constants;
pub mod decode;
pub mod error;
pub mod packet;
pub mod report;
pub mod rumble;
pub mod session;
pub mod spi;

pub use calibration::{AxisCalibration, Calibration, ImuCalibration};
pub use command::{Command, Subcommand};
pub use decode::{decode_status, ZeroOffset};
pub use error::{Error, Result};
pub use packet::{OutputKind, OutputReport};
pub use report::{InputReport, ReportBuilder, ReportId, SubcommandReply};
pub use rumble::RumbleData;
pub use session::Session;
pub use spi::{ImuCalibrationSource, SpiRead};

/// Size of every input report in bytes
pub const INPUT_REPORT_SIZE: usize = 49;
