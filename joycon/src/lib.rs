//! # joycon
//!
//! Async protocol engine for Nintendo Joy-Con controllers.
//!
//! ## Features
//!
//! - Typed decoding of full-state reports (buttons, sticks, battery, IMU)
//! - IMU calibration loaded from the controller's SPI flash
//! - Subcommands with bounded reply waits and retries
//! - Rumble, player lamps, vibration toggle, remote disconnect
//! - Background reader with a latest-state snapshot and observers
//!
//! Discovery and pairing are left to the platform; anything implementing
//! [`Connector`] / [`Transport`] can carry the reports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use joycon::{Device, DeviceConfig, DeviceIdentity, SimulatedController};
//! use joycon_transport::memory;
//!
//! #[tokio::main]
//! async fn main() -> joycon::Result<()> {
//!     let (transport, peer) = memory::pair("left");
//!     let _sim = SimulatedController::left_joycon().spawn(peer);
//!
//!     let device = Device::with_transport(
//!         Box::new(transport),
//!         DeviceIdentity::left(None),
//!         DeviceConfig::default(),
//!     )
//!     .await?;
//!
//!     if let Some(info) = device.info() {
//!         println!("{}", info);
//!     }
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;

// Re-exports
pub use config::DeviceConfig;
pub use device::Device;
pub use dispatcher::{DeviceState, Observer};
pub use error::{Error, Result};

// Re-export protocol and transport types
pub use joycon_core::{Calibration, Command, InputReport, RumbleData, Subcommand, ZeroOffset};
pub use joycon_transport::{Connector, SimulatedController, Transport};
pub use joycon_types::{Buttons, ControllerInfo, DeviceIdentity, Side, Status};
