//! Type definitions for joycon

pub mod device_info;
pub mod error;
pub mod identity;
pub mod status;

pub use device_info::{ControllerColors, ControllerInfo, Rgb};
pub use error::{Error, Result};
pub use identity::{DeviceIdentity, Side};
pub use status::{Battery, Buttons, ImuSample, Status, Stick, Vector3};
