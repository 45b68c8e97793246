//! Transport layer for the Joy-Con protocol
//!
//! Discovery, pairing and the HID/Bluetooth plumbing live outside this
//! workspace. They plug in through two traits:
//! - [`Connector`] opens a channel to one identified controller
//! - [`Transport`] is that channel: fixed 49-byte reads, variable writes
//!
//! [`MemoryTransport`] bridges anything that can push bytes into a channel,
//! and [`SimulatedController`] answers like real hardware for tests and demos.

pub mod error;
pub mod memory;
pub mod sim;

pub use error::{Error, Result};
pub use memory::{MemoryPeer, MemoryTransport, ReportSender};
pub use sim::{SimHandle, SimulatedController};

use async_trait::async_trait;
use joycon_core::InputReport;
use joycon_types::DeviceIdentity;

/// Duplex channel to one controller
///
/// Methods take `&self` so one task can block in [`receive`](Self::receive)
/// while others [`send`](Self::send).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one output report
    async fn send(&self, data: &[u8]) -> Result<()>;
    
    /// Receive one input report (blocks until a report arrives)
    async fn receive(&self) -> Result<InputReport>;
    
    /// Release the channel
    async fn close(&self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Get remote address
    fn remote_addr(&self) -> String;
}

/// Opens transports to identified controllers
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, identity: &DeviceIdentity) -> Result<Box<dyn Transport>>;
}
