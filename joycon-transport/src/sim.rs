//! Simulated controller
//!
//! Drives the peer end of an in-memory link the way a Joy-Con answers over
//! Bluetooth: every subcommand except a disconnect gets a `0x21` reply, SPI
//! reads are served from an in-memory flash image, and full-state reports
//! are pushed on demand. Fault knobs cover NACKs, silence, mismatched reply
//! ids and corrupted SPI echoes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use joycon_core::{
    constants::flash, Command, InputReport, OutputReport, ReportBuilder, Subcommand,
};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{error::Result, memory::MemoryPeer, ReportSender};

/// Factory IMU block of a typical left Joy-Con
pub const DEFAULT_FACTORY_IMU: [u8; 24] = [
    0xBE, 0xFF, 0x3E, 0x00, 0xF0, 0x01,
    0x00, 0x40, 0x00, 0x40, 0x00, 0x40,
    0xFE, 0xFF, 0xFE, 0xFF, 0x08, 0x00,
    0xE7, 0x3B, 0xE7, 0x3B, 0xE7, 0x3B,
];

#[derive(Debug, Clone, Default)]
struct Faults {
    state_before_reply: bool,
    corrupt_spi_echo: bool,
    nack: HashSet<u8>,
    silent: HashSet<u8>,
    reply_as: Option<u8>,
}

/// Scriptable stand-in for a physical controller
#[derive(Debug, Clone, Default)]
pub struct SimulatedController {
    flash: BTreeMap<u32, u8>,
    faults: Faults,
}

impl SimulatedController {
    /// Controller with blank (0xFF) flash
    pub fn new() -> Self {
        Self::default()
    }
    
    /// Neon-blue left Joy-Con with factory IMU calibration only
    pub fn left_joycon() -> Self {
        Self::new()
            .with_colors([0x0A, 0xB9, 0xE6], [0x00, 0x1E, 0x1E])
            .with_factory_calibration(DEFAULT_FACTORY_IMU)
    }
    
    pub fn with_flash(mut self, address: u32, bytes: &[u8]) -> Self {
        for (i, byte) in bytes.iter().enumerate() {
            self.flash.insert(address + i as u32, *byte);
        }
        self
    }
    
    pub fn with_colors(self, body: [u8; 3], buttons: [u8; 3]) -> Self {
        let mut block = [0u8; 6];
        block[..3].copy_from_slice(&body);
        block[3..].copy_from_slice(&buttons);
        self.with_flash(flash::COLOR_ADDRESS, &block)
    }
    
    pub fn with_factory_calibration(self, block: [u8; 24]) -> Self {
        self.with_flash(flash::FACTORY_IMU_ADDRESS, &block)
    }
    
    /// Store user calibration and set the marker that selects it
    pub fn with_user_calibration(self, block: [u8; 24]) -> Self {
        self.with_flash(flash::USER_IMU_MARKER_ADDRESS, &flash::USER_IMU_MARKER)
            .with_flash(flash::USER_IMU_ADDRESS, &block)
    }
    
    /// Emit a full-state report right before every reply
    pub fn interleave_state_reports(mut self) -> Self {
        self.faults.state_before_reply = true;
        self
    }
    
    /// Flip a bit of the echoed address in SPI read replies
    pub fn corrupt_spi_echo(mut self) -> Self {
        self.faults.corrupt_spi_echo = true;
        self
    }
    
    /// Answer `subcommand` with the ack bit cleared
    pub fn nack(mut self, subcommand: Subcommand) -> Self {
        self.faults.nack.insert(subcommand.into());
        self
    }
    
    /// Never answer `subcommand`
    pub fn ignore(mut self, subcommand: Subcommand) -> Self {
        self.faults.silent.insert(subcommand.into());
        self
    }
    
    /// Echo `subcommand` as the reply id regardless of the request
    pub fn reply_as(mut self, subcommand: Subcommand) -> Self {
        self.faults.reply_as = Some(subcommand.into());
        self
    }
    
    /// Read flash the way the controller would (unwritten bytes read 0xFF)
    pub fn read_flash(&self, address: u32, size: u8) -> Vec<u8> {
        (0..u32::from(size))
            .map(|i| self.flash.get(&(address + i)).copied().unwrap_or(0xFF))
            .collect()
    }
    
    /// Build the reply for `command`, if the controller would send one
    pub fn reply_to(&self, command: &Command, timer: u8) -> Option<InputReport> {
        let sub = u8::from(command.subcommand());
        if !command.expects_reply() || self.faults.silent.contains(&sub) {
            return None;
        }
        
        let echoed = self.faults.reply_as.unwrap_or(sub);
        if self.faults.nack.contains(&sub) {
            return Some(ReportBuilder::reply(0x00, echoed).timer(timer).build());
        }
        
        let report = match *command {
            Command::SpiFlashRead { address, size } => {
                let mut data = address.to_le_bytes().to_vec();
                data.push(size);
                if self.faults.corrupt_spi_echo {
                    data[0] ^= 0x01;
                }
                data.extend(self.read_flash(address, size));
                ReportBuilder::reply(flash::READ_ACK, echoed).reply_data(&data)
            }
            _ => ReportBuilder::reply(0x80, echoed),
        };
        Some(report.timer(timer).build())
    }
    
    /// Start answering on `peer`
    pub fn spawn(self, mut peer: MemoryPeer) -> SimHandle {
        let reports = peer.reports();
        let log = Arc::new(Mutex::new(Vec::new()));
        
        let task = {
            let reports = reports.clone();
            let log = log.clone();
            tokio::spawn(async move {
                let mut timer = 0u8;
                while let Some(frame) = peer.next_output().await {
                    log.lock().push(frame.clone());
                    
                    let output = match OutputReport::decode(&frame) {
                        Ok(output) => output,
                        Err(e) => {
                            warn!("Simulated controller ignoring frame: {}", e);
                            continue;
                        }
                    };
                    let Some(command) = output.command else {
                        continue;
                    };
                    
                    if self.faults.state_before_reply {
                        let state = ReportBuilder::full_state()
                            .timer(timer)
                            .left_stick(2048, 2048)
                            .right_stick(2048, 2048)
                            .build();
                        if reports.push_report(state).is_err() {
                            break;
                        }
                    }
                    
                    if let Some(reply) = self.reply_to(&command, timer) {
                        debug!(counter = output.counter, %command, "Simulated reply");
                        if reports.push_report(reply).is_err() {
                            break;
                        }
                    }
                    timer = timer.wrapping_add(1);
                }
            })
        };
        
        SimHandle { reports, log, task }
    }
}

/// Running simulated controller
pub struct SimHandle {
    reports: ReportSender,
    log: Arc<Mutex<Vec<Bytes>>>,
    task: JoinHandle<()>,
}

impl SimHandle {
    /// Push a report as if the controller produced it
    pub fn push(&self, report: InputReport) -> Result<()> {
        self.reports.push_report(report)
    }
    
    /// Every output report received so far, raw
    pub fn outputs(&self) -> Vec<Bytes> {
        self.log.lock().clone()
    }
    
    /// Every well-formed output report received so far
    pub fn decoded_outputs(&self) -> Vec<OutputReport> {
        self.log
            .lock()
            .iter()
            .filter_map(|frame| OutputReport::decode(frame).ok())
            .collect()
    }
}

impl Drop for SimHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory, Transport};
    use joycon_core::{RumbleData, SpiRead};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_flash_defaults_to_erased() {
        let sim = SimulatedController::new().with_flash(0x6050, &[1, 2]);
        assert_eq!(sim.read_flash(0x6050, 4), vec![1, 2, 0xFF, 0xFF]);
    }

    #[test]
    fn test_spi_reply_validates() {
        let sim = SimulatedController::left_joycon();
        let read = SpiRead::new(0x6020, 24).unwrap();
        
        let reply = sim.reply_to(&read.command(), 0).unwrap().reply().unwrap();
        assert_eq!(read.parse_reply(&reply).unwrap().as_ref(), &DEFAULT_FACTORY_IMU);
    }

    #[test]
    fn test_disconnect_gets_no_reply() {
        let sim = SimulatedController::new();
        assert!(sim.reply_to(&Command::Disconnect, 0).is_none());
    }

    #[test]
    fn test_fault_knobs() {
        let sim = SimulatedController::new()
            .nack(Subcommand::EnableImu)
            .ignore(Subcommand::SetInputMode);
        
        let nack = sim.reply_to(&Command::EnableImu(true), 0).unwrap().reply().unwrap();
        assert!(!nack.is_ack());
        assert!(sim.reply_to(&Command::SetInputMode(0x30), 0).is_none());
        
        let stray = SimulatedController::new().reply_as(Subcommand::EnableVibration);
        let reply = stray.reply_to(&Command::EnableImu(true), 0).unwrap().reply().unwrap();
        assert_eq!(reply.subcommand(), 0x48);
    }

    #[tokio::test]
    async fn test_spawned_controller_answers() {
        let (transport, peer) = memory::pair("sim");
        let handle = SimulatedController::left_joycon().spawn(peer);
        
        let frame = OutputReport::subcommand(0, RumbleData::STOP, Command::EnableVibration(true));
        transport.send(&frame.encode()).await.unwrap();
        
        let reply = transport.receive().await.unwrap().reply().unwrap();
        assert_eq!(reply.subcommand(), 0x48);
        assert!(reply.is_ack());
        assert_eq!(handle.decoded_outputs(), vec![frame]);
        
        transport.close().await.unwrap();
    }
}
