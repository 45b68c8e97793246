//! In-memory transport
//!
//! A [`MemoryTransport`] and its [`MemoryPeer`] are two ends of a pair of
//! unbounded channels. The transport end is handed to a device; the peer end
//! is driven by whatever produces input reports (a callback-based HID or BLE
//! stack, or a simulated controller).

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use joycon_core::{InputReport, INPUT_REPORT_SIZE};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

/// Create a connected transport/peer pair
pub fn pair(label: impl Into<String>) -> (MemoryTransport, MemoryPeer) {
    let (to_host, incoming) = mpsc::unbounded_channel();
    let (outgoing, from_host) = mpsc::unbounded_channel();
    
    let transport = MemoryTransport {
        label: label.into(),
        outgoing,
        incoming: Mutex::new(incoming),
        connected: AtomicBool::new(true),
        closed: Notify::new(),
    };
    let peer = MemoryPeer {
        reports: ReportSender(to_host),
        from_host,
    };
    (transport, peer)
}

/// Zero-pad (or truncate) raw bytes into one input report
///
/// HID reads of a shorter report leave the rest of the buffer zeroed.
pub fn pad_report(data: &[u8]) -> InputReport {
    let mut bytes = [0u8; INPUT_REPORT_SIZE];
    let n = data.len().min(INPUT_REPORT_SIZE);
    bytes[..n].copy_from_slice(&data[..n]);
    InputReport::new(bytes)
}

/// Host end of an in-memory link
pub struct MemoryTransport {
    label: String,
    outgoing: mpsc::UnboundedSender<Bytes>,
    incoming: Mutex<mpsc::UnboundedReceiver<InputReport>>,
    connected: AtomicBool,
    closed: Notify,
}

impl MemoryTransport {
    pub fn new(label: impl Into<String>) -> (Self, MemoryPeer) {
        pair(label)
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        
        trace!("Sending {} bytes: {}", data.len(), hex::encode(data));
        
        self.outgoing
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| Error::ConnectionClosed)
    }
    
    async fn receive(&self) -> Result<InputReport> {
        // registered before the check so a concurrent close() can't slip between
        let closed = self.closed.notified();
        tokio::pin!(closed);
        closed.as_mut().enable();
        
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        
        let mut incoming = tokio::select! {
            incoming = self.incoming.lock() => incoming,
            _ = closed.as_mut() => return Err(Error::NotConnected),
        };
        
        tokio::select! {
            report = incoming.recv() => {
                let report = report.ok_or(Error::ConnectionClosed)?;
                trace!("Received report 0x{:02X}", u8::from(report.id()));
                Ok(report)
            }
            _ = closed => Err(Error::NotConnected),
        }
    }
    
    async fn close(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            debug!("Closing memory link {}", self.label);
            self.closed.notify_waiters();
        }
        Ok(())
    }
    
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
    
    fn remote_addr(&self) -> String {
        format!("memory:{}", self.label)
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Memory transport {} dropped while still connected", self.label);
        }
    }
}

/// Cloneable handle that injects input reports into a link
#[derive(Debug, Clone)]
pub struct ReportSender(mpsc::UnboundedSender<InputReport>);

impl ReportSender {
    /// Push raw bytes, zero-padded to a full report
    pub fn push(&self, data: &[u8]) -> Result<()> {
        self.push_report(pad_report(data))
    }
    
    pub fn push_report(&self, report: InputReport) -> Result<()> {
        self.0.send(report).map_err(|_| Error::ConnectionClosed)
    }
}

/// Controller end of an in-memory link
pub struct MemoryPeer {
    reports: ReportSender,
    from_host: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryPeer {
    pub fn reports(&self) -> ReportSender {
        self.reports.clone()
    }
    
    pub fn push(&self, data: &[u8]) -> Result<()> {
        self.reports.push(data)
    }
    
    pub fn push_report(&self, report: InputReport) -> Result<()> {
        self.reports.push_report(report)
    }
    
    /// Next output report written by the host, `None` once the host is gone
    pub async fn next_output(&mut self) -> Option<Bytes> {
        self.from_host.recv().await
    }
    
    pub fn try_next_output(&mut self) -> Option<Bytes> {
        self.from_host.try_recv().ok()
    }
}
