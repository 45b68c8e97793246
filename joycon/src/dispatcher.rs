//! Background report dispatcher
//!
//! One task owns every `receive()` on the transport and routes what it reads:
//! - `0x30` full-state reports replace the latest-report snapshot, then every
//!   registered observer runs, in registration order, on the reader task
//! - `0x21` subcommand replies go to the caller currently waiting for one
//! - anything else is dropped
//!
//! Observers run synchronously. A slow observer delays the next read, so keep
//! them short and hand heavy work to another task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use joycon_core::{decode_status, Calibration, InputReport, ReportId, RumbleData, ZeroOffset};
use joycon_transport::Transport;
use joycon_types::{ControllerInfo, DeviceIdentity, Status};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};

/// Callback run for every full-state report
///
/// Observers get the shared [`DeviceState`] rather than the [`Device`]
/// itself: they run on the reader task, which must never wait on a reply.
/// They can read the snapshot and decoded status, and queue rumble with
/// [`DeviceState::queue_rumble`]; subcommands have to go through the
/// `Device` on another task.
///
/// Registering another observer from inside an observer deadlocks.
///
/// [`Device`]: crate::Device
pub type Observer = Box<dyn Fn(&DeviceState) + Send + Sync>;

/// State shared between a [`Device`](crate::Device) and its reader task
pub struct DeviceState {
    identity: DeviceIdentity,
    latest: RwLock<Option<InputReport>>,
    calibration: RwLock<Calibration>,
    zero_offset: RwLock<ZeroOffset>,
    info: RwLock<Option<ControllerInfo>>,
    observers: RwLock<Vec<Observer>>,
    rumble_queue: mpsc::UnboundedSender<RumbleData>,
    connected: AtomicBool,
}

impl DeviceState {
    pub(crate) fn new(identity: DeviceIdentity, rumble_queue: mpsc::UnboundedSender<RumbleData>) -> Self {
        Self {
            identity,
            latest: RwLock::new(None),
            calibration: RwLock::new(Calibration::default()),
            zero_offset: RwLock::new(ZeroOffset::default()),
            info: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
            rumble_queue,
            connected: AtomicBool::new(true),
        }
    }
    
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
    
    /// Copy of the most recent full-state report
    pub fn latest_report(&self) -> Option<InputReport> {
        *self.latest.read()
    }
    
    /// Decode the latest report with the current calibration and baseline
    pub fn status(&self) -> Option<Status> {
        let report = self.latest_report()?;
        let calibration = self.calibration();
        let offset = self.zero_offset();
        Some(decode_status(&report, &calibration.imu, &offset))
    }
    
    /// Calibration in effect (unit gain until flash data is loaded)
    pub fn calibration(&self) -> Calibration {
        *self.calibration.read()
    }
    
    pub fn zero_offset(&self) -> ZeroOffset {
        *self.zero_offset.read()
    }
    
    /// Colors and calibration source, once the open sequence completed
    pub fn info(&self) -> Option<ControllerInfo> {
        self.info.read().clone()
    }
    
    /// False once the reader task has stopped
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
    
    /// Queue `rumble` for sending without waiting
    ///
    /// Safe to call from an observer. The report is framed and written by the
    /// device's writer task, in order with every other output report.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] once the device is closed.
    pub fn queue_rumble(&self, rumble: RumbleData) -> Result<()> {
        self.rumble_queue.send(rumble).map_err(|_| Error::Disconnected)
    }
    
    pub(crate) fn set_calibration(&self, calibration: Calibration) {
        *self.calibration.write() = calibration;
    }
    
    pub(crate) fn set_zero_offset(&self, offset: ZeroOffset) {
        *self.zero_offset.write() = offset;
    }
    
    pub(crate) fn set_info(&self, info: ControllerInfo) {
        *self.info.write() = Some(info);
    }
    
    pub(crate) fn add_observer(&self, observer: Observer) {
        self.observers.write().push(observer);
    }
    
    fn publish(&self, report: InputReport) {
        *self.latest.write() = Some(report);
        
        for observer in self.observers.read().iter() {
            observer(self);
        }
    }
}

/// What the reader hands a waiting caller
pub(crate) type Delivery = std::result::Result<InputReport, joycon_transport::Error>;

#[derive(Default)]
struct Mailbox {
    waiter: Option<oneshot::Sender<Delivery>>,
    closed: bool,
    
    /// Receive error that stopped the reader
    failure: Option<joycon_transport::Error>,
}

/// Mailbox for the one subcommand reply being waited on
#[derive(Default)]
pub(crate) struct ReplySlot {
    mailbox: Mutex<Mailbox>,
}

impl ReplySlot {
    /// Register as the waiter for the next reply
    ///
    /// Must be called before the request is written, so a fast reply can't
    /// arrive with nobody waiting. Once the reader has stopped, fails with
    /// the receive error that stopped it, or `Disconnected` after a clean stop.
    pub fn install(&self) -> Result<oneshot::Receiver<Delivery>> {
        let mut mailbox = self.mailbox.lock();
        if mailbox.closed {
            return Err(match &mailbox.failure {
                Some(failure) => Error::Transport(failure.replicate()),
                None => Error::Disconnected,
            });
        }
        let (tx, rx) = oneshot::channel();
        mailbox.waiter = Some(tx);
        Ok(rx)
    }
    
    /// Give up waiting
    pub fn cancel(&self) {
        self.mailbox.lock().waiter.take();
    }
    
    fn deliver(&self, report: InputReport) {
        match self.mailbox.lock().waiter.take() {
            Some(waiter) => {
                if waiter.send(Ok(report)).is_err() {
                    debug!("Reply waiter gave up before delivery");
                }
            }
            None => warn!("Dropping unsolicited subcommand reply: {:?}", report),
        }
    }
    
    /// Fail the current and all future waits
    ///
    /// With a `failure`, waiters get that transport error; otherwise the
    /// pending waiter is dropped and later ones get `Disconnected`.
    fn close(&self, failure: Option<joycon_transport::Error>) {
        let mut mailbox = self.mailbox.lock();
        mailbox.closed = true;
        
        if let Some(waiter) = mailbox.waiter.take() {
            if let Some(failure) = &failure {
                if waiter.send(Err(failure.replicate())).is_err() {
                    debug!("Reply waiter gave up before the failure");
                }
            }
        }
        mailbox.failure = failure;
    }
}

/// Handle to the running reader task
pub(crate) struct Dispatcher {
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl Dispatcher {
    pub fn spawn(
        transport: Arc<dyn Transport>,
        state: Arc<DeviceState>,
        replies: Arc<ReplySlot>,
    ) -> Self {
        let (stop, stopped) = watch::channel(false);
        let task = tokio::spawn(run(transport, state, replies, stopped));
        
        Self {
            stop,
            task: Some(task),
        }
    }
    
    /// Ask the reader to stop and wait up to `limit` for it
    pub async fn shutdown(&mut self, limit: Duration) {
        let Some(mut task) = self.task.take() else {
            return;
        };
        
        if self.stop.send(true).is_err() {
            trace!("Reader already exited");
        }
        
        match tokio::time::timeout(limit, &mut task).await {
            Ok(Ok(())) => debug!("Reader stopped"),
            Ok(Err(e)) => warn!("Reader task failed: {}", e),
            Err(_) => {
                warn!("Reader did not stop within {:?}, aborting", limit);
                task.abort();
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn run(
    transport: Arc<dyn Transport>,
    state: Arc<DeviceState>,
    replies: Arc<ReplySlot>,
    mut stopped: watch::Receiver<bool>,
) {
    debug!("Reader started on {}", transport.remote_addr());
    
    let failure = loop {
        let received = tokio::select! {
            _ = stopped.changed() => break None,
            received = transport.receive() => received,
        };
        
        match received {
            Ok(report) => route(report, &state, &replies),
            Err(e) => {
                error!("Receive failed, reader stopping: {}", e);
                break Some(e);
            }
        }
    };
    
    state.connected.store(false, Ordering::Release);
    replies.close(failure);
}

fn route(report: InputReport, state: &DeviceState, replies: &ReplySlot) {
    match report.id() {
        ReportId::FullState => state.publish(report),
        ReportId::SubcommandReply => replies.deliver(report),
        ReportId::Other(id) => trace!("Ignoring input report 0x{:02X}", id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use joycon_core::ReportBuilder;
    use pretty_assertions::assert_eq;

    fn state() -> DeviceState {
        let (queue, _) = mpsc::unbounded_channel();
        DeviceState::new(DeviceIdentity::left(None), queue)
    }

    #[test]
    fn test_route_full_state() {
        let state = state();
        let replies = ReplySlot::default();
        
        let report = ReportBuilder::full_state().timer(9).build();
        route(report, &state, &replies);
        assert_eq!(state.latest_report(), Some(report));
    }

    #[test]
    fn test_reply_goes_to_waiter_not_snapshot() {
        let state = state();
        let replies = ReplySlot::default();
        let mut waiter = replies.install().unwrap();
        
        let reply = ReportBuilder::reply(0x90, 0x10).build();
        route(reply, &state, &replies);
        
        assert_eq!(waiter.try_recv().unwrap().unwrap(), reply);
        assert_eq!(state.latest_report(), None);
    }

    #[test]
    fn test_other_ids_ignored() {
        let state = state();
        let replies = ReplySlot::default();
        
        route(ReportBuilder::with_id(0x3F).build(), &state, &replies);
        assert_eq!(state.latest_report(), None);
    }

    #[test]
    fn test_observers_run_in_order() {
        let state = state();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in 1..=3 {
            let seen = seen.clone();
            state.add_observer(Box::new(move |s: &DeviceState| {
                let timer = s.latest_report().map(|r| r.timer());
                seen.lock().push((tag, timer));
            }));
        }
        
        state.publish(ReportBuilder::full_state().timer(4).build());
        assert_eq!(*seen.lock(), vec![(1, Some(4)), (2, Some(4)), (3, Some(4))]);
    }

    #[test]
    fn test_closed_slot_rejects_waiters() {
        let replies = ReplySlot::default();
        let mut waiter = replies.install().unwrap();
        replies.close(None);
        
        assert!(waiter.try_recv().is_err());
        assert!(matches!(replies.install(), Err(Error::Disconnected)));
    }

    #[test]
    fn test_receive_failure_reaches_waiters() {
        let replies = ReplySlot::default();
        let mut waiter = replies.install().unwrap();
        replies.close(Some(joycon_transport::Error::ConnectionClosed));
        
        assert!(matches!(
            waiter.try_recv().unwrap(),
            Err(joycon_transport::Error::ConnectionClosed)
        ));
        assert!(matches!(
            replies.install(),
            Err(Error::Transport(joycon_transport::Error::ConnectionClosed))
        ));
    }

    #[test]
    fn test_queue_rumble_after_close() {
        let (queue, mut queued) = mpsc::unbounded_channel();
        let state = DeviceState::new(DeviceIdentity::left(None), queue);
        
        state.queue_rumble(RumbleData::BUMP).unwrap();
        assert_eq!(queued.try_recv().unwrap(), RumbleData::BUMP);
        
        drop(queued);
        assert!(matches!(state.queue_rumble(RumbleData::STOP), Err(Error::Disconnected)));
    }

    #[test]
    fn test_status_before_first_report() {
        assert!(state().status().is_none());
    }
}
