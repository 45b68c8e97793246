//! High-level device interface

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};

use joycon_core::{
    constants::{flash, STANDARD_FULL_MODE},
    Calibration, Command, ImuCalibrationSource, InputReport, OutputReport, RumbleData, Session,
    SpiRead, SubcommandReply, ZeroOffset,
};
use joycon_transport::{Connector, Transport};
use joycon_types::{ControllerInfo, DeviceIdentity, Status};

use crate::config::DeviceConfig;
use crate::dispatcher::{Dispatcher, DeviceState, Observer, ReplySlot};
use crate::error::{Error, Result};

/// An open Joy-Con
///
/// Opening runs the handshake (IMU on, full-state mode) and loads colors and
/// IMU calibration from SPI flash. From then on a background reader keeps
/// the latest full-state report available through [`status`](Self::status)
/// and feeds registered observers.
///
/// Every method takes `&self`; subcommand exchanges are serialized
/// internally, so a `Device` can be shared behind an `Arc` and closed from
/// any clone. Dropping without [`close`](Self::close) stops the background
/// tasks but leaves the transport open.
///
/// # Examples
///
/// ```no_run
/// use joycon::{Device, DeviceConfig, DeviceIdentity};
/// # async fn run(connector: &dyn joycon::Connector) -> joycon::Result<()> {
/// let device = Device::open(connector, DeviceIdentity::left(None), DeviceConfig::default()).await?;
///
/// device.set_player_lamp(1).await?;
/// device.rumble_bump().await?;
///
/// if let Ok(status) = device.status() {
///     println!("battery level {}", status.battery.level);
/// }
///
/// device.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Device {
    transport: Arc<dyn Transport>,
    session: Session,
    config: DeviceConfig,
    state: Arc<DeviceState>,
    replies: Arc<ReplySlot>,
    dispatcher: parking_lot::Mutex<Option<Dispatcher>>,
    
    /// Sends rumble queued through [`DeviceState::queue_rumble`]
    writer: parking_lot::Mutex<Option<JoinHandle<()>>>,
    
    /// Held for a whole request/reply exchange
    exchange: Mutex<()>,
    
    /// Held while framing and writing one report, so counters hit the wire in order
    write: Arc<Mutex<()>>,
    
    closed: AtomicBool,
}

impl Device {
    /// Open the controller `identity` through `connector`
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The connector can't open the device
    /// - A handshake command or calibration read fails or times out
    pub async fn open(
        connector: &dyn Connector,
        identity: DeviceIdentity,
        config: DeviceConfig,
    ) -> Result<Self> {
        info!("Opening {}...", identity);
        let transport = connector.open(&identity).await?;
        Self::with_transport(transport, identity, config).await
    }
    
    /// Run the open sequence over an already opened transport
    pub async fn with_transport(
        transport: Box<dyn Transport>,
        identity: DeviceIdentity,
        config: DeviceConfig,
    ) -> Result<Self> {
        let device = Self::attach(transport, identity, config);
        
        if let Err(e) = device.initialize().await {
            warn!("Open sequence failed: {}", e);
            if let Err(close_err) = device.close().await {
                warn!("Failed to release transport: {}", close_err);
            }
            return Err(e);
        }
        
        info!("Connected to {}", device.state.identity());
        Ok(device)
    }
    
    fn attach(transport: Box<dyn Transport>, identity: DeviceIdentity, config: DeviceConfig) -> Self {
        let transport: Arc<dyn Transport> = Arc::from(transport);
        let session = Session::new();
        let write = Arc::new(Mutex::new(()));
        let (rumble_queue, queued) = mpsc::unbounded_channel();
        
        let state = Arc::new(DeviceState::new(identity, rumble_queue));
        let replies = Arc::new(ReplySlot::default());
        let dispatcher = Dispatcher::spawn(transport.clone(), state.clone(), replies.clone());
        let writer = spawn_writer(transport.clone(), session.clone(), write.clone(), queued);
        
        Self {
            transport,
            session,
            config,
            state,
            replies,
            dispatcher: parking_lot::Mutex::new(Some(dispatcher)),
            writer: parking_lot::Mutex::new(Some(writer)),
            exchange: Mutex::new(()),
            write,
            closed: AtomicBool::new(false),
        }
    }
    
    async fn initialize(&self) -> Result<()> {
        self.handshake().await?;
        self.load_calibration().await?;
        Ok(())
    }
    
    /// Enable the IMU and switch to full-state reports
    ///
    /// Also the recovery step after an error for which
    /// [`Error::requires_handshake`] holds.
    pub async fn handshake(&self) -> Result<()> {
        debug!("Running open handshake...");
        
        self.command(Command::EnableImu(true)).await?;
        sleep(self.config.handshake_delay).await;
        self.command(Command::SetInputMode(STANDARD_FULL_MODE)).await?;
        
        Ok(())
    }
    
    /// Read colors and IMU calibration from flash and start using them
    pub async fn load_calibration(&self) -> Result<Calibration> {
        let colors = self.spi_flash_read(flash::COLOR_ADDRESS, flash::COLOR_SIZE).await?;
        
        let marker_size = flash::USER_IMU_MARKER.len() as u8;
        let marker = self.spi_flash_read(flash::USER_IMU_MARKER_ADDRESS, marker_size).await?;
        let source = ImuCalibrationSource::from_marker(&marker);
        
        let read = source.read();
        let imu = self.spi_flash_read(read.address(), read.size()).await?;
        
        let calibration = Calibration::from_flash(&colors, &imu)?;
        self.state.set_calibration(calibration);
        self.state.set_info(ControllerInfo::new(
            self.state.identity().clone(),
            calibration.colors,
            source == ImuCalibrationSource::User,
        ));
        
        debug!(?source, "Calibration loaded: {:?}", calibration.imu);
        Ok(calibration)
    }
    
    /// Send a subcommand and wait for its acknowledged reply
    ///
    /// The wait is bounded by [`DeviceConfig::reply_timeout`]; on timeout
    /// the request is resent up to [`DeviceConfig::max_retries`] times.
    /// Full-state reports arriving meanwhile keep flowing to the snapshot.
    ///
    /// [`Command::Disconnect`] never gets a reply; use
    /// [`disconnect_device`](Self::disconnect_device).
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] once every attempt went unanswered
    /// - [`Error::Core`] if the reply is for another subcommand or not acked
    /// - [`Error::Transport`] if writing failed, or if reading failed while
    ///   waiting (and on every later call)
    /// - [`Error::Disconnected`] once the device is closed
    pub async fn send_subcommand(&self, command: Command) -> Result<SubcommandReply> {
        let _exchange = self.exchange.lock().await;
        let subcommand = command.subcommand();
        let mut attempts = 0;
        
        loop {
            attempts += 1;
            
            let waiter = self.replies.install()?;
            if let Err(e) = self.transmit(|session| session.frame(command)).await {
                self.replies.cancel();
                return Err(e);
            }
            
            match timeout(self.config.reply_timeout, waiter).await {
                Ok(Ok(Ok(report))) => {
                    let reply = report.reply()?;
                    reply.validate(subcommand)?;
                    trace!(%command, attempts, "Reply received");
                    return Ok(reply);
                }
                Ok(Ok(Err(e))) => return Err(Error::Transport(e)),
                Ok(Err(_)) => return Err(Error::Disconnected),
                Err(_) => {
                    self.replies.cancel();
                    if attempts > self.config.max_retries {
                        warn!("{} unanswered after {} attempts", subcommand, attempts);
                        return Err(Error::Timeout { subcommand, attempts });
                    }
                    warn!("No reply to {} (attempt {}), resending", subcommand, attempts);
                }
            }
        }
    }
    
    /// Write a subcommand without waiting for a reply
    pub async fn send_command(&self, command: Command) -> Result<()> {
        self.transmit(|session| session.frame(command)).await?;
        Ok(())
    }
    
    /// Read `size` bytes (at most `0x1D`) of SPI flash at `address`
    ///
    /// # Errors
    ///
    /// Besides the [`send_subcommand`](Self::send_subcommand) errors, fails
    /// without sending anything if `size` is too large, and with a protocol
    /// desync if the echoed address or size differ from the request.
    pub async fn spi_flash_read(&self, address: u32, size: u8) -> Result<Bytes> {
        let read = SpiRead::new(address, size)?;
        let reply = self.send_subcommand(read.command()).await?;
        Ok(read.parse_reply(&reply)?)
    }
    
    /// Light the player lamps in the low nibble of `pattern`
    pub async fn set_player_lamp_on(&self, pattern: u8) -> Result<()> {
        self.command(Command::player_lights_on(pattern)).await
    }
    
    /// Show player number `player` (1-8) with steady lamps
    pub async fn set_player_lamp(&self, player: u8) -> Result<()> {
        self.command(Command::player(player)?).await
    }
    
    /// Show player number `player` (1-8) with flashing lamps
    pub async fn set_player_lamp_flashing(&self, player: u8) -> Result<()> {
        self.command(Command::player_flashing(player)?).await
    }
    
    pub async fn enable_vibration(&self, enabled: bool) -> Result<()> {
        self.command(Command::EnableVibration(enabled)).await
    }
    
    pub async fn enable_imu(&self, enabled: bool) -> Result<()> {
        self.command(Command::EnableImu(enabled)).await
    }
    
    /// Play `rumble`; it is repeated in every later output report
    pub async fn send_rumble(&self, rumble: RumbleData) -> Result<()> {
        self.transmit(|session| session.frame_rumble(rumble)).await?;
        Ok(())
    }
    
    pub async fn rumble_bump(&self) -> Result<()> {
        self.send_rumble(RumbleData::BUMP).await
    }
    
    pub async fn rumble_simple(&self) -> Result<()> {
        self.send_rumble(RumbleData::SIMPLE).await
    }
    
    pub async fn rumble_stop(&self) -> Result<()> {
        self.send_rumble(RumbleData::STOP).await
    }
    
    /// Tell the controller to drop its link (no reply is sent)
    pub async fn disconnect_device(&self) -> Result<()> {
        info!("Requesting disconnect of {}", self.state.identity());
        self.send_command(Command::Disconnect).await
    }
    
    /// Most recent full-state report
    pub fn latest_report(&self) -> Option<InputReport> {
        self.state.latest_report()
    }
    
    /// Decode the most recent full-state report
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoReport`] before the first full-state report.
    pub fn status(&self) -> Result<Status> {
        self.state.status().ok_or(Error::NoReport)
    }
    
    /// Use the latest report as the rest position for sticks and gyro
    pub fn capture_baseline(&self) -> Result<ZeroOffset> {
        let report = self.latest_report().ok_or(Error::NoReport)?;
        let offset = ZeroOffset::capture(&report, &self.state.calibration().imu);
        self.state.set_zero_offset(offset);
        debug!("Baseline captured: {:?}", offset);
        Ok(offset)
    }
    
    pub fn reset_baseline(&self) {
        self.state.set_zero_offset(ZeroOffset::default());
    }
    
    pub fn zero_offset(&self) -> ZeroOffset {
        self.state.zero_offset()
    }
    
    /// Run `observer` on the reader task after every full-state report
    ///
    /// See [`Observer`] for what an observer may do.
    pub fn register_observer<F>(&self, observer: F)
    where
        F: Fn(&DeviceState) + Send + Sync + 'static,
    {
        let observer: Observer = Box::new(observer);
        self.state.add_observer(observer);
    }
    
    pub fn identity(&self) -> &DeviceIdentity {
        self.state.identity()
    }
    
    pub fn info(&self) -> Option<ControllerInfo> {
        self.state.info()
    }
    
    pub fn calibration(&self) -> Calibration {
        self.state.calibration()
    }
    
    /// Shared state, readable after the device is gone
    pub fn state(&self) -> Arc<DeviceState> {
        self.state.clone()
    }
    
    /// Packet counter the next output report will carry
    pub fn next_counter(&self) -> u8 {
        self.session.peek_counter()
    }
    
    /// Last rumble pattern sent
    pub fn rumble(&self) -> RumbleData {
        self.session.rumble()
    }
    
    /// Check if connected
    pub fn is_connected(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
            && self.state.is_connected()
            && self.transport.is_connected()
    }
    
    /// Stop the background tasks and release the transport
    ///
    /// The reader gets [`DeviceConfig::shutdown_timeout`] to finish its
    /// current observer calls before it is aborted. Queued rumble not yet
    /// written is discarded.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        
        info!("Closing {}...", self.transport.remote_addr());
        
        let dispatcher = self.dispatcher.lock().take();
        if let Some(mut dispatcher) = dispatcher {
            dispatcher.shutdown(self.config.shutdown_timeout).await;
        }
        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            writer.abort();
            if let Err(e) = writer.await {
                if !e.is_cancelled() {
                    warn!("Writer task failed: {}", e);
                }
            }
        }
        self.transport.close().await?;
        
        info!("Closed");
        Ok(())
    }
    
    // Helper methods
    
    /// Send a command, waiting for its ack when so configured
    async fn command(&self, command: Command) -> Result<()> {
        if self.config.confirm_commands && command.expects_reply() {
            self.send_subcommand(command).await?;
            Ok(())
        } else {
            self.send_command(command).await
        }
    }
    
    async fn transmit<F>(&self, frame: F) -> Result<OutputReport>
    where
        F: FnOnce(&Session) -> OutputReport,
    {
        let _write = self.write.lock().await;
        let report = frame(&self.session);
        
        trace!("Sending: {:?}", report);
        self.transport.send(&report.encode()).await?;
        
        Ok(report)
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if !self.closed.load(Ordering::Acquire) {
            warn!("Device {} dropped without close()", self.state.identity());
        }
        if let Some(writer) = self.writer.get_mut().take() {
            writer.abort();
        }
    }
}

fn spawn_writer(
    transport: Arc<dyn Transport>,
    session: Session,
    write: Arc<Mutex<()>>,
    mut queued: mpsc::UnboundedReceiver<RumbleData>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(rumble) = queued.recv().await {
            let _write = write.lock().await;
            let report = session.frame_rumble(rumble);
            
            trace!("Sending queued: {:?}", report);
            if let Err(e) = transport.send(&report.encode()).await {
                warn!("Queued rumble not sent: {}", e);
            }
        }
    })
}
