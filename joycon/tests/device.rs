//! End-to-end tests against the simulated controller

use std::sync::Arc;
use std::time::Duration;

use joycon::{Buttons, Device, DeviceConfig, DeviceIdentity, Error, RumbleData, SimulatedController, Subcommand};
use joycon_core::{constants::flash, Command, OutputKind, ReportBuilder};
use joycon_transport::{memory, SimHandle};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::time::{sleep, timeout};

const USER_IMU: [u8; 24] = [
    0x10, 0x00, 0x20, 0x00, 0x30, 0x00,
    0x00, 0x20, 0x00, 0x40, 0x00, 0x10,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x3B, 0x34, 0x3B, 0x34, 0x3B, 0x34,
];

async fn connect(sim: SimulatedController, config: DeviceConfig) -> joycon::Result<(Device, SimHandle)> {
    let (transport, peer) = memory::pair("left");
    let handle = sim.spawn(peer);
    let device = Device::with_transport(Box::new(transport), DeviceIdentity::left(None), config).await?;
    Ok((device, handle))
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(2), async {
        while !condition() {
            sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn fast() -> DeviceConfig {
    DeviceConfig::default()
        .with_reply_timeout(Duration::from_millis(50))
        .with_max_retries(2)
}

#[tokio::test]
async fn test_open_sequence() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    let commands: Vec<_> = sim.decoded_outputs().into_iter().map(|o| o.command.unwrap()).collect();
    assert_eq!(
        commands,
        vec![
            Command::EnableImu(true),
            Command::SetInputMode(0x30),
            Command::SpiFlashRead { address: 0x6050, size: 6 },
            Command::SpiFlashRead { address: 0x8026, size: 2 },
            Command::SpiFlashRead { address: 0x6020, size: 24 },
        ]
    );
    
    let info = device.info().unwrap();
    assert_eq!(info.colors.body.to_string(), "#0AB9E6");
    assert!(!info.user_calibration);
    
    let calibration = device.calibration();
    assert_eq!(calibration.imu.accel.offset, [-66, 62, 496]);
    assert_eq!(calibration.imu.accel.coeff, [1.0, 1.0, 1.0]);
    assert_eq!(calibration.imu.gyro.offset, [-2, -2, 8]);
    
    assert!(device.is_connected());
    device.close().await.unwrap();
    assert!(!device.is_connected());
}

#[tokio::test]
async fn test_user_calibration_preferred() {
    let sim = SimulatedController::left_joycon().with_user_calibration(USER_IMU);
    let (device, sim_handle) = connect(sim, DeviceConfig::default()).await.unwrap();
    
    let last = sim_handle.decoded_outputs().pop().unwrap();
    assert_eq!(last.command, Some(Command::SpiFlashRead { address: 0x8028, size: 24 }));
    
    assert!(device.info().unwrap().user_calibration);
    let calibration = device.calibration();
    assert_eq!(calibration.imu.accel.offset, [0x10, 0x20, 0x30]);
    assert_eq!(calibration.imu.accel.coeff, [2.0, 1.0, 4.0]);
    assert_eq!(calibration.imu.gyro.coeff, [1.0, 1.0, 1.0]);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_counter_wraps_across_report_kinds() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    // five reports went out while opening
    for _ in 0..6 {
        device.rumble_simple().await.unwrap();
    }
    for player in 1..=6 {
        device.set_player_lamp(player).await.unwrap();
    }
    
    wait_until(|| sim.outputs().len() == 17).await;
    let counters: Vec<u8> = sim.decoded_outputs().iter().map(|o| o.counter).collect();
    let expected: Vec<u8> = (0..17).map(|i| i % 16).collect();
    assert_eq!(counters, expected);
    assert_eq!(device.next_counter(), 1);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_player_lamp_frames() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    device.set_player_lamp(4).await.unwrap();
    device.set_player_lamp_flashing(4).await.unwrap();
    device.set_player_lamp_on(0x05).await.unwrap();
    
    let args: Vec<Vec<u8>> = sim
        .outputs()
        .iter()
        .skip(5)
        .map(|frame| frame[10..].to_vec())
        .collect();
    assert_eq!(args, vec![vec![0x30, 0x0F], vec![0x30, 0xF0], vec![0x30, 0x05]]);
    
    let before = sim.outputs().len();
    let err = device.set_player_lamp(9).await.unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(sim.outputs().len(), before);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_rumble_repeated_in_later_reports() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    assert_eq!(sim.decoded_outputs()[0].rumble, RumbleData::STOP);
    
    device.rumble_bump().await.unwrap();
    device.enable_vibration(true).await.unwrap();
    
    let outputs = sim.decoded_outputs();
    let rumble = &outputs[outputs.len() - 2];
    let vibration = &outputs[outputs.len() - 1];
    assert_eq!(rumble.kind, OutputKind::Rumble);
    assert_eq!(rumble.rumble, RumbleData::BUMP);
    assert_eq!(vibration.command, Some(Command::EnableVibration(true)));
    assert_eq!(vibration.rumble, RumbleData::BUMP);
    
    device.rumble_stop().await.unwrap();
    assert_eq!(device.rumble(), RumbleData::STOP);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_spi_read_payload() {
    let (device, _sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    let colors = device.spi_flash_read(flash::COLOR_ADDRESS, 6).await.unwrap();
    assert_eq!(colors.as_ref(), &[0x0A, 0xB9, 0xE6, 0x00, 0x1E, 0x1E]);
    
    let blank = device.spi_flash_read(0x5000, 0x1D).await.unwrap();
    assert_eq!(blank.as_ref(), &[0xFF; 0x1D]);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_echo_mismatch_fails_open() {
    let sim = SimulatedController::left_joycon().corrupt_spi_echo();
    let err = connect(sim, DeviceConfig::default()).await.err().unwrap();
    
    assert!(matches!(err, Error::Core(joycon_core::Error::EchoMismatch { .. })));
    assert!(err.requires_handshake());
}

#[tokio::test]
async fn test_mismatched_reply_is_desync() {
    let sim = SimulatedController::left_joycon().reply_as(Subcommand::EnableVibration);
    let err = connect(sim, DeviceConfig::default()).await.err().unwrap();
    
    assert!(matches!(
        err,
        Error::Core(joycon_core::Error::SubcommandMismatch { expected: 0x40, actual: 0x48 })
    ));
}

#[tokio::test]
async fn test_nack_is_desync() {
    let sim = SimulatedController::left_joycon().nack(Subcommand::SetPlayerLights);
    let (device, _sim) = connect(sim, DeviceConfig::default()).await.unwrap();
    
    let err = device.set_player_lamp(1).await.unwrap_err();
    assert!(err.requires_handshake());
    
    // still usable once the handshake is redone
    device.handshake().await.unwrap();
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_timeout_after_retries() {
    let sim = SimulatedController::left_joycon().ignore(Subcommand::EnableVibration);
    let (device, sim) = connect(sim, fast()).await.unwrap();
    
    let err = device.enable_vibration(true).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Timeout { subcommand: Subcommand::EnableVibration, attempts: 3 }
    ));
    assert!(err.is_recoverable());
    
    let sent = sim
        .decoded_outputs()
        .iter()
        .filter(|o| o.command == Some(Command::EnableVibration(true)))
        .count();
    assert_eq!(sent, 3);
    
    // the engine is free again
    device.set_player_lamp(2).await.unwrap();
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_replies_never_reach_snapshot() {
    let sim = SimulatedController::left_joycon().interleave_state_reports();
    let (device, sim) = connect(sim, DeviceConfig::default()).await.unwrap();
    
    // one state report preceded every reply of the open sequence
    let latest = device.latest_report().unwrap();
    assert!(latest.is_full_state());
    assert_eq!(latest.timer(), 4);
    
    // unsolicited reply and unknown id, then a marker state
    sim.push(ReportBuilder::reply(0x80, 0x30).timer(0x77).build()).unwrap();
    sim.push(ReportBuilder::with_id(0x3F).timer(0x78).build()).unwrap();
    sim.push(ReportBuilder::full_state().timer(0x79).build()).unwrap();
    wait_until(|| device.latest_report().map(|r| r.timer()) == Some(0x79)).await;
    
    device.spi_flash_read(0x6050, 6).await.unwrap();
    
    let latest = device.latest_report().unwrap();
    assert!(latest.is_full_state());
    assert_eq!(latest.timer(), 5);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_baseline_zeroes_rest_position() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    assert!(matches!(device.capture_baseline(), Err(Error::NoReport)));
    
    let rest = ReportBuilder::full_state()
        .timer(1)
        .left_stick(2048, 2048)
        .right_stick(2048, 2048)
        .imu_raw([[0, 0, 4096, 12, -7, 3]; 3])
        .build();
    sim.push(rest).unwrap();
    wait_until(|| device.latest_report().is_some()).await;
    
    device.capture_baseline().unwrap();
    let status = device.status().unwrap();
    assert_eq!((status.left_stick.horizontal, status.left_stick.vertical), (0, 0));
    assert_eq!((status.right_stick.horizontal, status.right_stick.vertical), (0, 0));
    for sample in status.imu {
        assert_eq!((sample.gyro.x, sample.gyro.y, sample.gyro.z), (0.0, 0.0, 0.0));
    }
    
    device.reset_baseline();
    assert_eq!(device.status().unwrap().left_stick.horizontal, 2048);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_observers_see_each_state() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    let seen = Arc::new(Mutex::new(Vec::new()));
    for tag in ["first", "second"] {
        let seen = seen.clone();
        device.register_observer(move |state| {
            let pressed = state.status().map(|s| s.is_pressed(Buttons::A)).unwrap_or(false);
            seen.lock().push((tag, pressed));
        });
    }
    
    sim.push(ReportBuilder::full_state().buttons(Buttons::A).build()).unwrap();
    sim.push(ReportBuilder::full_state().build()).unwrap();
    wait_until(|| seen.lock().len() == 4).await;
    
    assert_eq!(
        *seen.lock(),
        vec![("first", true), ("second", true), ("first", false), ("second", false)]
    );
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_observer_queues_rumble_on_press() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    device.register_observer(|state| {
        if state.status().is_some_and(|s| s.is_pressed(Buttons::A)) {
            state.queue_rumble(RumbleData::BUMP).unwrap();
        }
    });
    
    sim.push(ReportBuilder::full_state().build()).unwrap();
    sim.push(ReportBuilder::full_state().buttons(Buttons::A).build()).unwrap();
    wait_until(|| sim.outputs().len() == 6).await;
    
    let queued = sim.decoded_outputs().pop().unwrap();
    assert_eq!(queued.kind, OutputKind::Rumble);
    assert_eq!(queued.rumble, RumbleData::BUMP);
    assert_eq!(queued.counter, 5);
    
    // the queued pattern becomes the device's rumble state
    device.set_player_lamp(1).await.unwrap();
    assert_eq!(sim.decoded_outputs().pop().unwrap().rumble, RumbleData::BUMP);
    
    device.close().await.unwrap();
}

#[tokio::test]
async fn test_shared_device_closes_from_any_clone() {
    let (device, _sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    let device = Arc::new(device);
    
    let worker = {
        let device = device.clone();
        tokio::spawn(async move { device.set_player_lamp(3).await })
    };
    worker.await.unwrap().unwrap();
    
    device.close().await.unwrap();
    assert!(!device.is_connected());
    assert!(matches!(device.rumble_bump().await, Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_disconnect_and_close() {
    let (device, sim) = connect(SimulatedController::left_joycon(), DeviceConfig::default())
        .await
        .unwrap();
    
    device.disconnect_device().await.unwrap();
    wait_until(|| sim.outputs().len() == 6).await;
    assert_eq!(&sim.outputs()[5][10..], &[0x06, 0x00]);
    
    let state = device.state();
    device.close().await.unwrap();
    device.close().await.unwrap();
    
    assert!(!state.is_connected());
    assert!(matches!(device.enable_vibration(false).await, Err(Error::Disconnected)));
}
