//! Drive a simulated left Joy-Con
//!
//! Run with `RUST_LOG=debug` to see the protocol exchange.

use std::time::Duration;

use anyhow::Context;
use joycon::{Buttons, Device, DeviceConfig, DeviceIdentity, SimulatedController};
use joycon_core::ReportBuilder;
use joycon_transport::memory;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let (transport, peer) = memory::pair("left");
    let sim = SimulatedController::left_joycon().spawn(peer);
    
    let device = Device::with_transport(Box::new(transport), DeviceIdentity::left(None), DeviceConfig::default())
        .await
        .context("open sequence failed")?;
    
    if let Some(info) = device.info() {
        println!("Connected: {}", info);
    }
    
    device.register_observer(|state| {
        if let Some(status) = state.status() {
            if status.is_pressed(Buttons::A) {
                println!("A pressed, left stick at {:?}", status.left_stick);
            }
        }
    });
    
    device.set_player_lamp(1).await?;
    device.rumble_bump().await?;
    
    // controller at rest, then A pressed with the stick nudged right
    sim.push(ReportBuilder::full_state().left_stick(2048, 2048).battery(4, false).build())?;
    sleep(Duration::from_millis(20)).await;
    device.capture_baseline()?;
    
    sim.push(
        ReportBuilder::full_state()
            .left_stick(2300, 2048)
            .buttons(Buttons::A)
            .battery(4, false)
            .build(),
    )?;
    sleep(Duration::from_millis(20)).await;
    
    let status = device.status()?;
    println!("Battery level {}, charging: {}", status.battery.level, status.battery.charging);
    
    device.rumble_stop().await?;
    device.close().await?;
    
    Ok(())
}
