//! Decoded controller status
//!
//! These are plain value types produced by the report decoder in
//! `joycon-core`. They carry no lifecycle of their own.

use bitflags::bitflags;

bitflags! {
    /// Button state as laid out in bytes 3..=5 of a full-state report
    ///
    /// Bit `n` corresponds to byte `3 + n / 8`, bit `n % 8`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Buttons: u32 {
        const Y = 1 << 0;
        const X = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const RIGHT_SR = 1 << 4;
        const RIGHT_SL = 1 << 5;
        const R = 1 << 6;
        const ZR = 1 << 7;

        const MINUS = 1 << 8;
        const PLUS = 1 << 9;
        const RIGHT_STICK = 1 << 10;
        const LEFT_STICK = 1 << 11;
        const HOME = 1 << 12;
        const CAPTURE = 1 << 13;
        const CHARGING_GRIP = 1 << 15;

        const DOWN = 1 << 16;
        const UP = 1 << 17;
        const RIGHT = 1 << 18;
        const LEFT = 1 << 19;
        const LEFT_SR = 1 << 20;
        const LEFT_SL = 1 << 21;
        const L = 1 << 22;
        const ZL = 1 << 23;
    }
}

/// Battery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Battery {
    pub charging: bool,
    
    /// 0 (empty) ..= 4 (full), as reported by the controller
    pub level: u8,
}

/// Analog stick position
///
/// Raw positions are 12-bit; after baseline subtraction values are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stick {
    pub horizontal: i32,
    pub vertical: i32,
    pub pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One calibrated IMU sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    pub accel: Vector3,
    pub gyro: Vector3,
}

/// Fully decoded, point-in-time view of a controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Status {
    pub battery: Battery,
    pub buttons: Buttons,
    pub left_stick: Stick,
    pub right_stick: Stick,
    
    /// The three IMU samples carried by one report, oldest first
    pub imu: [ImuSample; 3],
}

impl Status {
    /// Accelerometer reading of the first sample
    pub fn accel(&self) -> Vector3 {
        self.imu[0].accel
    }

    /// Gyroscope reading of the first sample
    pub fn gyro(&self) -> Vector3 {
        self.imu[0].gyro
    }

    pub fn is_pressed(&self, buttons: Buttons) -> bool {
        self.buttons.contains(buttons)
    }
}
