//! Full-state report decoding
//!
//! A single pure function, [`decode_status`], turns a report plus calibration
//! and baseline into a [`Status`]. The smaller field accessors are public so
//! callers can read one field without decoding everything.

use joycon_types::{Battery, Buttons, ImuSample, Status, Stick, Vector3};

use crate::{
    bitfield,
    calibration::{i16_from_pair, ImuCalibration},
    constants::offsets,
    error::{Error, Result},
    report::InputReport,
};

/// Button flag with its `(byte, bit)` position in the report
pub const BUTTON_LAYOUT: [(Buttons, usize, u8); 23] = [
    (Buttons::Y, 3, 0),
    (Buttons::X, 3, 1),
    (Buttons::B, 3, 2),
    (Buttons::A, 3, 3),
    (Buttons::RIGHT_SR, 3, 4),
    (Buttons::RIGHT_SL, 3, 5),
    (Buttons::R, 3, 6),
    (Buttons::ZR, 3, 7),
    (Buttons::MINUS, 4, 0),
    (Buttons::PLUS, 4, 1),
    (Buttons::RIGHT_STICK, 4, 2),
    (Buttons::LEFT_STICK, 4, 3),
    (Buttons::HOME, 4, 4),
    (Buttons::CAPTURE, 4, 5),
    (Buttons::CHARGING_GRIP, 4, 7),
    (Buttons::DOWN, 5, 0),
    (Buttons::UP, 5, 1),
    (Buttons::RIGHT, 5, 2),
    (Buttons::LEFT, 5, 3),
    (Buttons::LEFT_SR, 5, 4),
    (Buttons::LEFT_SL, 5, 5),
    (Buttons::L, 5, 6),
    (Buttons::ZL, 5, 7),
];

pub fn battery(report: &InputReport) -> Battery {
    let bytes = report.as_bytes();
    Battery {
        charging: bitfield::flag(bytes, offsets::BATTERY, 4),
        level: bitfield::extract(bytes, offsets::BATTERY, 5, 3),
    }
}

pub fn buttons(report: &InputReport) -> Buttons {
    let bytes = report.as_bytes();
    BUTTON_LAYOUT
        .iter()
        .filter(|(_, byte, bit)| bitfield::flag(bytes, *byte, *bit))
        .fold(Buttons::empty(), |acc, (button, _, _)| acc | *button)
}

/// Raw 12-bit `(horizontal, vertical)` of the stick packed at `base`
fn stick_raw(report: &InputReport, base: usize) -> (u16, u16) {
    let bytes = report.as_bytes();
    let horizontal = u16::from(bitfield::extract(bytes, base, 0, 8))
        | (u16::from(bitfield::extract(bytes, base + 1, 0, 4)) << 8);
    let vertical = u16::from(bitfield::extract(bytes, base + 1, 4, 4))
        | (u16::from(bitfield::extract(bytes, base + 2, 0, 8)) << 4);
    (horizontal, vertical)
}

pub fn left_stick_raw(report: &InputReport) -> (u16, u16) {
    stick_raw(report, offsets::LEFT_STICK)
}

pub fn right_stick_raw(report: &InputReport) -> (u16, u16) {
    stick_raw(report, offsets::RIGHT_STICK)
}

/// Raw IMU counts `[ax, ay, az, gx, gy, gz]` of sample `index` (0..3)
///
/// # Errors
///
/// Returns [`Error::SampleIndexOutOfRange`] for `index >= 3`.
pub fn imu_raw(report: &InputReport, index: usize) -> Result<[i16; 6]> {
    if index >= offsets::IMU_SAMPLES {
        return Err(Error::SampleIndexOutOfRange(index));
    }
    let bytes = report.as_bytes();
    let base = offsets::IMU + index * offsets::IMU_STRIDE;
    let mut raw = [0i16; 6];
    for (axis, value) in raw.iter_mut().enumerate() {
        let at = base + axis * 2;
        *value = i16_from_pair(bytes[at], bytes[at + 1]);
    }
    Ok(raw)
}

/// Calibrated IMU sample `index`, without baseline correction
pub fn imu_sample(report: &InputReport, index: usize, calibration: &ImuCalibration) -> Result<ImuSample> {
    let raw = imu_raw(report, index)?;
    Ok(ImuSample {
        accel: calibration.accel.apply([raw[0], raw[1], raw[2]]),
        gyro: calibration.gyro.apply([raw[3], raw[4], raw[5]]),
    })
}

/// Stick and gyro readings captured while the controller is at rest
///
/// Subtracted from every later decode so a stationary controller reports
/// zero. The default baseline subtracts nothing.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZeroOffset {
    pub left_stick: (i32, i32),
    pub right_stick: (i32, i32),
    pub gyro: Vector3,
}

impl ZeroOffset {
    /// Capture a baseline from `report` (gyro taken from the first sample)
    pub fn capture(report: &InputReport, calibration: &ImuCalibration) -> Self {
        let (lh, lv) = left_stick_raw(report);
        let (rh, rv) = right_stick_raw(report);
        let gyro = imu_raw(report, 0)
            .map(|raw| calibration.gyro.apply([raw[3], raw[4], raw[5]]))
            .unwrap_or_default();
        
        Self {
            left_stick: (i32::from(lh), i32::from(lv)),
            right_stick: (i32::from(rh), i32::from(rv)),
            gyro,
        }
    }
}

/// Decode a full-state report
///
/// # Examples
///
/// ```
/// use joycon_core::{decode_status, ImuCalibration, ReportBuilder, ZeroOffset};
///
/// let report = ReportBuilder::full_state().battery(4, true).build();
/// let status = decode_status(&report, &ImuCalibration::default(), &ZeroOffset::default());
/// assert_eq!(status.battery.level, 4);
/// assert!(status.battery.charging);
/// ```
pub fn decode_status(report: &InputReport, calibration: &ImuCalibration, offset: &ZeroOffset) -> Status {
    let buttons = buttons(report);
    let (lh, lv) = left_stick_raw(report);
    let (rh, rv) = right_stick_raw(report);
    
    let mut imu = [ImuSample::default(); 3];
    for (index, sample) in imu.iter_mut().enumerate() {
        if let Ok(decoded) = imu_sample(report, index, calibration) {
            *sample = ImuSample {
                accel: decoded.accel,
                gyro: Vector3::new(
                    decoded.gyro.x - offset.gyro.x,
                    decoded.gyro.y - offset.gyro.y,
                    decoded.gyro.z - offset.gyro.z,
                ),
            };
        }
    }
    
    Status {
        battery: battery(report),
        buttons,
        left_stick: Stick {
            horizontal: i32::from(lh) - offset.left_stick.0,
            vertical: i32::from(lv) - offset.left_stick.1,
            pressed: buttons.contains(Buttons::LEFT_STICK),
        },
        right_stick: Stick {
            horizontal: i32::from(rh) - offset.right_stick.0,
            vertical: i32::from(rv) - offset.right_stick.1,
            pressed: buttons.contains(Buttons::RIGHT_STICK),
        },
        imu,
    }
}
