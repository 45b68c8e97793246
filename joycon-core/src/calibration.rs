//! IMU calibration model
//!
//! The controller stores per-axis offsets and gain coefficients in SPI flash.
//! A raw 16-bit sample is converted with `(raw - offset) * coeff`, where the
//! coefficient is derived from the stored value relative to a per-sensor
//! sentinel.
//!
//! # Flash layout
//!
//! ```text
//! 24 bytes = 12 x i16, stored low byte first
//!
//! group  0..3   accel offset x, y, z
//! group  3..6   accel coeff  x, y, z
//! group  6..9   gyro offset  x, y, z
//! group  9..12  gyro coeff   x, y, z
//! ```

use byteorder::{ByteOrder, LittleEndian};
use joycon_types::{ControllerColors, Vector3};

use crate::{
    constants::{flash, sentinels},
    error::{Error, Result},
};

/// Rebuild a signed 16-bit value from a stored byte pair
///
/// The pair is read as `(first, second)` and reconstructed as
/// `(second << 8) | first`. IMU samples in input reports use the same rule.
///
/// # Examples
///
/// ```
/// use joycon_core::calibration::i16_from_pair;
///
/// assert_eq!(i16_from_pair(0x3B, 0x34), 0x343B);
/// assert_eq!(i16_from_pair(0xFE, 0xFF), -2);
/// ```
#[inline]
pub fn i16_from_pair(first: u8, second: u8) -> i16 {
    LittleEndian::read_i16(&[first, second])
}

/// Apply an offset/coefficient pair to a raw sample
#[inline]
pub fn apply(raw: i16, offset: i16, coeff: f32) -> f32 {
    (i32::from(raw) - i32::from(offset)) as f32 * coeff
}

/// Derive a gain coefficient from its stored raw value
///
/// A raw value equal to the sentinel means unit gain. A zero raw value
/// (blank flash) is treated the same way instead of producing infinity.
#[inline]
pub fn coefficient(raw: i16, sentinel: i16) -> f32 {
    if raw == sentinel || raw == 0 {
        1.0
    } else {
        f32::from(sentinel) / f32::from(raw)
    }
}

/// Offsets and coefficients for the three axes of one sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisCalibration {
    pub offset: [i16; 3],
    pub coeff: [f32; 3],
}

impl AxisCalibration {
    /// Offsets of zero and unit gain
    pub const IDENTITY: Self = Self {
        offset: [0; 3],
        coeff: [1.0; 3],
    };
    
    /// Build from raw flash values using `sentinel` for coefficient derivation
    pub fn from_raw(offset: [i16; 3], raw_coeff: [i16; 3], sentinel: i16) -> Self {
        Self {
            offset,
            coeff: raw_coeff.map(|raw| coefficient(raw, sentinel)),
        }
    }
    
    /// Calibrate one axis (`0` = x, `1` = y, `2` = z)
    pub fn apply_axis(&self, axis: usize, raw: i16) -> f32 {
        apply(raw, self.offset[axis], self.coeff[axis])
    }
    
    pub fn apply(&self, raw: [i16; 3]) -> Vector3 {
        Vector3::new(
            self.apply_axis(0, raw[0]),
            self.apply_axis(1, raw[1]),
            self.apply_axis(2, raw[2]),
        )
    }
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Accelerometer and gyroscope calibration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuCalibration {
    pub accel: AxisCalibration,
    pub gyro: AxisCalibration,
}

impl ImuCalibration {
    /// Parse a 24-byte calibration block
    ///
    /// # Errors
    ///
    /// Returns [`Error::ReportTooShort`] if fewer than 24 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let size = usize::from(flash::IMU_CALIBRATION_SIZE);
        if bytes.len() < size {
            return Err(Error::ReportTooShort {
                expected: size,
                actual: bytes.len(),
            });
        }
        
        let mut values = [0i16; 12];
        for (group, value) in values.iter_mut().enumerate() {
            *value = i16_from_pair(bytes[group * 2], bytes[group * 2 + 1]);
        }
        
        let triple = |start: usize| [values[start], values[start + 1], values[start + 2]];
        
        Ok(Self {
            accel: AxisCalibration::from_raw(triple(0), triple(3), sentinels::ACCEL_COEFF),
            gyro: AxisCalibration::from_raw(triple(6), triple(9), sentinels::GYRO_COEFF),
        })
    }
}

/// Everything read from flash at connection time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Calibration {
    pub colors: ControllerColors,
    pub imu: ImuCalibration,
}

impl Calibration {
    /// Build from the 6-byte color block and the 24-byte IMU block
    pub fn from_flash(color_bytes: &[u8], imu_bytes: &[u8]) -> Result<Self> {
        let colors = ControllerColors::from_bytes(color_bytes).map_err(|_| Error::ReportTooShort {
            expected: usize::from(flash::COLOR_SIZE),
            actual: color_bytes.len(),
        })?;
        
        Ok(Self {
            colors,
            imu: ImuCalibration::from_bytes(imu_bytes)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Factory block of a left Joy-Con
    const FACTORY: [u8; 24] = [
        0xBE, 0xFF, 0x3E, 0x00, 0xF0, 0x01,
        0x00, 0x40, 0x00, 0x40, 0x00, 0x40,
        0xFE, 0xFF, 0xFE, 0xFF, 0x08, 0x00,
        0xE7, 0x3B, 0xE7, 0x3B, 0xE7, 0x3B,
    ];

    #[test]
    fn test_pair_byte_order() {
        assert_eq!(i16_from_pair(0x00, 0x40), 0x4000);
        assert_eq!(i16_from_pair(0x40, 0x00), 0x0040);
        assert_eq!(i16_from_pair(0xBE, 0xFF), -66);
    }

    #[test]
    fn test_sentinel_coefficient_is_unit() {
        assert_eq!(coefficient(sentinels::ACCEL_COEFF, sentinels::ACCEL_COEFF), 1.0);
        assert_eq!(coefficient(sentinels::GYRO_COEFF, sentinels::GYRO_COEFF), 1.0);
    }

    #[test]
    fn test_accel_half_raw_doubles_gain() {
        assert_eq!(coefficient(0x2000, sentinels::ACCEL_COEFF), 2.0);
    }

    #[test]
    fn test_zero_coefficient_falls_back_to_unit() {
        assert_eq!(coefficient(0, sentinels::GYRO_COEFF), 1.0);
    }

    #[test]
    fn test_apply() {
        assert_eq!(apply(100, -20, 0.5), 60.0);
        assert_eq!(apply(i16::MIN, i16::MAX, 1.0), -65535.0);
    }

    #[test]
    fn test_factory_block_grouping() {
        let cal = ImuCalibration::from_bytes(&FACTORY).unwrap();
        
        assert_eq!(cal.accel.offset, [-66, 62, 496]);
        assert_eq!(cal.accel.coeff, [1.0, 1.0, 1.0]);
        assert_eq!(cal.gyro.offset, [-2, -2, 8]);
        
        let expected = f32::from(sentinels::GYRO_COEFF) / f32::from(0x3BE7i16);
        assert_eq!(cal.gyro.coeff, [expected; 3]);
    }

    #[test]
    fn test_from_flash_accel_coeff() {
        let mut imu = FACTORY;
        // accel coeff x = 0x2000
        imu[6] = 0x00;
        imu[7] = 0x20;
        
        let cal = Calibration::from_flash(&[1, 2, 3, 4, 5, 6], &imu).unwrap();
        assert_eq!(cal.imu.accel.coeff[0], 2.0);
        assert_eq!(cal.colors.body.r, 1);
        assert_eq!(cal.colors.buttons.b, 6);
    }

    #[test]
    fn test_short_block_rejected() {
        assert!(ImuCalibration::from_bytes(&FACTORY[..20]).is_err());
        assert!(Calibration::from_flash(&[0; 3], &FACTORY).is_err());
    }

    #[test]
    fn test_axis_apply() {
        let axis = AxisCalibration::from_raw([10, 20, 30], [0x2000, 0x4000, 0x4000], sentinels::ACCEL_COEFF);
        assert_eq!(axis.apply([20, 20, 0]), Vector3::new(20.0, 0.0, -30.0));
    }
}
