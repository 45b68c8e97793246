//! Protocol constants

/// Default time to wait for a subcommand reply (milliseconds)
pub const DEFAULT_REPLY_TIMEOUT_MS: u64 = 1000;

/// Maximum resends of a subcommand whose reply timed out
pub const MAX_RETRIES: usize = 3;

/// Delay between the two open-handshake commands (milliseconds)
pub const HANDSHAKE_DELAY_MS: u64 = 20;

/// Upper bound on joining the background reader at shutdown (milliseconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 500;

/// Nominal period of full-state reports (milliseconds)
pub const INPUT_REPORT_PERIOD_MS: u64 = 15;

/// Packet counter modulus (4-bit counter)
pub const PACKET_COUNTER_MODULUS: u8 = 16;

/// Input report ids
pub mod input_ids {
    /// Subcommand reply
    pub const SUBCOMMAND_REPLY: u8 = 0x21;
    
    /// Standard full-state report
    pub const FULL_STATE: u8 = 0x30;
}

/// Output report ids
pub mod output_ids {
    /// Rumble + subcommand
    pub const SUBCOMMAND: u8 = 0x01;
    
    /// Rumble only
    pub const RUMBLE: u8 = 0x10;
}

/// Byte offsets inside input reports
pub mod offsets {
    /// Battery nibble
    pub const BATTERY: usize = 2;
    
    /// First of the three button bytes
    pub const BUTTONS: usize = 3;
    
    /// Left stick (3 bytes, two packed 12-bit values)
    pub const LEFT_STICK: usize = 6;
    
    /// Right stick (3 bytes, two packed 12-bit values)
    pub const RIGHT_STICK: usize = 9;
    
    /// First IMU sample
    pub const IMU: usize = 13;
    
    /// Distance between consecutive IMU samples
    pub const IMU_STRIDE: usize = 12;
    
    /// Number of IMU samples per full-state report
    pub const IMU_SAMPLES: usize = 3;
    
    /// Ack byte of a subcommand reply
    pub const REPLY_ACK: usize = 13;
    
    /// Echoed subcommand id of a subcommand reply
    pub const REPLY_SUBCOMMAND: usize = 14;
    
    /// First data byte of a subcommand reply
    pub const REPLY_DATA: usize = 15;
}

/// SPI flash layout
pub mod flash {
    /// Largest payload a single read can return
    pub const MAX_READ_SIZE: u8 = 0x1D;
    
    /// Body and button colors
    pub const COLOR_ADDRESS: u32 = 0x6050;
    pub const COLOR_SIZE: u8 = 6;
    
    /// Factory IMU calibration
    pub const FACTORY_IMU_ADDRESS: u32 = 0x6020;
    
    /// Marker that flags the presence of user IMU calibration
    pub const USER_IMU_MARKER_ADDRESS: u32 = 0x8026;
    pub const USER_IMU_MARKER: [u8; 2] = [0xB2, 0xA1];
    
    /// User IMU calibration
    pub const USER_IMU_ADDRESS: u32 = 0x8028;
    
    /// Size of an IMU calibration block
    pub const IMU_CALIBRATION_SIZE: u8 = 24;
    
    /// Ack byte of a successful SPI read reply
    pub const READ_ACK: u8 = 0x90;
}

/// Calibration coefficient sentinels (raw value meaning "unit gain")
pub mod sentinels {
    pub const ACCEL_COEFF: i16 = 0x4000;
    pub const GYRO_COEFF: i16 = 0x343B;
}

/// Input mode argument selecting standard full-state reports
pub const STANDARD_FULL_MODE: u8 = 0x30;
