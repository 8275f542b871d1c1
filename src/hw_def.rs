use crate::types::Error;

use crc::{Crc, CRC_8_NRSC_5};

#[cfg(feature = "defmt")]
use defmt::Format;

/// Poly 0x31, init 0xFF, MSB first, no final XOR
const CRC: Crc<u8> = Crc::<u8>::new(&CRC_8_NRSC_5);

/// Largest response the driver ever reads: temperature word, CRC, humidity word, CRC
pub const READ_BUFFER_LEN: usize = 6;

/// Delay after a single-shot command when clock stretching is enabled
pub(crate) const SINGLE_SHOT_CLOCK_STRETCHING_DELAY_MS: u32 = 1;
/// Measurement durations with clock stretching disabled (datasheet maximums rounded up)
pub(crate) const SINGLE_SHOT_HIGH_REPEATABILITY_DELAY_MS: u32 = 16;
pub(crate) const SINGLE_SHOT_MEDIUM_REPEATABILITY_DELAY_MS: u32 = 7;
pub(crate) const SINGLE_SHOT_LOW_REPEATABILITY_DELAY_MS: u32 = 5;
/// Minimum spacing between a command and the following read header
pub(crate) const COMMAND_SPACING_DELAY_MS: u32 = 1;
/// Datasheet soft reset time is 1.5 ms max
pub(crate) const SOFT_RESET_DELAY_MS: u32 = 2;

pub(crate) const STATUS_BIT_WRITE_CHECKSUM: u16 = 0;
pub(crate) const STATUS_BIT_COMMAND: u16 = 1;
pub(crate) const STATUS_BIT_SYSTEM_RESET: u16 = 4;
pub(crate) const STATUS_BIT_T_TRACKING_ALERT: u16 = 10;
pub(crate) const STATUS_BIT_RH_TRACKING_ALERT: u16 = 11;
pub(crate) const STATUS_BIT_HEATER: u16 = 13;
pub(crate) const STATUS_BIT_ALERT_PENDING: u16 = 15;

/// I²C address of the device, selected by the ADDR pin
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum I2cAddr {
    /// ADDR pin connected to logic low
    Addr44,
    /// ADDR pin connected to logic high
    Addr45,
}
impl I2cAddr {
    /// Get the 7-bit address as a u8
    pub fn as_u8(self) -> u8 {
        match self {
            I2cAddr::Addr44 => 0x44,
            I2cAddr::Addr45 => 0x45,
        }
    }
}
impl TryFrom<u8> for I2cAddr {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x44 => Ok(I2cAddr::Addr44),
            0x45 => Ok(I2cAddr::Addr45),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Measurement repeatability: longer measurements with lower noise at higher settings
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Repeatability {
    /// highest repeatability, longest measurement
    High,
    /// medium repeatability
    Medium,
    /// lowest repeatability, shortest measurement
    Low,
}
impl TryFrom<u8> for Repeatability {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Repeatability::High),
            1 => Ok(Repeatability::Medium),
            2 => Ok(Repeatability::Low),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Whether the device holds SCL low until a single-shot measurement is ready
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClockStretching {
    /// the read transaction waits for the measurement
    Enabled,
    /// the device NACKs the read header until the measurement is ready
    Disabled,
}
impl TryFrom<u8> for ClockStretching {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ClockStretching::Enabled),
            1 => Ok(ClockStretching::Disabled),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Measurements per second in periodic mode
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mps {
    /// one measurement every 2 seconds
    Mps0_5,
    /// 1 measurement per second
    Mps1,
    /// 2 measurements per second
    Mps2,
    /// 4 measurements per second
    Mps4,
    /// 10 measurements per second
    Mps10,
}
impl TryFrom<u8> for Mps {
    type Error = Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Mps::Mps0_5),
            1 => Ok(Mps::Mps1),
            2 => Ok(Mps::Mps2),
            3 => Ok(Mps::Mps4),
            4 => Ok(Mps::Mps10),
            _ => Err(Error::InvalidArgument),
        }
    }
}

/// Two-byte commands understood by the device, sent MSB first
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u16)]
pub enum Command {
    /// single shot, high repeatability, clock stretching
    SingleShotHighCs = 0x2C06,
    /// single shot, medium repeatability, clock stretching
    SingleShotMediumCs = 0x2C0D,
    /// single shot, low repeatability, clock stretching
    SingleShotLowCs = 0x2C10,
    /// single shot, high repeatability, no clock stretching
    SingleShotHigh = 0x2400,
    /// single shot, medium repeatability, no clock stretching
    SingleShotMedium = 0x240B,
    /// single shot, low repeatability, no clock stretching
    SingleShotLow = 0x2416,

    /// periodic 0.5 mps, high repeatability
    PeriodicHalfHigh = 0x2032,
    /// periodic 0.5 mps, medium repeatability
    PeriodicHalfMedium = 0x2024,
    /// periodic 0.5 mps, low repeatability
    PeriodicHalfLow = 0x202F,
    /// periodic 1 mps, high repeatability
    Periodic1High = 0x2130,
    /// periodic 1 mps, medium repeatability
    Periodic1Medium = 0x2126,
    /// periodic 1 mps, low repeatability
    Periodic1Low = 0x212D,
    /// periodic 2 mps, high repeatability
    Periodic2High = 0x2236,
    /// periodic 2 mps, medium repeatability
    Periodic2Medium = 0x2220,
    /// periodic 2 mps, low repeatability
    Periodic2Low = 0x222B,
    /// periodic 4 mps, high repeatability
    Periodic4High = 0x2334,
    /// periodic 4 mps, medium repeatability
    Periodic4Medium = 0x2322,
    /// periodic 4 mps, low repeatability
    Periodic4Low = 0x2329,
    /// periodic 10 mps, high repeatability
    Periodic10High = 0x2737,
    /// periodic 10 mps, medium repeatability
    Periodic10Medium = 0x2721,
    /// periodic 10 mps, low repeatability
    Periodic10Low = 0x272A,

    /// periodic mode with accelerated response time (4 mps)
    PeriodicArt = 0x2B32,
    /// fetch the latest periodic measurement
    FetchData = 0xE000,
    /// stop periodic mode
    Break = 0x3093,
    /// software reset
    SoftReset = 0x30A2,
    /// heater on
    HeaterEnable = 0x306D,
    /// heater off
    HeaterDisable = 0x3066,
    /// read out the status register
    StatusRead = 0xF32D,
    /// clear the status register alert flags
    StatusClear = 0x3041,
}
impl Command {
    /// Bytes as they go on the wire
    pub fn to_be_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

/// Single-shot measurement command for a repeatability and clock stretching setting
pub fn single_shot_command(repeatability: Repeatability, clock_stretching: ClockStretching) -> Command {
    match (clock_stretching, repeatability) {
        (ClockStretching::Enabled, Repeatability::High) => Command::SingleShotHighCs,
        (ClockStretching::Enabled, Repeatability::Medium) => Command::SingleShotMediumCs,
        (ClockStretching::Enabled, Repeatability::Low) => Command::SingleShotLowCs,
        (ClockStretching::Disabled, Repeatability::High) => Command::SingleShotHigh,
        (ClockStretching::Disabled, Repeatability::Medium) => Command::SingleShotMedium,
        (ClockStretching::Disabled, Repeatability::Low) => Command::SingleShotLow,
    }
}

/// Periodic measurement start command for a repeatability and rate
pub fn periodic_command(repeatability: Repeatability, mps: Mps) -> Command {
    match (mps, repeatability) {
        (Mps::Mps0_5, Repeatability::High) => Command::PeriodicHalfHigh,
        (Mps::Mps0_5, Repeatability::Medium) => Command::PeriodicHalfMedium,
        (Mps::Mps0_5, Repeatability::Low) => Command::PeriodicHalfLow,
        (Mps::Mps1, Repeatability::High) => Command::Periodic1High,
        (Mps::Mps1, Repeatability::Medium) => Command::Periodic1Medium,
        (Mps::Mps1, Repeatability::Low) => Command::Periodic1Low,
        (Mps::Mps2, Repeatability::High) => Command::Periodic2High,
        (Mps::Mps2, Repeatability::Medium) => Command::Periodic2Medium,
        (Mps::Mps2, Repeatability::Low) => Command::Periodic2Low,
        (Mps::Mps4, Repeatability::High) => Command::Periodic4High,
        (Mps::Mps4, Repeatability::Medium) => Command::Periodic4Medium,
        (Mps::Mps4, Repeatability::Low) => Command::Periodic4Low,
        (Mps::Mps10, Repeatability::High) => Command::Periodic10High,
        (Mps::Mps10, Repeatability::Medium) => Command::Periodic10Medium,
        (Mps::Mps10, Repeatability::Low) => Command::Periodic10Low,
    }
}

/// Time to wait between a single-shot command and reading its result
pub(crate) fn single_shot_delay_ms(repeatability: Repeatability, clock_stretching: ClockStretching) -> u32 {
    match (clock_stretching, repeatability) {
        (ClockStretching::Enabled, _) => SINGLE_SHOT_CLOCK_STRETCHING_DELAY_MS,
        (ClockStretching::Disabled, Repeatability::High) => SINGLE_SHOT_HIGH_REPEATABILITY_DELAY_MS,
        (ClockStretching::Disabled, Repeatability::Medium) => SINGLE_SHOT_MEDIUM_REPEATABILITY_DELAY_MS,
        (ClockStretching::Disabled, Repeatability::Low) => SINGLE_SHOT_LOW_REPEATABILITY_DELAY_MS,
    }
}

/// CRC-8 as computed by the device over each 2-byte word
pub fn crc8(data: &[u8]) -> u8 {
    CRC.checksum(data)
}

pub(crate) fn raw_temp_to_celsius(raw: u16) -> f32 {
    175.0 * raw as f32 / 65535.0 - 45.0
}

pub(crate) fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 1.8 + 32.0
}

pub(crate) fn raw_rel_humid_to_percent(raw: u16) -> f32 {
    100.0 * raw as f32 / 65535.0
}
