use crate::engine::Engine;
use crate::hw_def::*;

use core::fmt;
use core::ops::BitOr;

#[cfg(feature="defmt")]
use defmt::Format;

/// SHT3x device driver driven by caller-supplied bus and timer primitives
#[derive(Debug)]
pub struct Sht3x<W, R, T, U = ()> {
    pub(crate) i2c_write: W,
    pub(crate) i2c_read: R,
    pub(crate) start_timer: T,
    pub(crate) engine: Engine,
    pub(crate) callback: Option<SequenceCallback<U>>,
}

/// Everything needed to create a driver instance
#[derive(Debug)]
pub struct Config<W, R, T> {
    /// starts an I²C write transaction
    pub i2c_write: W,
    /// starts an I²C read transaction
    pub i2c_read: R,
    /// starts a one-shot millisecond timer
    pub start_timer: T,
    /// 0x44 or 0x45, depending on the ADDR pin
    pub i2c_addr: u8,
}

/// All possible errors in this crate
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Error {
    /// Something went wrong inside the driver itself
    Driver,
    /// Invalid input data provided
    InvalidArgument,
    /// The instance memory hook did not provide memory
    OutOfMemory,
    /// I²C communication error
    Io,
    /// The device NACKed its address because no measurement is ready yet
    NoData,
    /// Failure of a checksum from the device was detected
    CrcMismatch,
    /// Another sequence is still in progress on this instance
    Busy,
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Driver => write!(f, "internal driver error"),
            Error::InvalidArgument => write!(f, "invalid argument"),
            Error::OutOfMemory => write!(f, "no instance memory"),
            Error::Io => write!(f, "I2C transaction failed"),
            Error::NoData => write!(f, "no measurement data available"),
            Error::CrcMismatch => write!(f, "checksum mismatch"),
            Error::Busy => write!(f, "another sequence is in progress"),
        }
    }
}
impl core::error::Error for Error {}

/// Outcome of one I²C transaction, reported by the transport
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum I2cResultCode {
    /// transaction completed
    Ok,
    /// NACK after the address byte; for measurement reads this means "not ready yet"
    AddressNack,
    /// NACK after a data byte or any other bus fault
    BusError,
}

/// Which parts of a measurement response to read and verify
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags(u8);
impl Flags {
    /// read the temperature
    pub const READ_TEMP: Flags = Flags(1 << 0);
    /// read the relative humidity
    pub const READ_HUM: Flags = Flags(1 << 1);
    /// verify the temperature checksum (requires `READ_TEMP`)
    pub const VERIFY_CRC_TEMP: Flags = Flags(1 << 2);
    /// verify the humidity checksum (requires `READ_HUM`)
    pub const VERIFY_CRC_HUM: Flags = Flags(1 << 3);
    /// read and verify both values
    pub const ALL: Flags = Flags(0x0F);

    /// Flags from raw bits; bits are not validated until used
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }
    /// Get the raw bits
    pub const fn bits(self) -> u8 {
        self.0
    }
    /// true if all bits of `other` are set
    pub const fn contains(self, other: Flags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Number of response bytes to read for these flags, `None` for an invalid combination.
    ///
    /// Reads always start at the temperature word, so humidity alone still needs the
    /// temperature word and its checksum byte in front of it.
    pub fn read_len(self) -> Option<usize> {
        if self.0 & !Flags::ALL.0 != 0 {
            return None;
        }
        let temp = self.contains(Flags::READ_TEMP);
        let hum = self.contains(Flags::READ_HUM);
        if !temp && !hum {
            return None;
        }
        if (self.contains(Flags::VERIFY_CRC_TEMP) && !temp) || (self.contains(Flags::VERIFY_CRC_HUM) && !hum) {
            return None;
        }
        Some(match (hum, self.contains(Flags::VERIFY_CRC_HUM), self.contains(Flags::VERIFY_CRC_TEMP)) {
            (true, true, _) => 6,
            (true, false, _) => 5,
            (false, _, true) => 3,
            (false, _, false) => 2,
        })
    }
}
impl BitOr for Flags {
    type Output = Flags;

    fn bitor(self, rhs: Flags) -> Flags {
        Flags(self.0 | rhs.0)
    }
}

/// Temperature and/or humidity after conversion; only requested values are present
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Measurement {
    /// degrees Celsius
    pub temperature: Option<f32>,
    /// relative humidity in percent
    pub humidity: Option<f32>,
}
impl Measurement {
    /// Decode a response read with `flags`, verifying the requested checksums
    pub fn from_read_bytes(flags: Flags, bytes: &[u8]) -> Result<Self, Error> {
        let len = flags.read_len().ok_or(Error::InvalidArgument)?;
        if bytes.len() < len {
            return Err(Error::Io);
        }
        if flags.contains(Flags::VERIFY_CRC_TEMP) {
            check_word(&bytes[0..3])?;
        }
        if flags.contains(Flags::VERIFY_CRC_HUM) {
            check_word(&bytes[3..6])?;
        }

        let mut measurement = Measurement::default();
        if flags.contains(Flags::READ_TEMP) {
            measurement.temperature = Some(raw_temp_to_celsius(u16::from_be_bytes([bytes[0], bytes[1]])));
        }
        if flags.contains(Flags::READ_HUM) {
            measurement.humidity = Some(raw_rel_humid_to_percent(u16::from_be_bytes([bytes[3], bytes[4]])));
        }
        Ok(measurement)
    }

    /// Get temperature in Fahrenheit
    pub fn fahrenheit(&self) -> Option<f32> {
        self.temperature.map(celsius_to_fahrenheit)
    }
}

/// Compare the CRC byte that follows a 2-byte word
pub(crate) fn check_word(word_and_crc: &[u8]) -> Result<(), Error> {
    let crc_expect = crc8(&word_and_crc[0..2]);
    if word_and_crc[2] != crc_expect {
        warn!("sht3x: crc mismatch: word={:?}, crc={}, crc_expect={}", &word_and_crc[0..2], word_and_crc[2], crc_expect);
        return Err(Error::CrcMismatch);
    }
    Ok(())
}

/// Status register of the device
#[cfg_attr(feature = "defmt", derive(Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusRegister(u16);
impl From<u16> for StatusRegister {
    fn from(raw: u16) -> Self {
        Self(raw)
    }
}
impl StatusRegister {
    /// Get the raw status bits
    pub fn raw(&self) -> u16 {
        self.0
    }

    fn bit(&self, lsbit: u16) -> bool {
        (self.0 >> lsbit) & 1 != 0
    }

    /// checksum of the last write transfer was correct
    pub fn is_crc_of_last_write_transfer_correct(&self) -> bool {
        !self.bit(STATUS_BIT_WRITE_CHECKSUM)
    }
    /// last command was executed successfully
    pub fn is_last_command_executed_successfully(&self) -> bool {
        !self.bit(STATUS_BIT_COMMAND)
    }
    /// reset (power-on, soft reset or reset pin) detected since last clear of status register
    pub fn is_system_reset_detected(&self) -> bool {
        self.bit(STATUS_BIT_SYSTEM_RESET)
    }
    /// temperature tracking alert
    pub fn is_temperature_alert_raised(&self) -> bool {
        self.bit(STATUS_BIT_T_TRACKING_ALERT)
    }
    /// relative humidity tracking alert
    pub fn is_humidity_alert_raised(&self) -> bool {
        self.bit(STATUS_BIT_RH_TRACKING_ALERT)
    }
    /// heater is enabled
    pub fn is_heater_on(&self) -> bool {
        self.bit(STATUS_BIT_HEATER)
    }
    /// at least one alert is active
    pub fn is_at_least_one_alert_pending(&self) -> bool {
        self.bit(STATUS_BIT_ALERT_PENDING)
    }
}
impl fmt::Display for StatusRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusRegister {{ 0x{:04x}; ", self.0)?;
        if self.is_at_least_one_alert_pending() {
            write!(f, "alert_pending ")?;
        }
        if self.is_heater_on() {
            write!(f, "heater_on ")?;
        }
        if self.is_humidity_alert_raised() {
            write!(f, "rh_alert ")?;
        }
        if self.is_temperature_alert_raised() {
            write!(f, "t_alert ")?;
        }
        if self.is_system_reset_detected() {
            write!(f, "reset_detected ")?;
        }
        if !self.is_last_command_executed_successfully() {
            write!(f, "command_failed ")?;
        }
        if !self.is_crc_of_last_write_transfer_correct() {
            write!(f, "write_crc_failed ")?;
        }
        write!(f, "}}")
    }
}

/// Called when a command-only sequence completes
pub type CompleteCb<U> = fn(Result<(), Error>, U);
/// Called when a measurement sequence completes
pub type MeasCompleteCb<U> = fn(Result<Measurement, Error>, U);
/// Called when a status register read completes
pub type StatusRegisterCompleteCb<U> = fn(Result<StatusRegister, Error>, U);

/// Completion callback of the sequence in progress, with its user data
#[derive(Debug)]
pub(crate) enum SequenceCallback<U> {
    Complete(Option<CompleteCb<U>>, U),
    Measurement(Option<MeasCompleteCb<U>>, U),
    StatusRegister(Option<StatusRegisterCompleteCb<U>>, U),
}
