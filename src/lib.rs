//! This is a platform-agnostic, non-blocking Rust driver for the SHT30, SHT31 and SHT35
//! humidity and temperature digital sensors. The core driver never blocks and never owns
//! the bus: it is driven by three primitives the caller supplies (start an I²C write,
//! start an I²C read, start a millisecond timer) and reports every result through a
//! completion callback. A thin front end over the [`embedded-hal-async`] traits runs the
//! same sequences for callers that have an async HAL.
//!
//! [`embedded-hal-async`]: https://github.com/rust-embedded/embedded-hal/tree/master/embedded-hal-async
//!
//! This driver allows you to:
//! - Send single-shot measurement commands and read out the measurements, with or without
//!   clock stretching, at any repeatability.
//! - Start, fetch from, read and stop periodic measurements, including accelerated
//!   response time mode.
//! - Choose which of temperature and humidity to read and which checksums to verify.
//! - Enable/disable the heater.
//! - Trigger a software reset, optionally waiting out the reset time.
//! - Read and clear the status register, and decode its flags.
//!
//! Only one sequence runs per instance at a time. Any operation started while another is
//! in flight fails immediately with [`Error::Busy`] and leaves the running one alone.
//!
//! ## Features
//!
//! - `async`: Enables the [`asynch`] front end.
//! - `defmt`: Enables logging using the `defmt` framework.
//! - `log`: Enables logging using the `log` framework.
//!
//! ## Supported devices: SHT30, SHT31, SHT35
//!
//! Datasheet:
//!   [SHT3x-DIS](https://sensirion.com/media/documents/213E6A3B/63A5A569/Datasheet_SHT3x_DIS.pdf)
//!
//! ## Callback Example:
//!
//! ```
//! use sht3x_async::{ClockStretching, Config, Error, Flags, I2cResultCode, Measurement, Repeatability, Sht3x};
//!
//! fn on_measurement(result: Result<Measurement, Error>, _user_data: ()) {
//!     if let Ok(meas) = result {
//!         let _ = (meas.temperature, meas.humidity);
//!     }
//! }
//!
//! // Platform-specific: start the transaction or timer and return
//! let config = Config {
//!     i2c_write: |_addr: u8, _data: &[u8]| {},
//!     i2c_read: |_addr: u8, _len: usize| {},
//!     start_timer: |_ms: u32| {},
//!     i2c_addr: 0x44,
//! };
//! let mut sht3x: Sht3x<_, _, _, ()> = Sht3x::new(config).unwrap();
//!
//! sht3x.read_single_shot_measurement(
//!     Repeatability::High,
//!     ClockStretching::Disabled,
//!     Flags::READ_TEMP | Flags::READ_HUM,
//!     Some(on_measurement),
//!     (),
//! ).unwrap();
//!
//! // Later, from the event loop, as the bus and timer report back
//! sht3x.i2c_write_complete(I2cResultCode::Ok).unwrap();
//! sht3x.timer_expired().unwrap();
//! sht3x.i2c_read_complete(I2cResultCode::Ok, &[0x62, 0x60, 0xB6, 0x72, 0xB3]).unwrap();
//! ```
//!
//! ## Async Example:
//!
//! ```ignore
//! use sht3x_async::{asynch::Sht3xAsync, ClockStretching, Flags, I2cAddr, Repeatability};
//!
//! // Platform-specific
//! let i2c = /* embedded_hal_async::i2c::I2c instance */;
//! let delay = /* embedded_hal_async::delay::DelayNs instance */;
//!
//! let mut sht3x = Sht3xAsync::new(i2c, delay, I2cAddr::Addr44);
//! let meas = sht3x
//!     .read_single_shot_measurement(Repeatability::High, ClockStretching::Disabled, Flags::ALL)
//!     .await
//!     .unwrap();
//! println!("{:3} %RH, {:0.1} °C", meas.humidity.unwrap(), meas.temperature.unwrap());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

cfg_if::cfg_if! {
    if #[cfg(feature = "defmt")] {
        macro_rules! trace {
            ($($arg:tt)*) => { defmt::trace!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { defmt::warn!($($arg)*) };
        }
    } else if #[cfg(feature = "log")] {
        macro_rules! trace {
            ($($arg:tt)*) => { log::trace!($($arg)*) };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { log::warn!($($arg)*) };
        }
    } else {
        macro_rules! trace {
            ($($arg:tt)*) => { () };
        }
        macro_rules! warn {
            ($($arg:tt)*) => { () };
        }
    }
}

#[cfg(feature = "async")]
pub mod asynch;
mod device_impl;
mod engine;
mod hw_def;
pub mod transport;
mod types;

pub use crate::{hw_def::*, transport::*, types::*};

#[cfg(test)]
mod tests {
    #[test]
    fn logging_macros_are_unit_expressions() {
        let status: Option<u16> = None;
        let logged = match status {
            Some(_) => trace!("sht3x: status present"),
            None => warn!("sht3x: no status"),
        };
        let () = logged;
    }
}
