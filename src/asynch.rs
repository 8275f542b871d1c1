//! Front end over [`embedded-hal-async`](embedded_hal_async) I²C and delay.

use crate::engine::{Action, Engine, Operation, Outcome};
use crate::hw_def::*;
use crate::types::*;

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{ErrorKind, I2c, NoAcknowledgeSource};

/// SHT3x driver on an async I²C bus
#[derive(Debug)]
pub struct Sht3xAsync<I2C, Delay> {
    i2c: I2C,
    delay: Delay,
    engine: Engine,
}

impl<I2C, Delay, E> Sht3xAsync<I2C, Delay>
where
    I2C: I2c<Error = E>,
    E: embedded_hal_async::i2c::Error,
    Delay: DelayNs,
{
    /// Create a new SHT3x driver instance
    pub fn new(i2c: I2C, delay: Delay, i2c_addr: I2cAddr) -> Self {
        Self { i2c, delay, engine: Engine::new(i2c_addr) }
    }

    /// Give back the bus and delay
    pub fn release(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }

    async fn run(&mut self, operation: Operation) -> Result<Outcome, Error> {
        // a dropped future leaves its sequence behind
        self.engine.abandon();
        let address = self.engine.i2c_addr().as_u8();
        let mut action = self.engine.start(operation)?;
        loop {
            action = match action {
                Action::Write(bytes) => {
                    let result = result_code(self.i2c.write(address, &bytes).await);
                    self.engine.write_complete(result)?
                }
                Action::StartTimer(duration_ms) => {
                    self.delay.delay_ms(duration_ms).await;
                    self.engine.timer_expired()?
                }
                Action::Read(len) => {
                    let mut read_buf = [0u8; READ_BUFFER_LEN];
                    let read_buf_slice = read_buf.get_mut(..len).ok_or(Error::Driver)?;
                    let result = result_code(self.i2c.read(address, read_buf_slice).await);
                    self.engine.read_complete(result, read_buf_slice)?
                }
                Action::Complete(outcome) => return Ok(outcome),
            };
        }
    }

    /// Send a single-shot measurement command; the measurement is not read
    pub async fn send_single_shot_measurement_cmd(
        &mut self,
        repeatability: Repeatability,
        clock_stretching: ClockStretching,
    ) -> Result<(), Error> {
        self.run(Operation::SendSingleShotMeasurementCmd(repeatability, clock_stretching)).await?.into_done()
    }

    /// Read out a measurement requested earlier; [`Error::NoData`] if it is not ready
    pub async fn read_measurement(&mut self, flags: Flags) -> Result<Measurement, Error> {
        self.run(Operation::ReadMeasurement(flags)).await?.into_measurement()
    }

    /// Trigger a single-shot measurement, wait for it and read it out
    pub async fn read_single_shot_measurement(
        &mut self,
        repeatability: Repeatability,
        clock_stretching: ClockStretching,
        flags: Flags,
    ) -> Result<Measurement, Error> {
        self.run(Operation::ReadSingleShotMeasurement(repeatability, clock_stretching, flags))
            .await?
            .into_measurement()
    }

    /// Enter periodic mode
    pub async fn start_periodic_measurement(&mut self, repeatability: Repeatability, mps: Mps) -> Result<(), Error> {
        self.run(Operation::StartPeriodicMeasurement(repeatability, mps)).await?.into_done()
    }

    /// Enter periodic mode with accelerated response time
    pub async fn start_periodic_measurement_art(&mut self) -> Result<(), Error> {
        self.run(Operation::StartPeriodicMeasurementArt).await?.into_done()
    }

    /// Send the fetch data command; the data is not read
    pub async fn fetch_periodic_measurement_data(&mut self) -> Result<(), Error> {
        self.run(Operation::FetchPeriodicMeasurementData).await?.into_done()
    }

    /// Leave periodic mode
    pub async fn stop_periodic_measurement(&mut self) -> Result<(), Error> {
        self.run(Operation::StopPeriodicMeasurement).await?.into_done()
    }

    /// Fetch and read the latest periodic measurement; [`Error::NoData`] if there is none
    pub async fn read_periodic_measurement(&mut self, flags: Flags) -> Result<Measurement, Error> {
        self.run(Operation::ReadPeriodicMeasurement(flags)).await?.into_measurement()
    }

    /// software reset
    pub async fn soft_reset(&mut self) -> Result<(), Error> {
        self.run(Operation::SoftReset).await?.into_done()
    }

    /// software reset, returning once the device is ready again
    pub async fn soft_reset_with_delay(&mut self) -> Result<(), Error> {
        self.run(Operation::SoftResetWithDelay).await?.into_done()
    }

    /// Condensation heater on
    pub async fn enable_heater(&mut self) -> Result<(), Error> {
        self.run(Operation::EnableHeater).await?.into_done()
    }

    /// Condensation heater off
    pub async fn disable_heater(&mut self) -> Result<(), Error> {
        self.run(Operation::DisableHeater).await?.into_done()
    }

    /// Send the read status register command; the register is not read
    pub async fn send_read_status_register_cmd(&mut self) -> Result<(), Error> {
        self.run(Operation::SendReadStatusRegisterCmd).await?.into_done()
    }

    /// Clear the status register alert flags
    pub async fn clear_status_register(&mut self) -> Result<(), Error> {
        self.run(Operation::ClearStatusRegister).await?.into_done()
    }

    /// Read the status register
    pub async fn read_status_register(&mut self, verify_crc: bool) -> Result<StatusRegister, Error> {
        self.run(Operation::ReadStatusRegister { verify_crc }).await?.into_status_register()
    }
}

/// Reads never see a data NACK from the device, so an unattributed NACK is the address
fn result_code<E: embedded_hal_async::i2c::Error>(result: Result<(), E>) -> I2cResultCode {
    match result {
        Ok(()) => I2cResultCode::Ok,
        Err(e) => match e.kind() {
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address | NoAcknowledgeSource::Unknown) => {
                I2cResultCode::AddressNack
            }
            _ => I2cResultCode::BusError,
        },
    }
}
