use crate::engine::{Action, Engine, Operation, Outcome};
use crate::hw_def::*;
use crate::transport::{I2cRead, I2cWrite, StartTimer};
use crate::types::*;

impl<W, R, T, U> Sht3x<W, R, T, U>
where
    W: I2cWrite,
    R: I2cRead,
    T: StartTimer,
{
    /// Create a new SHT3x driver instance that owns its state
    pub fn new(config: Config<W, R, T>) -> Result<Self, Error> {
        let i2c_addr = I2cAddr::try_from(config.i2c_addr)?;
        Ok(Self {
            i2c_write: config.i2c_write,
            i2c_read: config.i2c_read,
            start_timer: config.start_timer,
            engine: Engine::new(i2c_addr),
            callback: None,
        })
    }

    /// Create a driver instance in memory handed out by `get_instance_memory`.
    ///
    /// The config is validated first; the hook is only called for a valid config, and
    /// then exactly once. A hook that has no memory left returns `None`, which fails with
    /// [`Error::OutOfMemory`].
    pub fn create<'a, F>(config: Config<W, R, T>, get_instance_memory: F) -> Result<&'a mut Self, Error>
    where
        F: FnOnce() -> Option<&'a mut Option<Self>>,
    {
        let sht3x = Self::new(config)?;
        let slot = get_instance_memory().ok_or(Error::OutOfMemory)?;
        Ok(slot.insert(sht3x))
    }

    /// Take the instance out of `instance` and hand it to `free_instance_memory`, or drop
    /// it if no hook is given.
    ///
    /// Fails with [`Error::Busy`] while a sequence is in progress; the instance then stays
    /// in place and the hook is not called. An empty slot is [`Error::InvalidArgument`].
    pub fn destroy(
        instance: &mut Option<Self>,
        free_instance_memory: Option<&mut dyn FnMut(Self)>,
    ) -> Result<(), Error> {
        if instance.as_ref().is_some_and(|sht3x| sht3x.engine.is_busy()) {
            return Err(Error::Busy);
        }
        let sht3x = instance.take().ok_or(Error::InvalidArgument)?;
        if let Some(free_instance_memory) = free_instance_memory {
            free_instance_memory(sht3x);
        }
        Ok(())
    }

    /// I²C address this instance talks to
    pub fn i2c_addr(&self) -> I2cAddr {
        self.engine.i2c_addr()
    }

    /// true from the moment an operation is accepted until its callback has been called
    pub fn is_busy(&self) -> bool {
        self.engine.is_busy()
    }

    /// Send a single-shot measurement command; the measurement is not read
    pub fn send_single_shot_measurement_cmd(
        &mut self,
        repeatability: Repeatability,
        clock_stretching: ClockStretching,
        cb: Option<CompleteCb<U>>,
        user_data: U,
    ) -> Result<(), Error> {
        self.start(
            Operation::SendSingleShotMeasurementCmd(repeatability, clock_stretching),
            SequenceCallback::Complete(cb, user_data),
        )
    }

    /// Read out a measurement that was requested earlier.
    ///
    /// If the measurement is not ready yet the device NACKs and `cb` gets
    /// [`Error::NoData`]; call again later.
    pub fn read_measurement(&mut self, flags: Flags, cb: Option<MeasCompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::ReadMeasurement(flags), SequenceCallback::Measurement(cb, user_data))
    }

    /// Send a single-shot measurement command, wait for the measurement and read it out
    pub fn read_single_shot_measurement(
        &mut self,
        repeatability: Repeatability,
        clock_stretching: ClockStretching,
        flags: Flags,
        cb: Option<MeasCompleteCb<U>>,
        user_data: U,
    ) -> Result<(), Error> {
        self.start(
            Operation::ReadSingleShotMeasurement(repeatability, clock_stretching, flags),
            SequenceCallback::Measurement(cb, user_data),
        )
    }

    /// Enter periodic mode
    pub fn start_periodic_measurement(
        &mut self,
        repeatability: Repeatability,
        mps: Mps,
        cb: Option<CompleteCb<U>>,
        user_data: U,
    ) -> Result<(), Error> {
        self.start(Operation::StartPeriodicMeasurement(repeatability, mps), SequenceCallback::Complete(cb, user_data))
    }

    /// Enter periodic mode with accelerated response time
    pub fn start_periodic_measurement_art(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::StartPeriodicMeasurementArt, SequenceCallback::Complete(cb, user_data))
    }

    /// Send the fetch data command; the data is not read
    pub fn fetch_periodic_measurement_data(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::FetchPeriodicMeasurementData, SequenceCallback::Complete(cb, user_data))
    }

    /// Leave periodic mode
    pub fn stop_periodic_measurement(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::StopPeriodicMeasurement, SequenceCallback::Complete(cb, user_data))
    }

    /// Fetch and read out the latest periodic measurement.
    ///
    /// `cb` gets [`Error::NoData`] when no new measurement is available.
    pub fn read_periodic_measurement(
        &mut self,
        flags: Flags,
        cb: Option<MeasCompleteCb<U>>,
        user_data: U,
    ) -> Result<(), Error> {
        self.start(Operation::ReadPeriodicMeasurement(flags), SequenceCallback::Measurement(cb, user_data))
    }

    /// Send the soft reset command
    pub fn soft_reset(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::SoftReset, SequenceCallback::Complete(cb, user_data))
    }

    /// Send the soft reset command and complete once the device has finished resetting
    pub fn soft_reset_with_delay(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::SoftResetWithDelay, SequenceCallback::Complete(cb, user_data))
    }

    /// Turn the heater on
    pub fn enable_heater(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::EnableHeater, SequenceCallback::Complete(cb, user_data))
    }

    /// Turn the heater off
    pub fn disable_heater(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::DisableHeater, SequenceCallback::Complete(cb, user_data))
    }

    /// Send the read status register command; the register is not read
    pub fn send_read_status_register_cmd(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::SendReadStatusRegisterCmd, SequenceCallback::Complete(cb, user_data))
    }

    /// Clear the alert flags of the status register
    pub fn clear_status_register(&mut self, cb: Option<CompleteCb<U>>, user_data: U) -> Result<(), Error> {
        self.start(Operation::ClearStatusRegister, SequenceCallback::Complete(cb, user_data))
    }

    /// Read the status register, optionally verifying its checksum
    pub fn read_status_register(
        &mut self,
        verify_crc: bool,
        cb: Option<StatusRegisterCompleteCb<U>>,
        user_data: U,
    ) -> Result<(), Error> {
        self.start(Operation::ReadStatusRegister { verify_crc }, SequenceCallback::StatusRegister(cb, user_data))
    }

    /// Report the outcome of the last [`I2cWrite::i2c_write`] request
    pub fn i2c_write_complete(&mut self, result: I2cResultCode) -> Result<(), Error> {
        let action = self.engine.write_complete(result)?;
        self.dispatch(action);
        Ok(())
    }

    /// Report the outcome of the last [`I2cRead::i2c_read`] request with the bytes read
    pub fn i2c_read_complete(&mut self, result: I2cResultCode, data: &[u8]) -> Result<(), Error> {
        let action = self.engine.read_complete(result, data)?;
        self.dispatch(action);
        Ok(())
    }

    /// Report that the last [`StartTimer::start_timer`] request expired
    pub fn timer_expired(&mut self) -> Result<(), Error> {
        let action = self.engine.timer_expired()?;
        self.dispatch(action);
        Ok(())
    }

    fn start(&mut self, operation: Operation, callback: SequenceCallback<U>) -> Result<(), Error> {
        let action = self.engine.start(operation)?;
        self.callback = Some(callback);
        self.dispatch(action);
        Ok(())
    }

    fn dispatch(&mut self, action: Action) {
        let address = self.engine.i2c_addr().as_u8();
        match action {
            Action::Write(bytes) => self.i2c_write.i2c_write(address, &bytes),
            Action::Read(len) => self.i2c_read.i2c_read(address, len),
            Action::StartTimer(duration_ms) => self.start_timer.start_timer(duration_ms),
            Action::Complete(outcome) => self.complete(outcome),
        }
    }

    /// Runs after the engine has gone idle
    fn complete(&mut self, outcome: Outcome) {
        match self.callback.take() {
            Some(SequenceCallback::Complete(cb, user_data)) => {
                if let Some(cb) = cb {
                    cb(outcome.into_done(), user_data);
                }
            }
            Some(SequenceCallback::Measurement(cb, user_data)) => {
                if let Some(cb) = cb {
                    cb(outcome.into_measurement(), user_data);
                }
            }
            Some(SequenceCallback::StatusRegister(cb, user_data)) => {
                if let Some(cb) = cb {
                    cb(outcome.into_status_register(), user_data);
                }
            }
            None => warn!("sht3x: sequence completed without a callback record"),
        }
    }
}
