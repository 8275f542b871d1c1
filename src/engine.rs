//! Sequence engine shared by every front end.
//!
//! The engine owns the busy state, the read buffer and the descriptor of the sequence in
//! flight. It never touches the bus itself: starting an operation or feeding it a
//! completion yields the next [`Action`] for the front end to carry out. Exactly one
//! sequence runs at a time; it ends when an [`Action::Complete`] is handed out, and the
//! engine is idle again by then.

use crate::hw_def::*;
use crate::types::*;

/// A public operation with its arguments
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Operation {
    SendSingleShotMeasurementCmd(Repeatability, ClockStretching),
    ReadMeasurement(Flags),
    ReadSingleShotMeasurement(Repeatability, ClockStretching, Flags),
    StartPeriodicMeasurement(Repeatability, Mps),
    StartPeriodicMeasurementArt,
    FetchPeriodicMeasurementData,
    StopPeriodicMeasurement,
    ReadPeriodicMeasurement(Flags),
    SoftReset,
    SoftResetWithDelay,
    EnableHeater,
    DisableHeater,
    SendReadStatusRegisterCmd,
    ClearStatusRegister,
    ReadStatusRegister { verify_crc: bool },
}

/// What the front end has to do next
#[derive(Debug, PartialEq)]
pub(crate) enum Action {
    Write([u8; 2]),
    Read(usize),
    StartTimer(u32),
    Complete(Outcome),
}

/// Final result of a sequence, shaped like the callback that receives it
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, PartialEq)]
pub(crate) enum Outcome {
    Done(Result<(), Error>),
    Measurement(Result<Measurement, Error>),
    StatusRegister(Result<StatusRegister, Error>),
}
impl Outcome {
    pub(crate) fn into_done(self) -> Result<(), Error> {
        match self {
            Outcome::Done(result) => result,
            _ => Err(Error::Driver),
        }
    }

    pub(crate) fn into_measurement(self) -> Result<Measurement, Error> {
        match self {
            Outcome::Measurement(result) => result,
            _ => Err(Error::Driver),
        }
    }

    pub(crate) fn into_status_register(self) -> Result<StatusRegister, Error> {
        match self {
            Outcome::StatusRegister(result) => result,
            _ => Err(Error::Driver),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum SequenceKind {
    /// terminates after the command write
    Command,
    ReadMeasurement(Flags),
    SingleShotMeasurement { flags: Flags, delay_ms: u32 },
    ReadPeriodicMeasurement(Flags),
    SoftResetWithDelay,
    ReadStatusRegister { verify_crc: bool },
}
impl SequenceKind {
    /// Address NACK on a measurement read means the data is not ready yet
    fn nack_is_no_data(self) -> bool {
        matches!(self, SequenceKind::ReadMeasurement(_) | SequenceKind::ReadPeriodicMeasurement(_))
    }

    fn failed(self, err: Error) -> Outcome {
        match self {
            SequenceKind::Command | SequenceKind::SoftResetWithDelay => Outcome::Done(Err(err)),
            SequenceKind::ReadMeasurement(_)
            | SequenceKind::SingleShotMeasurement { .. }
            | SequenceKind::ReadPeriodicMeasurement(_) => Outcome::Measurement(Err(err)),
            SequenceKind::ReadStatusRegister { .. } => Outcome::StatusRegister(Err(err)),
        }
    }
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Step {
    WriteOutstanding,
    TimerOutstanding,
    ReadOutstanding(usize),
}

#[derive(Clone, Copy, Debug)]
struct Sequence {
    kind: SequenceKind,
    step: Step,
}

/// Busy state, read buffer and sequence progress of one device
#[derive(Debug)]
pub(crate) struct Engine {
    i2c_addr: I2cAddr,
    read_buffer: [u8; READ_BUFFER_LEN],
    sequence: Option<Sequence>,
}

impl Engine {
    pub(crate) fn new(i2c_addr: I2cAddr) -> Self {
        Self {
            i2c_addr,
            read_buffer: [0u8; READ_BUFFER_LEN],
            sequence: None,
        }
    }

    pub(crate) fn i2c_addr(&self) -> I2cAddr {
        self.i2c_addr
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.sequence.is_some()
    }

    /// Forget a sequence whose driver went away mid-flight
    pub(crate) fn abandon(&mut self) {
        let abandoned = self.sequence.take();
        if abandoned.is_some() {
            warn!("sht3x: abandoned sequence {:?}", abandoned.map(|sequence| (sequence.kind, sequence.step)));
        }
    }

    /// Accept a new operation and return its first bus request.
    ///
    /// Fails with [`Error::Busy`] while a sequence is in progress and with
    /// [`Error::InvalidArgument`] for invalid read flags; neither changes any state.
    pub(crate) fn start(&mut self, operation: Operation) -> Result<Action, Error> {
        if self.is_busy() {
            warn!("sht3x: rejected {:?}, busy", operation);
            return Err(Error::Busy);
        }

        let (kind, command) = match operation {
            Operation::SendSingleShotMeasurementCmd(repeatability, clock_stretching) => {
                (SequenceKind::Command, single_shot_command(repeatability, clock_stretching))
            }
            // a bare read: no command goes out first
            Operation::ReadMeasurement(flags) => {
                let len = validate(flags)?;
                trace!("sht3x: start {:?}", operation);
                self.sequence = Some(Sequence {
                    kind: SequenceKind::ReadMeasurement(flags),
                    step: Step::ReadOutstanding(len),
                });
                return Ok(Action::Read(len));
            }
            Operation::ReadSingleShotMeasurement(repeatability, clock_stretching, flags) => {
                validate(flags)?;
                let delay_ms = single_shot_delay_ms(repeatability, clock_stretching);
                (
                    SequenceKind::SingleShotMeasurement { flags, delay_ms },
                    single_shot_command(repeatability, clock_stretching),
                )
            }
            Operation::StartPeriodicMeasurement(repeatability, mps) => {
                (SequenceKind::Command, periodic_command(repeatability, mps))
            }
            Operation::StartPeriodicMeasurementArt => (SequenceKind::Command, Command::PeriodicArt),
            Operation::FetchPeriodicMeasurementData => (SequenceKind::Command, Command::FetchData),
            Operation::StopPeriodicMeasurement => (SequenceKind::Command, Command::Break),
            Operation::ReadPeriodicMeasurement(flags) => {
                validate(flags)?;
                (SequenceKind::ReadPeriodicMeasurement(flags), Command::FetchData)
            }
            Operation::SoftReset => (SequenceKind::Command, Command::SoftReset),
            Operation::SoftResetWithDelay => (SequenceKind::SoftResetWithDelay, Command::SoftReset),
            Operation::EnableHeater => (SequenceKind::Command, Command::HeaterEnable),
            Operation::DisableHeater => (SequenceKind::Command, Command::HeaterDisable),
            Operation::SendReadStatusRegisterCmd => (SequenceKind::Command, Command::StatusRead),
            Operation::ClearStatusRegister => (SequenceKind::Command, Command::StatusClear),
            Operation::ReadStatusRegister { verify_crc } => {
                (SequenceKind::ReadStatusRegister { verify_crc }, Command::StatusRead)
            }
        };

        trace!("sht3x: start {:?}, command {:?}", operation, command);
        self.sequence = Some(Sequence { kind, step: Step::WriteOutstanding });
        Ok(Action::Write(command.to_be_bytes()))
    }

    /// The write of the current sequence finished
    pub(crate) fn write_complete(&mut self, result: I2cResultCode) -> Result<Action, Error> {
        let sequence = self.outstanding(Step::WriteOutstanding)?;
        if result != I2cResultCode::Ok {
            warn!("sht3x: write failed: {:?}", result);
            return Ok(self.finish(sequence.kind.failed(Error::Io)));
        }

        let delay_ms = match sequence.kind {
            SequenceKind::Command => return Ok(self.finish(Outcome::Done(Ok(())))),
            SequenceKind::SingleShotMeasurement { delay_ms, .. } => delay_ms,
            SequenceKind::ReadPeriodicMeasurement(_) | SequenceKind::ReadStatusRegister { .. } => {
                COMMAND_SPACING_DELAY_MS
            }
            SequenceKind::SoftResetWithDelay => SOFT_RESET_DELAY_MS,
            // starts with a read, never writes
            SequenceKind::ReadMeasurement(_) => return Ok(self.finish(sequence.kind.failed(Error::Driver))),
        };
        self.advance(Step::TimerOutstanding);
        trace!("sht3x: wait {} ms", delay_ms);
        Ok(Action::StartTimer(delay_ms))
    }

    /// The timer of the current sequence expired
    pub(crate) fn timer_expired(&mut self) -> Result<Action, Error> {
        let sequence = self.outstanding(Step::TimerOutstanding)?;
        let len = match sequence.kind {
            SequenceKind::SoftResetWithDelay => return Ok(self.finish(Outcome::Done(Ok(())))),
            SequenceKind::SingleShotMeasurement { flags, .. } | SequenceKind::ReadPeriodicMeasurement(flags) => {
                match flags.read_len() {
                    Some(len) => len,
                    None => return Ok(self.finish(sequence.kind.failed(Error::Driver))),
                }
            }
            SequenceKind::ReadStatusRegister { verify_crc } => {
                if verify_crc { 3 } else { 2 }
            }
            SequenceKind::Command | SequenceKind::ReadMeasurement(_) => {
                return Ok(self.finish(sequence.kind.failed(Error::Driver)));
            }
        };
        self.advance(Step::ReadOutstanding(len));
        trace!("sht3x: read {} bytes", len);
        Ok(Action::Read(len))
    }

    /// The read of the current sequence finished; `data` holds the bytes read
    pub(crate) fn read_complete(&mut self, result: I2cResultCode, data: &[u8]) -> Result<Action, Error> {
        let len = match self.sequence.map(|sequence| sequence.step) {
            Some(Step::ReadOutstanding(len)) => len,
            _ => {
                warn!("sht3x: unexpected read completion at {:?}", self.sequence.map(|sequence| sequence.step));
                return Err(Error::Driver);
            }
        };
        let kind = self.sequence.map(|sequence| sequence.kind).ok_or(Error::Driver)?;

        let err = match result {
            I2cResultCode::Ok if data.len() < len => {
                warn!("sht3x: short read: {} of {} bytes", data.len(), len);
                Some(Error::Io)
            }
            I2cResultCode::Ok => None,
            I2cResultCode::AddressNack if kind.nack_is_no_data() => Some(Error::NoData),
            I2cResultCode::AddressNack | I2cResultCode::BusError => {
                warn!("sht3x: read failed: {:?}", result);
                Some(Error::Io)
            }
        };
        if let Some(err) = err {
            return Ok(self.finish(kind.failed(err)));
        }

        self.read_buffer[..len].copy_from_slice(&data[..len]);
        let response = &self.read_buffer[..len];
        let outcome = match kind {
            SequenceKind::ReadMeasurement(flags)
            | SequenceKind::SingleShotMeasurement { flags, .. }
            | SequenceKind::ReadPeriodicMeasurement(flags) => {
                Outcome::Measurement(Measurement::from_read_bytes(flags, response))
            }
            SequenceKind::ReadStatusRegister { verify_crc } => Outcome::StatusRegister(decode_status(response, verify_crc)),
            SequenceKind::Command | SequenceKind::SoftResetWithDelay => kind.failed(Error::Driver),
        };
        Ok(self.finish(outcome))
    }

    fn outstanding(&self, expected: Step) -> Result<Sequence, Error> {
        match self.sequence {
            Some(sequence) if sequence.step == expected => Ok(sequence),
            _ => {
                warn!("sht3x: expected {:?}, sequence is {:?}", expected, self.sequence.map(|sequence| sequence.step));
                Err(Error::Driver)
            }
        }
    }

    fn advance(&mut self, step: Step) {
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.step = step;
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Action {
        self.sequence = None;
        trace!("sht3x: complete {:?}", outcome);
        Action::Complete(outcome)
    }
}

fn validate(flags: Flags) -> Result<usize, Error> {
    flags.read_len().ok_or(Error::InvalidArgument)
}

fn decode_status(response: &[u8], verify_crc: bool) -> Result<StatusRegister, Error> {
    if verify_crc {
        check_word(response)?;
    }
    Ok(StatusRegister::from(u16::from_be_bytes([response[0], response[1]])))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOTH: Flags = Flags::from_bits(0b0011);

    fn engine() -> Engine {
        Engine::new(I2cAddr::Addr44)
    }

    #[test]
    fn single_shot_measurement_path() {
        let mut engine = engine();
        let op = Operation::ReadSingleShotMeasurement(Repeatability::High, ClockStretching::Disabled, BOTH);
        assert_eq!(engine.start(op), Ok(Action::Write([0x24, 0x00])));
        assert!(engine.is_busy());
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::StartTimer(16)));
        assert_eq!(engine.timer_expired(), Ok(Action::Read(5)));
        let action = engine.read_complete(I2cResultCode::Ok, &[0x62, 0x60, 0xB6, 0x72, 0xB3]).unwrap();
        assert!(!engine.is_busy());
        let Action::Complete(outcome) = action else { panic!("{action:?}") };
        let meas = outcome.into_measurement().unwrap();
        assert!((meas.temperature.unwrap() - 22.25).abs() < 0.01);
        assert!((meas.humidity.unwrap() - 44.80).abs() < 0.01);
    }

    #[test]
    fn busy_rejects_without_state_change() {
        let mut engine = engine();
        assert_eq!(engine.start(Operation::SoftReset), Ok(Action::Write([0x30, 0xA2])));
        assert_eq!(engine.start(Operation::EnableHeater), Err(Error::Busy));
        assert_eq!(engine.start(Operation::ReadMeasurement(BOTH)), Err(Error::Busy));
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::Complete(Outcome::Done(Ok(())))));
        assert_eq!(engine.start(Operation::EnableHeater), Ok(Action::Write([0x30, 0x6D])));
    }

    #[test]
    fn invalid_flags_rejected_before_any_request() {
        let mut engine = engine();
        for bits in [0b0000, 0b0100, 0b1000, 0b1101, 0b1110, 0b1_0001] {
            let flags = Flags::from_bits(bits);
            assert_eq!(engine.start(Operation::ReadMeasurement(flags)), Err(Error::InvalidArgument));
            assert_eq!(engine.start(Operation::ReadPeriodicMeasurement(flags)), Err(Error::InvalidArgument));
            let op = Operation::ReadSingleShotMeasurement(Repeatability::Low, ClockStretching::Enabled, flags);
            assert_eq!(engine.start(op), Err(Error::InvalidArgument));
            assert!(!engine.is_busy());
        }
    }

    #[test]
    fn read_measurement_nack_is_no_data() {
        let mut engine = engine();
        assert_eq!(engine.start(Operation::ReadMeasurement(Flags::READ_TEMP)), Ok(Action::Read(2)));
        assert_eq!(
            engine.read_complete(I2cResultCode::AddressNack, &[]),
            Ok(Action::Complete(Outcome::Measurement(Err(Error::NoData))))
        );

        assert_eq!(engine.start(Operation::ReadPeriodicMeasurement(BOTH)), Ok(Action::Write([0xE0, 0x00])));
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::StartTimer(1)));
        assert_eq!(engine.timer_expired(), Ok(Action::Read(5)));
        assert_eq!(
            engine.read_complete(I2cResultCode::AddressNack, &[]),
            Ok(Action::Complete(Outcome::Measurement(Err(Error::NoData))))
        );
    }

    #[test]
    fn single_shot_nack_is_io_error() {
        let mut engine = engine();
        let op = Operation::ReadSingleShotMeasurement(Repeatability::Medium, ClockStretching::Disabled, BOTH);
        engine.start(op).unwrap();
        assert_eq!(
            engine.write_complete(I2cResultCode::AddressNack),
            Ok(Action::Complete(Outcome::Measurement(Err(Error::Io))))
        );

        engine.start(op).unwrap();
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::StartTimer(7)));
        assert_eq!(engine.timer_expired(), Ok(Action::Read(5)));
        assert_eq!(
            engine.read_complete(I2cResultCode::AddressNack, &[]),
            Ok(Action::Complete(Outcome::Measurement(Err(Error::Io))))
        );
        assert!(!engine.is_busy());
    }

    #[test]
    fn status_register_path() {
        let mut engine = engine();
        let op = Operation::ReadStatusRegister { verify_crc: true };
        assert_eq!(engine.start(op), Ok(Action::Write([0xF3, 0x2D])));
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::StartTimer(1)));
        assert_eq!(engine.timer_expired(), Ok(Action::Read(3)));
        let crc = crc8(&[0x80, 0x10]);
        assert_eq!(
            engine.read_complete(I2cResultCode::Ok, &[0x80, 0x10, crc]),
            Ok(Action::Complete(Outcome::StatusRegister(Ok(StatusRegister::from(0x8010)))))
        );

        engine.start(op).unwrap();
        engine.write_complete(I2cResultCode::Ok).unwrap();
        engine.timer_expired().unwrap();
        assert_eq!(
            engine.read_complete(I2cResultCode::Ok, &[0x80, 0x10, crc ^ 0xFF]),
            Ok(Action::Complete(Outcome::StatusRegister(Err(Error::CrcMismatch))))
        );

        let op = Operation::ReadStatusRegister { verify_crc: false };
        engine.start(op).unwrap();
        engine.write_complete(I2cResultCode::Ok).unwrap();
        assert_eq!(engine.timer_expired(), Ok(Action::Read(2)));
        assert_eq!(
            engine.read_complete(I2cResultCode::AddressNack, &[]),
            Ok(Action::Complete(Outcome::StatusRegister(Err(Error::Io))))
        );
    }

    #[test]
    fn soft_reset_with_delay_path() {
        let mut engine = engine();
        assert_eq!(engine.start(Operation::SoftResetWithDelay), Ok(Action::Write([0x30, 0xA2])));
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::StartTimer(2)));
        assert_eq!(engine.timer_expired(), Ok(Action::Complete(Outcome::Done(Ok(())))));

        engine.start(Operation::SoftResetWithDelay).unwrap();
        assert_eq!(
            engine.write_complete(I2cResultCode::BusError),
            Ok(Action::Complete(Outcome::Done(Err(Error::Io))))
        );
    }

    #[test]
    fn stray_completions_are_driver_errors() {
        let mut engine = engine();
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Err(Error::Driver));
        assert_eq!(engine.timer_expired(), Err(Error::Driver));
        assert_eq!(engine.read_complete(I2cResultCode::Ok, &[0; 6]), Err(Error::Driver));

        engine.start(Operation::StopPeriodicMeasurement).unwrap();
        assert_eq!(engine.timer_expired(), Err(Error::Driver));
        assert_eq!(engine.read_complete(I2cResultCode::Ok, &[0; 6]), Err(Error::Driver));
        assert!(engine.is_busy());
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Ok(Action::Complete(Outcome::Done(Ok(())))));
    }

    #[test]
    fn short_read_is_io_error() {
        let mut engine = engine();
        engine.start(Operation::ReadMeasurement(Flags::ALL)).unwrap();
        assert_eq!(
            engine.read_complete(I2cResultCode::Ok, &[0x62, 0x60, 0xB6]),
            Ok(Action::Complete(Outcome::Measurement(Err(Error::Io))))
        );
    }

    #[test]
    fn abandon_frees_the_engine() {
        let mut engine = engine();
        engine.start(Operation::FetchPeriodicMeasurementData).unwrap();
        engine.abandon();
        assert!(!engine.is_busy());
        assert_eq!(engine.write_complete(I2cResultCode::Ok), Err(Error::Driver));
    }
}
