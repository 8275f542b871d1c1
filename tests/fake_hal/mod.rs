#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sht3x_async::{Config, Error, I2cRead, I2cWrite, Measurement, Sht3x, StartTimer, StatusRegister};

/// A request the driver made of one of its primitives
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Write { address: u8, data: Vec<u8> },
    Read { address: u8, len: usize },
    Timer(u32),
}

/// Requests shared between the fakes and the test
#[derive(Clone, Default)]
pub struct Requests(Rc<RefCell<Vec<Request>>>);

impl Requests {
    pub fn take(&self) -> Vec<Request> {
        self.0.borrow_mut().drain(..).collect()
    }

    fn push(&self, request: Request) {
        self.0.borrow_mut().push(request);
    }
}

pub struct FakeI2c(Requests);

impl I2cWrite for FakeI2c {
    fn i2c_write(&mut self, address: u8, data: &[u8]) {
        self.0.push(Request::Write { address, data: data.to_vec() });
    }
}

impl I2cRead for FakeI2c {
    fn i2c_read(&mut self, address: u8, len: usize) {
        self.0.push(Request::Read { address, len });
    }
}

pub struct FakeTimer(Requests);

impl StartTimer for FakeTimer {
    fn start_timer(&mut self, duration_ms: u32) {
        self.0.push(Request::Timer(duration_ms));
    }
}

/// What a completion callback received
#[derive(Debug, PartialEq)]
pub enum Completion {
    Done(Result<(), Error>),
    Measurement(Result<Measurement, Error>),
    StatusRegister(Result<StatusRegister, Error>),
}

/// Handed to the driver as user data and back to the callbacks
#[derive(Clone, Default)]
pub struct Completions(Rc<RefCell<Vec<Completion>>>);

impl Completions {
    pub fn take(&self) -> Vec<Completion> {
        self.0.borrow_mut().drain(..).collect()
    }

    pub fn take_measurement(&self) -> Result<Measurement, Error> {
        match self.take().as_slice() {
            [Completion::Measurement(result)] => *result,
            other => panic!("expected one measurement completion, got {other:?}"),
        }
    }
}

pub fn on_done(result: Result<(), Error>, completions: Completions) {
    completions.0.borrow_mut().push(Completion::Done(result));
}

pub fn on_measurement(result: Result<Measurement, Error>, completions: Completions) {
    completions.0.borrow_mut().push(Completion::Measurement(result));
}

pub fn on_status_register(result: Result<StatusRegister, Error>, completions: Completions) {
    completions.0.borrow_mut().push(Completion::StatusRegister(result));
}

pub type TestSht3x = Sht3x<FakeI2c, FakeI2c, FakeTimer, Completions>;

pub fn config(requests: &Requests, i2c_addr: u8) -> Config<FakeI2c, FakeI2c, FakeTimer> {
    Config {
        i2c_write: FakeI2c(requests.clone()),
        i2c_read: FakeI2c(requests.clone()),
        start_timer: FakeTimer(requests.clone()),
        i2c_addr,
    }
}

/// A driver wired to fakes, with handles on everything it does
pub struct Fixture {
    pub sht3x: TestSht3x,
    pub requests: Requests,
    pub completions: Completions,
}

impl Fixture {
    pub fn new() -> Fixture {
        Fixture::with_addr(0x44)
    }

    pub fn with_addr(i2c_addr: u8) -> Fixture {
        let requests = Requests::default();
        let sht3x = TestSht3x::new(config(&requests, i2c_addr)).unwrap();
        Fixture { sht3x, requests, completions: Completions::default() }
    }
}

pub fn write(data: &[u8]) -> Request {
    Request::Write { address: 0x44, data: data.to_vec() }
}

pub fn read(len: usize) -> Request {
    Request::Read { address: 0x44, len }
}

/// Counts calls of an instance memory hook
#[derive(Default)]
pub struct HookCalls(Cell<usize>);

impl HookCalls {
    pub fn hit(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }
}

pub fn assert_close(actual: Option<f32>, expected: f32) {
    let actual = actual.expect("value was not read");
    assert!((actual - expected).abs() < 0.01, "{actual} != {expected}");
}
