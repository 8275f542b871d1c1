//! Primitives the caller supplies to [`Sht3x`](crate::Sht3x).
//!
//! None of these may report completion from inside the call. Start the transaction or
//! timer, return, and later report the outcome from the same execution context through
//! [`Sht3x::i2c_write_complete`](crate::Sht3x::i2c_write_complete),
//! [`Sht3x::i2c_read_complete`](crate::Sht3x::i2c_read_complete) or
//! [`Sht3x::timer_expired`](crate::Sht3x::timer_expired). Each request gets exactly one
//! completion.

/// Starts an I²C write of `data` to the 7-bit `address`
pub trait I2cWrite {
    /// Begin the write
    fn i2c_write(&mut self, address: u8, data: &[u8]);
}

/// Starts an I²C read of `len` bytes from the 7-bit `address`
pub trait I2cRead {
    /// Begin the read
    fn i2c_read(&mut self, address: u8, len: usize);
}

/// Starts a timer that expires no sooner than `duration_ms` milliseconds from now
pub trait StartTimer {
    /// Begin the timer
    fn start_timer(&mut self, duration_ms: u32);
}

impl<F: FnMut(u8, &[u8])> I2cWrite for F {
    fn i2c_write(&mut self, address: u8, data: &[u8]) {
        self(address, data)
    }
}

impl<F: FnMut(u8, usize)> I2cRead for F {
    fn i2c_read(&mut self, address: u8, len: usize) {
        self(address, len)
    }
}

impl<F: FnMut(u32)> StartTimer for F {
    fn start_timer(&mut self, duration_ms: u32) {
        self(duration_ms)
    }
}
