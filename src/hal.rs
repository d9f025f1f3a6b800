// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Hardware capabilities the instrument is written against.
//!
//! Pins, buses and delays are expressed with the `embedded-hal` traits. The
//! object-safe wrappers here let a [`Platform`] hand them out as trait objects
//! so scanners don't need to be generic over a board support package.

use std::fmt;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::i2c::{self, ErrorKind, I2c, Operation, SevenBitAddress};

use crate::audio::AudioSink;
use crate::config::{I2sPins, PinId};

pub mod mock;

/// A digital input. Read failures read as high, which is idle for a pulled-up pad.
pub trait DigitalInput: Send {
    /// Returns true when the pin is high.
    fn level(&mut self) -> bool;
}

impl<P> DigitalInput for P
where
    P: InputPin + Send,
{
    fn level(&mut self) -> bool {
        self.is_high().unwrap_or(true)
    }
}

/// A digital output.
pub trait DigitalOutput: Send {
    fn set_level(&mut self, high: bool);
}

impl<P> DigitalOutput for P
where
    P: OutputPin + Send,
{
    fn set_level(&mut self, high: bool) {
        // Output writes on the supported targets can't fail.
        let _ = self.set_state(PinState::from(high));
    }
}

/// A native analog input returning raw conversions of `resolution()` bits.
pub trait AnalogPin: Send {
    fn resolution(&self) -> u8;
    fn sample(&mut self) -> u16;
}

/// An I2C bus handed out by a platform.
pub struct BoxedI2c(Box<dyn I2c<SevenBitAddress, Error = ErrorKind> + Send>);

impl BoxedI2c {
    pub fn new<B>(bus: B) -> BoxedI2c
    where
        B: I2c<SevenBitAddress, Error = ErrorKind> + Send + 'static,
    {
        BoxedI2c(Box::new(bus))
    }
}

impl i2c::ErrorType for BoxedI2c {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for BoxedI2c {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.0.transaction(address, operations)
    }
}

impl fmt::Debug for BoxedI2c {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedI2c").finish()
    }
}

/// A delay provider handed out by a platform.
pub struct BoxedDelay(Box<dyn DelayNs + Send>);

impl BoxedDelay {
    pub fn new<D>(delay: D) -> BoxedDelay
    where
        D: DelayNs + Send + 'static,
    {
        BoxedDelay(Box::new(delay))
    }
}

impl DelayNs for BoxedDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.delay_ns(ns)
    }

    fn delay_us(&mut self, us: u32) {
        self.0.delay_us(us)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms)
    }
}

/// Blocking delay backed by `spin_sleep`, accurate to a few microseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl DelayNs for SpinDelay {
    fn delay_ns(&mut self, ns: u32) {
        spin_sleep::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// The audio output transport requested from a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioTransport {
    I2s(I2sPins),
    Pwm(PinId),
}

impl fmt::Display for AudioTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioTransport::I2s(pins) => write!(
                f,
                "I2S (bit_clock={}, word_select={}, data={})",
                pins.bit_clock, pins.word_select, pins.data
            ),
            AudioTransport::Pwm(pin) => write!(f, "PWM ({})", pin),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("pin {0} is already in use")]
    PinInUse(PinId),

    #[error("pin {pin} can't be used as {role}")]
    Unsupported { pin: PinId, role: &'static str },

    #[error("I2C bus unavailable: {0}")]
    Bus(String),

    #[error("audio transport unavailable: {0}")]
    Audio(String),
}

/// A board: the source of every pin, bus and transport the instrument uses.
/// Each pin may be claimed once.
pub trait Platform {
    /// A digital input with its pull-up enabled.
    fn input_pin(&mut self, pin: PinId) -> Result<Box<dyn DigitalInput>, HalError>;

    /// A digital output, initially high.
    fn output_pin(&mut self, pin: PinId) -> Result<Box<dyn DigitalOutput>, HalError>;

    /// A native ADC input.
    fn analog_pin(&mut self, pin: PinId) -> Result<Box<dyn AnalogPin>, HalError>;

    /// An I2C bus on the given pins.
    fn i2c(&mut self, sda: PinId, scl: PinId, frequency: u32) -> Result<BoxedI2c, HalError>;

    /// A blocking delay provider.
    fn delay(&mut self) -> BoxedDelay;

    /// The blocking audio output.
    fn audio_out(
        &mut self,
        transport: AudioTransport,
        sample_rate: u32,
        block_size: usize,
    ) -> Result<Box<dyn AudioSink>, HalError>;
}
