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

//! A simulated board. Every pin, the I2C bus and the audio transport live in
//! memory, and a [`Handle`] lets tests and the console drive pad inputs.
//!
//! The I2C bus answers at 0x48 as an ADS1115 and the analog sources can be
//! wired through simulated multiplexers, so the scanners see the same select,
//! enable and conversion traffic they would on hardware.

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::i2c::{self, ErrorKind, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};
use parking_lot::Mutex;

use super::{
    AnalogPin, AudioTransport, BoxedDelay, BoxedI2c, DigitalInput, DigitalOutput, HalError,
    SpinDelay,
};
use crate::audio::{AudioSink, NullSink, SinkError};
use crate::config::PinId;

/// Native ADC pins on the Pico.
const ANALOG_PINS: std::ops::RangeInclusive<u8> = 26..=28;
const ADC_RESOLUTION: u8 = 12;

const ADS_ADDRESS: u8 = 0x48;
const ADS_CONVERSION_REGISTER: u8 = 0x00;
const ADS_CONFIG_REGISTER: u8 = 0x01;
const ADS_READY: u16 = 0x8000;

/// Where an analog value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogSource {
    /// A native ADC pin.
    Pin(PinId),
    /// An ADS1115 single-ended input.
    Ads(u8),
}

struct Mux {
    select: Vec<PinId>,
    enable: Option<PinId>,
    inputs: HashMap<u8, u16>,
}

#[derive(Default)]
struct Ads {
    pointer: u8,
    config: u16,
    channel: u8,
    conversions: usize,
}

#[derive(Default)]
struct State {
    claimed: HashSet<PinId>,
    levels: HashMap<PinId, bool>,
    outputs: HashMap<PinId, bool>,
    analog: HashMap<AnalogSource, u16>,
    muxes: HashMap<AnalogSource, Mux>,
    i2c_fault: bool,
    ads: Ads,
}

impl State {
    fn claim(&mut self, pin: PinId) -> Result<(), HalError> {
        if self.claimed.insert(pin) {
            Ok(())
        } else {
            Err(HalError::PinInUse(pin))
        }
    }

    fn output(&self, pin: PinId) -> bool {
        self.outputs.get(&pin).copied().unwrap_or(true)
    }

    /// The 16-bit value presented to an analog source. A disabled mux floats to 0.
    fn analog_value(&self, source: AnalogSource) -> u16 {
        let Some(mux) = self.muxes.get(&source) else {
            return self.analog.get(&source).copied().unwrap_or(0);
        };
        if mux.enable.is_some_and(|pin| self.output(pin)) {
            return 0;
        }
        let channel = mux
            .select
            .iter()
            .enumerate()
            .filter(|(_, pin)| self.output(**pin))
            .fold(0u8, |channel, (bit, _)| channel | (1 << bit));
        mux.inputs.get(&channel).copied().unwrap_or(0)
    }
}

/// The simulated board.
pub struct Platform {
    state: Arc<Mutex<State>>,
    realtime: bool,
}

impl Platform {
    /// A board whose delays and audio output run in real time.
    pub fn new() -> Platform {
        Platform {
            state: Arc::new(Mutex::new(State::default())),
            realtime: true,
        }
    }

    /// A board whose delays return immediately and whose audio output never
    /// blocks.
    pub fn instant() -> Platform {
        Platform {
            realtime: false,
            ..Platform::new()
        }
    }

    /// Returns a handle for driving the board's inputs.
    pub fn handle(&self) -> Handle {
        Handle {
            state: self.state.clone(),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Platform::new()
    }
}

impl super::Platform for Platform {
    fn input_pin(&mut self, pin: PinId) -> Result<Box<dyn DigitalInput>, HalError> {
        self.state.lock().claim(pin)?;
        Ok(Box::new(Pin {
            id: pin,
            state: self.state.clone(),
        }))
    }

    fn output_pin(&mut self, pin: PinId) -> Result<Box<dyn DigitalOutput>, HalError> {
        let mut state = self.state.lock();
        state.claim(pin)?;
        state.outputs.insert(pin, true);
        Ok(Box::new(Pin {
            id: pin,
            state: self.state.clone(),
        }))
    }

    fn analog_pin(&mut self, pin: PinId) -> Result<Box<dyn AnalogPin>, HalError> {
        if !ANALOG_PINS.contains(&pin.number()) {
            return Err(HalError::Unsupported {
                pin,
                role: "an analog input",
            });
        }
        self.state.lock().claim(pin)?;
        Ok(Box::new(AnalogInput {
            source: AnalogSource::Pin(pin),
            state: self.state.clone(),
        }))
    }

    fn i2c(&mut self, sda: PinId, scl: PinId, _frequency: u32) -> Result<BoxedI2c, HalError> {
        let mut state = self.state.lock();
        state.claim(sda)?;
        state.claim(scl)?;
        Ok(BoxedI2c::new(Bus {
            state: self.state.clone(),
        }))
    }

    fn delay(&mut self) -> BoxedDelay {
        if self.realtime {
            BoxedDelay::new(SpinDelay)
        } else {
            BoxedDelay::new(NoDelay)
        }
    }

    fn audio_out(
        &mut self,
        transport: AudioTransport,
        sample_rate: u32,
        _block_size: usize,
    ) -> Result<Box<dyn AudioSink>, HalError> {
        let pins = match transport {
            AudioTransport::I2s(pins) => vec![pins.bit_clock, pins.word_select, pins.data],
            AudioTransport::Pwm(pin) => vec![pin],
        };
        let mut state = self.state.lock();
        for pin in pins {
            state.claim(pin)?;
        }
        let sink = if self.realtime {
            NullSink::new(sample_rate)
        } else {
            NullSink::unpaced()
        };
        Ok(Box::new(Transport { transport, sink }))
    }
}

/// Drives the simulated board from outside.
#[derive(Clone)]
pub struct Handle {
    state: Arc<Mutex<State>>,
}

impl Handle {
    /// Pulls a pad's input pin low.
    pub fn press(&self, pin: PinId) {
        self.state.lock().levels.insert(pin, false);
    }

    /// Releases a pad's input pin back to its pull-up.
    pub fn release(&self, pin: PinId) {
        self.state.lock().levels.insert(pin, true);
    }

    /// Sets the 16-bit value presented to an analog source.
    pub fn set_analog(&self, source: AnalogSource, value: u16) {
        self.state.lock().analog.insert(source, value);
    }

    /// Puts a multiplexer in front of an analog source.
    pub fn wire_mux(&self, output: AnalogSource, select: &[PinId], enable: Option<PinId>) {
        self.state.lock().muxes.insert(
            output,
            Mux {
                select: select.to_vec(),
                enable,
                inputs: HashMap::new(),
            },
        );
    }

    /// Sets the value on one input of a wired multiplexer.
    pub fn set_mux_input(&self, output: AnalogSource, channel: u8, value: u16) {
        if let Some(mux) = self.state.lock().muxes.get_mut(&output) {
            mux.inputs.insert(channel, value);
        }
    }

    /// The last level written to an output pin.
    pub fn output_level(&self, pin: PinId) -> Option<bool> {
        self.state.lock().outputs.get(&pin).copied()
    }

    /// Makes every I2C transaction fail with a NACK.
    pub fn set_i2c_fault(&self, fault: bool) {
        self.state.lock().i2c_fault = fault;
    }

    /// The number of ADS1115 conversions started.
    pub fn conversions(&self) -> usize {
        self.state.lock().ads.conversions
    }

    pub fn is_claimed(&self, pin: PinId) -> bool {
        self.state.lock().claimed.contains(&pin)
    }
}

/// A delay that returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

struct Pin {
    id: PinId,
    state: Arc<Mutex<State>>,
}

impl digital::ErrorType for Pin {
    type Error = Infallible;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.state.lock().levels.get(&self.id).copied().unwrap_or(true))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for Pin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.state.lock().outputs.insert(self.id, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.lock().outputs.insert(self.id, true);
        Ok(())
    }
}

struct AnalogInput {
    source: AnalogSource,
    state: Arc<Mutex<State>>,
}

impl AnalogPin for AnalogInput {
    fn resolution(&self) -> u8 {
        ADC_RESOLUTION
    }

    fn sample(&mut self) -> u16 {
        self.state.lock().analog_value(self.source) >> (16 - ADC_RESOLUTION)
    }
}

/// The I2C bus with an ADS1115 attached.
struct Bus {
    state: Arc<Mutex<State>>,
}

impl i2c::ErrorType for Bus {
    type Error = ErrorKind;
}

impl I2c<SevenBitAddress> for Bus {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.i2c_fault || address != ADS_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    let Some((&register, data)) = bytes.split_first() else {
                        continue;
                    };
                    state.ads.pointer = register;
                    if register == ADS_CONFIG_REGISTER && data.len() == 2 {
                        let config = u16::from_be_bytes([data[0], data[1]]);
                        state.ads.config = config;
                        // Single-ended inputs are MUX values 4 through 7.
                        state.ads.channel = (((config >> 12) & 0x7) as u8).saturating_sub(4);
                        state.ads.conversions += 1;
                    }
                }
                Operation::Read(buffer) => {
                    let value = match state.ads.pointer {
                        ADS_CONVERSION_REGISTER => {
                            let level = state.analog_value(AnalogSource::Ads(state.ads.channel));
                            (level / 2) as i16 as u16
                        }
                        ADS_CONFIG_REGISTER => state.ads.config | ADS_READY,
                        _ => 0,
                    };
                    for (byte, value) in buffer.iter_mut().zip(value.to_be_bytes()) {
                        *byte = value;
                    }
                }
            }
        }
        Ok(())
    }
}

/// A simulated I2S or PWM transport.
struct Transport {
    transport: AudioTransport,
    sink: NullSink,
}

impl AudioSink for Transport {
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError> {
        self.sink.write_block(block)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (simulated)", self.transport)
    }
}
