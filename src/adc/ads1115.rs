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

//! ADS1115 16-bit delta-sigma converter.
//!
//! Single-shot, single-ended reads: write the config register with the start
//! bit set, wait one conversion period, poll the ready bit and read the
//! conversion register.

use std::fmt;
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::AdcChannel;
use crate::hal::{BoxedDelay, BoxedI2c};

mod reg {
    pub const CONVERSION: u8 = 0x00;
    pub const CONFIG: u8 = 0x01;

    /// Start a conversion on write, conversion idle on read.
    pub const OS: u16 = 0x8000;
    /// AINx against GND for x = 0..3.
    pub const MUX_SINGLE_ENDED: u16 = 0x4000;
    pub const MODE_SINGLE_SHOT: u16 = 0x0100;
    pub const COMP_QUE_DISABLE: u16 = 0x0003;
}

/// Times to poll the ready bit after the conversion period.
const READY_POLLS: usize = 10;
const READY_POLL_US: u32 = 200;

/// Full-scale range of the programmable gain amplifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gain {
    Fsr6_144V,
    #[default]
    Fsr4_096V,
    Fsr2_048V,
    Fsr1_024V,
    Fsr0_512V,
    Fsr0_256V,
}

impl Gain {
    fn bits(self) -> u16 {
        match self {
            Gain::Fsr6_144V => 0x0000,
            Gain::Fsr4_096V => 0x0200,
            Gain::Fsr2_048V => 0x0400,
            Gain::Fsr1_024V => 0x0600,
            Gain::Fsr0_512V => 0x0800,
            Gain::Fsr0_256V => 0x0A00,
        }
    }
}

/// Conversions per second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataRate {
    Sps8,
    Sps16,
    Sps32,
    Sps64,
    Sps128,
    Sps250,
    Sps475,
    #[default]
    Sps860,
}

impl DataRate {
    fn bits(self) -> u16 {
        (self as u16) << 5
    }

    pub fn samples_per_second(self) -> u32 {
        match self {
            DataRate::Sps8 => 8,
            DataRate::Sps16 => 16,
            DataRate::Sps32 => 32,
            DataRate::Sps64 => 64,
            DataRate::Sps128 => 128,
            DataRate::Sps250 => 250,
            DataRate::Sps475 => 475,
            DataRate::Sps860 => 860,
        }
    }

    /// One conversion period plus the 10% the internal oscillator may run slow.
    pub fn conversion_time_us(self) -> u32 {
        1_100_000 / self.samples_per_second()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Ads1115Error<E: fmt::Debug> {
    #[error("I2C bus error: {0:?}")]
    Bus(E),

    #[error("ADS1115 has no input A{0}")]
    InvalidChannel(u8),
}

/// ADS1115 driver, generic over the I2C bus and delay provider.
pub struct Ads1115<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    gain: Gain,
    data_rate: DataRate,
}

impl<I2C, D> Ads1115<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Default I2C address (ADDR pin to GND).
    pub const DEFAULT_ADDRESS: u8 = 0x48;

    pub fn new(i2c: I2C, delay: D) -> Self {
        Self::new_with_address(i2c, delay, Self::DEFAULT_ADDRESS)
    }

    pub fn new_with_address(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            gain: Gain::default(),
            data_rate: DataRate::default(),
        }
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_data_rate(mut self, data_rate: DataRate) -> Self {
        self.data_rate = data_rate;
        self
    }

    /// Releases the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    /// The config word that starts a single-shot conversion on `channel`.
    fn config_word(&self, channel: u8) -> u16 {
        reg::OS
            | (reg::MUX_SINGLE_ENDED + (u16::from(channel) << 12))
            | self.gain.bits()
            | reg::MODE_SINGLE_SHOT
            | self.data_rate.bits()
            | reg::COMP_QUE_DISABLE
    }

    pub fn write_register(&mut self, register: u8, value: u16) -> Result<(), I2C::Error> {
        let [high, low] = value.to_be_bytes();
        self.i2c.write(self.address, &[register, high, low])
    }

    pub fn read_register(&mut self, register: u8) -> Result<u16, I2C::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.address, &[register], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Runs a single-shot conversion and returns the signed result.
    pub fn read_raw(&mut self, channel: u8) -> Result<i16, Ads1115Error<I2C::Error>> {
        if channel > 3 {
            return Err(Ads1115Error::InvalidChannel(channel));
        }

        self.write_register(reg::CONFIG, self.config_word(channel))
            .map_err(Ads1115Error::Bus)?;
        self.delay.delay_us(self.data_rate.conversion_time_us());

        let mut ready = false;
        for _ in 0..READY_POLLS {
            let config = self.read_register(reg::CONFIG).map_err(Ads1115Error::Bus)?;
            if config & reg::OS != 0 {
                ready = true;
                break;
            }
            self.delay.delay_us(READY_POLL_US);
        }
        if !ready {
            debug!(channel, "ADS1115 conversion not flagged ready, reading anyway");
        }

        let raw = self
            .read_register(reg::CONVERSION)
            .map_err(Ads1115Error::Bus)?;
        Ok(raw as i16)
    }

    /// Reads a single-ended input scaled to 0..=65535.
    pub fn read_single_ended(&mut self, channel: u8) -> Result<u16, Ads1115Error<I2C::Error>> {
        Ok(scale_single_ended(self.read_raw(channel)?))
    }
}

/// Single-ended readings only span the positive half of the signed range.
/// Negative readings (input slightly below ground) clamp to 0 and the rest is
/// stretched over the full unsigned range. This is not an offset mapping:
/// ground reads as 0, so pad thresholds are measured from silence.
fn scale_single_ended(raw: i16) -> u16 {
    let raw = raw.max(0) as u16;
    (raw << 1) | (raw >> 14)
}

/// The driver as shared between the channels of one device.
pub type SharedAds1115 = Arc<Mutex<Ads1115<BoxedI2c, BoxedDelay>>>;

/// One input of a shared ADS1115. Bus faults are logged and read as 0.
pub struct Ads1115Channel {
    device: SharedAds1115,
    channel: u8,
    faults: u64,
}

impl Ads1115Channel {
    pub fn new(device: SharedAds1115, channel: u8) -> Ads1115Channel {
        Ads1115Channel {
            device,
            channel,
            faults: 0,
        }
    }

    /// The number of faulted reads since the last good one.
    pub fn faults(&self) -> u64 {
        self.faults
    }
}

impl AdcChannel for Ads1115Channel {
    fn read(&mut self) -> u16 {
        let result = self.device.lock().read_single_ended(self.channel);
        match result {
            Ok(value) => {
                if self.faults > 0 {
                    info!(channel = self.channel, faults = self.faults, "ADS1115 recovered");
                    self.faults = 0;
                }
                value
            }
            Err(e) => {
                self.faults += 1;
                if self.faults == 1 {
                    warn!(channel = self.channel, err = %e, "ADS1115 read failed, reading 0");
                } else {
                    debug!(channel = self.channel, faults = self.faults, err = %e, "ADS1115 read failed");
                }
                0
            }
        }
    }
}

impl fmt::Debug for Ads1115Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ads1115Channel")
            .field("channel", &self.channel)
            .field("faults", &self.faults)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use embedded_hal::i2c::{self, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

    use super::*;
    use crate::hal::mock::NoDelay;

    /// Mock I2C that records writes and answers reads from a queue.
    #[derive(Default)]
    struct MockI2c {
        writes: Vec<Vec<u8>>,
        reads: VecDeque<[u8; 2]>,
        fail: bool,
    }

    impl ErrorType for MockI2c {
        type Error = ErrorKind;
    }

    impl I2c for MockI2c {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for operation in operations.iter_mut() {
                match operation {
                    Operation::Write(bytes) => self.writes.push(bytes.to_vec()),
                    Operation::Read(buffer) => {
                        let value = self.reads.pop_front().unwrap_or([0, 0]);
                        buffer.copy_from_slice(&value);
                    }
                }
            }
            Ok(())
        }
    }

    /// Counts requested delay.
    #[derive(Default)]
    struct CountingDelay {
        total_us: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_us += u64::from(ns) / 1000;
        }
    }

    #[test]
    fn test_config_word() {
        let ads = Ads1115::new(MockI2c::default(), NoDelay);
        // OS | single-ended A0 | 4.096V | single shot | 860 SPS | comparator off.
        assert_eq!(ads.config_word(0), 0x8000 | 0x4000 | 0x0200 | 0x0100 | 0x00E0 | 0x0003);
        assert_eq!(ads.config_word(3) & 0x7000, 0x7000);
        let ads = ads.with_gain(Gain::Fsr2_048V).with_data_rate(DataRate::Sps128);
        assert_eq!(ads.config_word(1), 0x8000 | 0x5000 | 0x0400 | 0x0100 | 0x0080 | 0x0003);
    }

    #[test]
    fn test_single_shot_read() {
        let mut i2c = MockI2c::default();
        // Not ready, ready, then the conversion.
        i2c.reads.extend([[0x05, 0x83], [0x85, 0x83], [0x40, 0x00]]);
        let mut ads = Ads1115::new(i2c, CountingDelay::default());

        assert_eq!(ads.read_raw(1).unwrap(), 0x4000);

        let (i2c, delay) = ads.release();
        assert_eq!(i2c.writes[0], vec![reg::CONFIG, 0xD3, 0xE3]);
        assert_eq!(i2c.writes[1], vec![reg::CONFIG]);
        assert_eq!(i2c.writes[2], vec![reg::CONFIG]);
        assert_eq!(i2c.writes[3], vec![reg::CONVERSION]);
        // One conversion period and one poll interval.
        assert_eq!(
            delay.total_us,
            u64::from(DataRate::Sps860.conversion_time_us() + READY_POLL_US)
        );
    }

    #[test]
    fn test_scaling() {
        assert_eq!(scale_single_ended(0), 0);
        assert_eq!(scale_single_ended(-5), 0);
        assert_eq!(scale_single_ended(i16::MAX), 65535);
        assert_eq!(scale_single_ended(0x4000), 0x8001);
        assert_eq!(scale_single_ended(1500), 3000);
    }

    #[test]
    fn test_invalid_channel() {
        let mut ads = Ads1115::new(MockI2c::default(), NoDelay);
        assert!(matches!(
            ads.read_raw(4),
            Err(Ads1115Error::InvalidChannel(4))
        ));
    }

    #[test]
    fn test_conversion_time() {
        assert_eq!(DataRate::Sps860.conversion_time_us(), 1279);
        assert_eq!(DataRate::Sps8.conversion_time_us(), 137_500);
    }

    #[test]
    fn test_bus_fault_reads_zero() {
        let device: SharedAds1115 = Arc::new(Mutex::new(Ads1115::new(
            BoxedI2c::new(MockI2c {
                fail: true,
                ..MockI2c::default()
            }),
            BoxedDelay::new(NoDelay),
        )));
        let mut channel = Ads1115Channel::new(device.clone(), 0);
        assert_eq!(channel.read(), 0);
        assert_eq!(channel.read(), 0);
        assert_eq!(channel.faults(), 2);
    }

    #[test]
    fn test_error_kind_is_debug() {
        let e: Ads1115Error<ErrorKind> =
            Ads1115Error::Bus(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        assert!(e.to_string().contains("NoAcknowledge"));
    }
}
