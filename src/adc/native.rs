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

use std::fmt;

use super::AdcChannel;
use crate::config::PinId;
use crate::hal::AnalogPin;

/// The microcontroller's own converter on a fixed pin.
pub struct NativeAdc {
    pin: PinId,
    input: Box<dyn AnalogPin>,
}

impl NativeAdc {
    pub fn new(pin: PinId, input: Box<dyn AnalogPin>) -> NativeAdc {
        NativeAdc { pin, input }
    }

    pub fn pin(&self) -> PinId {
        self.pin
    }
}

impl AdcChannel for NativeAdc {
    fn read(&mut self) -> u16 {
        let bits = self.input.resolution();
        scale_to_u16(self.input.sample(), bits)
    }
}

impl fmt::Debug for NativeAdc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAdc").field("pin", &self.pin).finish()
    }
}

/// Left-aligns a `bits`-wide conversion in 16 bits, repeating the high bits
/// into the low ones so full scale maps to 65535.
fn scale_to_u16(raw: u16, bits: u8) -> u16 {
    if bits == 0 {
        return 0;
    }
    if bits >= 16 {
        return raw;
    }
    let bits = u32::from(bits);
    let raw = u32::from(raw) & ((1 << bits) - 1);
    let aligned = raw << (16 - bits);
    let mut value = aligned;
    let mut shift = bits;
    while shift < 16 {
        value |= aligned >> shift;
        shift += bits;
    }
    value as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u16, u8);

    impl AnalogPin for Fixed {
        fn resolution(&self) -> u8 {
            self.1
        }

        fn sample(&mut self) -> u16 {
            self.0
        }
    }

    #[test]
    fn test_scale_to_u16() {
        assert_eq!(scale_to_u16(0, 12), 0);
        assert_eq!(scale_to_u16(4095, 12), 0xFFFF);
        assert_eq!(scale_to_u16(2048, 12), 0x8008);
        assert_eq!(scale_to_u16(1023, 10), 0xFFFF);
        assert_eq!(scale_to_u16(1234, 16), 1234);
        // Out of range bits are masked.
        assert_eq!(scale_to_u16(0x1FFF, 12), 0xFFFF);
    }

    #[test]
    fn test_native_read() {
        let mut adc = NativeAdc::new(PinId::new(26), Box::new(Fixed(4095, 12)));
        assert_eq!(adc.read(), 65535);
        assert_eq!(adc.pin(), PinId::new(26));
    }
}
