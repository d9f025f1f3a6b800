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

//! Shared multiplexer select lines.

use embedded_hal::delay::DelayNs;
use tracing::{debug, warn};

use crate::config::{ConfigError, PinId};
use crate::hal::{BoxedDelay, DigitalOutput, Platform};

/// The select lines shared by every multiplexer chip. Bit i of the channel
/// drives line i.
pub(super) struct SelectLines {
    lines: Vec<Box<dyn DigitalOutput>>,
    delay: BoxedDelay,
    settle_us: u32,
}

impl SelectLines {
    /// Claims the select pins and drives them low. Any pin failing is fatal.
    pub(super) fn new(
        platform: &mut dyn Platform,
        pins: &[PinId],
        settle_us: u32,
    ) -> Result<SelectLines, ConfigError> {
        let mut lines = Vec::with_capacity(pins.len());
        for pin in pins {
            let mut line = platform.output_pin(*pin)?;
            line.set_level(false);
            lines.push(line);
        }
        debug!(lines = lines.len(), settle_us, "Mux select lines");
        Ok(SelectLines {
            lines,
            delay: platform.delay(),
            settle_us,
        })
    }

    pub(super) fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The number of channels the lines can address.
    pub(super) fn channels(&self) -> u32 {
        1u32 << self.lines.len().min(16)
    }

    /// Addresses `channel` and waits for the analog path to settle.
    pub(super) fn select(&mut self, channel: u8) {
        for (bit, line) in self.lines.iter_mut().enumerate() {
            line.set_level(u32::from(channel) & (1 << bit) != 0);
        }
        self.delay.delay_us(self.settle_us);
    }
}

/// A chip's active-low enable line.
pub(super) struct EnableLine {
    line: Option<Box<dyn DigitalOutput>>,
}

impl EnableLine {
    /// Claims the pin, starting disabled. A chip without a usable enable pin
    /// is left always enabled.
    pub(super) fn new(platform: &mut dyn Platform, pin: Option<PinId>) -> EnableLine {
        let line = pin.and_then(|pin| match platform.output_pin(pin) {
            Ok(mut line) => {
                line.set_level(true);
                Some(line)
            }
            Err(e) => {
                warn!(pin = %pin, err = %e, "Mux enable pin unavailable");
                None
            }
        });
        EnableLine { line }
    }

    pub(super) fn enable(&mut self) {
        if let Some(line) = self.line.as_mut() {
            line.set_level(false);
        }
    }

    pub(super) fn disable(&mut self) {
        if let Some(line) = self.line.as_mut() {
            line.set_level(true);
        }
    }
}
