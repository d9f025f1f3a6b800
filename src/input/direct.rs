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

use tracing::debug;

use super::{
    linear_velocity, open_velocity_channel, trigger_pins, Edge, PadScanner, Scan, TriggerPin,
};
use crate::adc::{AdcChannel, AdcFactory};
use crate::config::{ConfigError, HardwareConfig, InputMode};
use crate::hal::Platform;
use crate::notes::NoteResolver;

struct DirectPad {
    trigger: TriggerPin,
    velocity: Option<Box<dyn AdcChannel>>,
}

/// Trigger pins with an optional analog velocity input per pad, sampled at
/// the press edge.
pub struct DirectScanner {
    pads: Vec<DirectPad>,
    default_velocity: u8,
}

impl DirectScanner {
    pub fn new(
        config: &HardwareConfig,
        resolver: &NoteResolver,
        platform: &mut dyn Platform,
        adc: &mut AdcFactory,
    ) -> Result<DirectScanner, ConfigError> {
        let mut pads = Vec::new();
        for (trigger, assignment) in trigger_pins(config, resolver, platform)? {
            let velocity = if let Some(pin) = assignment.adc_pin() {
                open_velocity_channel("adc_pin", || adc.native(platform, pin))
            } else if let Some(channel) = assignment.adc_channel() {
                open_velocity_channel("adc_channel", || adc.ads(platform, channel))
            } else {
                None
            };
            debug!(
                pin = %trigger.pin,
                note = %trigger.note,
                analog = velocity.is_some(),
                "Direct pad"
            );
            pads.push(DirectPad { trigger, velocity });
        }

        Ok(DirectScanner {
            pads,
            default_velocity: config.default_velocity(),
        })
    }
}

impl PadScanner for DirectScanner {
    fn scan(&mut self) -> Scan {
        let mut scan = Scan::default();
        for pad in self.pads.iter_mut() {
            match pad.trigger.edge() {
                Some(Edge::Press) => {
                    let velocity = pad
                        .velocity
                        .as_mut()
                        .map_or(self.default_velocity, |adc| linear_velocity(adc.read()));
                    scan.pressed.push(pad.trigger.press(velocity));
                }
                Some(Edge::Release) => scan.released.push(pad.trigger.release()),
                None => {}
            }
        }
        scan
    }

    fn pad_count(&self) -> usize {
        self.pads.len()
    }

    fn mode(&self) -> InputMode {
        InputMode::Direct
    }
}
