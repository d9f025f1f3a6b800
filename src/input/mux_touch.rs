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

use tracing::{info, warn};

use super::mux::SelectLines;
use super::{
    linear_velocity, open_velocity_channel, trigger_pins, Edge, PadScanner, Scan, TriggerPin,
};
use crate::adc::{AdcChannel, AdcFactory};
use crate::config::{ConfigError, HardwareConfig, InputMode};
use crate::hal::Platform;
use crate::notes::NoteResolver;

struct TouchPad {
    trigger: TriggerPin,
    channel: Option<u8>,
}

/// Digital trigger pins, with strike intensity read through a multiplexer
/// at the press edge.
pub struct MuxTouchScanner {
    pads: Vec<TouchPad>,
    select: SelectLines,
    adc: Option<Box<dyn AdcChannel>>,
    default_velocity: u8,
}

impl MuxTouchScanner {
    pub fn new(
        config: &HardwareConfig,
        resolver: &NoteResolver,
        platform: &mut dyn Platform,
        adc: &mut AdcFactory,
    ) -> Result<MuxTouchScanner, ConfigError> {
        let mux = config.mux();
        let select = SelectLines::new(platform, mux.select_pins(), mux.settle_us())?;
        let channel = if select.is_empty() {
            warn!("No mux select pins, using fixed velocity");
            None
        } else {
            open_velocity_channel("mux", || {
                adc.open(platform, mux.analog_pin(), mux.adc_channel())
            })
        };

        let mut pads = Vec::new();
        for (trigger, assignment) in trigger_pins(config, resolver, platform)? {
            let channel = assignment.mux_channel();
            if let Some(channel) = channel.filter(|_| !select.is_empty()) {
                if u32::from(channel) >= select.channels() {
                    return Err(ConfigError::mapping(
                        "mux_touch",
                        format!(
                            "{} uses mux channel {} but only {} are addressable",
                            trigger.pin,
                            channel,
                            select.channels()
                        ),
                    ));
                }
            }
            pads.push(TouchPad { trigger, channel });
        }
        info!(
            select_pins = mux.select_pins().len(),
            adc = %adc.kind(),
            "Mux touch"
        );

        Ok(MuxTouchScanner {
            pads,
            select,
            adc: channel,
            default_velocity: config.default_velocity(),
        })
    }

    fn read_velocity(&mut self, channel: Option<u8>) -> u8 {
        let (Some(channel), Some(adc)) = (channel, self.adc.as_mut()) else {
            return self.default_velocity;
        };
        self.select.select(channel);
        linear_velocity(adc.read())
    }
}

impl PadScanner for MuxTouchScanner {
    fn scan(&mut self) -> Scan {
        let mut scan = Scan::default();
        for index in 0..self.pads.len() {
            match self.pads[index].trigger.edge() {
                Some(Edge::Press) => {
                    let velocity = self.read_velocity(self.pads[index].channel);
                    scan.pressed.push(self.pads[index].trigger.press(velocity));
                }
                Some(Edge::Release) => scan.released.push(self.pads[index].trigger.release()),
                None => {}
            }
        }
        scan
    }

    fn pad_count(&self) -> usize {
        self.pads.len()
    }

    fn mode(&self) -> InputMode {
        InputMode::MuxTouch
    }
}
