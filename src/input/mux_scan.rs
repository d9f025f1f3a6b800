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

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::mux::{EnableLine, SelectLines};
use super::{resolve_note, threshold_velocity, PadEvent, PadScanner, Scan};
use crate::adc::{AdcChannel, AdcFactory};
use crate::config::{ConfigError, HardwareConfig, InputMode};
use crate::hal::Platform;
use crate::notes::{Note, NoteResolver};

struct Chip {
    id: String,
    enable: EnableLine,
    adc: Option<Box<dyn AdcChannel>>,
}

struct ScanPad {
    note: Arc<Note>,
    chip: usize,
    channel: u8,
    armed: bool,
    last: u16,
    peak: u16,
}

/// Pure analog scanning: every pad sits on a multiplexer channel and is
/// struck when its reading crosses the threshold.
pub struct MuxScanScanner {
    pads: Vec<ScanPad>,
    chips: Vec<Chip>,
    select: SelectLines,
    threshold: u16,
    peak_samples: u8,
    default_velocity: u8,
}

impl MuxScanScanner {
    pub fn new(
        config: &HardwareConfig,
        resolver: &NoteResolver,
        platform: &mut dyn Platform,
        adc: &mut AdcFactory,
    ) -> Result<MuxScanScanner, ConfigError> {
        let mux = config.mux();
        if mux.select_pins().is_empty() {
            return Err(ConfigError::mapping("mux_scan", "no select pins configured"));
        }
        let select = SelectLines::new(platform, mux.select_pins(), mux.settle_us())?;

        let mut chips = Vec::new();
        for (index, (id, chip)) in mux.chips()?.into_iter().enumerate() {
            let enable = EnableLine::new(platform, chip.enable_pin());
            let used = config
                .pads()
                .iter()
                .any(|pad| pad.mux().eq_ignore_ascii_case(&id));
            let channel = if used {
                match adc.open(platform, chip.analog_pin(index), chip.adc_channel(index)) {
                    Ok(channel) => Some(channel),
                    Err(e) => {
                        warn!(mux = %id, err = %e, "Mux ADC unavailable, skipping its pads");
                        None
                    }
                }
            } else {
                None
            };
            chips.push(Chip {
                id,
                enable,
                adc: channel,
            });
        }

        let mut pads = Vec::new();
        for pad in config.pads() {
            let Some(note) = resolve_note(resolver, pad.note()) else {
                continue;
            };
            let Some(chip) = chips
                .iter()
                .position(|chip| chip.id.eq_ignore_ascii_case(pad.mux()) && chip.adc.is_some())
            else {
                warn!(mux = pad.mux(), note = %note, "Pad on an unavailable mux, skipping");
                continue;
            };
            if u32::from(pad.channel()) >= select.channels() {
                return Err(ConfigError::mapping(
                    "mux_scan",
                    format!(
                        "{} uses channel {} but only {} are addressable",
                        note,
                        pad.channel(),
                        select.channels()
                    ),
                ));
            }
            pads.push(ScanPad {
                note,
                chip,
                channel: pad.channel(),
                armed: false,
                last: 0,
                peak: 0,
            });
        }

        for chip in chips.iter() {
            debug!(
                mux = %chip.id,
                pads = pads.iter().filter(|pad| chips[pad.chip].id == chip.id).count(),
                "Mux chip"
            );
        }
        info!(
            threshold = mux.threshold(),
            settle_us = mux.settle_us(),
            peak_samples = mux.peak_samples(),
            adc = %adc.kind(),
            "Mux scan"
        );

        Ok(MuxScanScanner {
            pads,
            chips,
            select,
            threshold: mux.threshold(),
            peak_samples: mux.peak_samples(),
            default_velocity: config.default_velocity(),
        })
    }
}

impl PadScanner for MuxScanScanner {
    fn scan(&mut self) -> Scan {
        let mut scan = Scan::default();
        for index in 0..self.pads.len() {
            let (channel, chip) = (self.pads[index].channel, self.pads[index].chip);
            self.select.select(channel);
            let chip = &mut self.chips[chip];
            let Some(adc) = chip.adc.as_mut() else {
                continue;
            };
            chip.enable.enable();

            let pad = &mut self.pads[index];
            let current = adc.read();
            if !pad.armed && pad.last < self.threshold && current >= self.threshold {
                let mut peak = current;
                for _ in 1..self.peak_samples {
                    peak = peak.max(adc.read());
                }
                pad.armed = true;
                pad.peak = peak;
                let velocity = threshold_velocity(peak, self.threshold, self.default_velocity);
                scan.pressed.push(PadEvent::press(pad.note.clone(), velocity));
            } else if pad.armed {
                if current < self.threshold {
                    pad.armed = false;
                    let velocity =
                        threshold_velocity(pad.peak, self.threshold, self.default_velocity);
                    scan.released.push(PadEvent::release(pad.note.clone(), velocity));
                } else {
                    pad.peak = pad.peak.max(current);
                }
            }
            pad.last = current;
            chip.enable.disable();
        }

        for chip in self.chips.iter_mut() {
            chip.enable.disable();
        }
        scan
    }

    fn pad_count(&self) -> usize {
        self.pads.len()
    }

    fn mode(&self) -> InputMode {
        InputMode::MuxScan
    }
}
