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

use super::{trigger_pins, Edge, PadScanner, Scan, TriggerPin};
use crate::config::{ConfigError, HardwareConfig, InputMode};
use crate::hal::Platform;
use crate::notes::NoteResolver;

/// Buttons on pulled-up pins, struck at a fixed velocity.
pub struct ButtonScanner {
    pads: Vec<TriggerPin>,
    velocity: u8,
}

impl ButtonScanner {
    pub fn new(
        config: &HardwareConfig,
        resolver: &NoteResolver,
        platform: &mut dyn Platform,
    ) -> Result<ButtonScanner, ConfigError> {
        let pads = trigger_pins(config, resolver, platform)?
            .into_iter()
            .map(|(pad, _)| pad)
            .collect();
        Ok(ButtonScanner {
            pads,
            velocity: config.default_velocity(),
        })
    }
}

impl PadScanner for ButtonScanner {
    fn scan(&mut self) -> Scan {
        let mut scan = Scan::default();
        for pad in self.pads.iter_mut() {
            match pad.edge() {
                Some(Edge::Press) => scan.pressed.push(pad.press(self.velocity)),
                Some(Edge::Release) => scan.released.push(pad.release()),
                None => {}
            }
        }
        scan
    }

    fn pad_count(&self) -> usize {
        self.pads.len()
    }

    fn mode(&self) -> InputMode {
        InputMode::Button
    }
}
