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

//! Pad scanners. Each input mode turns pin and ADC readings into press and
//! release events once per scan tick.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adc::{AdcChannel, AdcFactory};
use crate::config::{ConfigError, HardwareConfig, InputMode, NoteId, PinAssignment, PinId};
use crate::hal::{DigitalInput, HalError, Platform};
use crate::notes::{Note, NoteResolver};

mod button;
mod direct;
mod mux;
mod mux_scan;
mod mux_touch;

pub use self::button::ButtonScanner;
pub use self::direct::DirectScanner;
pub use self::mux_scan::MuxScanScanner;
pub use self::mux_touch::MuxTouchScanner;

/// Largest velocity a pad can produce.
pub const MAX_VELOCITY: u8 = 127;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadKind {
    Press,
    Release,
}

/// A pad changing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadEvent {
    pub note: Arc<Note>,
    pub velocity: u8,
    pub kind: PadKind,
}

impl PadEvent {
    pub fn press(note: Arc<Note>, velocity: u8) -> PadEvent {
        PadEvent {
            note,
            velocity,
            kind: PadKind::Press,
        }
    }

    pub fn release(note: Arc<Note>, velocity: u8) -> PadEvent {
        PadEvent {
            note,
            velocity,
            kind: PadKind::Release,
        }
    }
}

impl fmt::Display for PadEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PadKind::Press => "ON",
            PadKind::Release => "OFF",
        };
        write!(f, "{} {} vel={}", kind, self.note, self.velocity)
    }
}

/// The events of one scan tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scan {
    pub pressed: Vec<PadEvent>,
    pub released: Vec<PadEvent>,
}

impl Scan {
    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty() && self.released.is_empty()
    }
}

/// Reads every pad once. Must return well within one scan tick.
pub trait PadScanner: Send {
    fn scan(&mut self) -> Scan;

    /// The number of pads being scanned.
    fn pad_count(&self) -> usize;

    fn mode(&self) -> InputMode;
}

/// Maps a full-scale reading to a velocity: `floor(raw / 65535 * 126) + 1`.
pub fn linear_velocity(raw: u16) -> u8 {
    let velocity = u32::from(raw) * 126 / u32::from(u16::MAX) + 1;
    clamp_velocity(velocity)
}

/// Maps a reading above `threshold` to a velocity over the remaining range.
/// Falls back to `default` when the threshold leaves no range.
pub fn threshold_velocity(peak: u16, threshold: u16, default: u8) -> u8 {
    if threshold >= u16::MAX {
        return default;
    }
    let above = u32::from(peak.saturating_sub(threshold));
    let range = u32::from(u16::MAX - threshold);
    clamp_velocity(above * 126 / range + 1)
}

fn clamp_velocity(velocity: u32) -> u8 {
    u8::try_from(velocity.clamp(1, u32::from(MAX_VELOCITY))).unwrap_or(MAX_VELOCITY)
}

/// Looks up a pad's note, warning when the layout doesn't have it.
fn resolve_note(resolver: &NoteResolver, id: &NoteId) -> Option<Arc<Note>> {
    match resolver.resolve(&id.to_string()) {
        Ok(note) => Some(note),
        Err(e) => {
            warn!(err = %e, "Note not in layout, skipping pad");
            None
        }
    }
}

/// A pulled-up, active-low trigger pin with edge detection.
struct TriggerPin {
    pin: PinId,
    input: Box<dyn DigitalInput>,
    note: Arc<Note>,
    was_pressed: bool,
    velocity: u8,
}

/// A trigger pin changing state this tick.
enum Edge {
    Press,
    Release,
}

impl TriggerPin {
    /// Claims the pin. A pin that can't be initialized is skipped.
    fn open(platform: &mut dyn Platform, pin: PinId, note: Arc<Note>) -> Option<TriggerPin> {
        match platform.input_pin(pin) {
            Ok(input) => Some(TriggerPin {
                pin,
                input,
                note,
                was_pressed: false,
                velocity: 0,
            }),
            Err(e) => {
                warn!(pin = %pin, err = %e, "Pin init failed, skipping pad");
                None
            }
        }
    }

    fn edge(&mut self) -> Option<Edge> {
        let pressed = !self.input.level();
        let edge = match (pressed, self.was_pressed) {
            (true, false) => Some(Edge::Press),
            (false, true) => Some(Edge::Release),
            _ => None,
        };
        self.was_pressed = pressed;
        edge
    }

    fn press(&mut self, velocity: u8) -> PadEvent {
        self.velocity = velocity;
        PadEvent::press(self.note.clone(), velocity)
    }

    fn release(&self) -> PadEvent {
        PadEvent::release(self.note.clone(), self.velocity)
    }
}

/// Opens the trigger pins of every mapped pad, paired with its mapping.
fn trigger_pins<'c>(
    config: &'c HardwareConfig,
    resolver: &NoteResolver,
    platform: &mut dyn Platform,
) -> Result<Vec<(TriggerPin, &'c PinAssignment)>, ConfigError> {
    let mut pads = Vec::new();
    for (pin, assignment) in config.pins()? {
        let Some(note) = resolve_note(resolver, assignment.note()) else {
            continue;
        };
        if let Some(trigger) = TriggerPin::open(platform, pin, note) {
            pads.push((trigger, assignment));
        }
    }
    Ok(pads)
}

/// Opens an ADC channel for a velocity source, or warns and returns None.
fn open_velocity_channel<F>(what: &str, open: F) -> Option<Box<dyn AdcChannel>>
where
    F: FnOnce() -> Result<Box<dyn AdcChannel>, HalError>,
{
    match open() {
        Ok(channel) => Some(channel),
        Err(e) => {
            warn!(source = what, err = %e, "Velocity input unavailable, using fixed velocity");
            None
        }
    }
}

/// Builds the scanner for the configured input mode.
pub fn build_scanner(
    config: &HardwareConfig,
    resolver: &NoteResolver,
    platform: &mut dyn Platform,
) -> Result<Box<dyn PadScanner>, ConfigError> {
    let mut adc = AdcFactory::new(config.adc());
    let scanner: Box<dyn PadScanner> = match config.input_mode() {
        InputMode::Button => Box::new(ButtonScanner::new(config, resolver, platform)?),
        InputMode::Touch => {
            warn!("Capacitive touch isn't available on this platform, using buttons");
            Box::new(ButtonScanner::new(config, resolver, platform)?)
        }
        InputMode::Direct => Box::new(DirectScanner::new(config, resolver, platform, &mut adc)?),
        InputMode::MuxTouch => Box::new(MuxTouchScanner::new(
            config, resolver, platform, &mut adc,
        )?),
        InputMode::MuxScan => Box::new(MuxScanScanner::new(
            config, resolver, platform, &mut adc,
        )?),
    };
    info!(
        mode = %scanner.mode(),
        pads = scanner.pad_count(),
        "Input ready"
    );
    Ok(scanner)
}
