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

//! Square-wave voice used when no samples are available.

use tracing::debug;

use super::mixer::velocity_gain;
use crate::notes::frequency;

/// Peak amplitude at unity gain.
const TONE_AMPLITUDE: i32 = 8192;

const MIN_FREQUENCY: f32 = 20.0;
const MAX_FREQUENCY: f32 = 20_000.0;

/// A single monophonic square-wave voice.
#[derive(Debug)]
pub struct ToneVoice {
    sample_rate: u32,
    midi: Option<u8>,
    phase: u32,
    step: u32,
    amplitude: i16,
}

impl ToneVoice {
    pub fn new(sample_rate: u32) -> ToneVoice {
        ToneVoice {
            sample_rate: sample_rate.max(1),
            midi: None,
            phase: 0,
            step: 0,
            amplitude: 0,
        }
    }

    /// The note sounding, if any.
    pub fn midi(&self) -> Option<u8> {
        self.midi
    }

    pub fn is_active(&self) -> bool {
        self.midi.is_some()
    }

    /// Starts a tone at the note's frequency. Notes outside the audible range
    /// are ignored. Returns true if the tone started.
    pub fn note_on(&mut self, midi: u8, velocity: u8) -> bool {
        let freq = frequency(midi);
        if !(MIN_FREQUENCY..=MAX_FREQUENCY).contains(&freq) {
            debug!(midi, freq, "Tone outside audible range");
            return false;
        }
        let step = f64::from(freq) / f64::from(self.sample_rate) * f64::from(u32::MAX);
        self.step = step as u32;
        self.phase = 0;
        self.amplitude = ((TONE_AMPLITUDE * i32::from(velocity_gain(velocity))) >> 8) as i16;
        self.midi = Some(midi);
        true
    }

    pub fn note_off(&mut self, midi: u8) {
        if self.midi == Some(midi) {
            self.midi = None;
        }
    }

    pub fn all_off(&mut self) {
        self.midi = None;
    }

    pub fn render(&mut self, out: &mut [i16]) {
        if self.midi.is_none() {
            out.fill(0);
            return;
        }
        for sample in out.iter_mut() {
            *sample = if self.phase < 1 << 31 {
                self.amplitude
            } else {
                -self.amplitude
            };
            self.phase = self.phase.wrapping_add(self.step);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_wave_period() {
        // 69 is 440 Hz, so a 44000 Hz rate gives a 100 sample period.
        let mut tone = ToneVoice::new(44_000);
        assert!(tone.note_on(69, 127));
        let mut out = [0i16; 100];
        tone.render(&mut out);
        assert!(out[..50].iter().all(|s| *s == 8192));
        assert!(out[51..].iter().all(|s| *s == -8192));
    }

    #[test]
    fn test_velocity_scales_amplitude() {
        let mut tone = ToneVoice::new(22_050);
        tone.note_on(60, 64);
        let mut out = [0i16; 4];
        tone.render(&mut out);
        assert_eq!(out[0], ((8192 * 158) >> 8) as i16);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let mut tone = ToneVoice::new(22_050);
        // MIDI 0 is about 8 Hz.
        assert!(!tone.note_on(0, 100));
        // MIDI 127 is about 12.5 kHz.
        assert!(tone.note_on(127, 100));
        assert!(!tone.note_on(3, 100));
        assert_eq!(tone.midi(), Some(127));
    }

    #[test]
    fn test_note_off() {
        let mut tone = ToneVoice::new(22_050);
        tone.note_on(60, 100);
        tone.note_off(61);
        assert!(tone.is_active());
        tone.note_off(60);
        assert!(!tone.is_active());

        let mut out = [7i16; 4];
        tone.render(&mut out);
        assert_eq!(out, [0; 4]);
    }
}
