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

//! Voice slots for polyphonic sample playback.
//!
//! The pool is a fixed array of slots created once. A note takes the first
//! idle slot; when none is idle the oldest allocation is stolen.

use std::fmt;

use tracing::debug;

use crate::config::RetriggerBehavior;
use crate::samples::{SampleError, SampleStream};

/// One slot of the mixer.
pub struct Voice {
    slot: usize,
    active: bool,
    midi: Option<u8>,
    gain: u16,
    sequence: u64,
    position: usize,
    /// The last stream played in this slot and its note, kept for rewinding.
    stream: Option<(u8, Box<dyn SampleStream>)>,
}

impl Voice {
    fn new(slot: usize) -> Voice {
        Voice {
            slot,
            active: false,
            midi: None,
            gain: 0,
            sequence: 0,
            position: 0,
            stream: None,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The note playing, if any.
    pub fn midi(&self) -> Option<u8> {
        self.midi
    }

    /// Fixed-point gain with 8 fractional bits.
    pub fn gain(&self) -> u16 {
        self.gain
    }

    /// The allocation sequence number of the current note.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Samples played since the note started.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reads the next block of the note into `buffer`.
    pub(super) fn read(&mut self, buffer: &mut [i16]) -> Result<usize, SampleError> {
        let Some((_, stream)) = self.stream.as_mut() else {
            return Ok(0);
        };
        let read = stream.read_block(buffer)?;
        self.position += read;
        Ok(read)
    }

    pub(super) fn is_exhausted(&self) -> bool {
        self.stream
            .as_ref()
            .map_or(true, |(_, stream)| stream.is_exhausted())
    }

    /// Returns the slot to idle. The stream is kept for a later rewind.
    pub(super) fn reset(&mut self) {
        self.active = false;
        self.midi = None;
        self.position = 0;
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("slot", &self.slot)
            .field("active", &self.active)
            .field("midi", &self.midi)
            .field("gain", &self.gain)
            .field("sequence", &self.sequence)
            .field("position", &self.position)
            .finish()
    }
}

/// Manages the voice slots.
#[derive(Debug)]
pub struct VoicePool {
    voices: Vec<Voice>,
    next_sequence: u64,
    retrigger: RetriggerBehavior,
}

impl VoicePool {
    /// Creates a pool with `max_voices` slots (at least one).
    pub fn new(max_voices: usize, retrigger: RetriggerBehavior) -> VoicePool {
        VoicePool {
            voices: (0..max_voices.max(1)).map(Voice::new).collect(),
            next_sequence: 1,
            retrigger,
        }
    }

    pub fn capacity(&self) -> usize {
        self.voices.len()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub(super) fn voices_mut(&mut self) -> &mut [Voice] {
        &mut self.voices
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// The notes currently sounding, in slot order.
    pub fn active_notes(&self) -> Vec<u8> {
        self.voices
            .iter()
            .filter(|v| v.active)
            .filter_map(|v| v.midi)
            .collect()
    }

    /// Chooses the slot for a new note: the note's own slot when cutting,
    /// else the first idle slot, else the oldest allocation.
    pub fn select_slot(&self, midi: u8) -> usize {
        if self.retrigger == RetriggerBehavior::Cut {
            if let Some(voice) = self
                .voices
                .iter()
                .filter(|v| v.active && v.midi == Some(midi))
                .min_by_key(|v| v.sequence)
            {
                return voice.slot;
            }
        }
        if let Some(voice) = self.voices.iter().find(|v| !v.active) {
            return voice.slot;
        }
        self.voices
            .iter()
            .min_by_key(|v| (v.sequence, v.slot))
            .map(|v| v.slot)
            .unwrap_or(0)
    }

    /// Takes the stream last used in `slot` if it belongs to `midi`.
    pub(super) fn take_stream(&mut self, slot: usize, midi: u8) -> Option<Box<dyn SampleStream>> {
        let voice = self.voices.get_mut(slot)?;
        match voice.stream.take() {
            Some((cached, stream)) if cached == midi => Some(stream),
            other => {
                voice.stream = other;
                None
            }
        }
    }

    /// Hands a stream taken with [`take_stream`](Self::take_stream) back to
    /// `slot` untouched, so a retrigger that can't start leaves the voice as
    /// it was.
    pub(super) fn restore_stream(&mut self, slot: usize, midi: u8, stream: Box<dyn SampleStream>) {
        if let Some(voice) = self.voices.get_mut(slot) {
            voice.stream = Some((midi, stream));
        }
    }

    /// Starts `midi` in `slot` from the beginning of `stream`.
    pub fn start(&mut self, slot: usize, midi: u8, gain: u16, stream: Box<dyn SampleStream>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let Some(voice) = self.voices.get_mut(slot) else {
            return;
        };
        if voice.active {
            debug!(
                slot,
                stolen = voice.midi,
                midi,
                "Voice limit reached, stealing oldest voice"
            );
        }
        voice.active = true;
        voice.midi = Some(midi);
        voice.gain = gain;
        voice.sequence = sequence;
        voice.position = 0;
        voice.stream = Some((midi, stream));
    }

    /// Silences every voice playing `midi`. Returns how many were stopped.
    pub fn stop(&mut self, midi: u8) -> usize {
        let mut stopped = 0;
        for voice in self.voices.iter_mut().filter(|v| v.active && v.midi == Some(midi)) {
            voice.reset();
            stopped += 1;
        }
        stopped
    }

    /// Silences every voice. Returns how many were stopped.
    pub fn stop_all(&mut self) -> usize {
        let mut stopped = 0;
        for voice in self.voices.iter_mut().filter(|v| v.active) {
            voice.reset();
            stopped += 1;
        }
        stopped
    }
}
