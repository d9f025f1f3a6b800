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

//! Fixed-point sample mixing.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::voice::VoicePool;
use crate::config::RetriggerBehavior;
use crate::notes::Note;
use crate::samples::SampleLibrary;

/// Gain of 1.0 with 8 fractional bits.
pub const UNITY_GAIN: u16 = 256;

/// Exponent of the velocity curve. Below 1 so soft strikes stay audible.
const VELOCITY_CURVE: f32 = 0.7;

/// Maps a velocity (1-127) to a fixed-point gain: `round(256 * (v/127)^0.7)`
/// clamped to [1, 256].
pub fn velocity_gain(velocity: u8) -> u16 {
    let v = f32::from(velocity.clamp(1, 127)) / 127.0;
    let gain = (f32::from(UNITY_GAIN) * v.powf(VELOCITY_CURVE)).round();
    (gain as u16).clamp(1, UNITY_GAIN)
}

/// Adds `samples` scaled by `gain` into `accumulator`, saturating.
pub fn mix_into(accumulator: &mut [i32], samples: &[i16], gain: u16) {
    let gain = i32::from(gain);
    for (acc, sample) in accumulator.iter_mut().zip(samples) {
        *acc = acc.saturating_add((i32::from(*sample) * gain) >> 8);
    }
}

/// Clamps the accumulated mix into 16-bit output.
pub fn clamp_into(accumulator: &[i32], out: &mut [i16]) {
    for (out, acc) in out.iter_mut().zip(accumulator) {
        *out = (*acc).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    }
}

/// Plays sampled notes through the voice pool.
pub struct Mixer {
    pool: VoicePool,
    library: Box<dyn SampleLibrary>,
    scratch: Vec<i16>,
    accumulator: Vec<i32>,
}

impl Mixer {
    pub fn new(
        library: Box<dyn SampleLibrary>,
        max_voices: usize,
        retrigger: RetriggerBehavior,
        block_size: usize,
    ) -> Mixer {
        Mixer {
            pool: VoicePool::new(max_voices, retrigger),
            library,
            scratch: vec![0; block_size],
            accumulator: vec![0; block_size],
        }
    }

    /// Loads the sample of every note. Returns how many were found.
    pub fn load_all(&mut self, notes: &[Arc<Note>]) -> usize {
        let loaded = notes
            .iter()
            .filter(|note| self.library.load(note))
            .count();
        info!("Loaded {}/{} WAV samples", loaded, notes.len());
        loaded
    }

    pub fn pool(&self) -> &VoicePool {
        &self.pool
    }

    /// Starts a note. Returns the slot used, or None if its sample can't be
    /// opened, in which case no slot is touched.
    pub fn note_on(&mut self, midi: u8, velocity: u8) -> Option<usize> {
        let slot = self.pool.select_slot(midi);
        let stream = match self.pool.take_stream(slot, midi) {
            Some(mut stream) => match stream.rewind() {
                Ok(()) => stream,
                Err(e) => {
                    debug!(midi, err = %e, "Rewind failed, reopening sample");
                    match self.library.open(midi) {
                        Ok(stream) => stream,
                        Err(e) => {
                            debug!(midi, err = %e, "Sample unavailable, keeping current voice");
                            self.pool.restore_stream(slot, midi, stream);
                            return None;
                        }
                    }
                }
            },
            None => match self.library.open(midi) {
                Ok(stream) => stream,
                Err(e) => {
                    debug!(midi, err = %e, "No sample for note");
                    return None;
                }
            },
        };
        self.pool.start(slot, midi, velocity_gain(velocity), stream);
        Some(slot)
    }

    pub fn note_off(&mut self, midi: u8) {
        self.pool.stop(midi);
    }

    pub fn all_off(&mut self) {
        self.pool.stop_all();
    }

    /// Mixes the next block of every active voice into `out`. Voices whose
    /// sample ends within the block are padded with silence and go idle.
    pub fn render(&mut self, out: &mut [i16]) {
        let len = out.len();
        if self.scratch.len() < len {
            self.scratch.resize(len, 0);
            self.accumulator.resize(len, 0);
        }
        let accumulator = &mut self.accumulator[..len];
        accumulator.fill(0);

        for voice in self.pool.voices_mut().iter_mut().filter(|v| v.is_active()) {
            let scratch = &mut self.scratch[..len];
            let read = match voice.read(scratch) {
                Ok(read) => read,
                Err(e) => {
                    warn!(midi = voice.midi(), err = %e, "Sample read failed, stopping voice");
                    voice.reset();
                    continue;
                }
            };
            mix_into(&mut accumulator[..read], &scratch[..read], voice.gain());
            if read < len || voice.is_exhausted() {
                voice.reset();
            }
        }

        clamp_into(accumulator, out);
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::samples::{MemoryLibrary, MemoryStream, SampleError, SampleStream};

    fn mixer(max_voices: usize, samples: &[(u8, Vec<i16>)]) -> Mixer {
        let mut library = MemoryLibrary::new();
        for (midi, data) in samples {
            library.insert(*midi, data.clone());
        }
        Mixer::new(
            Box::new(library),
            max_voices,
            RetriggerBehavior::Polyphonic,
            4,
        )
    }

    #[test]
    fn test_gain_curve() {
        assert_eq!(velocity_gain(127), 256);
        assert!(velocity_gain(1) >= 1);
        assert_eq!(velocity_gain(0), velocity_gain(1));
        assert_eq!(velocity_gain(200), 256);
        // round(256 * (64/127)^0.7)
        assert_eq!(velocity_gain(64), 158);

        let mut previous = 0;
        for velocity in 1..=127u8 {
            let gain = velocity_gain(velocity);
            assert!(gain >= previous, "gain dropped at velocity {}", velocity);
            assert!((1..=256).contains(&gain));
            previous = gain;
        }
    }

    #[test]
    fn test_mix_into_saturates() {
        let mut accumulator = [i32::MAX - 10, 0, -5];
        mix_into(&mut accumulator, &[i16::MAX, 512, -512], 256);
        assert_eq!(accumulator, [i32::MAX, 512, -517]);

        let mut accumulator = [0; 2];
        mix_into(&mut accumulator, &[1000, -1000], 128);
        assert_eq!(accumulator, [500, -500]);
    }

    #[test]
    fn test_clamp_into() {
        let mut out = [0i16; 3];
        clamp_into(&[40000, -40000, 123], &mut out);
        assert_eq!(out, [i16::MAX, i16::MIN, 123]);
    }

    #[test]
    fn test_voices_sum_and_clamp() {
        let mut mixer = mixer(4, &[(60, vec![20000; 8]), (62, vec![20000; 8])]);
        mixer.note_on(60, 127);
        mixer.note_on(62, 127);
        let mut out = [0i16; 4];
        mixer.render(&mut out);
        assert_eq!(out, [i16::MAX; 4]);
    }

    #[test]
    fn test_exhausted_mid_block_pads_silence() {
        let mut mixer = mixer(2, &[(60, vec![1000; 6])]);
        assert_eq!(mixer.note_on(60, 127), Some(0));

        let mut out = [0i16; 4];
        mixer.render(&mut out);
        assert_eq!(out, [1000; 4]);
        assert_eq!(mixer.pool().active_count(), 1);

        mixer.render(&mut out);
        assert_eq!(out, [1000, 1000, 0, 0]);
        assert_eq!(mixer.pool().active_count(), 0);
    }

    #[test]
    fn test_idle_after_exact_block_count() {
        // Three full blocks.
        let mut mixer = mixer(2, &[(60, vec![100; 12])]);
        mixer.note_on(60, 127);
        let mut out = [0i16; 4];
        for block in 1..=3 {
            mixer.render(&mut out);
            assert_eq!(out, [100; 4]);
            let expected = if block < 3 { 1 } else { 0 };
            assert_eq!(mixer.pool().active_count(), expected);
        }
    }

    #[test]
    fn test_missing_sample_is_noop() {
        let mut mixer = mixer(1, &[(60, vec![1; 100])]);
        mixer.note_on(60, 100);
        assert_eq!(mixer.note_on(61, 100), None);
        assert_eq!(mixer.pool().active_notes(), vec![60]);
    }

    #[test]
    fn test_n_plus_one_steals_first() {
        let samples: Vec<(u8, Vec<i16>)> = (60..67).map(|midi| (midi, vec![1; 1000])).collect();
        let mut mixer = mixer(6, &samples);
        for midi in 60..67 {
            assert!(mixer.note_on(midi, 100).is_some());
        }
        assert_eq!(mixer.pool().active_count(), 6);
        let notes = mixer.pool().active_notes();
        assert!(!notes.contains(&60));
        assert!(notes.contains(&66));
    }

    #[test]
    fn test_retrigger_restarts_sample() {
        let mut mixer = mixer(1, &[(60, vec![1, 2, 3, 4, 5, 6, 7, 8])]);
        mixer.note_on(60, 127);
        let mut out = [0i16; 4];
        mixer.render(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);

        mixer.note_on(60, 127);
        mixer.render(&mut out);
        assert_eq!(out, [1, 2, 3, 4]);
    }

    #[test]
    fn test_gain_applied() {
        let mut mixer = mixer(1, &[(60, vec![1000; 4])]);
        mixer.note_on(60, 64);
        let mut out = [0i16; 4];
        mixer.render(&mut out);
        // 1000 * 158 >> 8
        assert_eq!(out, [617; 4]);
    }

    #[test]
    fn test_note_off_and_all_off() {
        let mut mixer = mixer(4, &[(60, vec![1; 100]), (62, vec![1; 100])]);
        mixer.note_on(60, 100);
        mixer.note_on(62, 100);
        mixer.note_off(60);
        assert_eq!(mixer.pool().active_notes(), vec![62]);
        mixer.all_off();
        assert_eq!(mixer.pool().active_count(), 0);
        let mut out = [5i16; 4];
        mixer.render(&mut out);
        assert_eq!(out, [0; 4]);
    }

    /// A stream that can't seek back, from a library that opens it once.
    struct OneShot {
        opened: bool,
    }

    struct OneShotStream(MemoryStream);

    impl SampleStream for OneShotStream {
        fn rewind(&mut self) -> Result<(), SampleError> {
            Err(SampleError::Io(io::Error::new(
                io::ErrorKind::Unsupported,
                "not seekable",
            )))
        }

        fn read_block(&mut self, buffer: &mut [i16]) -> Result<usize, SampleError> {
            self.0.read_block(buffer)
        }

        fn is_exhausted(&self) -> bool {
            self.0.is_exhausted()
        }
    }

    impl SampleLibrary for OneShot {
        fn load(&mut self, _note: &Note) -> bool {
            true
        }

        fn open(&mut self, midi: u8) -> Result<Box<dyn SampleStream>, SampleError> {
            if std::mem::replace(&mut self.opened, true) {
                return Err(SampleError::NotLoaded(midi));
            }
            Ok(Box::new(OneShotStream(MemoryStream::new(vec![7i16; 12].into()))))
        }

        fn loaded(&self) -> usize {
            1
        }
    }

    #[test]
    fn test_failed_retrigger_keeps_voice() {
        for retrigger in [RetriggerBehavior::Cut, RetriggerBehavior::Polyphonic] {
            let mut mixer = Mixer::new(Box::new(OneShot { opened: false }), 1, retrigger, 4);
            assert_eq!(mixer.note_on(60, 127), Some(0));
            let mut out = [0i16; 4];
            mixer.render(&mut out);

            assert_eq!(mixer.note_on(60, 127), None);
            assert_eq!(mixer.pool().active_notes(), vec![60]);
            mixer.render(&mut out);
            assert_eq!(out, [7; 4]);
            assert_eq!(mixer.pool().voices()[0].position(), 8);
        }
    }
}
