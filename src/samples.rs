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

//! Sample streams for note playback.
//!
//! Each MIDI number maps to exactly one 16-bit mono PCM sample. Voices read
//! their sample a block at a time, either streamed from the sounds directory
//! or from buffers preloaded into memory.

use std::path::PathBuf;

use crate::config::HardwareConfig;
use crate::notes::Note;

mod memory;
mod wav;

pub use self::memory::{MemoryLibrary, MemoryStream};
pub use self::wav::{WavDirectory, WavStream};

#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("no sample loaded for MIDI note {0}")]
    NotLoaded(u8),

    #[error("unsupported sample {path}: {reason}")]
    Format { path: PathBuf, reason: String },

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A rewindable PCM source for one note.
pub trait SampleStream: Send {
    /// Seeks back to the first sample.
    fn rewind(&mut self) -> Result<(), SampleError>;

    /// Fills `buffer` from the stream and returns the number of samples
    /// written. A short read means the stream ended.
    fn read_block(&mut self, buffer: &mut [i16]) -> Result<usize, SampleError>;

    /// Returns true once every sample has been read.
    fn is_exhausted(&self) -> bool;
}

/// Provides sample streams by MIDI number.
pub trait SampleLibrary: Send {
    /// Makes the sample for `note` available. Returns false if it's missing
    /// or unusable.
    fn load(&mut self, note: &Note) -> bool;

    /// Opens a stream positioned at the start of the sample for `midi`.
    fn open(&mut self, midi: u8) -> Result<Box<dyn SampleStream>, SampleError>;

    /// The number of samples available.
    fn loaded(&self) -> usize;
}

/// Opens the sample library described by the hardware config.
pub fn open_library(config: &HardwareConfig) -> Box<dyn SampleLibrary> {
    if config.preload_samples() {
        Box::new(MemoryLibrary::from_directory(
            &config.sounds_dir(),
            config.sample_rate(),
        ))
    } else {
        Box::new(WavDirectory::new(&config.sounds_dir(), config.sample_rate()))
    }
}
