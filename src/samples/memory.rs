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

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use super::{wav, SampleError, SampleLibrary, SampleStream};
use crate::notes::Note;

/// Samples held in memory. Streams share the buffer.
#[derive(Default)]
pub struct MemoryLibrary {
    dir: Option<PathBuf>,
    sample_rate: u32,
    samples: HashMap<u8, Arc<[i16]>>,
}

impl MemoryLibrary {
    /// An empty library. Samples are added with [`MemoryLibrary::insert`].
    pub fn new() -> MemoryLibrary {
        MemoryLibrary::default()
    }

    /// A library that reads whole WAV files from `dir` as notes are loaded.
    pub fn from_directory(dir: &Path, sample_rate: u32) -> MemoryLibrary {
        MemoryLibrary {
            dir: Some(dir.to_path_buf()),
            sample_rate,
            samples: HashMap::new(),
        }
    }

    pub fn insert(&mut self, midi: u8, samples: Vec<i16>) {
        self.samples.insert(midi, samples.into());
    }

    /// Returns the memory used by the loaded samples in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples
            .values()
            .map(|samples| std::mem::size_of_val(&**samples))
            .sum()
    }

    fn read_file(&self, path: &Path) -> Result<Vec<i16>, SampleError> {
        let mut reader = wav::open_reader(path, self.sample_rate)?;
        Ok(reader.samples::<i16>().collect::<Result<Vec<i16>, _>>()?)
    }
}

impl SampleLibrary for MemoryLibrary {
    fn load(&mut self, note: &Note) -> bool {
        if self.samples.contains_key(&note.midi()) {
            return true;
        }
        let Some(dir) = &self.dir else {
            return false;
        };
        let filename = note.sample_filename();
        let path = dir.join(&filename);
        if !path.exists() {
            info!("Missing: {}", filename);
            return false;
        }
        match self.read_file(&path) {
            Ok(samples) => {
                self.insert(note.midi(), samples);
                true
            }
            Err(e) => {
                warn!(file = filename, err = %e, "Unusable sample");
                false
            }
        }
    }

    fn open(&mut self, midi: u8) -> Result<Box<dyn SampleStream>, SampleError> {
        let samples = self.samples.get(&midi).ok_or(SampleError::NotLoaded(midi))?;
        Ok(Box::new(MemoryStream::new(samples.clone())))
    }

    fn loaded(&self) -> usize {
        self.samples.len()
    }
}

/// A cursor over a shared in-memory sample.
pub struct MemoryStream {
    samples: Arc<[i16]>,
    position: usize,
}

impl MemoryStream {
    pub fn new(samples: Arc<[i16]>) -> MemoryStream {
        MemoryStream {
            samples,
            position: 0,
        }
    }
}

impl SampleStream for MemoryStream {
    fn rewind(&mut self) -> Result<(), SampleError> {
        self.position = 0;
        Ok(())
    }

    fn read_block(&mut self, buffer: &mut [i16]) -> Result<usize, SampleError> {
        let remaining = &self.samples[self.position.min(self.samples.len())..];
        let read = remaining.len().min(buffer.len());
        buffer[..read].copy_from_slice(&remaining[..read]);
        self.position += read;
        Ok(read)
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.samples.len()
    }
}
