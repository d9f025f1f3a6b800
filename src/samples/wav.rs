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
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader};
use tracing::{debug, info, warn};

use super::{SampleError, SampleLibrary, SampleStream};
use crate::notes::Note;

type Reader = WavReader<BufReader<File>>;

/// Opens a WAV file and checks it's 16-bit mono PCM.
pub(super) fn open_reader(path: &Path, sample_rate: u32) -> Result<Reader, SampleError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(SampleError::Format {
            path: path.to_path_buf(),
            reason: format!("{} channels, expected mono", spec.channels),
        });
    }
    if spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int {
        return Err(SampleError::Format {
            path: path.to_path_buf(),
            reason: format!("{}-bit {:?}, expected 16-bit PCM", spec.bits_per_sample, spec.sample_format),
        });
    }
    if spec.sample_rate != sample_rate {
        warn!(
            path = %path.display(),
            file_rate = spec.sample_rate,
            output_rate = sample_rate,
            "Sample rate differs from output, pitch will shift"
        );
    }
    Ok(reader)
}

/// Streams samples from WAV files in the sounds directory.
pub struct WavDirectory {
    dir: PathBuf,
    sample_rate: u32,
    paths: HashMap<u8, PathBuf>,
}

impl WavDirectory {
    pub fn new(dir: &Path, sample_rate: u32) -> WavDirectory {
        WavDirectory {
            dir: dir.to_path_buf(),
            sample_rate,
            paths: HashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SampleLibrary for WavDirectory {
    fn load(&mut self, note: &Note) -> bool {
        let filename = note.sample_filename();
        let path = self.dir.join(&filename);
        if !path.exists() {
            info!("Missing: {}", filename);
            return false;
        }
        match open_reader(&path, self.sample_rate) {
            Ok(reader) => {
                debug!(path = %path.display(), samples = reader.len(), "Sample available");
                self.paths.insert(note.midi(), path);
                true
            }
            Err(e) => {
                warn!(file = filename, err = %e, "Unusable sample");
                false
            }
        }
    }

    fn open(&mut self, midi: u8) -> Result<Box<dyn SampleStream>, SampleError> {
        let path = self.paths.get(&midi).ok_or(SampleError::NotLoaded(midi))?;
        Ok(Box::new(WavStream::open(path, self.sample_rate)?))
    }

    fn loaded(&self) -> usize {
        self.paths.len()
    }
}

/// A sample streamed from disk.
pub struct WavStream {
    reader: Reader,
    exhausted: bool,
}

impl WavStream {
    pub fn open(path: &Path, sample_rate: u32) -> Result<WavStream, SampleError> {
        let reader = open_reader(path, sample_rate)?;
        let exhausted = reader.len() == 0;
        Ok(WavStream { reader, exhausted })
    }
}

impl SampleStream for WavStream {
    fn rewind(&mut self) -> Result<(), SampleError> {
        self.reader.seek(0)?;
        self.exhausted = self.reader.len() == 0;
        Ok(())
    }

    fn read_block(&mut self, buffer: &mut [i16]) -> Result<usize, SampleError> {
        let mut samples = self.reader.samples::<i16>();
        let mut read = 0;
        for slot in buffer.iter_mut() {
            match samples.next() {
                Some(sample) => {
                    *slot = sample?;
                    read += 1;
                }
                None => break,
            }
        }
        self.exhausted = samples.len() == 0;
        Ok(read)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
