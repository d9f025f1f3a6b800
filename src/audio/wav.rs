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

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{error, info};

use super::{AudioSink, NullSink, SinkError};

/// Records the output to a 16-bit mono WAV file. Writes are paced in real
/// time, so the recording holds what a live transport would have played.
pub struct WavSink {
    path: PathBuf,
    writer: Option<WavWriter<BufWriter<File>>>,
    pacer: NullSink,
}

impl WavSink {
    pub fn create(path: &Path, sample_rate: u32) -> Result<WavSink, SinkError> {
        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        Ok(WavSink {
            path: path.to_path_buf(),
            writer: Some(WavWriter::create(path, spec)?),
            pacer: NullSink::new(sample_rate),
        })
    }

    /// Records as fast as blocks arrive.
    pub fn unpaced(mut self) -> WavSink {
        self.pacer = NullSink::unpaced();
        self
    }
}

impl AudioSink for WavSink {
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Disconnected)?;
        for sample in block {
            writer.write_sample(*sample)?;
        }
        self.pacer.write_block(block)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        if let Some(writer) = self.writer.take() {
            let duration = writer.duration();
            writer.finalize()?;
            info!(path = %self.path.display(), samples = duration, "Finished recording");
        }
        Ok(())
    }
}

impl Drop for WavSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!(path = %self.path.display(), err = %e, "Error finalizing recording");
        }
    }
}

impl fmt::Display for WavSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WAV ({})", self.path.display())
    }
}
