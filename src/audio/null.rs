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
use std::time::{Duration, Instant};

use super::{AudioSink, SinkError};

/// Discards audio. Writes block for the duration of the block so the mixer
/// runs at the same cadence it would against a real transport.
pub struct NullSink {
    sample_rate: u32,
    paced: bool,
    deadline: Option<Instant>,
    samples_written: u64,
}

impl NullSink {
    pub fn new(sample_rate: u32) -> NullSink {
        NullSink {
            sample_rate: sample_rate.max(1),
            paced: true,
            deadline: None,
            samples_written: 0,
        }
    }

    /// A sink that never blocks.
    pub fn unpaced() -> NullSink {
        NullSink {
            paced: false,
            ..NullSink::new(1)
        }
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl AudioSink for NullSink {
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError> {
        self.samples_written += block.len() as u64;
        if !self.paced {
            return Ok(());
        }

        let period = Duration::from_secs_f64(block.len() as f64 / f64::from(self.sample_rate));
        let now = Instant::now();
        let deadline = match self.deadline {
            // Fell behind by more than a block, start over rather than burst.
            Some(deadline) if deadline + period >= now => deadline + period,
            _ => now + period,
        };
        self.deadline = Some(deadline);
        spin_sleep::sleep(deadline.saturating_duration_since(Instant::now()));
        Ok(())
    }
}

impl fmt::Display for NullSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Null ({} Hz)", self.sample_rate)
    }
}
