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

use std::{fmt, io, sync::Arc, thread, time::Duration};

use parking_lot::Mutex;

use super::{AudioSink, SinkError};

/// A mock sink. Records every block it's given.
#[derive(Clone)]
pub struct Sink {
    name: String,
    blocks: Arc<Mutex<Vec<Vec<i16>>>>,
    fail_after: Option<usize>,
    pacing: Option<Duration>,
}

impl Sink {
    pub fn new(name: &str) -> Sink {
        Sink {
            name: name.to_string(),
            blocks: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
            pacing: None,
        }
    }

    /// Makes every write block for `period`, like a real transport.
    pub fn paced(mut self, period: Duration) -> Sink {
        self.pacing = Some(period);
        self
    }

    /// A sink whose writes fail once `blocks` blocks have been accepted.
    pub fn failing_after(name: &str, blocks: usize) -> Sink {
        Sink {
            fail_after: Some(blocks),
            ..Sink::new(name)
        }
    }

    /// Returns a copy of the blocks written so far.
    pub fn blocks(&self) -> Vec<Vec<i16>> {
        self.blocks.lock().clone()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.lock().len()
    }
}

impl AudioSink for Sink {
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError> {
        let mut blocks = self.blocks.lock();
        if self.fail_after.is_some_and(|limit| blocks.len() >= limit) {
            return Err(SinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock transport failure",
            )));
        }
        blocks.push(block.to_vec());
        drop(blocks);
        if let Some(period) = self.pacing {
            thread::sleep(period);
        }
        Ok(())
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
