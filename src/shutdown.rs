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
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A shutdown request shared by the scan loop, the console and the demos.
/// Each observes it at its next tick or sleep.
#[derive(Clone, Default)]
pub struct Shutdown {
    requested: Arc<Mutex<bool>>,
    condvar: Arc<Condvar>,
}

impl Shutdown {
    pub fn new() -> Shutdown {
        Shutdown::default()
    }

    /// Returns true once shutdown has been requested.
    pub fn is_requested(&self) -> bool {
        *self.requested.lock()
    }

    /// Requests shutdown and wakes every waiter.
    pub fn request(&self) {
        let mut requested = self.requested.lock();
        if !*requested {
            *requested = true;
            self.condvar.notify_all();
        }
    }

    /// Blocks until shutdown is requested.
    pub fn wait(&self) {
        let mut requested = self.requested.lock();
        while !*requested {
            self.condvar.wait(&mut requested);
        }
    }

    /// Sleeps for `timeout` unless shutdown is requested first. Returns true
    /// if it was.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut requested = self.requested.lock();
        while !*requested {
            if self.condvar.wait_until(&mut requested, deadline).timed_out() {
                break;
            }
        }
        *requested
    }
}
