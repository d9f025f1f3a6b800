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

//! The only structure shared between the scan and mix contexts.
//!
//! The scan side appends under a short lock. The mix side swaps both lists
//! out for its own empty ones at the start of each block, so decoding and
//! mixing never happen while the lock is held.

use std::mem;

use parking_lot::Mutex;

/// A request from the scan side to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    NoteOn { midi: u8, velocity: u8 },
    NoteOff { midi: u8 },
    AllOff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOn {
    pub midi: u8,
    pub velocity: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteOff {
    Note(u8),
    /// Every voice.
    All,
}

/// Commands waiting for the next mix block, in the order they were sent.
#[derive(Debug, Default)]
pub struct Pending {
    pub note_on: Vec<NoteOn>,
    pub note_off: Vec<NoteOff>,
}

impl Pending {
    pub fn with_capacity(capacity: usize) -> Pending {
        Pending {
            note_on: Vec::with_capacity(capacity),
            note_off: Vec::with_capacity(capacity),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.note_on.is_empty() && self.note_off.is_empty()
    }

    /// Empties both lists, keeping their allocations.
    pub fn clear(&mut self) {
        self.note_on.clear();
        self.note_off.clear();
    }
}

#[derive(Debug, Default)]
pub struct CommandChannel {
    pending: Mutex<Pending>,
}

impl CommandChannel {
    pub fn new() -> CommandChannel {
        CommandChannel::default()
    }

    pub fn send(&self, command: Command) {
        let mut pending = self.pending.lock();
        match command {
            Command::NoteOn { midi, velocity } => pending.note_on.push(NoteOn { midi, velocity }),
            Command::NoteOff { midi } => pending.note_off.push(NoteOff::Note(midi)),
            Command::AllOff => pending.note_off.push(NoteOff::All),
        }
    }

    pub fn note_on(&self, midi: u8, velocity: u8) {
        self.send(Command::NoteOn { midi, velocity });
    }

    pub fn note_off(&self, midi: u8) {
        self.send(Command::NoteOff { midi });
    }

    pub fn all_off(&self) {
        self.send(Command::AllOff);
    }

    /// Takes every pending command. `batch` is cleared and swapped in as the
    /// new pending lists, so its capacity is reused.
    pub fn drain_into(&self, batch: &mut Pending) {
        batch.clear();
        mem::swap(&mut *self.pending.lock(), batch);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let channel = CommandChannel::new();
        channel.note_on(60, 100);
        channel.note_off(60);
        channel.note_on(62, 90);
        channel.all_off();

        let mut batch = Pending::default();
        channel.drain_into(&mut batch);
        assert_eq!(
            batch.note_on,
            vec![
                NoteOn {
                    midi: 60,
                    velocity: 100
                },
                NoteOn {
                    midi: 62,
                    velocity: 90
                },
            ]
        );
        assert_eq!(batch.note_off, vec![NoteOff::Note(60), NoteOff::All]);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_drain_reuses_batch() {
        let channel = CommandChannel::new();
        let mut batch = Pending::with_capacity(16);
        batch.note_on.push(NoteOn {
            midi: 1,
            velocity: 1,
        });

        channel.drain_into(&mut batch);
        assert!(batch.is_empty());
        assert!(channel.is_empty());

        channel.note_on(64, 64);
        channel.drain_into(&mut batch);
        assert_eq!(batch.note_on.len(), 1);
        assert!(batch.note_off.is_empty());
    }

    #[test]
    fn test_concurrent_senders() {
        let channel = Arc::new(CommandChannel::new());
        let senders: Vec<_> = (0..4u8)
            .map(|i| {
                let channel = channel.clone();
                thread::spawn(move || {
                    for n in 0..100u8 {
                        channel.note_on(i, n);
                    }
                })
            })
            .collect();
        for sender in senders {
            sender.join().unwrap();
        }

        let mut batch = Pending::default();
        channel.drain_into(&mut batch);
        assert_eq!(batch.note_on.len(), 400);
        // Each sender's commands stay in order.
        for i in 0..4u8 {
            let velocities: Vec<u8> = batch
                .note_on
                .iter()
                .filter(|on| on.midi == i)
                .map(|on| on.velocity)
                .collect();
            assert_eq!(velocities, (0..100u8).collect::<Vec<_>>());
        }
    }
}
