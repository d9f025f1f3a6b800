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

//! Demo playback: a scale over every layout note, then a chord progression.

use std::time::Duration;

use tracing::info;

use crate::engine::CommandChannel;
use crate::notes::{display_name, NoteResolver};
use crate::shutdown::Shutdown;

const SCALE_VELOCITY: u8 = 90;
const CHORD_VELOCITY: u8 = 85;
const DEFAULT_BPM: f64 = 100.0;
/// Scale notes are 0.8 beats apart.
const NOTE_BEATS: f64 = 0.8;

/// C, F, G and high C major.
const CHORDS: [(&str, [u8; 4]); 4] = [
    ("C major", [60, 64, 67, 72]),
    ("F major", [65, 69, 72, 77]),
    ("G major", [67, 71, 74, 79]),
    ("C major (high)", [72, 76, 79, 84]),
];

/// Demo timing.
#[derive(Debug, Clone, Copy)]
pub struct Demo {
    /// Time between scale notes.
    pub note_gap: Duration,
    /// Time between the notes of a chord.
    pub strum_gap: Duration,
    pub hold: Duration,
    pub rest: Duration,
}

impl Default for Demo {
    fn default() -> Self {
        Demo {
            note_gap: Duration::from_millis((NOTE_BEATS * 60_000.0 / DEFAULT_BPM).round() as u64),
            strum_gap: Duration::from_millis(50),
            hold: Duration::from_millis(1500),
            rest: Duration::from_millis(300),
        }
    }
}

impl Demo {
    /// Plays every layout note in MIDI order. Returns false if interrupted.
    pub fn scale(
        &self,
        commands: &CommandChannel,
        resolver: &NoteResolver,
        shutdown: &Shutdown,
    ) -> bool {
        info!(notes = resolver.len(), "Scale demo");
        for note in resolver.notes() {
            info!("  {}", note);
            commands.note_on(note.midi(), SCALE_VELOCITY);
            if shutdown.wait_timeout(self.note_gap) {
                commands.all_off();
                return false;
            }
        }
        commands.all_off();
        true
    }

    /// Strums each chord, playing only the notes the layout has. Returns
    /// false if interrupted.
    pub fn chords(
        &self,
        commands: &CommandChannel,
        resolver: &NoteResolver,
        shutdown: &Shutdown,
    ) -> bool {
        info!("Chord demo");
        for (name, chord) in CHORDS.iter() {
            let playable: Vec<u8> = chord
                .iter()
                .copied()
                .filter(|midi| resolver.by_midi(*midi).is_some())
                .collect();
            if playable.is_empty() {
                continue;
            }
            let names: Vec<String> = playable.iter().map(|midi| display_name(*midi)).collect();
            info!("  {}: {}", name, names.join(" "));

            for midi in playable {
                commands.note_on(midi, CHORD_VELOCITY);
                if shutdown.wait_timeout(self.strum_gap) {
                    commands.all_off();
                    return false;
                }
            }
            let interrupted = shutdown.wait_timeout(self.hold);
            commands.all_off();
            if interrupted || shutdown.wait_timeout(self.rest) {
                return false;
            }
        }
        true
    }

    /// The scale demo followed by the chord demo.
    pub fn run(&self, commands: &CommandChannel, resolver: &NoteResolver, shutdown: &Shutdown) {
        if self.scale(commands, resolver, shutdown) && !shutdown.wait_timeout(self.rest) {
            self.chords(commands, resolver, shutdown);
        }
        info!("Demo complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NoteOff, NoteOn, Pending};
    use crate::notes::Note;

    fn fast() -> Demo {
        Demo {
            note_gap: Duration::ZERO,
            strum_gap: Duration::ZERO,
            hold: Duration::ZERO,
            rest: Duration::ZERO,
        }
    }

    fn resolver(midis: &[u8]) -> NoteResolver {
        NoteResolver::new(midis.iter().map(|m| Note::from_midi(*m).unwrap()).collect())
    }

    fn drain(commands: &CommandChannel) -> Pending {
        let mut pending = Pending::default();
        commands.drain_into(&mut pending);
        pending
    }

    #[test]
    fn test_default_timing() {
        let demo = Demo::default();
        assert_eq!(demo.note_gap, Duration::from_millis(480));
    }

    #[test]
    fn test_scale_plays_every_note() {
        let commands = CommandChannel::new();
        let resolver = resolver(&[64, 60, 62]);
        assert!(fast().scale(&commands, &resolver, &Shutdown::new()));

        let pending = drain(&commands);
        let notes: Vec<NoteOn> = pending.note_on;
        assert_eq!(
            notes,
            vec![
                NoteOn { midi: 60, velocity: 90 },
                NoteOn { midi: 62, velocity: 90 },
                NoteOn { midi: 64, velocity: 90 },
            ]
        );
        assert_eq!(pending.note_off, vec![NoteOff::All]);
    }

    #[test]
    fn test_chords_skip_missing_notes() {
        let commands = CommandChannel::new();
        // Only part of C major and G major are on this pan.
        let resolver = resolver(&[60, 64, 71, 74]);
        assert!(fast().chords(&commands, &resolver, &Shutdown::new()));

        let pending = drain(&commands);
        let midis: Vec<u8> = pending.note_on.iter().map(|on| on.midi).collect();
        assert_eq!(midis, vec![60, 64, 71, 74]);
        assert!(pending.note_on.iter().all(|on| on.velocity == 85));
        assert_eq!(pending.note_off.len(), 2);
    }

    #[test]
    fn test_interrupted() {
        let commands = CommandChannel::new();
        let shutdown = Shutdown::new();
        shutdown.request();
        assert!(!Demo::default().scale(&commands, &resolver(&[60, 62]), &shutdown));
        assert_eq!(drain(&commands).note_on.len(), 1);
    }
}
