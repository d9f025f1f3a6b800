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

//! Note naming and lookup.
//!
//! Notes are identified in three ways: a name and octave ("C#4", "Db4"), a
//! layout index ("O6"), or a MIDI number written as text ("61"). The
//! [`NoteResolver`] canonicalizes all of them against the loaded layout.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// Canonical display names, sharps only.
const DISPLAY_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Returns the semitone offset within the octave for a note name.
pub fn semitone(name: &str) -> Option<u8> {
    let semitone = match name {
        "C" | "B#" => 0,
        "C#" | "Db" => 1,
        "D" => 2,
        "D#" | "Eb" => 3,
        "E" | "Fb" => 4,
        "F" | "E#" => 5,
        "F#" | "Gb" => 6,
        "G" => 7,
        "G#" | "Ab" => 8,
        "A" => 9,
        "A#" | "Bb" => 10,
        "B" | "Cb" => 11,
        _ => return None,
    };
    Some(semitone)
}

/// Converts a note name and octave into a MIDI number.
pub fn note_to_midi(name: &str, octave: i8) -> Option<u8> {
    let midi = (i16::from(octave) + 1) * 12 + i16::from(semitone(name)?);
    u8::try_from(midi).ok().filter(|midi| *midi <= 127)
}

/// Renders a MIDI number in display form, e.g. 61 -> "C#4".
pub fn display_name(midi: u8) -> String {
    let octave = i16::from(midi) / 12 - 1;
    format!("{}{}", DISPLAY_NAMES[usize::from(midi % 12)], octave)
}

/// The sample file name for a MIDI number, e.g. 61 -> "Cs4.wav".
pub fn sample_filename(midi: u8) -> String {
    format!("{}.wav", display_name(midi).replace('#', "s"))
}

/// The equal-tempered frequency of a MIDI number in Hz.
pub fn frequency(midi: u8) -> f32 {
    440.0 * 2f32.powf((f32::from(midi) - 69.0) / 12.0)
}

/// A single playable note from the pan layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    midi: u8,
    name: String,
    octave: i8,
    ring: Option<String>,
    idx: Option<String>,
}

impl Note {
    /// Creates a note. Returns None if the name is unknown or the result is
    /// outside the MIDI range.
    pub fn new(name: &str, octave: i8, ring: Option<String>, idx: Option<String>) -> Option<Note> {
        Some(Note {
            midi: note_to_midi(name, octave)?,
            name: name.to_string(),
            octave,
            ring,
            idx,
        })
    }

    /// Creates a note directly from a MIDI number, named in display form.
    pub fn from_midi(midi: u8) -> Option<Note> {
        if midi > 127 {
            return None;
        }
        let octave = i8::try_from(i16::from(midi) / 12 - 1).ok()?;
        Some(Note {
            midi,
            name: DISPLAY_NAMES[usize::from(midi % 12)].to_string(),
            octave,
            ring: None,
            idx: None,
        })
    }

    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// The note name as written in the layout (may be a flat).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }

    /// The ring of the pan the note sits on (outer, central, inner).
    pub fn ring(&self) -> Option<&str> {
        self.ring.as_deref()
    }

    /// The layout index of the note, e.g. "O6".
    pub fn idx(&self) -> Option<&str> {
        self.idx.as_deref()
    }

    pub fn display_name(&self) -> String {
        display_name(self.midi)
    }

    pub fn sample_filename(&self) -> String {
        sample_filename(self.midi)
    }

    pub fn frequency(&self) -> f32 {
        frequency(self.midi)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", display_name(self.midi))?;
        if let Some(idx) = &self.idx {
            write!(f, " ({})", idx)?;
        }
        Ok(())
    }
}

/// Returned when a note identifier matches nothing in the layout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("note not found: {0}")]
pub struct NoteNotFound(pub String);

/// Resolves note identifiers against the loaded layout.
pub struct NoteResolver {
    notes: Vec<Arc<Note>>,
    by_name: HashMap<String, Arc<Note>>,
    by_idx: HashMap<String, Arc<Note>>,
    by_midi: HashMap<u8, Arc<Note>>,
}

impl NoteResolver {
    /// Builds the lookup tables. Notes are kept sorted by MIDI number.
    pub fn new(notes: Vec<Note>) -> NoteResolver {
        let mut notes: Vec<Arc<Note>> = notes.into_iter().map(Arc::new).collect();
        notes.sort_by_key(|note| note.midi());

        let mut by_name = HashMap::new();
        let mut by_idx = HashMap::new();
        let mut by_midi = HashMap::new();
        for note in notes.iter() {
            let written = format!("{}{}", note.name(), note.octave());
            for key in [written, note.display_name()] {
                by_name.entry(key).or_insert_with(|| note.clone());
            }
            if let Some(idx) = note.idx() {
                if by_idx.insert(idx.to_string(), note.clone()).is_some() {
                    debug!(idx, "Duplicate layout index, last entry wins");
                }
            }
            by_midi.entry(note.midi()).or_insert_with(|| note.clone());
        }

        NoteResolver {
            notes,
            by_name,
            by_idx,
            by_midi,
        }
    }

    /// Resolves a name+octave, a layout index, or a MIDI number given as text.
    pub fn resolve(&self, id: &str) -> Result<Arc<Note>, NoteNotFound> {
        let id = id.trim();
        if let Some(note) = self.by_name.get(id).or_else(|| self.by_idx.get(id)) {
            return Ok(note.clone());
        }
        id.parse::<u8>()
            .ok()
            .and_then(|midi| self.by_midi.get(&midi))
            .cloned()
            .ok_or_else(|| NoteNotFound(id.to_string()))
    }

    /// Looks up the layout note for a MIDI number.
    pub fn by_midi(&self, midi: u8) -> Option<&Arc<Note>> {
        self.by_midi.get(&midi)
    }

    /// All layout notes in MIDI order.
    pub fn notes(&self) -> &[Arc<Note>] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl fmt::Debug for NoteResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteResolver")
            .field("notes", &self.notes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> NoteResolver {
        NoteResolver::new(vec![
            Note::new("C", 4, Some("outer".into()), Some("O1".into())).unwrap(),
            Note::new("Db", 4, Some("outer".into()), Some("O6".into())).unwrap(),
            Note::new("G", 5, Some("central".into()), Some("C3".into())).unwrap(),
        ])
    }

    #[test]
    fn test_note_to_midi() {
        assert_eq!(note_to_midi("C", 4), Some(60));
        assert_eq!(note_to_midi("C#", 4), Some(61));
        assert_eq!(note_to_midi("Db", 4), Some(61));
        assert_eq!(note_to_midi("A", 4), Some(69));
        assert_eq!(note_to_midi("B#", 3), Some(48));
        assert_eq!(note_to_midi("Cb", 4), Some(71));
        assert_eq!(note_to_midi("H", 4), None);
        assert_eq!(note_to_midi("G", 10), None);
    }

    #[test]
    fn test_display_and_filename() {
        assert_eq!(display_name(61), "C#4");
        assert_eq!(display_name(60), "C4");
        assert_eq!(display_name(0), "C-1");
        assert_eq!(sample_filename(61), "Cs4.wav");
        assert_eq!(sample_filename(88), "E6.wav");
    }

    #[test]
    fn test_frequency() {
        assert!((frequency(69) - 440.0).abs() < 0.01);
        assert!((frequency(81) - 880.0).abs() < 0.01);
        assert!((frequency(60) - 261.63).abs() < 0.01);
    }

    #[test]
    fn test_resolve_round_trip() {
        let resolver = resolver();
        let note = resolver.resolve("C#4").unwrap();
        assert_eq!(note.midi(), 61);
        assert_eq!(display_name(note.midi()), "C#4");
        assert_eq!(note.sample_filename(), "Cs4.wav");
    }

    #[test]
    fn test_resolve_forms() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("Db4").unwrap().midi(), 61);
        assert_eq!(resolver.resolve("O6").unwrap().midi(), 61);
        assert_eq!(resolver.resolve("61").unwrap().midi(), 61);
        assert_eq!(resolver.resolve(" G5 ").unwrap().midi(), 79);
        assert_eq!(resolver.resolve("C3").unwrap().midi(), 79);
    }

    #[test]
    fn test_resolve_not_found() {
        let resolver = resolver();
        assert_eq!(resolver.resolve("A4"), Err(NoteNotFound("A4".to_string())));
        assert!(resolver.resolve("69").is_err());
        assert!(resolver.resolve("300").is_err());
        assert!(resolver.resolve("").is_err());
    }

    #[test]
    fn test_notes_sorted() {
        let resolver = NoteResolver::new(vec![
            Note::new("E", 5, None, None).unwrap(),
            Note::new("C", 4, None, None).unwrap(),
        ]);
        let midis: Vec<u8> = resolver.notes().iter().map(|n| n.midi()).collect();
        assert_eq!(midis, vec![60, 76]);
        assert_eq!(resolver.len(), 2);
        assert!(resolver.by_midi(76).is_some());
    }

    #[test]
    fn test_from_midi() {
        let note = Note::from_midi(61).unwrap();
        assert_eq!(note.name(), "C#");
        assert_eq!(note.octave(), 4);
        assert!(Note::from_midi(128).is_none());
    }
}
