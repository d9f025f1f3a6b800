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

use std::path::Path;

use config::{Config, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::board::Board;
use super::error::ConfigError;
use super::hardware::HardwareConfig;
use crate::notes::{Note, NoteResolver};

/// A note as written in the layout file.
#[derive(Deserialize, Clone, Debug)]
struct NoteEntry {
    name: String,
    octave: i8,
    #[serde(default)]
    ring: Option<String>,
    #[serde(default)]
    idx: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LayoutFile {
    #[serde(default)]
    notes: Vec<NoteEntry>,
    #[serde(default)]
    hardware: Value,
}

/// The pan layout: the playable notes and the raw hardware section.
#[derive(Debug, Clone)]
pub struct Layout {
    notes: Vec<Note>,
    hardware: Value,
}

impl Layout {
    /// Parse a layout from a JSON file.
    pub fn load(path: &Path) -> Result<Layout, ConfigError> {
        let layout = Self::from_config(
            Config::builder()
                .add_source(File::from(path).format(FileFormat::Json))
                .build()?,
        )?;
        info!(
            path = %path.display(),
            notes = layout.notes.len(),
            "Loaded pan layout"
        );
        Ok(layout)
    }

    /// Parse a layout from a JSON string.
    pub fn from_json(json: &str) -> Result<Layout, ConfigError> {
        Self::from_config(
            Config::builder()
                .add_source(File::from_str(json, FileFormat::Json))
                .build()?,
        )
    }

    fn from_config(config: Config) -> Result<Layout, ConfigError> {
        let file = config.try_deserialize::<LayoutFile>()?;
        let mut notes: Vec<Note> = file
            .notes
            .into_iter()
            .filter_map(|entry| {
                let note = Note::new(&entry.name, entry.octave, entry.ring, entry.idx);
                if note.is_none() {
                    warn!(
                        name = %entry.name,
                        octave = entry.octave,
                        "Unknown note in layout, skipping"
                    );
                }
                note
            })
            .collect();
        notes.sort_by_key(|note| note.midi());

        Ok(Layout {
            notes,
            hardware: file.hardware,
        })
    }

    /// The playable notes in MIDI order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// The hardware section as written, before merging with board defaults.
    pub fn hardware(&self) -> &Value {
        &self.hardware
    }

    /// Builds the note resolver for this layout.
    pub fn resolver(&self) -> NoteResolver {
        NoteResolver::new(self.notes.clone())
    }

    /// Merges the hardware section over the given board's defaults.
    pub fn hardware_config(&self, board: &Board) -> Result<HardwareConfig, ConfigError> {
        HardwareConfig::resolve(board, &self.hardware)
    }
}
