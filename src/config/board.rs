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

//! Board detection and per-board hardware defaults.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

/// Environment variable naming the board the firmware runs on.
pub const BOARD_ENV: &str = "STEELPAN_BOARD";

/// The board assumed when nothing else is known.
pub const DEFAULT_BOARD: &str = "raspberry_pi_pico";

/// Boards with known default pinouts, in lookup order.
const KNOWN_BOARDS: [(&str, fn() -> Value); 2] = [
    ("raspberry_pi_pico_w", pico_defaults),
    ("raspberry_pi_pico", pico_defaults),
];

/// The board the instrument runs on. Detected once at startup and passed
/// explicitly to everything that needs board-specific defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    id: String,
}

impl Board {
    pub fn new(id: impl Into<String>) -> Board {
        Board { id: id.into() }
    }

    /// Detects the board.
    ///
    /// Priority:
    /// 1. STEELPAN_BOARD environment variable
    /// 2. The default Raspberry Pi Pico
    pub fn detect() -> Board {
        match std::env::var(BOARD_ENV) {
            Ok(id) if !id.trim().is_empty() => Board::new(id.trim()),
            _ => Board::new(DEFAULT_BOARD),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The default hardware configuration for this board. Exact matches win,
    /// then prefix matches, then the Pico defaults.
    pub fn defaults(&self) -> Value {
        if let Some((_, defaults)) = KNOWN_BOARDS.iter().find(|(name, _)| *name == self.id) {
            return defaults();
        }
        if let Some((name, defaults)) = KNOWN_BOARDS
            .iter()
            .find(|(name, _)| self.id.starts_with(name))
        {
            info!(board = %self.id, matched = *name, "Using defaults of a related board");
            return defaults();
        }
        warn!(board = %self.id, "Unknown board, using Raspberry Pi Pico defaults");
        pico_defaults()
    }
}

fn pico_defaults() -> Value {
    json!({
        "audio_out": "i2s",
        "i2s": {
            "bit_clock": "GP27",
            "word_select": "GP28",
            "data": "GP26",
        },
        "adc": {
            "type": "i2c",
            "sda": "GP4",
            "scl": "GP5",
        },
        "led_pin": "LED",
        "max_voices": 6,
        "mux": {
            "select_pins": ["GP10", "GP11", "GP12", "GP13"],
            "mux_a": { "enable_pin": "GP14" },
            "mux_b": { "enable_pin": "GP15" },
        },
    })
}

/// Recursively merges `overrides` on top of `base`. Objects are merged key by
/// key; any other override value replaces the base value outright.
pub fn merge(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged: Map<String, Value> = base.clone();
            for (key, value) in overrides {
                let value = match merged.get(key) {
                    Some(existing) => merge(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base.clone(),
        (_, overrides) => overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_merge_nested() {
        let merged = merge(
            &json!({"i2s": {"data": "GP26"}}),
            &json!({"i2s": {"bit_clock": "GP99"}}),
        );
        assert_eq!(merged, json!({"i2s": {"data": "GP26", "bit_clock": "GP99"}}));
    }

    #[test]
    fn test_merge_replaces_scalars_and_arrays() {
        let merged = merge(
            &json!({"max_voices": 6, "mux": {"select_pins": ["GP10", "GP11"], "threshold": 3000}}),
            &json!({"max_voices": 8, "mux": {"select_pins": ["GP2"]}}),
        );
        assert_eq!(
            merged,
            json!({"max_voices": 8, "mux": {"select_pins": ["GP2"], "threshold": 3000}})
        );
    }

    #[test]
    fn test_merge_null_keeps_base() {
        let base = json!({"led_pin": "LED"});
        assert_eq!(merge(&base, &Value::Null), base);
        assert_eq!(merge(&base, &json!({})), base);
    }

    #[test]
    fn test_merge_object_over_scalar() {
        let merged = merge(&json!({"adc": "native"}), &json!({"adc": {"type": "i2c"}}));
        assert_eq!(merged, json!({"adc": {"type": "i2c"}}));
    }

    #[test]
    fn test_board_defaults() {
        let pico = Board::new("raspberry_pi_pico").defaults();
        assert_eq!(pico["i2s"]["data"], "GP26");
        assert_eq!(pico["mux"]["mux_b"]["enable_pin"], "GP15");
        assert_eq!(Board::new("raspberry_pi_pico_w").defaults(), pico);
        assert_eq!(Board::new("raspberry_pi_pico2").defaults(), pico);
        assert_eq!(Board::new("esp32").defaults(), pico);
    }

    #[test]
    #[serial]
    fn test_board_env_override() {
        let original = std::env::var(BOARD_ENV).ok();

        std::env::set_var(BOARD_ENV, "raspberry_pi_pico_w");
        assert_eq!(Board::detect().id(), "raspberry_pi_pico_w");

        std::env::set_var(BOARD_ENV, "  ");
        assert_eq!(Board::detect().id(), DEFAULT_BOARD);

        match original {
            Some(val) => std::env::set_var(BOARD_ENV, val),
            None => std::env::remove_var(BOARD_ENV),
        }
    }
}
