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

use crate::hal::HalError;

/// Typed error for config load/parse failures so callers can distinguish
/// e.g. file-not-found from a bad pin mapping without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid hardware configuration: {0}")]
    Hardware(#[from] serde_json::Error),

    #[error("Invalid pin name: {0}")]
    InvalidPin(String),

    #[error("Invalid {mode} configuration: {reason}")]
    InvalidMapping { mode: &'static str, reason: String },

    #[error("Hardware unavailable: {0}")]
    Hal(#[from] HalError),
}

impl ConfigError {
    pub(crate) fn mapping(mode: &'static str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidMapping {
            mode,
            reason: reason.into(),
        }
    }
}
