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

//! Configuration: the pan layout file, per-board hardware defaults and the
//! merged hardware configuration the instrument is built from.

mod board;
mod error;
mod hardware;
mod layout;

pub use self::board::{merge, Board, BOARD_ENV, DEFAULT_BOARD};
pub use self::error::ConfigError;
pub use self::hardware::{
    AdcConfig, AdcKind, AudioOut, HardwareConfig, I2sPins, InputMode, MuxChipConfig, MuxConfig,
    NoteId, PadConfig, PinAssignment, PinId, RetriggerBehavior,
};
pub use self::layout::Layout;
