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

//! A sample-based polyphonic steel pan: velocity-sensitive pads are scanned
//! on one thread while WAV samples are mixed and streamed out on another.

pub mod adc;
pub mod audio;
pub mod config;
pub mod controller;
pub mod demo;
pub mod engine;
pub mod hal;
pub mod input;
pub mod instrument;
pub mod notes;
pub mod samples;
pub mod shutdown;
