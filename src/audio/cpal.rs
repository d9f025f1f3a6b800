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

//! Host audio output through cpal, for running on a desktop.

use std::{fmt, thread};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{error, info};

use super::{AudioSink, SinkError};

/// Blocks queued ahead of the stream callback.
const QUEUED_BLOCKS: usize = 4;

/// Plays blocks on the default output device. The stream lives on its own
/// thread; writes block once the queue to the callback is full.
pub struct CpalSink {
    device: String,
    blocks: Sender<Vec<i16>>,
    // Dropping this ends the stream thread.
    _stop: Sender<()>,
}

impl CpalSink {
    pub fn open(sample_rate: u32, block_size: usize) -> Result<CpalSink, SinkError> {
        let (blocks_tx, blocks_rx) = crossbeam_channel::bounded::<Vec<i16>>(QUEUED_BLOCKS);
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let (ready_tx, ready_rx) = crossbeam_channel::bounded::<Result<String, String>>(1);

        thread::Builder::new()
            .name("steelpan-cpal".to_string())
            .spawn(move || {
                let stream = match build_stream(sample_rate, blocks_rx) {
                    Ok((device, stream)) => {
                        let _ = ready_tx.send(Ok(device));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns once the sink is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })?;

        let device = ready_rx
            .recv()
            .map_err(|_| SinkError::Disconnected)?
            .map_err(SinkError::Unavailable)?;
        info!(device = %device, sample_rate, block_size, "CPAL output stream started");

        Ok(CpalSink {
            device,
            blocks: blocks_tx,
            _stop: stop_tx,
        })
    }
}

fn build_stream(
    sample_rate: u32,
    blocks: Receiver<Vec<i16>>,
) -> Result<(String, cpal::Stream), String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no default output device".to_string())?;
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_output_config()
        .map_err(|e| e.to_string())?;

    let config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_typed::<f32>(&device, &config, blocks),
        cpal::SampleFormat::I16 => build_typed::<i16>(&device, &config, blocks),
        other => return Err(format!("unsupported sample format {:?}", other)),
    }?;
    stream.play().map_err(|e| e.to_string())?;
    Ok((name, stream))
}

fn build_typed<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    blocks: Receiver<Vec<i16>>,
) -> Result<cpal::Stream, String>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let channels = usize::from(config.channels.max(1));
    let mut playback = Playback::new(blocks);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = T::from_sample(playback.next_sample());
                    frame.fill(value);
                }
            },
            |err| error!("CPAL output stream error: {}", err),
            None,
        )
        .map_err(|e| e.to_string())
}

/// The callback's cursor through the queued blocks.
struct Playback {
    blocks: Receiver<Vec<i16>>,
    current: Vec<i16>,
    position: usize,
}

impl Playback {
    fn new(blocks: Receiver<Vec<i16>>) -> Playback {
        Playback {
            blocks,
            current: Vec::new(),
            position: 0,
        }
    }

    /// The next queued sample, or silence on underrun.
    fn next_sample(&mut self) -> i16 {
        while self.position >= self.current.len() {
            match self.blocks.try_recv() {
                Ok(block) => {
                    self.current = block;
                    self.position = 0;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return 0,
            }
        }
        let sample = self.current[self.position];
        self.position += 1;
        sample
    }
}

impl AudioSink for CpalSink {
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError> {
        self.blocks
            .send(block.to_vec())
            .map_err(|_| SinkError::Disconnected)
    }
}

impl fmt::Display for CpalSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (CPAL)", self.device)
    }
}
