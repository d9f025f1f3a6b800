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

//! Audio sinks: where mixed blocks go.

use std::fmt;

use tracing::{info, warn};

use crate::config::{AudioOut, HardwareConfig};
use crate::hal::{AudioTransport, HalError, Platform};

#[cfg(feature = "cpal")]
pub mod cpal;
pub mod mock;
mod null;
mod wav;

pub use self::null::NullSink;
pub use self::wav::WavSink;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("audio transport write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV write failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("audio output disconnected")]
    Disconnected,

    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Hal(#[from] HalError),
}

/// The output transport. A write blocks until the transport can take the
/// block, which paces the mixer.
pub trait AudioSink: fmt::Display + Send {
    /// Writes one block of mono 16-bit samples.
    fn write_block(&mut self, block: &[i16]) -> Result<(), SinkError>;

    /// Flushes anything buffered. Called once when the engine stops.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Opens the sink selected by `audio_out`.
pub fn open_sink(
    config: &HardwareConfig,
    platform: &mut dyn Platform,
) -> Result<Box<dyn AudioSink>, SinkError> {
    let sample_rate = config.sample_rate();
    let block_size = config.block_size();

    let sink: Box<dyn AudioSink> = match config.audio_out() {
        AudioOut::I2s => {
            let pins = config
                .i2s()
                .ok_or_else(|| SinkError::Unavailable("no I2S pins configured".to_string()))?;
            if u16::from(pins.word_select.number()) != u16::from(pins.bit_clock.number()) + 1 {
                warn!(
                    bit_clock = %pins.bit_clock,
                    word_select = %pins.word_select,
                    "I2S word select should be the pin after bit clock"
                );
            }
            platform.audio_out(AudioTransport::I2s(*pins), sample_rate, block_size)?
        }
        AudioOut::Pwm => platform.audio_out(
            AudioTransport::Pwm(config.audio_pin()),
            sample_rate,
            block_size,
        )?,
        AudioOut::Null => Box::new(NullSink::new(sample_rate)),
        AudioOut::Wav => {
            let path = config
                .record_path()
                .ok_or_else(|| SinkError::Unavailable("no record_path configured".to_string()))?;
            Box::new(WavSink::create(path, sample_rate)?)
        }
        #[cfg(feature = "cpal")]
        AudioOut::Cpal => Box::new(self::cpal::CpalSink::open(sample_rate, block_size)?),
        #[cfg(not(feature = "cpal"))]
        AudioOut::Cpal => {
            return Err(SinkError::Unavailable(
                "built without the cpal feature".to_string(),
            ))
        }
    };

    info!(sink = %sink, sample_rate, block_size, "Opened audio output");
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::hal::mock;

    #[test]
    fn test_open_sink_null_and_wav() {
        let mut platform = mock::Platform::new();

        let config = HardwareConfig::from_value(json!({"audio_out": "null"})).unwrap();
        let sink = open_sink(&config, &mut platform).unwrap();
        assert!(sink.to_string().starts_with("Null"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut config = HardwareConfig::default();
        config.record_to(path.clone());
        let mut sink = open_sink(&config, &mut platform).unwrap();
        sink.write_block(&[1, 2, 3]).unwrap();
        sink.finish().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_open_sink_i2s_claims_pins() {
        let mut platform = mock::Platform::new();
        let config = HardwareConfig::from_value(json!({
            "audio_out": "i2s",
            "i2s": {"bit_clock": "GP27", "word_select": "GP28", "data": "GP26"},
        }))
        .unwrap();
        let sink = open_sink(&config, &mut platform).unwrap();
        assert!(sink.to_string().contains("I2S"));

        // The pins are now taken.
        assert!(open_sink(&config, &mut platform).is_err());
    }

    #[test]
    fn test_open_sink_missing_settings() {
        let mut platform = mock::Platform::new();
        let config = HardwareConfig::from_value(json!({"audio_out": "wav"})).unwrap();
        assert!(matches!(
            open_sink(&config, &mut platform),
            Err(SinkError::Unavailable(_))
        ));
        let config = HardwareConfig::from_value(json!({"audio_out": "i2s"})).unwrap();
        assert!(open_sink(&config, &mut platform).is_err());
    }
}
