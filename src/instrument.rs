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

//! The playable instrument: pads scanned at a fixed rate on the calling
//! thread, sound mixed on the engine thread.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, span, warn, Level};

use crate::audio::{self, SinkError};
use crate::config::{ConfigError, HardwareConfig};
use crate::engine::{AudioBackend, AudioEngine, EngineError, EngineHandle};
use crate::hal::{DigitalOutput, HalError, Platform};
use crate::input::{self, PadScanner, Scan};
use crate::notes::NoteResolver;
use crate::samples;
use crate::shutdown::Shutdown;

/// Pads are scanned at 50 Hz.
pub const SCAN_PERIOD: Duration = Duration::from_millis(20);

#[derive(Debug, thiserror::Error)]
pub enum InstrumentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Hal(#[from] HalError),
}

/// Opens the audio output, loads the samples for every layout note and starts
/// the mix thread.
pub fn start_engine(
    config: &HardwareConfig,
    resolver: &NoteResolver,
    platform: &mut dyn Platform,
) -> Result<EngineHandle, InstrumentError> {
    let sink = audio::open_sink(config, platform)?;
    let backend = AudioBackend::select(config, samples::open_library(config), resolver.notes());
    Ok(AudioEngine::new(backend, sink, config.block_size()).start()?)
}

pub struct Instrument {
    resolver: Arc<NoteResolver>,
    scanner: Box<dyn PadScanner>,
    engine: EngineHandle,
    led: Option<Box<dyn DigitalOutput>>,
}

impl Instrument {
    /// Checks the pad mapping, then brings up audio, the pads and the status
    /// LED in that order.
    pub fn build(
        config: &HardwareConfig,
        resolver: NoteResolver,
        platform: &mut dyn Platform,
    ) -> Result<Instrument, InstrumentError> {
        config.validate()?;
        let engine = start_engine(config, &resolver, platform)?;
        let scanner = input::build_scanner(config, &resolver, platform)?;
        let led = config.led_pin().and_then(|pin| match platform.output_pin(pin) {
            Ok(mut led) => {
                led.set_level(false);
                Some(led)
            }
            Err(e) => {
                warn!(pin = %pin, err = %e, "Status LED unavailable");
                None
            }
        });

        Ok(Instrument {
            resolver: Arc::new(resolver),
            scanner,
            engine,
            led,
        })
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn resolver(&self) -> Arc<NoteResolver> {
        self.resolver.clone()
    }

    pub fn pad_count(&self) -> usize {
        self.scanner.pad_count()
    }

    /// Scans the pads once and starts a note for every strike. Releases are
    /// only logged; the sample decays on its own.
    pub fn tick(&mut self) -> Scan {
        let scan = self.scanner.scan();
        for event in scan.pressed.iter() {
            info!("{}", event);
            self.engine.note_on(event.note.midi(), event.velocity);
        }
        for event in scan.released.iter() {
            info!("{}", event);
        }
        scan
    }

    /// Scans at a fixed cadence until shutdown is requested or the engine
    /// fails. Returns the engine's error, if any.
    pub fn run(mut self, shutdown: &Shutdown) -> Result<(), InstrumentError> {
        let span = span!(Level::INFO, "instrument");
        let _enter = span.enter();

        self.set_led(true);
        info!(
            pads = self.pad_count(),
            notes = self.resolver.len(),
            "Ready, play!"
        );

        let mut next = Instant::now();
        while !shutdown.is_requested() {
            if self.engine.is_finished() {
                warn!("Audio engine stopped");
                break;
            }
            self.tick();

            next += SCAN_PERIOD;
            let now = Instant::now();
            if next < now {
                next = now;
            }
            spin_sleep::sleep(next.saturating_duration_since(now));
        }

        self.engine.all_off();
        self.set_led(false);
        info!("Stopping");
        self.engine.stop()?;
        Ok(())
    }

    fn set_led(&mut self, on: bool) {
        if let Some(led) = self.led.as_mut() {
            led.set_level(on);
        }
    }
}

impl fmt::Debug for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrument")
            .field("mode", &self.scanner.mode())
            .field("pads", &self.scanner.pad_count())
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;
    use crate::config::PinId;
    use crate::hal::mock;
    use crate::notes::Note;
    use crate::samples::tests::write_wav;
    use crate::test::eventually;

    fn resolver() -> NoteResolver {
        NoteResolver::new(vec![
            Note::new("C", 4, None, Some("O1".into())).unwrap(),
            Note::new("D", 4, None, Some("O2".into())).unwrap(),
        ])
    }

    fn config(sounds: &std::path::Path, audio_out: &str) -> HardwareConfig {
        HardwareConfig::from_value(json!({
            "audio_out": audio_out,
            "i2s": {"bit_clock": "GP27", "word_select": "GP28", "data": "GP26"},
            "led_pin": "LED",
            "pins": {"GP2": "C4", "GP3": "D4"},
            "sounds_dir": sounds,
            "sample_rate": 8000,
            "block_size": 64,
        }))
        .unwrap()
    }

    #[test]
    fn test_strike_plays_note() {
        let dir = tempfile::tempdir().unwrap();
        write_wav(&dir.path().join("C4.wav"), 8000, &vec![1000i16; 8000]);

        let mut platform = mock::Platform::new();
        let handle = platform.handle();
        let mut instrument =
            Instrument::build(&config(dir.path(), "i2s"), resolver(), &mut platform).unwrap();
        assert_eq!(instrument.pad_count(), 2);
        assert!(handle.is_claimed(PinId::new(27)));

        handle.press(PinId::new(2));
        let scan = instrument.tick();
        assert_eq!(scan.pressed[0].note.midi(), 60);
        eventually(
            || instrument.engine().active_voices() == 1,
            "Note never started",
        );

        // A release leaves the note ringing.
        handle.release(PinId::new(2));
        assert_eq!(instrument.tick().released.len(), 1);
        assert_eq!(instrument.engine().active_voices(), 1);
    }

    #[test]
    fn test_run_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut platform = mock::Platform::new();
        let handle = platform.handle();
        let instrument =
            Instrument::build(&config(dir.path(), "null"), resolver(), &mut platform).unwrap();

        let shutdown = Shutdown::new();
        let join = {
            let shutdown = shutdown.clone();
            thread::spawn(move || instrument.run(&shutdown))
        };
        eventually(
            || handle.output_level(PinId::LED) == Some(true),
            "LED never turned on",
        );
        shutdown.request();
        assert!(join.join().unwrap().is_ok());
        assert_eq!(handle.output_level(PinId::LED), Some(false));
    }

    #[test]
    fn test_bad_mapping_fails_before_audio() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("take.wav");
        let mut config = HardwareConfig::from_value(json!({
            "pins": {"PA7": "C4"},
            "sounds_dir": dir.path(),
        }))
        .unwrap();
        config.record_to(recording.clone());

        let mut platform = mock::Platform::instant();
        let handle = platform.handle();
        assert!(matches!(
            Instrument::build(&config, resolver(), &mut platform),
            Err(InstrumentError::Config(ConfigError::InvalidPin(_)))
        ));
        assert!(!recording.exists());
        assert!(!handle.is_claimed(PinId::LED));
    }

    #[test]
    fn test_audio_pins_conflict_with_pads() {
        let dir = tempfile::tempdir().unwrap();
        let config = HardwareConfig::from_value(json!({
            "audio_out": "pwm",
            "audio_pin": "GP2",
            "pins": {"GP2": "C4", "GP3": "D4"},
            "sounds_dir": dir.path(),
        }))
        .unwrap();
        let mut platform = mock::Platform::instant();
        let instrument = Instrument::build(&config, resolver(), &mut platform).unwrap();
        // The pad on the audio pin is skipped.
        assert_eq!(instrument.pad_count(), 1);
    }
}
