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

//! The audio engine: a mix thread that drains the command channel, renders one
//! block from the active backend and hands it to the audio sink.

use std::{
    fmt, io,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use tracing::{debug, error, info, span, warn, Level};

use crate::audio::{AudioSink, SinkError};
use crate::config::HardwareConfig;
use crate::notes::Note;
use crate::samples::SampleLibrary;

pub mod command;
pub mod mixer;
mod thread_priority;
pub mod tone;
pub mod voice;

pub use self::command::{Command, CommandChannel, NoteOff, NoteOn, Pending};
pub use self::mixer::{velocity_gain, Mixer, UNITY_GAIN};
pub use self::tone::ToneVoice;
pub use self::voice::{Voice, VoicePool};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("audio output failed: {0}")]
    Sink(#[from] SinkError),

    #[error("mix thread panicked")]
    Panicked,

    #[error("unable to start mix thread: {0}")]
    Io(#[from] io::Error),
}

/// How notes become sound. Chosen once, when the engine is built.
pub enum AudioBackend {
    /// Polyphonic WAV sample playback.
    Sampled(Mixer),
    /// A single square-wave voice, used when no samples could be loaded.
    ToneFallback(ToneVoice),
}

impl AudioBackend {
    /// Loads the samples for `notes`. Falls back to tone synthesis when none
    /// of them exist.
    pub fn select(
        config: &HardwareConfig,
        library: Box<dyn SampleLibrary>,
        notes: &[Arc<Note>],
    ) -> AudioBackend {
        let mut mixer = Mixer::new(
            library,
            config.max_voices(),
            config.retrigger(),
            config.block_size(),
        );
        if mixer.load_all(notes) > 0 {
            AudioBackend::Sampled(mixer)
        } else {
            warn!(
                sounds_dir = %config.sounds_dir().display(),
                "No samples found, using tone fallback"
            );
            AudioBackend::ToneFallback(ToneVoice::new(config.sample_rate()))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioBackend::Sampled(_) => "sampled",
            AudioBackend::ToneFallback(_) => "tone",
        }
    }

    pub fn active_voices(&self) -> usize {
        match self {
            AudioBackend::Sampled(mixer) => mixer.pool().active_count(),
            AudioBackend::ToneFallback(tone) => usize::from(tone.is_active()),
        }
    }

    fn note_on(&mut self, midi: u8, velocity: u8) {
        match self {
            AudioBackend::Sampled(mixer) => {
                mixer.note_on(midi, velocity);
            }
            AudioBackend::ToneFallback(tone) => {
                tone.note_on(midi, velocity);
            }
        }
    }

    fn note_off(&mut self, off: NoteOff) {
        match (self, off) {
            (AudioBackend::Sampled(mixer), NoteOff::Note(midi)) => mixer.note_off(midi),
            (AudioBackend::Sampled(mixer), NoteOff::All) => mixer.all_off(),
            (AudioBackend::ToneFallback(tone), NoteOff::Note(midi)) => tone.note_off(midi),
            (AudioBackend::ToneFallback(tone), NoteOff::All) => tone.all_off(),
        }
    }

    fn render(&mut self, out: &mut [i16]) {
        match self {
            AudioBackend::Sampled(mixer) => mixer.render(out),
            AudioBackend::ToneFallback(tone) => tone.render(out),
        }
    }
}

impl fmt::Debug for AudioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBackend")
            .field("name", &self.name())
            .field("active_voices", &self.active_voices())
            .finish()
    }
}

/// Owns everything the mix context touches.
pub struct AudioEngine {
    backend: AudioBackend,
    commands: Arc<CommandChannel>,
    sink: Box<dyn AudioSink>,
    block: Vec<i16>,
    batch: Pending,
    active_voices: Arc<AtomicUsize>,
}

impl AudioEngine {
    pub fn new(backend: AudioBackend, sink: Box<dyn AudioSink>, block_size: usize) -> AudioEngine {
        AudioEngine {
            backend,
            commands: Arc::new(CommandChannel::new()),
            sink,
            block: vec![0; block_size.max(1)],
            batch: Pending::with_capacity(16),
            active_voices: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The channel the scan side sends commands through.
    pub fn commands(&self) -> Arc<CommandChannel> {
        self.commands.clone()
    }

    pub fn backend(&self) -> &AudioBackend {
        &self.backend
    }

    /// Applies pending commands, renders one block and writes it.
    pub fn mix_block(&mut self) -> Result<(), SinkError> {
        self.commands.drain_into(&mut self.batch);
        for on in self.batch.note_on.iter() {
            self.backend.note_on(on.midi, on.velocity);
        }
        for off in self.batch.note_off.iter() {
            self.backend.note_off(*off);
        }

        self.backend.render(&mut self.block);
        self.active_voices
            .store(self.backend.active_voices(), Ordering::Relaxed);
        self.sink.write_block(&self.block)
    }

    /// Moves the engine onto its own thread. Blocks are mixed until the
    /// handle is stopped or the sink fails.
    pub fn start(mut self) -> Result<EngineHandle, EngineError> {
        let commands = self.commands.clone();
        let active_voices = self.active_voices.clone();
        let running = Arc::new(AtomicBool::new(true));
        let finished = Arc::new(AtomicBool::new(false));

        let priority = thread_priority::mix_thread_priority();
        let rt_audio = thread_priority::rt_audio_enabled();

        info!(
            backend = self.backend.name(),
            sink = %self.sink,
            block_size = self.block.len(),
            "Starting audio engine"
        );

        let thread_running = running.clone();
        let thread_finished = finished.clone();
        let join = thread::Builder::new()
            .name("steelpan-mix".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "mix");
                let _enter = span.enter();
                thread_priority::configure_mix_thread_priority(priority, rt_audio);

                let mut result = Ok(());
                while thread_running.load(Ordering::Relaxed) {
                    if let Err(e) = self.mix_block() {
                        error!(err = %e, "Audio output failed");
                        result = Err(e);
                        break;
                    }
                }
                if let Err(e) = self.sink.finish() {
                    warn!(err = %e, "Error finishing audio output");
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                debug!("Mix thread exiting");
                thread_finished.store(true, Ordering::Release);
                result
            })?;

        Ok(EngineHandle {
            commands,
            active_voices,
            running,
            finished,
            join: Some(join),
        })
    }
}

impl fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioEngine")
            .field("backend", &self.backend)
            .field("sink", &self.sink.to_string())
            .field("block_size", &self.block.len())
            .finish()
    }
}

/// Controls a running engine from the scan side.
pub struct EngineHandle {
    commands: Arc<CommandChannel>,
    active_voices: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<Result<(), SinkError>>>,
}

impl EngineHandle {
    pub fn note_on(&self, midi: u8, velocity: u8) {
        self.commands.note_on(midi, velocity);
    }

    pub fn note_off(&self, midi: u8) {
        self.commands.note_off(midi);
    }

    pub fn all_off(&self) {
        self.commands.all_off();
    }

    pub fn commands(&self) -> Arc<CommandChannel> {
        self.commands.clone()
    }

    /// Voices sounding as of the last mixed block.
    pub fn active_voices(&self) -> usize {
        self.active_voices.load(Ordering::Relaxed)
    }

    /// True once the mix thread has exited.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Stops the mix thread and returns the error that ended it, if any.
    pub fn stop(mut self) -> Result<(), EngineError> {
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<(), EngineError> {
        self.running.store(false, Ordering::Relaxed);
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(EngineError::Panicked),
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(e) = self.join_thread() {
            warn!(err = %e, "Audio engine stopped with an error");
        }
    }
}

impl fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineHandle")
            .field("active_voices", &self.active_voices())
            .field("finished", &self.is_finished())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::audio::mock;
    use crate::config::RetriggerBehavior;
    use crate::samples::MemoryLibrary;
    use crate::test::eventually;

    fn sampled(samples: &[(u8, Vec<i16>)]) -> AudioBackend {
        let mut library = MemoryLibrary::new();
        for (midi, data) in samples {
            library.insert(*midi, data.clone());
        }
        AudioBackend::Sampled(Mixer::new(
            Box::new(library),
            4,
            RetriggerBehavior::Polyphonic,
            4,
        ))
    }

    #[test]
    fn test_select_backend() {
        let config = HardwareConfig::from_value(json!({"sample_rate": 8000})).unwrap();
        let notes = vec![Arc::new(Note::from_midi(60).unwrap())];

        let backend = AudioBackend::select(&config, Box::new(MemoryLibrary::new()), &notes);
        assert_eq!(backend.name(), "tone");

        let mut library = MemoryLibrary::new();
        library.insert(60, vec![1; 10]);
        let backend = AudioBackend::select(&config, Box::new(library), &notes);
        assert_eq!(backend.name(), "sampled");
    }

    #[test]
    fn test_mix_block_applies_commands() {
        let sink = mock::Sink::new("test");
        let mut engine = AudioEngine::new(
            sampled(&[(60, vec![100; 8]), (62, vec![10; 8])]),
            Box::new(sink.clone()),
            4,
        );
        let commands = engine.commands();

        engine.mix_block().unwrap();
        commands.note_on(60, 127);
        commands.note_on(62, 127);
        engine.mix_block().unwrap();
        commands.note_off(62);
        engine.mix_block().unwrap();
        commands.note_on(62, 127);
        commands.all_off();
        engine.mix_block().unwrap();

        let blocks = sink.blocks();
        assert_eq!(blocks[0], vec![0; 4]);
        assert_eq!(blocks[1], vec![110; 4]);
        assert_eq!(blocks[2], vec![100; 4]);
        // Note-ons are applied before note-offs within a block.
        assert_eq!(blocks[3], vec![0; 4]);
        assert_eq!(engine.backend().active_voices(), 0);
    }

    #[test]
    fn test_tone_fallback_renders() {
        let sink = mock::Sink::new("test");
        let mut engine = AudioEngine::new(
            AudioBackend::ToneFallback(ToneVoice::new(8000)),
            Box::new(sink.clone()),
            8,
        );
        engine.commands().note_on(69, 127);
        engine.mix_block().unwrap();
        assert!(sink.blocks()[0].iter().all(|s| s.abs() == 8192));
    }

    #[test]
    fn test_engine_thread() {
        let sink = mock::Sink::new("test").paced(Duration::from_millis(1));
        let engine = AudioEngine::new(
            sampled(&[(60, vec![100; 400])]),
            Box::new(sink.clone()),
            4,
        );
        let handle = engine.start().unwrap();
        handle.note_on(60, 127);
        eventually(|| handle.active_voices() == 1, "Voice never started");
        eventually(|| handle.active_voices() == 0, "Voice never finished");
        assert!(!handle.is_finished());
        assert!(sink.blocks().iter().any(|block| block == &vec![100; 4]));
        handle.stop().unwrap();
    }

    #[test]
    fn test_sink_failure_is_fatal() {
        let sink = mock::Sink::failing_after("test", 3);
        let engine = AudioEngine::new(sampled(&[]), Box::new(sink.clone()), 4);
        let handle = engine.start().unwrap();
        eventually(|| handle.is_finished(), "Mix thread never exited");
        assert!(matches!(handle.stop(), Err(EngineError::Sink(_))));
        assert_eq!(sink.block_count(), 3);
    }
}
