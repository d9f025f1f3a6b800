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
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{info, span, Level};

use crate::engine::CommandChannel;
use crate::notes::Note;
use crate::shutdown::Shutdown;

pub mod keyboard;

/// How often the controller checks for shutdown while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Controller events that will trigger behavior in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Strikes a note.
    NoteOn { note: Arc<Note>, velocity: u8 },

    /// Silences every voice.
    Stop,

    /// Shuts the instrument down.
    Quit,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Forwards driver events to the engine's command channel.
pub struct Controller {
    handle: Option<JoinHandle<()>>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(
        commands: Arc<CommandChannel>,
        shutdown: Shutdown,
        driver: Arc<dyn Driver>,
    ) -> Result<Controller, io::Error> {
        let handle = thread::Builder::new()
            .name("steelpan-controller".to_string())
            .spawn(move || {
                let (events_tx, events_rx) = crossbeam_channel::bounded(1);
                // The driver may block on its input forever, so it's never joined.
                let _driver = driver.monitor_events(events_tx);
                Controller::trigger_events(&commands, &shutdown, events_rx);
            })?;
        Ok(Controller {
            handle: Some(handle),
        })
    }

    /// Blocks until the controller finishes.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn trigger_events(commands: &CommandChannel, shutdown: &Shutdown, events_rx: Receiver<Event>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        info!("Controller started.");
        while !shutdown.is_requested() {
            let event = match events_rx.recv_timeout(POLL_INTERVAL) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            info!(event = ?event, "Received event.");
            match event {
                Event::NoteOn { note, velocity } => commands.note_on(note.midi(), velocity),
                Event::Stop => commands.all_off(),
                Event::Quit => shutdown.request(),
            }
        }
        info!("Controller closing.");
    }
}
