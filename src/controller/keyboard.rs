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

use crossbeam_channel::Sender;
use tracing::{info, span, warn, Level};

use super::Event;
use crate::notes::NoteResolver;

const STOP: &str = "stop";
const QUIT: &str = "quit";

/// A controller that plays notes typed on the console.
pub struct Driver {
    resolver: Arc<NoteResolver>,
    default_velocity: u8,
}

impl Driver {
    pub fn new(resolver: Arc<NoteResolver>, default_velocity: u8) -> Driver {
        Driver {
            resolver,
            default_velocity,
        }
    }

    /// Parses one line: a command, or a note with an optional velocity.
    fn parse(&self, input: &str) -> Option<Event> {
        let mut words = input.split_whitespace();
        let first = words.next()?;
        match first.to_lowercase().as_str() {
            STOP => return Some(Event::Stop),
            QUIT => return Some(Event::Quit),
            _ => {}
        }

        let velocity = match words.next() {
            Some(word) => word.parse::<u8>().ok()?.clamp(1, 127),
            None => self.default_velocity,
        };
        if words.next().is_some() {
            return None;
        }
        let note = self.resolver.resolve(first).ok()?;
        Some(Event::NoteOn { note, velocity })
    }

    /// Prompts for and handles one line. Returns false once input is closed.
    fn monitor_io<R, W>(
        &self,
        events_tx: &Sender<Event>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "Note [velocity] ({}, {}): ", STOP, QUIT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match self.parse(&input) {
            Some(event) => {
                let quit = event == Event::Quit;
                events_tx
                    .send(event)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                Ok(!quit)
            }
            None => {
                warn!(input = input.trim(), "Unrecognized input");
                Ok(true)
            }
        }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let driver = Driver::new(self.resolver.clone(), self.default_velocity);
        thread::spawn(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while driver.monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::{self, BufReader};

    use super::*;
    use crate::notes::Note;

    fn driver() -> Driver {
        Driver::new(
            Arc::new(NoteResolver::new(vec![
                Note::new("Db", 4, None, Some("O6".into())).unwrap(),
                Note::new("G", 5, None, Some("C3".into())).unwrap(),
            ])),
            100,
        )
    }

    fn get_event(input: &str) -> Result<Option<Event>, io::Error> {
        let (sender, receiver) = crossbeam_channel::bounded::<Event>(1);
        driver().monitor_io(&sender, BufReader::new(input.as_bytes()), Vec::new())?;
        drop(sender);
        Ok(receiver.recv().ok())
    }

    fn note_on(input: &str) -> Option<(u8, u8)> {
        match get_event(input).unwrap() {
            Some(Event::NoteOn { note, velocity }) => Some((note.midi(), velocity)),
            _ => None,
        }
    }

    #[test]
    fn test_keyboard_events() -> Result<(), io::Error> {
        assert_eq!(note_on("C#4\n"), Some((61, 100)));
        assert_eq!(note_on("O6 90\n"), Some((61, 90)));
        assert_eq!(note_on("79 200"), Some((79, 127)));
        assert_eq!(Some(Event::Stop), get_event("STOP\n")?);
        assert_eq!(Some(Event::Quit), get_event("quit")?);
        assert_eq!(None, get_event("unrecognized")?);
        assert_eq!(None, get_event("C#4 loud")?);
        assert_eq!(None, get_event("C#4 90 extra")?);
        assert_eq!(None, get_event("\n")?);
        Ok(())
    }

    #[test]
    fn test_closed_input() {
        let (sender, _receiver) = crossbeam_channel::bounded::<Event>(1);
        let mut prompt = Vec::new();
        assert!(!driver()
            .monitor_io(&sender, BufReader::new("".as_bytes()), &mut prompt)
            .unwrap());
        assert!(String::from_utf8(prompt).unwrap().starts_with("Note [velocity]"));
    }
}
