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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use steelpan::config::{merge, Board, HardwareConfig, Layout};
use steelpan::controller::{keyboard, Controller};
use steelpan::demo::Demo;
use steelpan::hal::mock;
use steelpan::instrument::{self, Instrument};
use steelpan::notes::display_name;
use steelpan::shutdown::Shutdown;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample-based steel pan."
)]
struct Cli {
    /// The board to take hardware defaults from. Detected when not given.
    #[arg(long, global = true)]
    board: Option<String>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the notes of a pan layout by ring.
    Notes {
        /// The path to the pan layout.
        layout: PathBuf,
    },
    /// Prints the merged hardware configuration as JSON.
    Config {
        /// The path to the pan layout.
        layout: PathBuf,
    },
    /// Plays the scale and chord demos.
    Demo {
        /// The path to the pan layout.
        layout: PathBuf,
        /// Records the output to a WAV file instead of playing it.
        #[arg(short, long)]
        record: Option<PathBuf>,
    },
    /// Runs the instrument on the simulated board, with notes typed on the console.
    Play {
        /// The path to the pan layout.
        layout: PathBuf,
        /// Records the output to a WAV file instead of playing it.
        #[arg(short, long)]
        record: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let board = match cli.board {
        Some(id) => Board::new(id),
        None => Board::detect(),
    };

    match cli.command {
        Commands::Notes { layout } => {
            let layout = Layout::load(&layout)?;
            print_notes(&layout);
        }
        Commands::Config { layout } => {
            let layout = Layout::load(&layout)?;
            // Fail on anything that won't deserialize.
            layout.hardware_config(&board)?;
            let merged = merge(&board.defaults(), layout.hardware());
            println!("{}", serde_json::to_string_pretty(&merged)?);
        }
        Commands::Demo { layout, record } => {
            let (layout, config) = load(&layout, &board, record)?;
            run_demo(&layout, &config, &Shutdown::new())?;
        }
        Commands::Play { layout, record } => {
            let (layout, config) = load(&layout, &board, record)?;
            let shutdown = Shutdown::new();
            if !config.has_inputs() {
                warn!("No pins or pads configured, running the demo");
                run_demo(&layout, &config, &shutdown)?;
                return Ok(());
            }

            let mut platform = mock::Platform::new();
            let instrument = Instrument::build(&config, layout.resolver(), &mut platform)?;
            let driver = Arc::new(keyboard::Driver::new(
                instrument.resolver(),
                config.default_velocity(),
            ));
            let _controller =
                Controller::new(instrument.engine().commands(), shutdown.clone(), driver)?;
            instrument.run(&shutdown)?;
        }
    }

    Ok(())
}

/// Loads the layout and merges its hardware section for the board.
fn load(
    path: &Path,
    board: &Board,
    record: Option<PathBuf>,
) -> Result<(Layout, HardwareConfig), Box<dyn Error>> {
    let layout = Layout::load(path)?;
    let mut config = layout.hardware_config(board)?;
    if let Some(dir) = path.parent() {
        config.relative_to(dir);
    }
    if let Some(record) = record {
        config.record_to(record);
    }
    info!(
        board = board.id(),
        audio_out = ?config.audio_out(),
        input_mode = %config.input_mode(),
        "Hardware configured"
    );
    Ok((layout, config))
}

fn run_demo(
    layout: &Layout,
    config: &HardwareConfig,
    shutdown: &Shutdown,
) -> Result<(), Box<dyn Error>> {
    let resolver = layout.resolver();
    let mut platform = mock::Platform::new();
    let engine = instrument::start_engine(config, &resolver, &mut platform)?;
    Demo::default().run(&engine.commands(), &resolver, shutdown);
    engine.stop()?;
    Ok(())
}

fn print_notes(layout: &Layout) {
    let notes = layout.notes();
    if notes.is_empty() {
        println!("No notes in layout.");
        return;
    }

    let mut rings: Vec<&str> = Vec::new();
    for note in notes {
        let ring = note.ring().unwrap_or("unassigned");
        if !rings.contains(&ring) {
            rings.push(ring);
        }
    }

    println!("Notes (count: {}):", notes.len());
    for ring in rings {
        let names: Vec<String> = notes
            .iter()
            .filter(|note| note.ring().unwrap_or("unassigned") == ring)
            .map(|note| note.to_string())
            .collect();
        println!("- {} ({}): {}", ring, names.len(), names.join(", "));
    }

    if let (Some(low), Some(high)) = (notes.first(), notes.last()) {
        println!(
            "\nRange: {} - {} (MIDI {}-{})",
            display_name(low.midi()),
            display_name(high.midi()),
            low.midi(),
            high.midi()
        );
    }
}
