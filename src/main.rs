// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

use std::env;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use crossterm::event::{Event, KeyEventKind};
use tracing::{error, info, warn, Level};

use trak::config::{Settings, SETTINGS_FILE};
use trak::control::{ControlAction, KeyContext, KeyboardController};
use trak::midi::Transport;
use trak::persist::{load_project, load_studio, save_interactive, save_project};
use trak::project::{PlayMode, Project};
use trak::sequencer::{Context, EventQueue, InputEvent, SequencerOptions, StepSequencer};
use trak::studio::Studio;
use trak::timing::{RowClock, MAX_TEMPO, MIN_TEMPO};
use trak::ui::{App, RepaintTracker, View};

/// Longest the loop sleeps when no row is due
const IDLE_WAIT: Duration = Duration::from_millis(250);

fn print_usage() {
    println!("trak - MIDI tracker step sequencer");
    println!();
    println!("Usage: trak [OPTIONS] [PROJECT]");
    println!();
    println!("Options:");
    println!("  -s, --studio=FILE       Studio catalog to load");
    println!("  -d, --debug             Write debug output to the log file");
    println!("      --list-midi         List available MIDI ports");
    println!("  -h, --help              Show this help message");
    println!();
    println!("Settings are read from ./{} when present.", SETTINGS_FILE);
}

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct Args {
    debug: bool,
    help: bool,
    list_midi: bool,
    studio: Option<PathBuf>,
    project: Option<PathBuf>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut parsed = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" | "--debug" => parsed.debug = true,
            "-h" | "--help" => parsed.help = true,
            "--list-midi" => parsed.list_midi = true,
            "-s" | "--studio" => {
                let file = args
                    .next()
                    .ok_or_else(|| anyhow!("{} requires a file name", arg))?;
                parsed.studio = Some(PathBuf::from(file));
            }
            _ => {
                if let Some(file) = arg.strip_prefix("--studio=") {
                    parsed.studio = Some(PathBuf::from(file));
                } else if arg.starts_with('-') {
                    return Err(anyhow!("Unknown option: {}", arg));
                } else if parsed.project.is_some() {
                    return Err(anyhow!("Only one project file may be given"));
                } else {
                    parsed.project = Some(PathBuf::from(arg));
                }
            }
        }
    }

    Ok(parsed)
}

/// Log to a file so the terminal UI stays clean
fn init_logging(debug: bool) -> Result<PathBuf> {
    let path = env::temp_dir().join("trak.log");
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file: {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(if debug { Level::DEBUG } else { Level::WARN })
        .init();
    Ok(path)
}

#[cfg(feature = "hardware")]
fn list_midi() {
    println!("MIDI destinations:");
    for (i, name) in trak::midi::list_destinations() {
        println!("  {}: {}", i, name);
    }
    println!("MIDI sources:");
    for (i, name) in trak::midi::list_sources() {
        println!("  {}: {}", i, name);
    }
}

#[cfg(not(feature = "hardware"))]
fn list_midi() {
    println!("trak was built without hardware MIDI support (enable the `hardware` feature)");
}

/// Connect an output for every studio device named in the settings
#[cfg(feature = "hardware")]
fn open_transport(studio: &Studio, settings: &Settings, notices: &mut Vec<String>) -> Box<dyn Transport> {
    use trak::index::DeviceIdx;
    use trak::midi::{MidirOutput, PortTransport};

    let mut transport = PortTransport::new();
    for (i, device) in studio.devices.iter().enumerate() {
        let Some(port) = settings.output_port(&device.name) else {
            continue;
        };
        let Ok(idx) = DeviceIdx::new(i) else {
            continue;
        };
        match MidirOutput::new_by_name(port) {
            Ok(output) => transport.attach(idx, Box::new(output)),
            Err(e) => {
                warn!("device '{}': {:#}", device.name, e);
                notices.push(format!("No output for {}", device.name));
            }
        }
    }
    Box::new(transport)
}

#[cfg(not(feature = "hardware"))]
fn open_transport(_studio: &Studio, _settings: &Settings, _notices: &mut Vec<String>) -> Box<dyn Transport> {
    Box::new(trak::midi::LogTransport)
}

#[cfg(feature = "hardware")]
type MidiIn = trak::midi::MidirInput;

#[cfg(not(feature = "hardware"))]
type MidiIn = ();

#[cfg(feature = "hardware")]
fn open_input(settings: &Settings, notices: &mut Vec<String>) -> Option<MidiIn> {
    let name = settings.midi.input.as_deref()?;
    match trak::midi::MidirInput::new_by_name(name) {
        Ok(input) => Some(input),
        Err(e) => {
            warn!("MIDI input: {:#}", e);
            notices.push(format!("No MIDI input {}", name));
            None
        }
    }
}

#[cfg(not(feature = "hardware"))]
fn open_input(_settings: &Settings, _notices: &mut Vec<String>) -> Option<MidiIn> {
    None
}

#[cfg(feature = "hardware")]
fn read_input(input: &MidiIn, queue: &mut EventQueue) {
    use trak::sequencer::Route;

    for message in input.recv_all() {
        if let Some(event) = message.to_input_event(Route::Broadcast) {
            if let Err(e) = queue.add(event) {
                warn!("dropped MIDI input: {}", e);
            }
        }
    }
}

#[cfg(not(feature = "hardware"))]
fn read_input(_input: &MidiIn, _queue: &mut EventQueue) {}

/// Studio from the command line, else the settings, else the built-in one
fn open_studio(args: &Args, settings: &Settings, notices: &mut Vec<String>) -> Studio {
    let Some(path) = args.studio.as_ref().or(settings.studio.as_ref()) else {
        return Studio::default();
    };
    match load_studio(path) {
        Ok(studio) => studio,
        Err(e) => {
            warn!("using the default studio: {:#}", e);
            notices.push(format!("Could not load studio {}", path.display()));
            Studio::default()
        }
    }
}

/// Project from the command line; a missing file starts a new project
/// that will be saved under that name
fn open_project(args: &Args, studio: &Studio, settings: &Settings, notices: &mut Vec<String>) -> Result<Project> {
    let fresh = || Project::with_rows(studio, settings.pattern_rows);
    let Some(path) = args.project.as_ref() else {
        return Ok(fresh()?);
    };
    if !path.exists() {
        info!("new project {}", path.display());
        let mut project = fresh()?;
        project.filename = Some(path.clone());
        return Ok(project);
    }
    match load_project(path, studio) {
        Ok(project) => Ok(project),
        Err(e) => {
            warn!("starting a new project: {:#}", e);
            notices.push(format!("Could not load {}", path.display()));
            Ok(fresh()?)
        }
    }
}

/// The pieces a tick borrows, kept apart from the sequencer so both can be
/// borrowed at once
struct Engine {
    project: Project,
    studio: Studio,
    transport: Box<dyn Transport>,
    tracker: RepaintTracker,
}

impl Engine {
    fn context(&mut self) -> Context<'_> {
        Context::new(
            &mut self.project,
            &self.studio,
            self.transport.as_mut(),
            &mut self.tracker,
        )
    }
}

/// Everything the event loop drives
struct Session {
    engine: Engine,
    sequencer: StepSequencer,
    keyboard: KeyboardController,
    queue: EventQueue,
    clock: RowClock,
    /// Key sounding from the computer keyboard
    audition: Option<u8>,
}

impl Session {
    fn queue_event(&mut self, event: InputEvent) {
        if let Err(e) = self.queue.add(event) {
            warn!("dropped input: {}", e);
        }
    }

    /// Release the key sounding from the computer keyboard
    fn release_audition(&mut self) {
        if let Some(key) = self.audition.take() {
            self.queue_event(InputEvent::note_off(key));
        }
    }

    /// Drain queued input through the edit tick
    fn flush_input(&mut self) -> Result<()> {
        if !self.queue.is_empty() {
            self.sequencer
                .edit_tick(&mut self.engine.context(), &mut self.queue)?;
        }
        Ok(())
    }

    fn retime_clock(&mut self) -> Result<()> {
        let project = &self.engine.project;
        self.clock
            .set_tempo(project.effective_tempo()?, project.quantization());
        Ok(())
    }

    /// Apply one key action. Returns false when the user asked to quit.
    /// Engine errors are fatal; a failed save only reports.
    fn handle_action(&mut self, action: ControlAction, app: &mut App) -> Result<bool> {
        let seq = &mut self.sequencer;
        match action {
            ControlAction::NoteKey(offset) => {
                if let Some(key) = self.keyboard.note_key(offset) {
                    self.release_audition();
                    self.queue_event(InputEvent::note_on(key, self.keyboard.velocity()));
                    self.audition = Some(key);
                }
            }
            ControlAction::OctaveUp => {
                self.keyboard.octave_up();
                self.engine.tracker.force();
            }
            ControlAction::OctaveDown => {
                self.keyboard.octave_down();
                self.engine.tracker.force();
            }
            ControlAction::Play(mode) => {
                seq.set_mode(mode, &mut self.engine.context())?;
                self.retime_clock()?;
                self.clock.start(Instant::now());
            }
            ControlAction::Stop => {
                seq.set_mode(PlayMode::Stopped, &mut self.engine.context())?;
                self.clock.stop();
                self.release_audition();
            }
            ControlAction::AdjustTempo(delta) => {
                let tempo = (self.engine.project.tempo() as i32 + delta as i32).clamp(MIN_TEMPO, MAX_TEMPO);
                seq.set_tempo(tempo as u16, &mut self.engine.context())?;
                self.retime_clock()?;
            }
            ControlAction::ToggleEdit => {
                seq.toggle_edit(&mut self.engine.context())?;
            }
            ControlAction::HexDigit(digit) => {
                seq.enter_digit(digit, &mut self.engine.context())?;
            }
            ControlAction::ClearCell => {
                seq.clear_cell(&mut self.engine.context())?;
            }
            ControlAction::MoveCursor { rows, columns } => {
                seq.move_cursor(rows, columns, &mut self.engine.context())?;
            }
            ControlAction::NextTrack => {
                seq.move_track(1, &mut self.engine.context())?;
            }
            ControlAction::PrevTrack => {
                seq.move_track(-1, &mut self.engine.context())?;
            }
            ControlAction::SelectPattern(delta) => {
                seq.select_pattern_in_part(delta, &mut self.engine.context())?;
            }
            ControlAction::SelectPart(delta) => {
                seq.select_part_in_song(delta, &mut self.engine.context())?;
            }
            ControlAction::SelectSong(delta) => {
                seq.select_song(delta, &mut self.engine.context())?;
            }
            ControlAction::Save => {
                let project = &mut self.engine.project;
                match project.filename.clone() {
                    Some(path) => match save_project(project, &path) {
                        Ok(()) => app.state_mut().set_status(format!("Saved {}", path.display())),
                        Err(e) => {
                            warn!("save failed: {:#}", e);
                            app.state_mut().set_status(format!("Save failed: {}", e));
                        }
                    },
                    None => app
                        .state_mut()
                        .set_status("No file name yet; you will be asked on exit"),
                }
                self.engine.tracker.force();
            }
            ControlAction::ToggleHelp => {
                let state = app.state_mut();
                state.show_help = !state.show_help;
                self.engine.tracker.force();
            }
            ControlAction::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn key_context(&self) -> KeyContext {
        let nibble = self
            .sequencer
            .current_column(&self.engine.project)
            .map(|c| c.kind.is_nibble())
            .unwrap_or(false);
        KeyContext {
            editing: self.engine.project.is_edit(),
            nibble,
        }
    }

    /// Run until the user quits
    fn run(&mut self, app: &mut App, input: Option<&MidiIn>) -> Result<()> {
        loop {
            if self.engine.tracker.take() {
                let view = View {
                    project: &self.engine.project,
                    columns: self.sequencer.columns(),
                    keyboard: &self.keyboard,
                };
                app.draw(&view)?;
            }

            let now = Instant::now();
            let wait = if self.engine.project.mode().is_playing() {
                self.clock.time_until_next_row(now)
            } else {
                IDLE_WAIT
            };

            match app.poll_event(wait)? {
                Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    let ctx = self.key_context();
                    if let Some(action) = self.keyboard.process_key(key.code, key.modifiers, ctx) {
                        if action.needs_edit() && !ctx.editing {
                            app.state_mut().set_status("Edit mode is off (Space)");
                            self.engine.tracker.force();
                        }
                        if !self.handle_action(action, app)? {
                            return Ok(());
                        }
                    }
                }
                Some(Event::Resize(..)) => self.engine.tracker.force(),
                _ => {}
            }

            if let Some(input) = input {
                read_input(input, &mut self.queue);
            }
            self.flush_input()?;

            while self.clock.poll(Instant::now()) {
                if !self.engine.project.mode().is_playing() {
                    self.clock.stop();
                    break;
                }
                self.sequencer.step(&mut self.engine.context())?;
                self.retime_clock()?;
            }

            if app.state_mut().clear_expired_status() {
                self.engine.tracker.force();
            }
        }
    }
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::load_or_default(SETTINGS_FILE);
    let mut notices = Vec::new();

    let studio = open_studio(&args, &settings, &mut notices);
    let project = open_project(&args, &studio, &settings, &mut notices)?;
    let transport = open_transport(&studio, &settings, &mut notices);
    let input = open_input(&settings, &mut notices);

    let sequencer = StepSequencer::new(&project, &studio)?.with_options(SequencerOptions {
        thru: settings.thru,
    });
    let clock = RowClock::new(project.effective_tempo()?, project.quantization());

    let mut session = Session {
        engine: Engine {
            project,
            studio,
            transport,
            tracker: RepaintTracker::new(),
        },
        sequencer,
        keyboard: KeyboardController::with_defaults().with_entry(settings.octave, settings.velocity),
        queue: EventQueue::new(),
        clock,
        audition: None,
    };

    let mut app = App::new(settings.poll_ms).context("Failed to start the terminal UI")?;
    if let Some(notice) = notices.first() {
        app.state_mut().set_status(notice.clone());
    }

    let result = session.run(&mut app, input.as_ref());

    // Silence anything still sounding before leaving
    session.release_audition();
    if session.engine.project.mode().is_playing() {
        let stopped = session
            .sequencer
            .set_mode(PlayMode::Stopped, &mut session.engine.context());
        if let Err(e) = stopped {
            warn!("stop on exit: {}", e);
        }
    }
    if let Err(e) = session.flush_input() {
        warn!("release on exit: {:#}", e);
    }
    if let Err(e) = session.engine.transport.all_notes_off() {
        warn!("all notes off: {:#}", e);
    }
    app.restore()?;
    result?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    if let Some(path) = save_interactive(&mut session.engine.project, &mut stdin.lock(), &mut stdout)? {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn main() {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if args.help {
        print_usage();
        return;
    }
    if args.list_midi {
        list_midi();
        return;
    }

    if let Err(e) = init_logging(args.debug) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["-d", "--studio=lab.studio", "song.trak"]).unwrap();
        assert!(parsed.debug);
        assert_eq!(parsed.studio, Some(PathBuf::from("lab.studio")));
        assert_eq!(parsed.project, Some(PathBuf::from("song.trak")));

        let parsed = args(&["-s", "lab.studio"]).unwrap();
        assert_eq!(parsed.studio, Some(PathBuf::from("lab.studio")));
        assert!(parsed.project.is_none());

        assert!(args(&["--help"]).unwrap().help);
        assert_eq!(args(&[]).unwrap(), Args::default());
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(args(&["-s"]).is_err());
        assert!(args(&["--bogus"]).is_err());
        assert!(args(&["a.trak", "b.trak"]).is_err());
    }
}
