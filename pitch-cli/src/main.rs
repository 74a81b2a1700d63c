//! # Pitch Tuner - Command Line Driver
//!
//! Drives a `pitch_core::Session` from the default microphone or a WAV file,
//! printing the detected note, frequency and tuning offset as it changes.
//!
//! ## Architecture
//! - **Audio Thread**: CPAL callback framing device buffers
//! - **Communication**: Single-slot crossbeam channel, at most one frame in flight
//! - **Main Thread**: Analysis loop calling `Session::tick` per frame
//! - **Stdin Thread**: Keyboard commands (toggle recording, quit)

mod capture;
mod controls;
mod export;
mod framing;
mod wav;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Parser};
use crossbeam_channel::{Receiver, after, never, select};
use pitch_core::config::SENSITIVE_SILENCE_RMS_THRESHOLD;
use pitch_core::{
    AutocorrelationMethod, FrameSource, RecordingSink, SampleFrame, Session, SourceError, TickReport,
    TunerConfig,
};
use tracing_subscriber::EnvFilter;

use controls::Command;
use wav::WavSource;

/// Command line options. Flags override values from `--config`.
#[derive(Debug, Parser)]
#[command(name = "pitch-tuner", version, about = "Real-time monophonic pitch detector")]
struct Args {
    /// Analyse this WAV file instead of the default microphone
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Training target note, e.g. "A4"
    #[arg(short, long)]
    target: Option<String>,

    /// Report in/out-of-tune against the target note
    #[arg(long)]
    train: bool,

    /// Use the low silence gate (0.0015) for quiet sources
    #[arg(long)]
    sensitive: bool,

    /// RMS level below which a frame counts as silence
    #[arg(long)]
    silence_threshold: Option<f32>,

    /// Silent frames to keep showing the last note
    #[arg(long)]
    hold_frames: Option<u32>,

    /// In-tune tolerance in cents
    #[arg(long)]
    tolerance: Option<f32>,

    /// Use FFT autocorrelation instead of the direct sum
    #[arg(long)]
    fft: bool,

    /// Analysis frames per second
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Stop after this many seconds of microphone capture
    #[arg(long)]
    seconds: Option<f64>,

    /// Record detected notes and export them here (.mid or .json)
    #[arg(short, long)]
    record: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Layers defaults, the config file and command line flags.
    fn tuner_config(&self) -> Result<TunerConfig> {
        let mut config = match &self.config {
            Some(path) => TunerConfig::load(path)?,
            None => TunerConfig::default(),
        };
        if self.sensitive {
            config.silence_rms_threshold = SENSITIVE_SILENCE_RMS_THRESHOLD;
        }
        if let Some(threshold) = self.silence_threshold {
            config.silence_rms_threshold = threshold;
        }
        if let Some(frames) = self.hold_frames {
            config.silence_hold_frames = frames;
        }
        if let Some(tolerance) = self.tolerance {
            config.training_tolerance_cents = tolerance;
        }
        if let Some(target) = &self.target {
            config.target_note_name = target.clone();
        }
        if self.fft {
            config.autocorrelation = AutocorrelationMethod::Fft;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.tuner_config().context("invalid configuration")?;
    if let Some(path) = &args.save_config {
        config.save(path)?;
        tracing::info!(path = %path.display(), "configuration saved");
        return Ok(());
    }

    // Resolve the export format before capturing anything.
    let sink = match &args.record {
        Some(path) => Some((
            path.as_path(),
            export::sink_for_path(path).ok_or_else(|| {
                anyhow!("unsupported export format {}; use .mid or .json", path.display())
            })?,
        )),
        None => None,
    };

    let mut session = Session::new(config)?;
    let mut printer = Printer::new(args.train);

    match &args.input {
        Some(path) => run_file(&mut session, &mut printer, path, &args)?,
        None => run_microphone(&mut session, &mut printer, &args)?,
    }

    if let Some((path, mut sink)) = sink {
        export_recording(&session, sink.as_mut(), path)?;
    }
    Ok(())
}

/// Analyses a WAV file as fast as it can be read, stamping each frame
/// with its position in the file.
fn run_file(session: &mut Session, printer: &mut Printer, path: &Path, args: &Args) -> Result<()> {
    let mut source = WavSource::open(path, session.config().frame_size, args.fps)?;

    session.start_session();
    if args.record.is_some() {
        session.toggle_recording();
    }

    loop {
        let frame = match source.pull_frame() {
            Ok(frame) => frame,
            Err(SourceError::Disconnected) => break,
            Err(e) => return Err(e.into()),
        };
        let report = session.tick(&frame, source.timestamp_millis())?;
        printer.show(&report, session.target_note());
    }

    finish(session);
    Ok(())
}

/// Captures from the default microphone until `q` is entered, `--seconds`
/// elapse or the device goes away.
fn run_microphone(session: &mut Session, printer: &mut Printer, args: &Args) -> Result<()> {
    let (capture, source) = capture::start_capture(session.config().frame_size, args.fps)
        .context("starting audio capture")?;
    tracing::info!(sample_rate = capture.sample_rate, "listening");
    eprintln!("Press Enter to toggle recording, q then Enter to stop.");

    session.start_session();
    if args.record.is_some() {
        session.toggle_recording();
    }

    let deadline = match args.seconds {
        Some(seconds) if seconds > 0.0 => after(Duration::from_secs_f64(seconds)),
        _ => never(),
    };
    let commands = controls::spawn_stdin_commands();

    let reason = capture_loop(session, printer, source.receiver(), &commands, &deadline)?;
    tracing::info!(?reason, "capture stopped");

    capture.pause();
    finish(session);
    Ok(())
}

/// Why [`capture_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    Quit,
    Deadline,
    StreamClosed,
}

/// Ticks the session with each incoming frame and applies keyboard
/// commands until a stop condition is met. A disconnected command channel
/// only turns the controls off.
fn capture_loop(
    session: &mut Session,
    printer: &mut Printer,
    frames: &Receiver<SampleFrame>,
    commands: &Receiver<Command>,
    deadline: &Receiver<Instant>,
) -> Result<StopReason> {
    let no_commands = never();
    let mut controls_open = true;

    loop {
        let command_rx = if controls_open { commands } else { &no_commands };
        select! {
            recv(frames) -> msg => match msg {
                Ok(frame) => {
                    let report = session.tick(&frame, wall_clock_millis())?;
                    printer.show(&report, session.target_note());
                }
                Err(_) => {
                    tracing::warn!("audio stream closed");
                    return Ok(StopReason::StreamClosed);
                }
            },
            recv(command_rx) -> msg => match msg {
                Ok(Command::ToggleRecording) => {
                    let recording = session.toggle_recording();
                    tracing::info!(recording, notes = session.recording().len(), "recording toggled");
                }
                Ok(Command::Quit) => return Ok(StopReason::Quit),
                Err(_) => controls_open = false,
            },
            recv(deadline) -> _ => return Ok(StopReason::Deadline),
        }
    }
}

fn finish(session: &mut Session) {
    if session.is_recording() {
        session.toggle_recording();
    }
    session.stop_session();
}

fn export_recording(session: &Session, sink: &mut dyn RecordingSink, path: &Path) -> Result<()> {
    if session.recording().is_empty() {
        bail!("no notes were recorded, nothing written to {}", path.display());
    }
    session
        .export_recording(sink)
        .with_context(|| format!("exporting to {}", path.display()))?;
    println!("Saved {} notes to {}", session.recording().len(), path.display());
    Ok(())
}

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Prints a display line whenever it changes.
struct Printer {
    train: bool,
    last_line: String,
}

impl Printer {
    fn new(train: bool) -> Self {
        Self {
            train,
            last_line: String::new(),
        }
    }

    fn show(&mut self, report: &TickReport, target_note: &str) {
        let mut line = report.display.to_string();
        if self.train {
            match report.training {
                Some(result) if result.in_tune => {
                    line.push_str(&format!("  | {target_note}: in tune ({:.1} c)", result.cents_off))
                }
                Some(result) => {
                    line.push_str(&format!("  | {target_note}: off by {:.1} c", result.cents_off))
                }
                None => line.push_str(&format!("  | {target_note}: waiting")),
            }
        }
        if line != self.last_line {
            println!("{line}");
            self.last_line = line;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    use crossbeam_channel::unbounded;
    use pitch_core::source::frame_channel;

    use crate::export::JsonFileSink;

    fn a4_frame() -> SampleFrame {
        let samples = (0..2048)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();
        SampleFrame::new(samples, 44100).unwrap()
    }

    fn running_session() -> Session {
        let mut session = Session::new(TunerConfig::default()).unwrap();
        session.start_session();
        session
    }

    #[test]
    fn quit_freezes_and_exports_recording() {
        let mut session = running_session();
        session.toggle_recording();
        session.tick(&a4_frame(), 10).unwrap();

        let (_sender, source) = frame_channel(44100);
        let (tx, commands) = unbounded();
        tx.send(Command::Quit).unwrap();

        let mut printer = Printer::new(false);
        let reason = capture_loop(&mut session, &mut printer, source.receiver(), &commands, &never()).unwrap();
        assert_eq!(reason, StopReason::Quit);

        finish(&mut session);
        assert!(!session.is_running());
        assert!(session.recording().is_frozen());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.json");
        export_recording(&session, &mut JsonFileSink::new(&path), &path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["notes"][0]["note_number"], 69);
    }

    #[test]
    fn toggle_command_starts_recording() {
        let mut session = running_session();
        let (_sender, source) = frame_channel(44100);
        let (tx, commands) = unbounded();
        tx.send(Command::ToggleRecording).unwrap();
        tx.send(Command::Quit).unwrap();

        let mut printer = Printer::new(false);
        capture_loop(&mut session, &mut printer, source.receiver(), &commands, &never()).unwrap();
        assert!(session.is_recording());
    }

    #[test]
    fn closed_controls_leave_deadline_in_charge() {
        let mut session = running_session();
        let (_sender, source) = frame_channel(44100);
        let (tx, commands) = unbounded::<Command>();
        drop(tx);

        let mut printer = Printer::new(false);
        let deadline = after(Duration::from_millis(20));
        let reason = capture_loop(&mut session, &mut printer, source.receiver(), &commands, &deadline).unwrap();
        assert_eq!(reason, StopReason::Deadline);
        assert!(session.is_running());
    }

    #[test]
    fn stream_close_stops_loop() {
        let mut session = running_session();
        let (sender, source) = frame_channel(44100);
        drop(sender);
        let (_tx, commands) = unbounded::<Command>();

        let mut printer = Printer::new(false);
        let reason = capture_loop(&mut session, &mut printer, source.receiver(), &commands, &never()).unwrap();
        assert_eq!(reason, StopReason::StreamClosed);
    }
}
