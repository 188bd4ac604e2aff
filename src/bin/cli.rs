//! tonewright CLI: headless playback and WAV export of a demo arrangement.
//!
//! Usage:
//!   cargo run --bin tw-cli
//!   cargo run --bin tw-cli -- --wav demo.wav --seconds 8
//!   RUST_LOG=debug cargo run --bin tw-cli -- --null

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tw_master::{
    AdsrParams, Controller, EngineConfig, EngineError, MusicalTime, NoteEvent, NullDevice, Pitch,
};

/// Play a short demo arrangement through the tonewright engine.
#[derive(Parser, Debug)]
#[command(name = "tw-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Headless playback and WAV export for the tonewright audio engine", long_about = None)]
struct Args {
    /// Render offline to this WAV file instead of playing
    #[arg(long, value_name = "PATH")]
    wav: Option<PathBuf>,

    /// Length to play or render
    #[arg(short, long, default_value_t = 8.0)]
    seconds: f64,

    /// Tempo in beats per minute
    #[arg(short, long, default_value_t = 120.0)]
    bpm: f64,

    /// Sample rate for offline rendering
    #[arg(long, default_value_t = 44_100)]
    sample_rate: u32,

    /// Frames per render block
    #[arg(long, default_value_t = 256)]
    block_size: u16,

    /// Play through a silent, real-time-paced device instead of the sound card
    #[arg(long)]
    null: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        initial_bpm: args.bpm,
        ..Default::default()
    };

    let Some(path) = &args.wav else {
        return exit_with(play_audio(config, &args));
    };

    println!("Rendering to {} at {} Hz...", path.display(), config.sample_rate);
    let wav = match render_wav(config, args.seconds) {
        Ok(wav) => wav,
        Err(e) => return exit_with(Err(e)),
    };
    if let Err(e) = std::fs::write(path, &wav) {
        eprintln!("Failed to write {}: {}", path.display(), e);
        return ExitCode::FAILURE;
    }
    println!("Wrote {} bytes", wav.len());
    ExitCode::SUCCESS
}

fn exit_with(result: Result<(), EngineError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn play_audio(config: EngineConfig, args: &Args) -> Result<(), EngineError> {
    let mut ctrl = if args.null {
        Controller::with_device(config, NullDevice::new(48_000))?
    } else {
        Controller::new(config)?
    };
    ctrl.initialize()?;
    build_demo(&mut ctrl, args.seconds)?;
    ctrl.start()?;
    println!("Playing at {} BPM...", ctrl.bpm());
    println!();

    let begin = Instant::now();
    let length = Duration::from_secs_f64(args.seconds.max(0.0));
    while begin.elapsed() < length && ctrl.is_rendering() {
        print!("\rBeat: {:7.2}", ctrl.position_beats());
        let _ = std::io::stdout().flush();
        for report in ctrl.poll_reports() {
            tracing::debug!("{report}");
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    ctrl.stop()?;
    ctrl.dispose();
    println!("\rDone.          ");
    Ok(())
}

fn render_wav(config: EngineConfig, seconds: f64) -> Result<Vec<u8>, EngineError> {
    let mut ctrl = Controller::offline(config)?;
    ctrl.initialize()?;
    build_demo(&mut ctrl, seconds)?;
    ctrl.start()?;
    let wav = ctrl.bounce_to_wav(seconds)?;
    for report in ctrl.poll_reports() {
        tracing::debug!("{report}");
    }
    Ok(wav)
}

/// Three tracks (bass, lead, pad) looping a four-bar progression, with a
/// little reverb on the master.
fn build_demo(ctrl: &mut Controller, seconds: f64) -> Result<(), EngineError> {
    ctrl.create_track("bass", "Bass")?;
    ctrl.create_instrument("bass", "synth")?;
    ctrl.set_envelope("bass", AdsrParams::new(0.005, 0.1, 0.6, 0.2))?;
    ctrl.create_effect("bass-lp", "filter", "bass")?;
    ctrl.set_effect_param("bass-lp", "frequency", 600.0)?;
    ctrl.set_volume("bass", 0.8)?;

    ctrl.create_track("lead", "Lead")?;
    ctrl.create_instrument("lead", "fmSynth")?;
    ctrl.create_effect("lead-delay", "delay", "lead")?;
    ctrl.set_effect_param("lead-delay", "wet", 0.3)?;
    ctrl.set_pan("lead", 0.3)?;
    ctrl.set_volume("lead", 0.5)?;

    ctrl.create_track("pad", "Pad")?;
    ctrl.create_instrument("pad", "amSynth")?;
    ctrl.set_pan("pad", -0.3)?;
    ctrl.set_volume("pad", 0.35)?;

    ctrl.create_master_effect("room", "reverb")?;
    ctrl.set_effect_param("room", "wet", 0.25)?;
    ctrl.set_master_volume(0.8)?;

    let chords: [[&str; 3]; 4] = [
        ["A3", "C4", "E4"],
        ["F3", "A3", "C4"],
        ["C3", "E3", "G3"],
        ["G3", "B3", "D4"],
    ];
    let roots = ["A1", "F1", "C2", "G1"];
    let melody = ["E5", "C5", "A4", "C5", "D5", "C5", "B4", "G4"];

    let beats = (seconds * ctrl.bpm() / 60.0).ceil() as u64;
    for beat in 0..beats {
        let bar = (beat / 4 % 4) as usize;
        let at = MusicalTime::from_beats(beat);
        note(ctrl, "bass", roots[bar], at, 0.9, 0.8)?;
        note(ctrl, "lead", melody[(beat % 8) as usize], at, 0.45, 0.7)?;
        if beat % 4 == 0 {
            for p in chords[bar] {
                note(ctrl, "pad", p, at, 3.5, 0.5)?;
            }
        }
    }
    Ok(())
}

fn note(
    ctrl: &mut Controller,
    track: &str,
    pitch: &str,
    start: MusicalTime,
    beats: f64,
    velocity: f32,
) -> Result<(), EngineError> {
    let pitch: Pitch = pitch.parse()?;
    let event = NoteEvent::new(track, pitch, start).with_duration(beats).with_velocity(velocity);
    ctrl.schedule_note(&event)
}
