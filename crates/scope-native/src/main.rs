//! Headless native runner: captures or plays audio, drives the scope at two
//! cadences and logs a once-per-second summary of what would be drawn.

mod audio;
mod cli;

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use scope_core::constants::{DEFAULT_SAMPLE_RATE, RENDER_INTERVAL_MS};
use scope_core::{
    open_or_fallback, profile_or_default, AnalyserSource, BrainProfile, CaptureSession,
    JsonProfileClassifier, RenderFrame, Scope, ScopeError, SyntheticSource, VisualMode,
};

use audio::{decode_wav, FilePlayer, MicCapture};
use cli::{Args, SourceArg};

/// Everything that keeps the audio input alive for the duration of the run.
struct Input {
    source: Box<dyn AnalyserSource>,
    session: CaptureSession,
    player: Option<FilePlayer>,
    _mic: Option<MicCapture>,
    _output: Option<cpal::Stream>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(if args.verbose {
        "debug"
    } else {
        "info"
    }))
    .init();

    let profile = load_profile(args.profile.as_deref());
    let mut input = open_input(&args)?;
    let config = args.scope_config(input.source.sample_rate());
    let mut scope = Scope::new(config, profile).context("scope config rejected")?;

    run(&args, &mut scope, &mut input);
    input.session.teardown();
    Ok(())
}

fn load_profile(path: Option<&Path>) -> BrainProfile {
    let Some(path) = path else {
        return BrainProfile::default();
    };
    match std::fs::read_to_string(path) {
        Ok(body) => profile_or_default(&JsonProfileClassifier::new(body), &[], ""),
        Err(e) => {
            log::warn!("[main] cannot read profile {}: {e}", path.display());
            BrainProfile::default()
        }
    }
}

fn open_input(args: &Args) -> anyhow::Result<Input> {
    let fft_size = args.fft_size;
    match args.source {
        SourceArg::Synthetic => Ok(Input {
            source: Box::new(SyntheticSource::fallback(DEFAULT_SAMPLE_RATE, fft_size)?),
            session: CaptureSession::synthetic(),
            player: None,
            _mic: None,
            _output: None,
        }),
        SourceArg::Mic => {
            let (mic, opened) = match MicCapture::open(fft_size) {
                Ok(mic) => {
                    let source: Box<dyn AnalyserSource> = Box::new(mic.analyser.clone());
                    (Some(mic), Ok(source))
                }
                Err(e) => (None, Err(e)),
            };
            let (source, fell_back) = open_or_fallback(opened, DEFAULT_SAMPLE_RATE, fft_size)?;
            Ok(Input {
                source,
                session: if fell_back {
                    CaptureSession::synthetic()
                } else {
                    CaptureSession::live()
                },
                player: None,
                _mic: mic,
                _output: None,
            })
        }
        SourceArg::File => {
            let path = args
                .file
                .as_deref()
                .context("--source file needs --file <PATH>")?;
            match open_file(path, fft_size) {
                Ok(input) => Ok(input),
                Err(e) => {
                    let (source, _) = open_or_fallback(Err(e), DEFAULT_SAMPLE_RATE, fft_size)?;
                    Ok(Input {
                        source,
                        session: CaptureSession::synthetic(),
                        player: None,
                        _mic: None,
                        _output: None,
                    })
                }
            }
        }
    }
}

fn open_file(path: &Path, fft_size: usize) -> Result<Input, ScopeError> {
    let file = decode_wav(path)?;
    let mut player = FilePlayer::new(&file, fft_size)?;
    let output = player.open_output();
    let mut session = CaptureSession::file(file.duration_sec(), Box::new(player.clone()))?;
    session.play(0.0)?;
    Ok(Input {
        source: Box::new(player.analyser()),
        session,
        player: Some(player),
        _mic: None,
        _output: output,
    })
}

/// Render at the display rate; the scope itself rate-limits analysis.
fn run(args: &Args, scope: &mut Scope, input: &mut Input) {
    let start = Instant::now();
    let mut last = start;
    let mut summary = Summary::default();
    loop {
        let now = Instant::now();
        let dt = (now - last).as_secs_f64();
        last = now;
        let now_sec = start.elapsed().as_secs_f64();
        if args.seconds.is_some_and(|limit| now_sec >= limit) {
            log::info!("[main] time limit reached");
            break;
        }

        input.source.advance(dt);
        if let Some(player) = input.player.as_mut() {
            player.pump(dt);
        }
        if input.session.update(now_sec) {
            log::info!("[main] file finished");
            break;
        }

        let now_ms = now_sec * 1000.0;
        if scope.analysis_tick(now_ms, input.source.as_mut()) {
            summary.analysis(scope);
        }
        let frame = scope.render_tick(dt as f32, now_ms);
        summary.frame(&frame);
        if now_sec - summary.since_sec >= 1.0 {
            summary.report(now_sec, scope);
        }

        let spent = now.elapsed();
        let budget = Duration::from_secs_f64(RENDER_INTERVAL_MS / 1000.0);
        if spent < budget {
            thread::sleep(budget - spent);
        }
    }
}

#[derive(Default)]
struct Summary {
    since_sec: f64,
    frames: u32,
    analyses: u32,
    beats: u32,
    peak_rms: f32,
    points: usize,
    trail: usize,
}

impl Summary {
    fn analysis(&mut self, scope: &Scope) {
        self.analyses += 1;
        if let Some(f) = scope.latest_features() {
            self.peak_rms = self.peak_rms.max(f.rms);
            self.beats += f.beat.fired as u32;
        }
    }

    fn frame(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        self.points = frame.pair.len();
        self.trail = frame.trail.len();
    }

    fn report(&mut self, now_sec: f64, scope: &Scope) {
        let mode = match scope.mode() {
            VisualMode::Waveform => "waveform",
            VisualMode::Shape(kind) => kind.name(),
        };
        log::info!(
            "[scope] t={now_sec:.1}s mode={mode} fps={} analysis={} rms={:.2} beats={} switches={} points={} trail={}",
            self.frames,
            self.analyses,
            self.peak_rms,
            self.beats,
            scope.decision().switch_count(),
            self.points,
            self.trail
        );
        *self = Summary {
            since_sec: now_sec,
            ..Summary::default()
        };
    }
}
