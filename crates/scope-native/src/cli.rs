//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use scope_core::window::TriggerSettings;
use scope_core::{DisplayMode, ScopeConfig, TriggerEdge};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    /// Default input device
    Mic,
    /// A WAV file (requires --file)
    File,
    /// Built-in test tone
    Synthetic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DisplayArg {
    Yt,
    Xy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TriggerArg {
    Rising,
    Falling,
    Off,
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "phosphor-scope")]
#[command(about = "Audio-reactive oscilloscope, headless native runner", long_about = None)]
pub struct Args {
    /// Where audio comes from
    #[arg(long, value_enum, default_value = "mic")]
    pub source: SourceArg,

    /// WAV file to play when --source file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// JSON brain profile (as returned by a classifier)
    #[arg(long, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Stop after this many seconds (runs until interrupted otherwise)
    #[arg(long, value_name = "SECONDS")]
    pub seconds: Option<f64>,

    /// Analyser FFT size (power of two, 256..=16384)
    #[arg(long, value_name = "N", default_value = "2048")]
    pub fft_size: usize,

    /// Samples per displayed waveform window
    #[arg(long, value_name = "N", default_value = "1024")]
    pub window: usize,

    #[arg(long, value_enum, default_value = "yt")]
    pub display: DisplayArg,

    #[arg(long, value_enum, default_value = "rising")]
    pub trigger: TriggerArg,

    /// Disable automatic gain on the waveform window
    #[arg(long)]
    pub no_auto_scale: bool,

    /// Turn the auto-pilot off and show the live waveform
    #[arg(long)]
    pub manual: bool,

    /// Debug logging (RUST_LOG still wins when set)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn scope_config(&self, sample_rate: f32) -> ScopeConfig {
        let mut config = ScopeConfig::default();
        config.features.sample_rate = sample_rate;
        config.features.fft_size = self.fft_size;
        config.window.window_size = self.window;
        config.window.trigger = match self.trigger {
            TriggerArg::Rising => Some(TriggerSettings {
                edge: TriggerEdge::Rising,
                ..TriggerSettings::default()
            }),
            TriggerArg::Falling => Some(TriggerSettings {
                edge: TriggerEdge::Falling,
                ..TriggerSettings::default()
            }),
            TriggerArg::Off => None,
        };
        if self.no_auto_scale {
            config.window.auto_scale = None;
        }
        config.display = match self.display {
            DisplayArg::Yt => DisplayMode::YT,
            DisplayArg::Xy => DisplayMode::XY,
        };
        config.auto_pilot = !self.manual;
        config
    }
}
