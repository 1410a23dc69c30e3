//! Deterministic test waveforms and the oscilloscope trigger finder.

use rand::prelude::*;
use std::f32::consts::TAU;

use crate::error::{Result, ScopeError};

/// Basic oscillator shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Saw,
    Triangle,
    Noise,
}

impl Waveform {
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Saw,
        Waveform::Triangle,
        Waveform::Noise,
    ];

    /// Unit-amplitude value at `cycle` (fractional position within one period,
    /// 0..1). Noise is not periodic and is produced by the caller's RNG.
    #[inline]
    fn periodic_value(self, cycle: f32) -> f32 {
        match self {
            Waveform::Sine => (cycle * TAU).sin(),
            Waveform::Square => {
                if cycle < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Saw => 2.0 * cycle - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (cycle - 0.5).abs(),
            Waveform::Noise => 0.0,
        }
    }
}

/// Parameters for [`generate`].
///
/// - `phase` is in radians and shifts every periodic waveform alike
/// - `seed` only affects [`Waveform::Noise`], keeping it reproducible
#[derive(Clone, Debug)]
pub struct SignalConfig {
    pub frequency_hz: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub offset_dc: f32,
    pub sample_rate: f32,
    pub duration_sec: f32,
    pub seed: u64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 440.0,
            amplitude: 1.0,
            phase: 0.0,
            offset_dc: 0.0,
            sample_rate: crate::constants::DEFAULT_SAMPLE_RATE,
            duration_sec: 0.1,
            seed: 42,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ScopeError::InvalidConfig(format!(
                "sample rate must be > 0, got {}",
                self.sample_rate
            )));
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(ScopeError::InvalidConfig(format!(
                "amplitude must be >= 0, got {}",
                self.amplitude
            )));
        }
        if !(self.duration_sec.is_finite() && self.duration_sec >= 0.0) {
            return Err(ScopeError::InvalidConfig(format!(
                "duration must be >= 0, got {}",
                self.duration_sec
            )));
        }
        if !self.frequency_hz.is_finite() || !self.phase.is_finite() || !self.offset_dc.is_finite()
        {
            return Err(ScopeError::InvalidConfig(
                "frequency, phase and offset must be finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of samples [`generate`] produces for this config.
    pub fn sample_count(&self) -> usize {
        (self.sample_rate * self.duration_sec).round() as usize
    }
}

/// Render `round(sample_rate * duration)` samples of `waveform`.
///
/// Every sample lies in `[offset - amplitude, offset + amplitude]`.
pub fn generate(waveform: Waveform, config: &SignalConfig) -> Result<Vec<f32>> {
    config.validate()?;
    let len = config.sample_count();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let phase_cycles = config.phase / TAU;
    let out = (0..len)
        .map(|i| {
            let t = i as f32 / config.sample_rate;
            let v = match waveform {
                Waveform::Noise => rng.gen_range(-1.0f32..=1.0),
                w => w.periodic_value((config.frequency_hz * t + phase_cycles).rem_euclid(1.0)),
            };
            config.offset_dc + config.amplitude * v
        })
        .collect();
    Ok(out)
}

/// Free-running oscillator used for real-time synthetic sources.
#[derive(Clone, Debug)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency_hz: f32,
    pub amplitude: f32,
    sample_rate: f32,
    cycle: f32,
    rng: StdRng,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency_hz: f32, amplitude: f32, sample_rate: f32) -> Self {
        Self {
            waveform,
            frequency_hz,
            amplitude,
            sample_rate: sample_rate.max(1.0),
            cycle: 0.0,
            rng: StdRng::seed_from_u64(0x5C0_9E),
        }
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        let inc = self.frequency_hz / self.sample_rate;
        for s in out.iter_mut() {
            let v = match self.waveform {
                Waveform::Noise => self.rng.gen_range(-1.0f32..=1.0),
                w => w.periodic_value(self.cycle),
            };
            *s = self.amplitude * v;
            self.cycle = (self.cycle + inc).rem_euclid(1.0);
        }
    }
}

/// Which direction a trigger crossing must go.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TriggerEdge {
    #[default]
    Rising,
    Falling,
}

/// First index `i >= 1` where the signal crosses `level` on `edge`
/// (rising: `prev < level <= curr`, falling: `prev > level >= curr`).
pub fn find_trigger(buffer: &[f32], level: f32, edge: TriggerEdge) -> Option<usize> {
    (1..buffer.len()).find(|&i| {
        let prev = buffer[i - 1];
        let curr = buffer[i];
        match edge {
            TriggerEdge::Rising => prev < level && level <= curr,
            TriggerEdge::Falling => prev > level && level >= curr,
        }
    })
}

/// Sentinel form of [`find_trigger`]: returns 0 when no crossing exists.
///
/// 0 is never a real crossing index (scanning starts at 1), so callers can
/// treat it as "unaligned".
pub fn find_trigger_point(buffer: &[f32], level: f32, edge: TriggerEdge) -> usize {
    find_trigger(buffer, level, edge).unwrap_or(0)
}
