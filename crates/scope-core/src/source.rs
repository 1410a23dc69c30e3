//! Audio analyser capability and pure-Rust analyser implementations.
//!
//! The core never talks to an audio device. It polls something that can hand
//! over "the most recent N time-domain samples" and "the most recent spectrum
//! in dB", which is exactly what a WebAudio `AnalyserNode` offers. Native
//! front-ends and tests use [`SoftwareAnalyser`] to get the same contract.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

use crate::constants::{ANALYSER_MIN_DB, ANALYSER_SMOOTHING, MAX_FFT_SIZE, MIN_FFT_SIZE};
use crate::error::{Result, ScopeError};
use crate::signal::{Oscillator, Waveform};

/// Poll-only view of a spectral analyser.
///
/// Reads always return "whatever is current"; missed updates are fine.
pub trait AnalyserSource {
    fn sample_rate(&self) -> f32;

    /// Power of two in `[256, 16384]`.
    fn fft_size(&self) -> usize;

    /// Copy the newest samples, oldest first, into `out` (up to `fft_size`).
    fn time_domain(&mut self, out: &mut [f32]);

    /// Copy the current magnitude spectrum in dB into `out`
    /// (up to `fft_size / 2` bins).
    fn frequency_db(&mut self, out: &mut [f32]);

    /// Let time-driven sources (synthetic signals, file playback) produce the
    /// samples for `dt_sec` of wall time. Device-driven sources ignore this.
    fn advance(&mut self, _dt_sec: f64) {}
}

pub fn validate_fft_size(fft_size: usize) -> Result<()> {
    if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
        return Err(ScopeError::InvalidConfig(format!(
            "fft size must be a power of two in [{MIN_FFT_SIZE}, {MAX_FFT_SIZE}], got {fft_size}"
        )));
    }
    Ok(())
}

/// Ring-buffered analyser with `AnalyserNode` semantics: Blackman window,
/// magnitude / N, temporal smoothing, dB conversion floored at `min_db`.
pub struct SoftwareAnalyser {
    sample_rate: f32,
    fft_size: usize,
    ring: Vec<f32>,
    write_pos: usize,
    fft: Arc<dyn Fft<f32>>,
    fft_buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    pub smoothing: f32,
    pub min_db: f32,
}

impl SoftwareAnalyser {
    pub fn new(sample_rate: f32, fft_size: usize) -> Result<Self> {
        validate_fft_size(fft_size)?;
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ScopeError::InvalidConfig(format!(
                "sample rate must be > 0, got {sample_rate}"
            )));
        }
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch_len = fft.get_inplace_scratch_len();
        let window = (0..fft_size)
            .map(|i| {
                let t = i as f32 / fft_size as f32;
                0.42 - 0.5 * (2.0 * PI * t).cos() + 0.08 * (4.0 * PI * t).cos()
            })
            .collect();
        log::debug!("[analyser] created: sample_rate={sample_rate}, fft_size={fft_size}");
        Ok(Self {
            sample_rate,
            fft_size,
            ring: vec![0.0; fft_size],
            write_pos: 0,
            fft,
            fft_buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            window,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: ANALYSER_SMOOTHING,
            min_db: ANALYSER_MIN_DB,
        })
    }

    /// Append samples; non-finite input is stored as silence.
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &s in samples {
            self.ring[self.write_pos] = if s.is_finite() { s } else { 0.0 };
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    #[inline]
    fn ordered(&self, i: usize) -> f32 {
        // write_pos is where the next sample lands, so the oldest lives there
        self.ring[(self.write_pos + i) % self.fft_size]
    }
}

impl AnalyserSource for SoftwareAnalyser {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.fft_size
    }

    fn time_domain(&mut self, out: &mut [f32]) {
        let n = out.len().min(self.fft_size);
        let skip = self.fft_size - n;
        for (i, slot) in out.iter_mut().take(n).enumerate() {
            *slot = self.ordered(skip + i);
        }
    }

    fn frequency_db(&mut self, out: &mut [f32]) {
        for i in 0..self.fft_size {
            self.fft_buffer[i] = Complex::new(self.ordered(i) * self.window[i], 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.fft_buffer, &mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing.clamp(0.0, 1.0);
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft_buffer[k].norm() * norm;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
        }
        for (slot, mag) in out.iter_mut().zip(&self.smoothed) {
            let db = 20.0 * mag.log10();
            *slot = if db.is_finite() {
                db.max(self.min_db)
            } else {
                self.min_db
            };
        }
    }
}

/// Oscillator-fed analyser. Stands in for a microphone or file that could not
/// be opened, so the render loop always has a signal.
pub struct SyntheticSource {
    analyser: SoftwareAnalyser,
    oscillator: Oscillator,
    block: Vec<f32>,
    pending: f64,
}

impl SyntheticSource {
    pub fn new(
        sample_rate: f32,
        fft_size: usize,
        waveform: Waveform,
        frequency_hz: f32,
        amplitude: f32,
    ) -> Result<Self> {
        let mut source = Self {
            analyser: SoftwareAnalyser::new(sample_rate, fft_size)?,
            oscillator: Oscillator::new(waveform, frequency_hz, amplitude, sample_rate),
            block: Vec::with_capacity(fft_size),
            pending: 0.0,
        };
        // start with a full window so the first poll is not silent
        source.pump(fft_size);
        Ok(source)
    }

    /// Default fallback: a 220 Hz sine at half scale.
    pub fn fallback(sample_rate: f32, fft_size: usize) -> Result<Self> {
        Self::new(sample_rate, fft_size, Waveform::Sine, 220.0, 0.5)
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.oscillator
    }

    fn pump(&mut self, count: usize) {
        self.block.resize(count, 0.0);
        self.oscillator.fill(&mut self.block);
        self.analyser.push_samples(&self.block);
    }
}

impl AnalyserSource for SyntheticSource {
    fn sample_rate(&self) -> f32 {
        self.analyser.sample_rate()
    }

    fn fft_size(&self) -> usize {
        self.analyser.fft_size()
    }

    fn time_domain(&mut self, out: &mut [f32]) {
        self.analyser.time_domain(out);
    }

    fn frequency_db(&mut self, out: &mut [f32]) {
        self.analyser.frequency_db(out);
    }

    fn advance(&mut self, dt_sec: f64) {
        self.pending += dt_sec.max(0.0) * self.analyser.sample_rate() as f64;
        // never generate more than one window per call; older samples would be
        // overwritten anyway
        let count = (self.pending.floor() as usize).min(self.analyser.fft_size());
        self.pending -= self.pending.floor();
        if count > 0 {
            self.pump(count);
        }
    }
}

/// Convert an `AnalyserNode`-style dB value to a linear 0.. level.
#[inline]
pub fn normalize_db(db: f32) -> f32 {
    use crate::constants::{DB_NORMALIZE_OFFSET, DB_NORMALIZE_SPAN};
    if !db.is_finite() {
        return 0.0;
    }
    ((db + DB_NORMALIZE_OFFSET) / DB_NORMALIZE_SPAN).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_fft() {
        assert!(SoftwareAnalyser::new(44_100.0, 1000).is_err());
        assert!(SoftwareAnalyser::new(44_100.0, 128).is_err());
        assert!(SoftwareAnalyser::new(44_100.0, 32_768).is_err());
        assert!(SoftwareAnalyser::new(44_100.0, 512).is_ok());
    }

    #[test]
    fn time_domain_returns_newest_samples_oldest_first() {
        let mut a = SoftwareAnalyser::new(8000.0, 256).unwrap();
        let samples: Vec<f32> = (0..300).map(|i| i as f32).collect();
        a.push_samples(&samples);
        let mut out = vec![0.0; 4];
        a.time_domain(&mut out);
        assert_eq!(out, vec![296.0, 297.0, 298.0, 299.0]);
    }

    #[test]
    fn non_finite_samples_become_silence() {
        let mut a = SoftwareAnalyser::new(8000.0, 256).unwrap();
        a.push_samples(&[f32::NAN, f32::INFINITY]);
        let mut out = vec![1.0; 2];
        a.time_domain(&mut out);
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn spectrum_peaks_near_tone_frequency() {
        let sr = 8192.0;
        let mut a = SoftwareAnalyser::new(sr, 1024).unwrap();
        a.smoothing = 0.0;
        let tone: Vec<f32> = (0..1024)
            .map(|i| (2.0 * PI * 1024.0 * i as f32 / sr).sin())
            .collect();
        a.push_samples(&tone);
        let mut db = vec![0.0; 512];
        a.frequency_db(&mut db);
        let peak = db
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(i, _)| i)
            .unwrap();
        // 1024 Hz at 8 Hz per bin
        assert!((peak as i32 - 128).abs() <= 1, "peak bin {peak}");
        assert!(db.iter().all(|v| *v >= -100.0));
    }

    #[test]
    fn silence_floors_at_min_db() {
        let mut a = SoftwareAnalyser::new(8000.0, 256).unwrap();
        let mut db = vec![0.0; 128];
        a.frequency_db(&mut db);
        assert!(db.iter().all(|v| *v == -100.0));
    }

    #[test]
    fn synthetic_source_advances_with_time() {
        let mut s = SyntheticSource::fallback(8000.0, 256).unwrap();
        let mut before = vec![0.0; 256];
        s.time_domain(&mut before);
        s.advance(0.01);
        let mut after = vec![0.0; 256];
        s.time_domain(&mut after);
        assert_ne!(before, after);
        assert!(after.iter().all(|v| v.abs() <= 0.5 + 1e-6));
    }

    #[test]
    fn normalize_db_maps_calibration_range() {
        assert_eq!(normalize_db(-100.0), 0.0);
        assert_eq!(normalize_db(-140.0), 0.0);
        assert!((normalize_db(-50.0) - 0.5).abs() < 1e-6);
        assert_eq!(normalize_db(f32::NEG_INFINITY), 0.0);
    }
}
