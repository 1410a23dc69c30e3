//! Spectral and rhythmic features polled from the shared analyser.
//!
//! One [`AudioFeatures`] snapshot is published per analysis tick: the
//! normalised spectrum, global RMS, three smoothed band envelopes and a beat
//! record. Snapshots are never mutated after publication.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use crate::constants::{
    ANALYSER_MIN_DB, ANALYSIS_INTERVAL_MS, BAND_SMOOTHING_ALPHA, BEAT_COOLDOWN_MS, BEAT_HISTORY_LEN,
    BEAT_MIN_MEAN, BEAT_THRESHOLD, DEFAULT_FFT_SIZE, DEFAULT_SAMPLE_RATE, HIGH_BAND_HZ,
    LOW_BAND_HZ, MID_BAND_HZ, RMS_GAIN,
};
use crate::error::{Result, ScopeError};
use crate::source::{normalize_db, validate_fft_size, AnalyserSource};

#[derive(Clone, Debug)]
pub struct BeatConfig {
    pub history_len: usize,
    pub threshold: f32,
    pub cooldown_ms: f64,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            history_len: BEAT_HISTORY_LEN,
            threshold: BEAT_THRESHOLD,
            cooldown_ms: BEAT_COOLDOWN_MS,
        }
    }
}

/// Feature extraction settings. Band edges are in Hz, `[low, high)`.
#[derive(Clone, Debug)]
pub struct FeatureConfig {
    pub sample_rate: f32,
    pub fft_size: usize,
    pub low_hz: (f32, f32),
    pub mid_hz: (f32, f32),
    pub high_hz: (f32, f32),
    pub band_alpha: f32,
    pub rms_gain: f32,
    pub beat: BeatConfig,
    pub interval_ms: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_size: DEFAULT_FFT_SIZE,
            low_hz: LOW_BAND_HZ,
            mid_hz: MID_BAND_HZ,
            high_hz: HIGH_BAND_HZ,
            band_alpha: BAND_SMOOTHING_ALPHA,
            rms_gain: RMS_GAIN,
            beat: BeatConfig::default(),
            interval_ms: ANALYSIS_INTERVAL_MS,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> Result<()> {
        validate_fft_size(self.fft_size)?;
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ScopeError::InvalidConfig("sample rate must be > 0".into()));
        }
        if !(self.band_alpha > 0.0 && self.band_alpha <= 1.0) {
            return Err(ScopeError::InvalidConfig(format!(
                "band alpha must be in (0, 1], got {}",
                self.band_alpha
            )));
        }
        if self.beat.history_len == 0 || !(self.beat.threshold > 0.0) {
            return Err(ScopeError::InvalidConfig(
                "beat history must be non-empty and threshold > 0".into(),
            ));
        }
        Ok(())
    }

    /// Frequency of FFT bin `i` in Hz.
    #[inline]
    pub fn bin_hz(&self, i: usize) -> f32 {
        i as f32 * self.sample_rate / self.fft_size as f32
    }

    /// Bins whose frequency falls in `[lo, hi)`, limited to the spectrum length.
    pub fn band_bins(&self, (lo, hi): (f32, f32)) -> Range<usize> {
        let bins = self.fft_size / 2;
        let start = (0..bins).find(|&i| self.bin_hz(i) >= lo).unwrap_or(bins);
        let end = (start..bins).find(|&i| self.bin_hz(i) >= hi).unwrap_or(bins);
        start..end
    }
}

/// Instant and exponentially smoothed level of one frequency band.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandEnvelope {
    pub instant: f32,
    pub smoothed: f32,
}

impl BandEnvelope {
    fn update(&mut self, instant: f32, alpha: f32) {
        self.instant = instant;
        self.smoothed += (instant - self.smoothed) * alpha;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatRecord {
    pub fired: bool,
    /// In [0, 1]; 0 when no beat fired.
    pub confidence: f32,
    pub last_beat_ms: Option<f64>,
}

/// One analysis tick's worth of features.
#[derive(Clone, Debug)]
pub struct AudioFeatures {
    pub timestamp_ms: f64,
    /// Normalised magnitude per bin, 0 at -100 dB.
    pub spectrum: Arc<[f32]>,
    /// Scaled and clamped to [0, 1].
    pub rms: f32,
    pub low: BandEnvelope,
    pub mid: BandEnvelope,
    pub high: BandEnvelope,
    pub beat: BeatRecord,
}

impl Default for AudioFeatures {
    /// Silence.
    fn default() -> Self {
        Self {
            timestamp_ms: 0.0,
            spectrum: Arc::from(Vec::new()),
            rms: 0.0,
            low: BandEnvelope::default(),
            mid: BandEnvelope::default(),
            high: BandEnvelope::default(),
            beat: BeatRecord::default(),
        }
    }
}

/// Energy-threshold onset detector over a sliding RMS history.
#[derive(Clone, Debug)]
pub struct BeatDetector {
    config: BeatConfig,
    history: VecDeque<f32>,
    last_beat_ms: Option<f64>,
}

impl BeatDetector {
    pub fn new(config: BeatConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.history_len + 1),
            config,
            last_beat_ms: None,
        }
    }

    pub fn mean(&self) -> f32 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f32>() / self.history.len() as f32
    }

    /// Feed one RMS sample. A beat needs a full history, a non-silent mean,
    /// `rms > mean * threshold` and the cooldown to have elapsed.
    pub fn push(&mut self, rms: f32, now_ms: f64) -> BeatRecord {
        let rms = if rms.is_finite() { rms.max(0.0) } else { 0.0 };
        let mean = self.mean();
        let gate = mean * self.config.threshold;
        let cooled = self
            .last_beat_ms
            .map_or(true, |t| now_ms - t >= self.config.cooldown_ms);
        let primed = self.history.len() >= self.config.history_len && mean > BEAT_MIN_MEAN;

        let fired = primed && cooled && rms > gate;
        let confidence = if fired {
            (rms / gate - 1.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        if fired {
            self.last_beat_ms = Some(now_ms);
        }

        self.history.push_back(rms);
        while self.history.len() > self.config.history_len {
            self.history.pop_front();
        }

        BeatRecord {
            fired,
            confidence,
            last_beat_ms: self.last_beat_ms,
        }
    }
}

pub struct FeatureExtractor {
    config: FeatureConfig,
    low_bins: Range<usize>,
    mid_bins: Range<usize>,
    high_bins: Range<usize>,
    time_buf: Vec<f32>,
    db_buf: Vec<f32>,
    low: BandEnvelope,
    mid: BandEnvelope,
    high: BandEnvelope,
    beat: BeatDetector,
    last_tick_ms: Option<f64>,
    latest: Option<AudioFeatures>,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> Result<Self> {
        config.validate()?;
        let low_bins = config.band_bins(config.low_hz);
        let mid_bins = config.band_bins(config.mid_hz);
        let high_bins = config.band_bins(config.high_hz);
        log::debug!(
            "[features] bins low={low_bins:?} mid={mid_bins:?} high={high_bins:?}"
        );
        Ok(Self {
            time_buf: vec![0.0; config.fft_size],
            db_buf: vec![ANALYSER_MIN_DB; config.fft_size / 2],
            beat: BeatDetector::new(config.beat.clone()),
            config,
            low_bins,
            mid_bins,
            high_bins,
            low: BandEnvelope::default(),
            mid: BandEnvelope::default(),
            high: BandEnvelope::default(),
            last_tick_ms: None,
            latest: None,
        })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    pub fn latest(&self) -> Option<&AudioFeatures> {
        self.latest.as_ref()
    }

    /// Read the analyser and publish a snapshot if the interval has elapsed.
    pub fn poll(
        &mut self,
        now_ms: f64,
        source: &mut dyn AnalyserSource,
    ) -> Option<&AudioFeatures> {
        if let Some(last) = self.last_tick_ms {
            if now_ms - last < self.config.interval_ms {
                return None;
            }
        }
        self.last_tick_ms = Some(now_ms);
        self.retune(source.sample_rate(), source.fft_size());
        let mut time_buf = std::mem::take(&mut self.time_buf);
        let mut db_buf = std::mem::take(&mut self.db_buf);
        db_buf.fill(ANALYSER_MIN_DB);
        source.time_domain(&mut time_buf);
        source.frequency_db(&mut db_buf);
        self.analyze(now_ms, &time_buf, &db_buf);
        self.time_buf = time_buf;
        self.db_buf = db_buf;
        self.latest.as_ref()
    }

    /// Follow the source's analyser geometry so band edges stay in Hz.
    fn retune(&mut self, sample_rate: f32, fft_size: usize) {
        if fft_size == self.config.fft_size && sample_rate == self.config.sample_rate {
            return;
        }
        let mut config = self.config.clone();
        config.sample_rate = sample_rate;
        config.fft_size = fft_size;
        if let Err(e) = config.validate() {
            log::warn!("[features] ignoring source geometry: {e}");
            return;
        }
        log::info!(
            "[features] source is {fft_size} @ {sample_rate} Hz, was {} @ {} Hz",
            self.config.fft_size,
            self.config.sample_rate
        );
        self.low_bins = config.band_bins(config.low_hz);
        self.mid_bins = config.band_bins(config.mid_hz);
        self.high_bins = config.band_bins(config.high_hz);
        self.time_buf = vec![0.0; fft_size];
        self.db_buf = vec![ANALYSER_MIN_DB; fft_size / 2];
        self.config = config;
    }

    /// Compute one snapshot from raw analyser buffers.
    pub fn analyze(&mut self, now_ms: f64, time_domain: &[f32], spectrum_db: &[f32]) -> AudioFeatures {
        let spectrum: Arc<[f32]> = spectrum_db.iter().map(|db| normalize_db(*db)).collect();

        let rms = (rms(time_domain) * self.config.rms_gain).clamp(0.0, 1.0);

        let alpha = self.config.band_alpha;
        self.low.update(band_average(&spectrum, &self.low_bins), alpha);
        self.mid.update(band_average(&spectrum, &self.mid_bins), alpha);
        self.high.update(band_average(&spectrum, &self.high_bins), alpha);

        let beat = self.beat.push(rms, now_ms);
        if beat.fired {
            log::trace!("[features] beat rms={rms:.3} confidence={:.2}", beat.confidence);
        }

        let features = AudioFeatures {
            timestamp_ms: now_ms,
            spectrum,
            rms,
            low: self.low,
            mid: self.mid,
            high: self.high,
            beat,
        };
        self.latest = Some(features.clone());
        features
    }
}

fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .filter(|s| s.is_finite())
        .map(|s| s * s)
        .sum();
    (sum / samples.len() as f32).sqrt()
}

fn band_average(spectrum: &[f32], bins: &Range<usize>) -> f32 {
    let end = bins.end.min(spectrum.len());
    if bins.start >= end {
        return 0.0;
    }
    let slice = &spectrum[bins.start..end];
    slice.iter().sum::<f32>() / slice.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_bins_follow_bin_frequencies() {
        let cfg = FeatureConfig {
            sample_rate: 44_100.0,
            fft_size: 2048,
            ..FeatureConfig::default()
        };
        // 21.53 Hz per bin
        assert_eq!(cfg.band_bins((20.0, 160.0)), 1..8);
        let mid = cfg.band_bins(cfg.mid_hz);
        let high = cfg.band_bins(cfg.high_hz);
        assert_eq!(mid.start, 8);
        assert_eq!(mid.end, high.start);
        assert!(high.end <= 1024);
    }

    #[test]
    fn rms_is_scaled_and_clamped() {
        let mut fx = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let loud = vec![0.9; 2048];
        let f = fx.analyze(0.0, &loud, &vec![-100.0; 1024]);
        assert_eq!(f.rms, 1.0);
        let quiet = vec![0.1; 2048];
        let f = fx.analyze(33.0, &quiet, &vec![-100.0; 1024]);
        assert!((f.rms - 0.2).abs() < 1e-5);
    }

    #[test]
    fn band_envelopes_smooth_toward_instant() {
        let mut fx = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let db = vec![-50.0; 1024];
        let first = fx.analyze(0.0, &vec![0.0; 2048], &db);
        assert!((first.low.instant - 0.5).abs() < 1e-6);
        assert!((first.low.smoothed - 0.5 * BAND_SMOOTHING_ALPHA).abs() < 1e-6);
        let mut last = first;
        for i in 1..100 {
            last = fx.analyze(i as f64 * 33.0, &vec![0.0; 2048], &db);
        }
        assert!((last.mid.smoothed - 0.5).abs() < 1e-3);
    }

    #[test]
    fn beat_fires_on_spike_after_steady_history() {
        let mut det = BeatDetector::new(BeatConfig::default());
        let m = 0.2;
        for i in 0..BEAT_HISTORY_LEN {
            let rec = det.push(m, i as f64 * 23.0);
            assert!(!rec.fired);
        }
        let rec = det.push(1.5 * BEAT_THRESHOLD * m, 2000.0);
        assert!(rec.fired);
        assert!(rec.confidence > 0.0 && rec.confidence <= 1.0);
        assert_eq!(rec.last_beat_ms, Some(2000.0));
    }

    #[test]
    fn beat_respects_cooldown() {
        let mut det = BeatDetector::new(BeatConfig::default());
        for i in 0..BEAT_HISTORY_LEN {
            det.push(0.1, i as f64 * 23.0);
        }
        assert!(det.push(0.5, 1000.0).fired);
        assert!(!det.push(0.9, 1050.0).fired);
    }

    #[test]
    fn smaller_source_is_read_at_its_own_size() {
        let mut fx = FeatureExtractor::new(FeatureConfig::default()).unwrap();
        let mut silent = crate::source::SoftwareAnalyser::new(44_100.0, 1024).unwrap();
        let f = fx.poll(0.0, &mut silent).unwrap().clone();
        assert_eq!(f.spectrum.len(), 512);
        assert!(f.spectrum.iter().all(|v| *v == 0.0));
        assert_eq!(f.rms, 0.0);
        assert_eq!(f.high.instant, 0.0);
        assert_eq!(fx.config().fft_size, 1024);
        assert_eq!(fx.config().band_bins(fx.config().low_hz), fx.low_bins);
    }

    #[test]
    fn silence_never_beats() {
        let mut det = BeatDetector::new(BeatConfig::default());
        for i in 0..200 {
            assert!(!det.push(0.0, i as f64 * 23.0).fired);
        }
    }
}
