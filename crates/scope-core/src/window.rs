//! Trigger-aligned, auto-scaled time-domain windows.

use std::sync::Arc;

use crate::constants::{
    ANALYSIS_INTERVAL_MS, AUTO_SCALE_ALPHA, AUTO_SCALE_MIN_PEAK, AUTO_SCALE_TARGET_PEAK,
    DEFAULT_WINDOW_SIZE,
};
use crate::error::{Result, ScopeError};
use crate::signal::{find_trigger, TriggerEdge};
use crate::source::AnalyserSource;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerSettings {
    pub level: f32,
    pub edge: TriggerEdge,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            level: 0.0,
            edge: TriggerEdge::Rising,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AutoScaleSettings {
    pub target_peak: f32,
    pub alpha: f32,
}

impl Default for AutoScaleSettings {
    fn default() -> Self {
        Self {
            target_peak: AUTO_SCALE_TARGET_PEAK,
            alpha: AUTO_SCALE_ALPHA,
        }
    }
}

#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub window_size: usize,
    pub trigger: Option<TriggerSettings>,
    pub auto_scale: Option<AutoScaleSettings>,
    pub interval_ms: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            trigger: Some(TriggerSettings::default()),
            auto_scale: Some(AutoScaleSettings::default()),
            interval_ms: ANALYSIS_INTERVAL_MS,
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ScopeError::InvalidConfig("window size must be > 0".into()));
        }
        if let Some(a) = &self.auto_scale {
            if !(a.alpha > 0.0 && a.alpha <= 1.0) {
                return Err(ScopeError::InvalidConfig(format!(
                    "auto-scale alpha must be in (0, 1], got {}",
                    a.alpha
                )));
            }
            if !(a.target_peak.is_finite() && a.target_peak > 0.0) {
                return Err(ScopeError::InvalidConfig(format!(
                    "auto-scale target peak must be > 0, got {}",
                    a.target_peak
                )));
            }
        }
        if !(self.interval_ms.is_finite() && self.interval_ms >= 0.0) {
            return Err(ScopeError::InvalidConfig("interval must be >= 0".into()));
        }
        Ok(())
    }
}

/// One published window. Immutable once built; consumers share it by `Arc`.
#[derive(Clone, Debug)]
pub struct WindowFrame {
    pub samples: Arc<[f32]>,
    /// Index the slice was rotated by, if a trigger crossing was found.
    pub trigger_index: Option<usize>,
    /// Smoothed auto-scale multiplier (1 when auto-scale is off).
    pub scale: f32,
    pub timestamp_ms: f64,
}

impl WindowFrame {
    /// Samples with the scale applied and clipped to [-1, 1].
    pub fn scaled(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|s| (s * self.scale).clamp(-1.0, 1.0))
            .collect()
    }
}

pub struct WindowExtractor {
    config: WindowConfig,
    fetch: Vec<f32>,
    slice: Vec<f32>,
    scale: f32,
    last_tick_ms: Option<f64>,
    latest: Option<WindowFrame>,
}

impl WindowExtractor {
    /// The window size is clamped to `fft_size` here, once, so every
    /// published frame has the same length.
    pub fn new(mut config: WindowConfig, fft_size: usize) -> Result<Self> {
        config.validate()?;
        if config.window_size > fft_size {
            log::warn!(
                "[window] window size {} exceeds fft size {}, clamping",
                config.window_size,
                fft_size
            );
            config.window_size = fft_size;
        }
        Ok(Self {
            fetch: vec![0.0; fft_size],
            slice: Vec::with_capacity(config.window_size),
            config,
            scale: 1.0,
            last_tick_ms: None,
            latest: None,
        })
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn latest(&self) -> Option<&WindowFrame> {
        self.latest.as_ref()
    }

    /// Extract a new frame if the tick interval has elapsed.
    pub fn poll(&mut self, now_ms: f64, source: &mut dyn AnalyserSource) -> Option<&WindowFrame> {
        if let Some(last) = self.last_tick_ms {
            if now_ms - last < self.config.interval_ms {
                return None;
            }
        }
        self.last_tick_ms = Some(now_ms);
        let fft_size = source.fft_size();
        if self.fetch.len() != fft_size {
            self.fetch.resize(fft_size, 0.0);
        }
        source.time_domain(&mut self.fetch);
        let buffer = std::mem::take(&mut self.fetch);
        self.extract(&buffer, now_ms);
        self.fetch = buffer;
        self.latest.as_ref()
    }

    /// Build and publish a frame from the newest `time_domain` samples.
    pub fn extract(&mut self, time_domain: &[f32], now_ms: f64) -> WindowFrame {
        let take = self.config.window_size.min(time_domain.len());
        self.slice.clear();
        self.slice
            .extend(time_domain[time_domain.len() - take..].iter().map(|s| {
                if s.is_finite() {
                    *s
                } else {
                    0.0
                }
            }));

        let mut trigger_index = None;
        if let Some(t) = self.config.trigger {
            if let Some(idx) = find_trigger(&self.slice, t.level, t.edge) {
                self.slice.rotate_left(idx);
                trigger_index = Some(idx);
            }
        }

        if let Some(a) = self.config.auto_scale {
            let peak = self.slice.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let target = if peak > AUTO_SCALE_MIN_PEAK {
                a.target_peak / peak
            } else {
                1.0
            };
            self.scale += (target - self.scale) * a.alpha;
            if !self.scale.is_finite() || self.scale <= 0.0 {
                log::debug!("[window] degenerate auto-scale, resetting to 1");
                self.scale = 1.0;
            }
        } else {
            self.scale = 1.0;
        }

        let frame = WindowFrame {
            samples: Arc::from(self.slice.as_slice()),
            trigger_index,
            scale: self.scale,
            timestamp_ms: now_ms,
        };
        self.latest = Some(frame.clone());
        frame
    }
}
