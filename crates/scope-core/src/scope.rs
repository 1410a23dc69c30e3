//! Per-frame orchestration of the whole pipeline.
//!
//! `Scope` is driven by two independent cadences owned by the host:
//! [`Scope::analysis_tick`] at roughly 30 Hz polls the analyser, and
//! [`Scope::render_tick`] at the display rate produces a [`RenderFrame`].
//! Neither blocks, and a render tick with no fresh analysis simply reuses
//! the latest snapshots.

use glam::{Vec2, Vec3};
use rand::prelude::*;
use std::sync::Arc;

use crate::channel::ChannelPair;
use crate::constants::{
    BLOOM_BASE, BLOOM_SPAN, LINE_WIDTH_BASE, LINE_WIDTH_SPAN, PHOSPHOR_GREEN, XY_DELAY_SAMPLES,
};
use crate::decision::{DecisionEngine, ModeDecision, Physics};
use crate::error::Result;
use crate::features::{AudioFeatures, FeatureConfig, FeatureExtractor};
use crate::font::{FontOutlineProvider, StrokeFont};
use crate::profile::BrainProfile;
use crate::shapes::{self, GeneratorState, ShapeContext, ShapeKind, ShapeParams};
use crate::source::AnalyserSource;
use crate::trail::{TrailBuffer, TrailConfig, TrailPoint};
use crate::window::{WindowConfig, WindowExtractor};

/// What the beam is drawing.
#[derive(Clone, Debug, PartialEq)]
pub enum VisualMode {
    /// The live (trigger-aligned) waveform.
    Waveform,
    Shape(ShapeKind),
}

/// How the live waveform is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Time on x, amplitude on y.
    #[default]
    YT,
    /// Channel A on x against a delayed copy on y.
    XY,
}

#[derive(Clone, Debug)]
pub struct ScopeConfig {
    pub window: WindowConfig,
    pub features: FeatureConfig,
    pub trail: TrailConfig,
    pub shape: ShapeParams,
    pub display: DisplayMode,
    /// Beam traversal speed in samples per second when not on auto-pilot.
    pub beam_speed: f32,
    pub auto_pilot: bool,
    pub seed: u64,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            features: FeatureConfig::default(),
            trail: TrailConfig::default(),
            shape: ShapeParams::default(),
            display: DisplayMode::YT,
            beam_speed: 5_000.0,
            auto_pilot: true,
            seed: 42,
        }
    }
}

impl ScopeConfig {
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        self.features.validate()?;
        self.trail.validate()?;
        self.shape.validate()?;
        if !(self.beam_speed.is_finite() && self.beam_speed >= 0.0) {
            return Err(crate::error::ScopeError::InvalidConfig(format!(
                "beam speed must be >= 0, got {}",
                self.beam_speed
            )));
        }
        Ok(())
    }
}

/// Scalar modifiers handed to the renderer with each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderModifiers {
    pub line_width: f32,
    pub color: [f32; 3],
    pub scale: f32,
    /// Radians, whole-image roll.
    pub rotation: f32,
    pub offset: Vec2,
    pub bloom: f32,
    pub jitter: f32,
    pub blur: f32,
    pub glitch: bool,
}

impl Default for RenderModifiers {
    fn default() -> Self {
        Self {
            line_width: LINE_WIDTH_BASE,
            color: PHOSPHOR_GREEN,
            scale: 1.0,
            rotation: 0.0,
            offset: Vec2::ZERO,
            bloom: BLOOM_BASE,
            jitter: 0.0,
            blur: 0.0,
            glitch: false,
        }
    }
}

/// Everything the renderer needs for one frame.
#[derive(Clone, Debug)]
pub struct RenderFrame {
    pub timestamp_ms: f64,
    pub pair: Arc<ChannelPair>,
    /// Newest first.
    pub trail: Vec<TrailPoint>,
    pub beam: Option<Vec2>,
    pub modifiers: RenderModifiers,
}

pub struct Scope {
    config: ScopeConfig,
    window: WindowExtractor,
    features: FeatureExtractor,
    trail: TrailBuffer,
    decision: DecisionEngine,
    font: Box<dyn FontOutlineProvider>,
    mode: VisualMode,
    generator: Option<GeneratorState>,
    shape: ShapeParams,
    beam_speed: f32,
    rng: StdRng,
}

impl Scope {
    pub fn new(config: ScopeConfig, profile: BrainProfile) -> Result<Self> {
        config.validate()?;
        let window = WindowExtractor::new(config.window.clone(), config.features.fft_size)?;
        let features = FeatureExtractor::new(config.features.clone())?;
        let trail = TrailBuffer::new(config.trail.clone())?;
        let decision = DecisionEngine::new(profile, config.seed);
        let mut scope = Self {
            window,
            features,
            trail,
            decision,
            font: Box::new(StrokeFont),
            mode: VisualMode::Waveform,
            generator: None,
            shape: config.shape.clone(),
            beam_speed: config.beam_speed,
            rng: StdRng::seed_from_u64(config.seed ^ 0x5C09E),
            config,
        };
        if scope.config.auto_pilot {
            let first = scope.decision.current().clone();
            scope.apply_decision(&first);
        }
        log::info!(
            "[scope] ready: fft={} window={} auto_pilot={}",
            scope.config.features.fft_size,
            scope.window.config().window_size,
            scope.config.auto_pilot
        );
        Ok(scope)
    }

    /// Replace the built-in stroke font.
    pub fn with_font(mut self, font: Box<dyn FontOutlineProvider>) -> Self {
        self.font = font;
        self
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub fn mode(&self) -> &VisualMode {
        &self.mode
    }

    pub fn shape_params(&self) -> &ShapeParams {
        &self.shape
    }

    /// Manual parameters; overwritten on the next switch while on auto-pilot.
    pub fn shape_params_mut(&mut self) -> &mut ShapeParams {
        &mut self.shape
    }

    pub fn decision(&self) -> &DecisionEngine {
        &self.decision
    }

    pub fn latest_features(&self) -> Option<&AudioFeatures> {
        self.features.latest()
    }

    pub fn beam_speed(&self) -> f32 {
        self.beam_speed
    }

    pub fn set_beam_speed(&mut self, speed: f32) {
        if speed.is_finite() && speed >= 0.0 {
            self.beam_speed = speed;
        }
    }

    pub fn set_display(&mut self, display: DisplayMode) {
        self.config.display = display;
    }

    pub fn set_auto_pilot(&mut self, on: bool) {
        self.config.auto_pilot = on;
        if on {
            let current = self.decision.current().clone();
            self.apply_decision(&current);
        }
    }

    pub fn set_profile(&mut self, profile: BrainProfile) {
        self.decision = DecisionEngine::new(profile, self.config.seed);
        if self.config.auto_pilot {
            let current = self.decision.current().clone();
            self.apply_decision(&current);
        }
    }

    /// Switch what is drawn. Activating a shape creates fresh generator
    /// state; leaving a shape drops it.
    pub fn set_mode(&mut self, mode: VisualMode) {
        if mode == self.mode && (self.generator.is_some() || mode == VisualMode::Waveform) {
            return;
        }
        self.generator = match &mode {
            VisualMode::Waveform => None,
            VisualMode::Shape(kind) => {
                self.shape.kind = kind.clone();
                Some(GeneratorState::new(kind.clone(), self.shape.seed))
            }
        };
        log::info!("[scope] mode -> {}", mode_name(&mode));
        self.mode = mode;
    }

    fn apply_decision(&mut self, d: &ModeDecision) {
        self.shape.layout = d.layout;
        self.shape.clone_count = d.clone_count;
        self.shape.target_scale = Some(d.target_scale);
        self.beam_speed = d.beam_speed;
        match d.shape_kind() {
            Some(kind) => {
                // same variant with new text or attractor keeps its state
                if let VisualMode::Shape(current) = &self.mode {
                    if std::mem::discriminant(current) == std::mem::discriminant(&kind)
                        && self.generator.is_some()
                    {
                        self.shape.kind = kind.clone();
                        self.mode = VisualMode::Shape(kind);
                        return;
                    }
                }
                self.set_mode(VisualMode::Shape(kind));
            }
            None => self.set_mode(VisualMode::Waveform),
        }
    }

    /// Poll the analyser. Returns `true` when a fresh feature snapshot was
    /// published on this call.
    pub fn analysis_tick(&mut self, now_ms: f64, source: &mut dyn AnalyserSource) -> bool {
        self.window.poll(now_ms, source);
        let Some(features) = self.features.poll(now_ms, source) else {
            return false;
        };
        if !self.config.auto_pilot {
            return true;
        }
        if let Some(decision) = self.decision.update(now_ms, features).cloned() {
            self.apply_decision(&decision);
        }
        true
    }

    pub fn render_tick(&mut self, dt_sec: f32, now_ms: f64) -> RenderFrame {
        let dt = if dt_sec.is_finite() { dt_sec.max(0.0) } else { 0.0 };
        let features = self.features.latest().cloned().unwrap_or_default();
        let physics = self.decision.step_physics(dt, now_ms, &features);

        if self.config.auto_pilot {
            self.shape.rotation_speed = Vec3::new(0.35, 1.0, 0.15) * physics.rotation_speed;
        }

        let shape_pair = match (&self.mode, self.generator.as_mut()) {
            (VisualMode::Shape(_), Some(state)) => {
                let ctx = ShapeContext {
                    font: self.font.as_ref(),
                };
                Some(shapes::tick(state, dt, &self.shape, &ctx))
            }
            _ => None,
        };
        let pair = shape_pair.unwrap_or_else(|| self.waveform_pair());

        let beam = self.trail.advance(&pair, self.beam_speed, dt);
        let modifiers = self.modifiers(now_ms, &features, &physics);
        RenderFrame {
            timestamp_ms: now_ms,
            pair: Arc::new(pair),
            trail: self.trail.draw_range().to_vec(),
            beam,
            modifiers,
        }
    }

    fn waveform_pair(&self) -> ChannelPair {
        let Some(frame) = self.window.latest() else {
            return ChannelPair::default();
        };
        let samples = frame.scaled();
        match self.config.display {
            DisplayMode::YT => ChannelPair::from_yt(&samples),
            DisplayMode::XY => ChannelPair::from_mono_xy(&samples, XY_DELAY_SAMPLES),
        }
    }

    fn modifiers(&mut self, now_ms: f64, f: &AudioFeatures, physics: &Physics) -> RenderModifiers {
        let line_width = LINE_WIDTH_BASE + LINE_WIDTH_SPAN * f.rms;
        let bloom = BLOOM_BASE + BLOOM_SPAN * f.high.smoothed;
        if !self.config.auto_pilot {
            return RenderModifiers {
                line_width,
                bloom,
                ..RenderModifiers::default()
            };
        }
        let tear = (1.0 - physics.stability).clamp(0.0, 1.0);
        let offset = if tear > 1e-3 {
            Vec2::new(self.rng.gen_range(-1.0..=1.0), self.rng.gen_range(-1.0..=1.0)) * tear * 0.05
        } else {
            Vec2::ZERO
        };
        RenderModifiers {
            line_width,
            color: self.decision.color(),
            scale: physics.zoom,
            rotation: physics.distortion * 0.05,
            offset,
            bloom,
            jitter: physics.warmth,
            blur: (1.0 - physics.focus).clamp(0.0, 1.0),
            glitch: self.decision.is_glitching(now_ms),
        }
    }
}

fn mode_name(mode: &VisualMode) -> &'static str {
    match mode {
        VisualMode::Waveform => "waveform",
        VisualMode::Shape(kind) => kind.name(),
    }
}
