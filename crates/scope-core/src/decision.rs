//! Auto-pilot: which shape to show and how it should move.
//!
//! Two independent update paths:
//! - [`DecisionEngine::update`] runs on the analysis tick and decides mode
//!   switches (rate-limited by pace, triggered by drops or a stale timer).
//! - [`DecisionEngine::step_physics`] runs every render tick and eases the
//!   continuous physics scalars toward audio-driven targets.

use rand::prelude::*;

use crate::constants::{
    CYAN, DROP_CONFIDENCE, DROP_RMS, FALLBACK_SWITCH_FACTOR, GLITCH_DURATION_MS,
    GRID_COLS, GRID_COMPLEXITY_THRESHOLD, GRID_ROWS, HIGH_COMPLEXITY_GLITCH,
    HIGH_COMPLEXITY_GLITCH_PROB, MAGENTA, ORANGE, PHOSPHOR_GREEN, PHYSICS_RATE_PER_SEC, RED,
    RED_SHIFT_RMS_GATE, STABILITY_RECOVERY_BOOST,
};
use crate::features::AudioFeatures;
use crate::layout::LayoutMode;
use crate::profile::{BrainProfile, ColorBias, ModeName, Mood, Pace};
use crate::shapes::{Attractor, ShapeKind};

impl Pace {
    /// Minimum time between mode switches.
    pub fn min_duration_ms(self) -> f64 {
        match self {
            Pace::Frenetic => 2_000.0,
            Pace::Fast => 5_000.0,
            Pace::Slow => 15_000.0,
            Pace::Medium => 8_000.0,
        }
    }

    /// Beam traversal speed in samples per second.
    pub fn beam_speed(self) -> f32 {
        match self {
            Pace::Frenetic => 12_000.0,
            Pace::Fast => 8_000.0,
            Pace::Medium => 5_000.0,
            Pace::Slow => 2_500.0,
        }
    }

    /// Base rotation rate in radians per second.
    pub fn base_rotation(self) -> f32 {
        match self {
            Pace::Frenetic => 1.6,
            Pace::Fast => 1.0,
            Pace::Medium => 0.6,
            Pace::Slow => 0.3,
        }
    }
}

/// Everything derived when the engine switches mode.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeDecision {
    pub mode: ModeName,
    pub mode_index: usize,
    pub attractor: Attractor,
    pub word: String,
    pub layout: LayoutMode,
    pub clone_count: usize,
    pub beam_speed: f32,
    pub target_scale: f32,
}

impl ModeDecision {
    /// `None` for the live waveform.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        Some(match self.mode {
            ModeName::Waveform => return None,
            ModeName::Cube => ShapeKind::Cube,
            ModeName::Text => ShapeKind::Text(self.word.clone()),
            ModeName::Planet => ShapeKind::Planet,
            ModeName::Chaos => ShapeKind::Chaos(self.attractor),
            ModeName::Brain => ShapeKind::Brain,
            ModeName::Eye => ShapeKind::Eye,
        })
    }

    fn is_3d(&self) -> bool {
        self.shape_kind().map_or(false, |k| k.is_3d())
    }
}

/// Continuously eased scalars for the renderer.
///
/// - `rotation_speed`: radians per second
/// - `distortion`, `warmth`: 0.. amounts
/// - `zoom`: camera breathing multiplier around 1
/// - `focus`: 1 is sharp, lower is blurrier
/// - `stability`: 1 is locked sync, lower tears the image
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Physics {
    pub rotation_speed: f32,
    pub distortion: f32,
    pub zoom: f32,
    pub warmth: f32,
    pub focus: f32,
    pub stability: f32,
}

impl Default for Physics {
    fn default() -> Self {
        Self {
            rotation_speed: 0.0,
            distortion: 0.0,
            zoom: 1.0,
            warmth: 0.2,
            focus: 0.8,
            stability: 1.0,
        }
    }
}

pub struct DecisionEngine {
    profile: BrainProfile,
    current: ModeDecision,
    switches: usize,
    last_switch_ms: Option<f64>,
    glitch_until_ms: Option<f64>,
    color: [f32; 3],
    physics: Physics,
    rng: StdRng,
}

impl DecisionEngine {
    pub fn new(mut profile: BrainProfile, seed: u64) -> Self {
        if profile.preferred_modes.is_empty() {
            profile.preferred_modes = ModeName::DEFAULT_POOL.to_vec();
        }
        let current = derive_decision(&profile, 0, 0);
        Self {
            profile,
            current,
            switches: 0,
            last_switch_ms: None,
            glitch_until_ms: None,
            color: PHOSPHOR_GREEN,
            physics: Physics::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn profile(&self) -> &BrainProfile {
        &self.profile
    }

    pub fn current(&self) -> &ModeDecision {
        &self.current
    }

    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    pub fn physics(&self) -> Physics {
        self.physics
    }

    pub fn switch_count(&self) -> usize {
        self.switches
    }

    pub fn is_glitching(&self, now_ms: f64) -> bool {
        self.glitch_until_ms.map_or(false, |until| now_ms < until)
    }

    pub fn min_duration_ms(&self) -> f64 {
        self.profile.pace.min_duration_ms()
    }

    /// Slow path. Returns the new decision when a switch happens.
    pub fn update(&mut self, now_ms: f64, features: &AudioFeatures) -> Option<&ModeDecision> {
        self.color = target_color(self.profile.color_bias, features);

        // the first update starts the clock
        let last = *self.last_switch_ms.get_or_insert(now_ms);
        let elapsed = now_ms - last;
        let min = self.min_duration_ms();
        if elapsed < min {
            return None;
        }
        let drop = features.beat.fired
            && features.beat.confidence > DROP_CONFIDENCE
            && features.rms > DROP_RMS;
        let stale = elapsed > min * FALLBACK_SWITCH_FACTOR;
        if !(drop || stale) {
            return None;
        }

        self.switches += 1;
        let index = (self.current.mode_index + 1) % self.profile.preferred_modes.len();
        self.current = derive_decision(&self.profile, index, self.switches);
        self.last_switch_ms = Some(now_ms);
        self.glitch_until_ms = Some(now_ms + GLITCH_DURATION_MS);
        log::info!(
            "[decision] switch #{} -> {:?} ({}, after {:.0} ms, layout {:?})",
            self.switches,
            self.current.mode,
            if drop { "drop" } else { "timer" },
            elapsed,
            self.current.layout
        );
        Some(&self.current)
    }

    /// Fast path: ease every physics scalar toward its target.
    pub fn step_physics(&mut self, dt_sec: f32, now_ms: f64, features: &AudioFeatures) -> Physics {
        let dt = if dt_sec.is_finite() { dt_sec.max(0.0) } else { 0.0 };
        let rate = 1.0 - (-dt * PHYSICS_RATE_PER_SEC).exp();
        let profile = &self.profile;
        let rms = features.rms;
        let bass = features.low.smoothed;

        let rotation = if self.current.is_3d() {
            profile.pace.base_rotation() + rms * 1.5
        } else {
            0.0
        };
        let mut distortion = bass * 0.8;
        if profile.mood == Mood::Calm {
            distortion *= 0.3;
        }
        let zoom = 1.1 - 0.2 * rms;
        let warmth = match profile.mood {
            Mood::Organic | Mood::Retro => 0.6,
            _ => 0.2,
        } + bass * 0.3;
        // digital is deliberately the softer baseline
        let focus_base = if profile.mood == Mood::Digital { 0.5 } else { 0.8 };
        let focus = (focus_base + rms * 0.2).clamp(0.0, 1.0);

        let stability = if self.is_glitching(now_ms) {
            0.3
        } else if profile.complexity_preference > HIGH_COMPLEXITY_GLITCH
            && self.rng.gen::<f32>() < HIGH_COMPLEXITY_GLITCH_PROB
        {
            0.5
        } else {
            1.0
        };

        let p = &mut self.physics;
        let ease = |v: &mut f32, target: f32, rate: f32| {
            if target.is_finite() {
                *v += (target - *v) * rate;
            }
        };
        ease(&mut p.rotation_speed, rotation, rate);
        ease(&mut p.distortion, distortion, rate);
        ease(&mut p.zoom, zoom, rate);
        ease(&mut p.warmth, warmth, rate);
        ease(&mut p.focus, focus, rate);
        let stability_rate = if stability > p.stability {
            (rate * STABILITY_RECOVERY_BOOST).min(1.0)
        } else {
            rate
        };
        ease(&mut p.stability, stability, stability_rate);
        *p
    }
}

fn derive_decision(profile: &BrainProfile, index: usize, switches: usize) -> ModeDecision {
    let mode = profile.preferred_modes[index % profile.preferred_modes.len()];
    let attractor = profile
        .suggested_attractors
        .get(switches % profile.suggested_attractors.len().max(1))
        .copied()
        .unwrap_or_default();
    let word = profile
        .suggested_words
        .get(switches % profile.suggested_words.len().max(1))
        .cloned()
        .unwrap_or_else(|| "SCOPE".to_string());

    let complexity = profile.complexity_preference.clamp(0.0, 1.0);
    let (layout, clone_count) = if complexity > GRID_COMPLEXITY_THRESHOLD && index % 2 == 1 {
        (
            LayoutMode::Grid {
                rows: GRID_ROWS,
                cols: GRID_COLS,
            },
            GRID_ROWS * GRID_COLS,
        )
    } else {
        (LayoutMode::Polygon, 1 + (complexity * 3.0).round() as usize)
    };

    let mut decision = ModeDecision {
        mode,
        mode_index: index,
        attractor,
        word,
        layout,
        clone_count,
        beam_speed: profile.pace.beam_speed(),
        target_scale: 1.0,
    };
    if let Some(kind) = decision.shape_kind() {
        decision.target_scale = kind.default_scale();
    }
    decision
}

/// Color rule table keyed by bias.
pub fn target_color(bias: ColorBias, features: &AudioFeatures) -> [f32; 3] {
    match bias {
        ColorBias::RedShift if features.rms > RED_SHIFT_RMS_GATE => RED,
        ColorBias::RedShift => ORANGE,
        ColorBias::BlueCool => CYAN,
        ColorBias::NeonMix if features.beat.fired => MAGENTA,
        ColorBias::NeonMix => CYAN,
        ColorBias::GreenDefault => PHOSPHOR_GREEN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{BandEnvelope, BeatRecord};

    fn quiet() -> AudioFeatures {
        AudioFeatures {
            rms: 0.1,
            ..AudioFeatures::default()
        }
    }

    fn drop_at(now_ms: f64) -> AudioFeatures {
        AudioFeatures {
            timestamp_ms: now_ms,
            rms: 0.7,
            beat: BeatRecord {
                fired: true,
                confidence: 0.95,
                last_beat_ms: Some(now_ms),
            },
            ..AudioFeatures::default()
        }
    }

    #[test]
    fn initial_state_is_first_preferred_mode() {
        let engine = DecisionEngine::new(BrainProfile::default(), 1);
        assert_eq!(engine.current().mode_index, 0);
        assert_eq!(engine.current().mode, ModeName::DEFAULT_POOL[0]);
        assert!(!engine.is_glitching(0.0));
    }

    #[test]
    fn drop_switches_only_after_min_duration() {
        let mut engine = DecisionEngine::new(BrainProfile::default(), 1);
        assert!(engine.update(0.0, &quiet()).is_none());
        assert!(engine.update(7_000.0, &drop_at(7_000.0)).is_none());
        let d = engine.update(8_100.0, &drop_at(8_100.0)).cloned();
        assert_eq!(d.map(|d| d.mode_index), Some(1));
        assert!(engine.is_glitching(8_200.0));
        assert!(!engine.is_glitching(8_600.0));
    }

    #[test]
    fn timer_fallback_prevents_stalling() {
        let mut engine = DecisionEngine::new(BrainProfile::default(), 1);
        engine.update(0.0, &quiet());
        assert!(engine.update(11_000.0, &quiet()).is_none());
        assert!(engine.update(12_100.0, &quiet()).is_some());
    }

    #[test]
    fn mode_index_wraps() {
        let profile = BrainProfile {
            preferred_modes: vec![ModeName::Cube, ModeName::Eye],
            pace: Pace::Frenetic,
            ..BrainProfile::default()
        };
        let mut engine = DecisionEngine::new(profile, 1);
        engine.update(0.0, &quiet());
        engine.update(3_100.0, &quiet());
        engine.update(6_200.0, &quiet());
        assert_eq!(engine.switch_count(), 2);
        assert_eq!(engine.current().mode, ModeName::Cube);
    }

    #[test]
    fn high_complexity_uses_grid_on_odd_indices() {
        let profile = BrainProfile {
            complexity_preference: 0.9,
            ..BrainProfile::default()
        };
        assert_eq!(derive_decision(&profile, 0, 0).layout, LayoutMode::Polygon);
        let odd = derive_decision(&profile, 1, 1);
        assert_eq!(odd.layout, LayoutMode::Grid { rows: 2, cols: 3 });
        assert_eq!(odd.clone_count, 6);
        let low = BrainProfile {
            complexity_preference: 0.0,
            ..BrainProfile::default()
        };
        assert_eq!(derive_decision(&low, 1, 1).clone_count, 1);
    }

    #[test]
    fn color_rules_follow_bias() {
        let loud = AudioFeatures {
            rms: 0.9,
            ..AudioFeatures::default()
        };
        assert_eq!(target_color(ColorBias::RedShift, &loud), RED);
        assert_eq!(target_color(ColorBias::RedShift, &quiet()), ORANGE);
        assert_eq!(target_color(ColorBias::NeonMix, &drop_at(0.0)), MAGENTA);
        assert_eq!(target_color(ColorBias::NeonMix, &quiet()), CYAN);
        assert_eq!(target_color(ColorBias::GreenDefault, &loud), PHOSPHOR_GREEN);
    }

    #[test]
    fn physics_eases_toward_targets() {
        let mut engine = DecisionEngine::new(BrainProfile::default(), 1);
        let features = AudioFeatures {
            rms: 1.0,
            low: BandEnvelope {
                instant: 1.0,
                smoothed: 1.0,
            },
            ..AudioFeatures::default()
        };
        let first = engine.step_physics(1.0 / 60.0, 0.0, &features);
        assert!(first.distortion > 0.0 && first.distortion < 0.8);
        let mut p = first;
        for i in 0..600 {
            p = engine.step_physics(1.0 / 60.0, i as f64 * 16.7, &features);
        }
        assert!((p.distortion - 0.8).abs() < 1e-3);
        assert!((p.zoom - 0.9).abs() < 1e-3);
        assert!((p.focus - 1.0).abs() < 1e-3);
    }

    #[test]
    fn digital_mood_keeps_softer_focus() {
        let digital = BrainProfile {
            mood: Mood::Digital,
            ..BrainProfile::default()
        };
        let mut soft = DecisionEngine::new(digital, 1);
        let mut sharp = DecisionEngine::new(BrainProfile::default(), 1);
        let (mut a, mut b) = (Physics::default(), Physics::default());
        for _ in 0..300 {
            a = soft.step_physics(1.0 / 60.0, 0.0, &quiet());
            b = sharp.step_physics(1.0 / 60.0, 0.0, &quiet());
        }
        assert!(a.focus < b.focus);
    }

    #[test]
    fn glitch_degrades_then_stability_recovers() {
        let mut engine = DecisionEngine::new(BrainProfile::default(), 1);
        engine.update(0.0, &quiet());
        engine.update(12_100.0, &quiet());
        let mut p = Physics::default();
        for i in 0..20 {
            p = engine.step_physics(1.0 / 60.0, 12_100.0 + i as f64 * 16.7, &quiet());
        }
        assert!(p.stability < 0.9);
        for i in 0..120 {
            p = engine.step_physics(1.0 / 60.0, 13_000.0 + i as f64 * 16.7, &quiet());
        }
        assert!(p.stability > 0.99);
    }
}
