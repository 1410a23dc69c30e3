//! Multi-instance point-path generators.
//!
//! All six shapes share one pipeline: the shape produces raw points for a
//! single instance, then [`tick`] rotates, projects, scales and offsets them
//! per instance and packs the result into a [`ChannelPair`]. Shape-specific
//! code never sees layout or projection.

pub mod brain;
pub mod chaos;
pub mod cube;
pub mod eye;
pub mod planet;
pub mod text;

use glam::{Vec2, Vec3};
use rand::prelude::*;

use crate::channel::ChannelPair;
use crate::constants::DEFAULT_POINTS_COUNT;
use crate::error::{Result, ScopeError};
use crate::font::FontOutlineProvider;
use crate::layout::{clamp_unit, rotate, InstanceLayout, LayoutMode, Projection};

pub use chaos::Attractor;

#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Cube,
    Text(String),
    Planet,
    Chaos(Attractor),
    Brain,
    Eye,
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Cube => "cube",
            ShapeKind::Text(_) => "text",
            ShapeKind::Planet => "planet",
            ShapeKind::Chaos(_) => "chaos",
            ShapeKind::Brain => "brain",
            ShapeKind::Eye => "eye",
        }
    }

    /// Flat shapes are drawn facing the viewer and never rotate.
    pub fn is_3d(&self) -> bool {
        !matches!(self, ShapeKind::Text(_))
    }

    pub fn projection(&self) -> Projection {
        match self {
            ShapeKind::Cube | ShapeKind::Brain => Projection::Perspective { distance: 4.0 },
            ShapeKind::Planet | ShapeKind::Chaos(_) | ShapeKind::Eye => {
                Projection::Perspective { distance: 3.0 }
            }
            ShapeKind::Text(_) => Projection::Orthographic,
        }
    }

    /// Single-instance scale that keeps the shape inside the viewport.
    pub fn default_scale(&self) -> f32 {
        match self {
            ShapeKind::Cube => 1.8,
            ShapeKind::Text(_) => 0.9,
            ShapeKind::Planet | ShapeKind::Chaos(_) | ShapeKind::Eye => 2.4,
            ShapeKind::Brain => 1.6,
        }
    }

    fn same_variant(&self, other: &ShapeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

#[derive(Clone, Debug)]
pub struct ShapeParams {
    pub kind: ShapeKind,
    pub points_count: usize,
    pub clone_count: usize,
    pub layout: LayoutMode,
    /// Radians per second around x, y and z.
    pub rotation_speed: Vec3,
    /// Overrides [`ShapeKind::default_scale`].
    pub target_scale: Option<f32>,
    /// Insert baseline connectors between glyphs (text only).
    pub text_connectors: bool,
    pub seed: u64,
}

impl Default for ShapeParams {
    fn default() -> Self {
        Self {
            kind: ShapeKind::Cube,
            points_count: DEFAULT_POINTS_COUNT,
            clone_count: 1,
            layout: LayoutMode::Polygon,
            rotation_speed: Vec3::new(0.3, 0.5, 0.0),
            target_scale: None,
            text_connectors: true,
            seed: 7,
        }
    }
}

impl ShapeParams {
    pub fn validate(&self) -> Result<()> {
        if self.points_count == 0 {
            return Err(ScopeError::InvalidConfig("points count must be > 0".into()));
        }
        if let LayoutMode::Grid { rows, cols } = self.layout {
            if rows == 0 || cols == 0 {
                return Err(ScopeError::InvalidConfig(format!(
                    "grid must be at least 1x1, got {rows}x{cols}"
                )));
            }
        }
        if !self.rotation_speed.is_finite() {
            return Err(ScopeError::InvalidConfig("rotation speed must be finite".into()));
        }
        Ok(())
    }

    pub fn passes(&self) -> usize {
        self.layout.passes(self.clone_count)
    }
}

/// Capabilities a generator may need from its host.
pub struct ShapeContext<'a> {
    pub font: &'a dyn FontOutlineProvider,
}

#[derive(Debug, Default)]
struct StaticCache {
    count: usize,
    points: Vec<Vec3>,
}

impl StaticCache {
    fn get(&mut self, count: usize, build: fn(usize, &mut Vec<Vec3>)) -> &[Vec3] {
        if self.count != count || self.points.len() != count {
            self.points.clear();
            build(count, &mut self.points);
            self.count = count;
        }
        &self.points
    }
}

/// Animation state of one active generator.
///
/// Created on activation and dropped on deactivation; nothing carries over
/// between activations.
pub struct GeneratorState {
    kind: ShapeKind,
    rotation: Vec3,
    time: f64,
    layout: InstanceLayout,
    statics: StaticCache,
    chaos: chaos::ChaosState,
    eye: eye::EyeState,
    text: text::TextState,
    scratch: Vec<Vec3>,
}

impl GeneratorState {
    pub fn new(kind: ShapeKind, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            kind,
            rotation: Vec3::ZERO,
            time: 0.0,
            layout: InstanceLayout::default(),
            statics: StaticCache::default(),
            chaos: chaos::ChaosState::default(),
            eye: eye::EyeState::new(rng.gen()),
            text: text::TextState::default(),
            scratch: Vec::new(),
        }
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn layout(&self) -> &InstanceLayout {
        &self.layout
    }
}

/// Advance `state` by `dt` seconds and produce this frame's points.
///
/// The output always holds exactly `points_count` finite points inside
/// [-1, 1]. Indices past `passes * floor(points_count / passes)` repeat the
/// last written point.
pub fn tick(
    state: &mut GeneratorState,
    dt: f32,
    params: &ShapeParams,
    ctx: &ShapeContext<'_>,
) -> ChannelPair {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    if !state.kind.same_variant(&params.kind) {
        log::debug!(
            "[shapes] kind changed {} -> {}, resetting state",
            state.kind.name(),
            params.kind.name()
        );
        *state = GeneratorState::new(params.kind.clone(), params.seed);
    }
    state.kind = params.kind.clone();
    state.time += dt as f64;
    if params.kind.is_3d() {
        state.rotation += params.rotation_speed * dt;
    }

    let total = params.points_count;
    let passes = params.passes();
    let per_pass = total / passes;
    let mut out = ChannelPair::zeroed(total);
    if per_pass == 0 {
        return out;
    }

    let targets = params.layout.target_offsets(passes);
    let base = params
        .target_scale
        .unwrap_or_else(|| params.kind.default_scale());
    state
        .layout
        .step(&targets, params.layout.target_scale(passes, base));

    if let ShapeKind::Chaos(attractor) = &params.kind {
        state.chaos.prepare(*attractor, passes, dt);
    }
    if let ShapeKind::Text(text) = &params.kind {
        state.text.prepare(text, params.text_connectors, ctx.font);
    }

    let projection = params.kind.projection();
    let scale = state.layout.scale();
    let mut scratch = std::mem::take(&mut state.scratch);
    let mut last = Vec2::ZERO;
    for pass in 0..passes {
        scratch.clear();
        match &params.kind {
            ShapeKind::Cube => scratch.extend_from_slice(state.statics.get(per_pass, cube::points)),
            ShapeKind::Planet => {
                scratch.extend_from_slice(state.statics.get(per_pass, planet::points))
            }
            ShapeKind::Brain => {
                scratch.extend_from_slice(state.statics.get(per_pass, brain::points))
            }
            ShapeKind::Chaos(_) => state.chaos.points(pass, per_pass, &mut scratch),
            ShapeKind::Eye => state.eye.points(pass, per_pass, state.time, &mut scratch),
            ShapeKind::Text(_) => state.text.points(per_pass, &mut scratch),
        }
        // a short shape is padded by repeating its last point
        let fill = scratch.last().copied().unwrap_or(Vec3::ZERO);
        scratch.resize(per_pass, fill);

        let offset = state.layout.offsets().get(pass).copied().unwrap_or(Vec2::ZERO);
        for (i, p) in scratch.iter().enumerate() {
            let p = if params.kind.is_3d() {
                rotate(*p, state.rotation)
            } else {
                *p
            };
            last = clamp_unit(projection.project(p, scale) + offset);
            out.set(pass * per_pass + i, last);
        }
    }
    state.scratch = scratch;

    for i in passes * per_pass..total {
        out.set(i, last);
    }
    out
}

/// Fibonacci-sphere point `k` of `n` on the unit sphere, y up.
pub(crate) fn fibonacci_point(k: usize, n: usize) -> Vec3 {
    let n = n.max(1) as f32;
    let k = k as f32 + 0.5;
    let phi = (1.0 - 2.0 * k / n).clamp(-1.0, 1.0).acos();
    let theta = std::f32::consts::PI * (1.0 + 5f32.sqrt()) * k;
    Vec3::new(theta.cos() * phi.sin(), phi.cos(), theta.sin() * phi.sin())
}
