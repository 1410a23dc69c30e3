//! Projection policies and multi-instance formation layout.
//!
//! Every shape generator funnels its raw points through here: rotate,
//! project, scale, offset by the instance centre, clamp to the viewport.

use glam::{EulerRot, Quat, Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, TAU};

use crate::constants::{
    CIRCLE_LAYOUT_RADIUS, GRID_CELL_FILL, GRID_LAYOUT_SPAN, MIN_PROJECTION_DEPTH, MIN_SCALE,
    OFFSET_LERP, POLYGON_CLONE_SCALE, SCALE_LERP,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// `screen = xy / (z + distance) * scale`
    Perspective { distance: f32 },
    /// `screen = xy * scale`, for flat content such as text
    Orthographic,
}

impl Projection {
    pub fn project(self, p: Vec3, scale: f32) -> Vec2 {
        let out = match self {
            Projection::Perspective { distance } => {
                let depth = (p.z + distance).max(MIN_PROJECTION_DEPTH);
                Vec2::new(p.x, p.y) / depth * scale
            }
            Projection::Orthographic => Vec2::new(p.x, p.y) * scale,
        };
        if out.is_finite() {
            out
        } else {
            Vec2::ZERO
        }
    }
}

/// How simultaneous instances of one shape are arranged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayoutMode {
    /// Clones evenly spaced on a circle, first one at the top.
    #[default]
    Polygon,
    Grid { rows: usize, cols: usize },
}

impl LayoutMode {
    /// Number of instances drawn for this layout.
    pub fn passes(self, clone_count: usize) -> usize {
        match self {
            LayoutMode::Polygon => clone_count.max(1),
            LayoutMode::Grid { rows, cols } => (rows * cols).max(1),
        }
    }

    fn grid_cell(rows: usize, cols: usize) -> Vec2 {
        Vec2::new(
            GRID_LAYOUT_SPAN / cols.max(1) as f32,
            GRID_LAYOUT_SPAN / rows.max(1) as f32,
        )
    }

    /// Analytic centre of every instance.
    pub fn target_offsets(self, passes: usize) -> Vec<Vec2> {
        match self {
            LayoutMode::Grid { rows, cols } => {
                let cols = cols.max(1);
                let cell = Self::grid_cell(rows, cols);
                let half = GRID_LAYOUT_SPAN * 0.5;
                (0..passes)
                    .map(|p| {
                        let (row, col) = (p / cols, p % cols);
                        Vec2::new(
                            (col as f32 + 0.5) * cell.x - half,
                            // row 0 on top
                            half - (row as f32 + 0.5) * cell.y,
                        )
                    })
                    .collect()
            }
            LayoutMode::Polygon if passes <= 1 => vec![Vec2::ZERO; passes],
            LayoutMode::Polygon => (0..passes)
                .map(|p| {
                    let angle = p as f32 / passes as f32 * TAU + FRAC_PI_2;
                    Vec2::new(angle.cos(), angle.sin()) * CIRCLE_LAYOUT_RADIUS
                })
                .collect(),
        }
    }

    /// Scale that fits `base`-scaled unit content into one instance slot.
    pub fn target_scale(self, passes: usize, base: f32) -> f32 {
        let s = match self {
            LayoutMode::Grid { rows, cols } => {
                let cell = Self::grid_cell(rows, cols);
                // content spans [-1, 1], i.e. two units
                base * cell.min_element() * 0.5 * GRID_CELL_FILL
            }
            LayoutMode::Polygon if passes > 1 => base * POLYGON_CLONE_SCALE,
            LayoutMode::Polygon => base,
        };
        safe_scale(s)
    }
}

/// Non-finite or tiny scales collapse to the positive floor.
#[inline]
pub fn safe_scale(s: f32) -> f32 {
    if s.is_finite() {
        s.max(MIN_SCALE)
    } else {
        MIN_SCALE
    }
}

/// One exponential smoothing step. A non-finite target is ignored so the
/// smoothed value can never be poisoned.
#[inline]
pub fn lerp_toward(current: f32, target: f32, alpha: f32) -> f32 {
    if !target.is_finite() {
        return current;
    }
    current + (target - current) * alpha
}

#[inline]
pub fn lerp_toward_vec(current: Vec2, target: Vec2, alpha: f32) -> Vec2 {
    if !target.is_finite() {
        return current;
    }
    current + (target - current) * alpha
}

pub fn rotate(p: Vec3, angles: Vec3) -> Vec3 {
    Quat::from_euler(EulerRot::XYZ, angles.x, angles.y, angles.z) * p
}

/// Clip to the renderer viewport; non-finite coordinates become 0.
#[inline]
pub fn clamp_unit(p: Vec2) -> Vec2 {
    let fix = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
    Vec2::new(fix(p.x), fix(p.y))
}

/// Smoothed per-instance offsets and the shared scale.
///
/// The first step snaps to the targets; later steps move a fixed fraction
/// of the way each tick, so changing layout animates into formation.
/// Instances added later start from the origin.
#[derive(Clone, Debug, Default)]
pub struct InstanceLayout {
    offsets: Vec<Vec2>,
    scale: f32,
    primed: bool,
}

impl InstanceLayout {
    pub fn offsets(&self) -> &[Vec2] {
        &self.offsets
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn step(&mut self, targets: &[Vec2], target_scale: f32) {
        let target_scale = safe_scale(target_scale);
        if !self.primed {
            self.offsets = targets.to_vec();
            self.scale = target_scale;
            self.primed = true;
            return;
        }
        self.offsets.resize(targets.len(), Vec2::ZERO);
        for (offset, target) in self.offsets.iter_mut().zip(targets) {
            *offset = lerp_toward_vec(*offset, *target, OFFSET_LERP);
        }
        self.scale = safe_scale(lerp_toward(self.scale, target_scale, SCALE_LERP));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_row_zero_is_on_top() {
        let offsets = LayoutMode::Grid { rows: 2, cols: 3 }.target_offsets(6);
        assert_eq!(offsets.len(), 6);
        assert!(offsets[0].y > offsets[3].y);
        assert!(offsets[0].x < offsets[1].x && offsets[1].x < offsets[2].x);
        let centroid = offsets.iter().copied().sum::<Vec2>() / 6.0;
        assert!(centroid.length() < 1e-5);
    }

    #[test]
    fn circle_starts_at_top() {
        let offsets = LayoutMode::Polygon.target_offsets(4);
        assert!((offsets[0] - Vec2::new(0.0, CIRCLE_LAYOUT_RADIUS)).length() < 1e-5);
        assert_eq!(LayoutMode::Polygon.target_offsets(1), vec![Vec2::ZERO]);
    }

    #[test]
    fn perspective_never_divides_by_zero() {
        let p = Projection::Perspective { distance: 2.0 };
        let out = p.project(Vec3::new(1.0, 1.0, -2.0), 1.0);
        assert!(out.is_finite());
        let out = p.project(Vec3::new(f32::NAN, 0.0, 0.0), 1.0);
        assert_eq!(out, Vec2::ZERO);
    }

    #[test]
    fn scale_has_positive_floor() {
        assert_eq!(safe_scale(f32::NAN), MIN_SCALE);
        assert_eq!(safe_scale(-3.0), MIN_SCALE);
        assert_eq!(safe_scale(0.5), 0.5);
        let s = LayoutMode::Grid { rows: 0, cols: 0 }.target_scale(1, 1.0);
        assert!(s.is_finite() && s > 0.0);
    }

    #[test]
    fn instance_layout_animates_into_formation() {
        let mut layout = InstanceLayout::default();
        layout.step(&[Vec2::ZERO], 1.0);
        let targets = LayoutMode::Polygon.target_offsets(3);
        layout.step(&targets, 0.45);
        // the existing instance moved 5% of the way, the new ones start near the origin
        assert!((layout.offsets()[0] - targets[0] * OFFSET_LERP).length() < 1e-5);
        assert!(layout.offsets()[2].length() < 0.1);
        for _ in 0..400 {
            layout.step(&targets, 0.45);
        }
        assert!((layout.offsets()[1] - targets[1]).length() < 1e-3);
        assert!((layout.scale() - 0.45).abs() < 1e-3);
    }

    #[test]
    fn nan_target_does_not_poison_smoothing() {
        assert_eq!(lerp_toward(0.5, f32::NAN, 0.1), 0.5);
    }
}
