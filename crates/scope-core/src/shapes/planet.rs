use glam::Vec3;
use std::f32::consts::{PI, TAU};

use crate::constants::PLANET_TURNS;

/// Latitude spiral from pole to pole: `phi = t * pi`, `theta = t * turns * 2pi`.
pub fn points(count: usize, out: &mut Vec<Vec3>) {
    let denom = count.saturating_sub(1).max(1) as f32;
    out.extend((0..count).map(|i| {
        let t = i as f32 / denom;
        let phi = t * PI;
        let theta = t * PLANET_TURNS * TAU;
        Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spiral_runs_pole_to_pole() {
        let mut pts = Vec::new();
        points(500, &mut pts);
        assert!((pts[0] - Vec3::Y).length() < 1e-5);
        assert!((pts[499] + Vec3::Y).length() < 1e-3);
        // consecutive points are close: a stroke, not a cloud
        for w in pts.windows(2) {
            assert!(w[0].distance(w[1]) < 0.2);
        }
    }
}
