use glam::Vec3;

use super::fibonacci_point;
use crate::constants::{
    BRAIN_ELONGATION, BRAIN_HEMISPHERE_GAP, BRAIN_UNDERSIDE_FLATTEN, BRAIN_WRINKLE_AMPLITUDE,
    BRAIN_WRINKLE_FREQUENCY,
};

/// Two wrinkled hemispheres. The first half of the points is the left
/// hemisphere, the second half the right.
pub fn points(count: usize, out: &mut Vec<Vec3>) {
    let left = count / 2;
    let right = count - left;
    for (n, side) in [(left, -1.0f32), (right, 1.0)] {
        out.extend((0..n).map(|k| hemisphere_point(fibonacci_point(k, n), side)));
    }
}

fn hemisphere_point(unit: Vec3, side: f32) -> Vec3 {
    let f = BRAIN_WRINKLE_FREQUENCY;
    let radius = 1.0
        + BRAIN_WRINKLE_AMPLITUDE * (unit.x * f).sin() * (unit.y * f).cos() * (unit.z * f).sin();
    let mut p = unit * radius;
    p.x = side * (p.x.abs() + BRAIN_HEMISPHERE_GAP);
    if p.y < 0.0 {
        p.y *= BRAIN_UNDERSIDE_FLATTEN;
    }
    p.z *= BRAIN_ELONGATION;
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hemispheres_are_split_by_a_gap() {
        let mut pts = Vec::new();
        points(1000, &mut pts);
        assert_eq!(pts.len(), 1000);
        assert!(pts[..500].iter().all(|p| p.x <= -BRAIN_HEMISPHERE_GAP));
        assert!(pts[500..].iter().all(|p| p.x >= BRAIN_HEMISPHERE_GAP));
    }

    #[test]
    fn underside_is_flattened() {
        let mut pts = Vec::new();
        points(2000, &mut pts);
        let top = pts.iter().map(|p| p.y).fold(f32::MIN, f32::max);
        let bottom = pts.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(bottom.abs() < top);
    }
}
