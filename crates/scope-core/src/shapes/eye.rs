use glam::{Vec2, Vec3};
use noise::{NoiseFn, OpenSimplex};
use rand::prelude::*;

use super::fibonacci_point;
use crate::constants::{
    EYE_CONE_HALF_ANGLE, EYE_PUPIL_COUNT, EYE_PUPIL_LIFT, EYE_PUPIL_RADIUS, EYE_SCLERA_FRACTION,
    EYE_WANDER_RATE,
};

/// Sclera sphere plus wandering pupils.
pub struct EyeState {
    noise: OpenSimplex,
    rng: StdRng,
    /// Unit-disk offsets per pupil point, regenerated when the count changes.
    disk: Vec<Vec2>,
}

impl std::fmt::Debug for EyeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EyeState")
            .field("disk", &self.disk.len())
            .finish()
    }
}

impl EyeState {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: OpenSimplex::new(seed),
            rng: StdRng::seed_from_u64(seed as u64),
            disk: Vec::new(),
        }
    }

    /// Forward-facing (towards -z) direction of pupil `pupil` on instance
    /// `instance` at `time` seconds. Stays within the wander cone.
    pub fn pupil_direction(&self, instance: usize, pupil: usize, time: f64) -> Vec3 {
        let t = time * EYE_WANDER_RATE;
        let lane = pupil as f64 * 17.3 + instance as f64 * 5.1;
        let yaw = self.noise.get([t, lane, 0.0]) as f32;
        let pitch = self.noise.get([t, lane, 31.7]) as f32;
        let yaw = yaw.clamp(-1.0, 1.0) * EYE_CONE_HALF_ANGLE;
        let pitch = pitch.clamp(-1.0, 1.0) * EYE_CONE_HALF_ANGLE;
        Vec3::new(
            yaw.sin() * pitch.cos(),
            pitch.sin(),
            -yaw.cos() * pitch.cos(),
        )
    }

    fn ensure_disk(&mut self, count: usize) {
        if self.disk.len() == count {
            return;
        }
        let rng = &mut self.rng;
        self.disk = (0..count)
            .map(|_| {
                let r = rng.gen::<f32>().sqrt();
                let a = rng.gen_range(0.0..std::f32::consts::TAU);
                Vec2::new(a.cos(), a.sin()) * r
            })
            .collect();
    }

    pub fn points(&mut self, instance: usize, count: usize, time: f64, out: &mut Vec<Vec3>) {
        let sclera = ((count as f32) * EYE_SCLERA_FRACTION).round() as usize;
        let sclera = sclera.min(count);
        out.extend((0..sclera).map(|k| fibonacci_point(k, sclera)));

        let pupil_points = count - sclera;
        let per_pupil = pupil_points / EYE_PUPIL_COUNT;
        // the last pupil absorbs the remainder
        let biggest = pupil_points - per_pupil * (EYE_PUPIL_COUNT - 1);
        self.ensure_disk(biggest);

        for pupil in 0..EYE_PUPIL_COUNT {
            let n = if pupil + 1 == EYE_PUPIL_COUNT {
                biggest
            } else {
                per_pupil
            };
            let dir = self.pupil_direction(instance, pupil, time);
            let (u, v) = dir.any_orthonormal_pair();
            let center = dir * EYE_PUPIL_LIFT;
            out.extend(
                self.disk[..n]
                    .iter()
                    .map(|d| center + (u * d.x + v * d.y) * EYE_PUPIL_RADIUS),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_budget_is_split_between_sclera_and_pupils() {
        let mut eye = EyeState::new(3);
        let mut pts = Vec::new();
        eye.points(0, 1000, 0.0, &mut pts);
        assert_eq!(pts.len(), 1000);
        // sclera points sit on the unit sphere, pupils outside it
        assert!(pts[..600].iter().all(|p| (p.length() - 1.0).abs() < 1e-4));
        assert!(pts[600..].iter().all(|p| p.length() > 1.0));
    }

    #[test]
    fn pupils_stay_in_forward_cone() {
        let eye = EyeState::new(11);
        for step in 0..200 {
            let t = step as f64 * 0.37;
            for pupil in 0..EYE_PUPIL_COUNT {
                let dir = eye.pupil_direction(2, pupil, t);
                let angle = dir.angle_between(Vec3::NEG_Z);
                assert!(angle <= EYE_CONE_HALF_ANGLE * 1.5 + 1e-4, "{angle}");
            }
        }
    }

    #[test]
    fn pupils_wander_over_time() {
        let eye = EyeState::new(5);
        let a = eye.pupil_direction(0, 0, 0.0);
        let b = eye.pupil_direction(0, 0, 10.0);
        assert!(a.distance(b) > 1e-3);
    }
}
