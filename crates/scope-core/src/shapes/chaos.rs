//! Strange attractors integrated with fixed-step Euler.

use glam::Vec3;
use smallvec::SmallVec;

use crate::constants::{
    CHAOS_ADVANCE_STEPS_PER_SEC, CHAOS_DT, CHAOS_INSTANCE_PERTURBATION, CHAOS_WARMUP_STEPS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Attractor {
    #[default]
    Lorenz,
    Rossler,
    Aizawa,
}

impl Attractor {
    pub const ALL: [Attractor; 3] = [Attractor::Lorenz, Attractor::Rossler, Attractor::Aizawa];

    /// Lenient name lookup used for profile suggestions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lorenz" => Some(Attractor::Lorenz),
            "rossler" | "rössler" | "roessler" => Some(Attractor::Rossler),
            "aizawa" => Some(Attractor::Aizawa),
            _ => None,
        }
    }

    pub fn derivative(self, p: Vec3) -> Vec3 {
        match self {
            Attractor::Lorenz => {
                let (sigma, rho, beta) = (10.0, 28.0, 8.0 / 3.0);
                Vec3::new(
                    sigma * (p.y - p.x),
                    p.x * (rho - p.z) - p.y,
                    p.x * p.y - beta * p.z,
                )
            }
            Attractor::Rossler => {
                let (a, b, c) = (0.2, 0.2, 5.7);
                Vec3::new(-p.y - p.z, p.x + a * p.y, b + p.z * (p.x - c))
            }
            Attractor::Aizawa => {
                let (a, b, c, d, e, f) = (0.95, 0.7, 0.6, 3.5, 0.25, 0.1);
                Vec3::new(
                    (p.z - b) * p.x - d * p.y,
                    d * p.x + (p.z - b) * p.y,
                    c + a * p.z - p.z.powi(3) / 3.0 - (p.x * p.x + p.y * p.y) * (1.0 + e * p.z)
                        + f * p.z * p.x.powi(3),
                )
            }
        }
    }

    #[inline]
    pub fn step(self, p: Vec3, dt: f32) -> Vec3 {
        p + self.derivative(p) * dt
    }

    pub fn initial_condition(self) -> Vec3 {
        match self {
            Attractor::Lorenz => Vec3::new(1.0, 1.0, 1.0),
            Attractor::Rossler | Attractor::Aizawa => Vec3::new(0.1, 0.0, 0.0),
        }
    }

    /// Point subtracted before scaling so the figure rotates about its middle.
    pub fn center(self) -> Vec3 {
        match self {
            Attractor::Lorenz => Vec3::new(0.0, 0.0, 23.5),
            Attractor::Rossler => Vec3::new(0.0, 0.0, 1.0),
            Attractor::Aizawa => Vec3::new(0.0, 0.0, 0.6),
        }
    }

    /// Brings the attractor's envelope to roughly the unit cube.
    pub fn normalize(self) -> f32 {
        match self {
            Attractor::Lorenz => 1.0 / 25.0,
            Attractor::Rossler => 1.0 / 12.0,
            Attractor::Aizawa => 1.0 / 1.5,
        }
    }

    /// `steps` raw points starting at (and including) `start`.
    pub fn trajectory(self, start: Vec3, steps: usize, dt: f32) -> Vec<Vec3> {
        let mut p = start;
        (0..steps)
            .map(|_| {
                let cur = p;
                p = self.step(p, dt);
                cur
            })
            .collect()
    }
}

/// Per-instance integration heads. Each instance starts from a slightly
/// different point so clones diverge.
#[derive(Debug, Default)]
pub struct ChaosState {
    attractor: Option<Attractor>,
    heads: SmallVec<[Vec3; 8]>,
    pending_steps: f32,
}

impl ChaosState {
    pub fn prepare(&mut self, attractor: Attractor, instances: usize, dt: f32) {
        if self.attractor != Some(attractor) || self.heads.len() != instances {
            log::debug!("[chaos] warming up {attractor:?} x{instances}");
            self.attractor = Some(attractor);
            self.pending_steps = 0.0;
            self.heads = (0..instances)
                .map(|i| {
                    let mut p = attractor.initial_condition()
                        + Vec3::X * (i as f32 * CHAOS_INSTANCE_PERTURBATION);
                    for _ in 0..CHAOS_WARMUP_STEPS {
                        p = attractor.step(p, CHAOS_DT);
                    }
                    p
                })
                .collect();
            return;
        }
        self.pending_steps += CHAOS_ADVANCE_STEPS_PER_SEC * dt;
        let steps = self.pending_steps.floor() as usize;
        self.pending_steps -= steps as f32;
        for head in &mut self.heads {
            for _ in 0..steps {
                *head = attractor.step(*head, CHAOS_DT);
            }
            if !head.is_finite() {
                log::debug!("[chaos] head diverged, restarting");
                *head = attractor.initial_condition();
            }
        }
    }

    pub fn points(&self, instance: usize, count: usize, out: &mut Vec<Vec3>) {
        let (Some(attractor), Some(head)) = (self.attractor, self.heads.get(instance)) else {
            return;
        };
        let center = attractor.center();
        let norm = attractor.normalize();
        let mut p = *head;
        for _ in 0..count {
            let q = (p - center) * norm;
            out.push(if q.is_finite() { q } else { Vec3::ZERO });
            p = attractor.step(p, CHAOS_DT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_leniently() {
        assert_eq!(Attractor::from_name(" Lorenz "), Some(Attractor::Lorenz));
        assert_eq!(Attractor::from_name("rössler"), Some(Attractor::Rossler));
        assert_eq!(Attractor::from_name("henon"), None);
    }

    #[test]
    fn instances_start_apart() {
        let mut state = ChaosState::default();
        state.prepare(Attractor::Lorenz, 2, 0.0);
        let (mut a, mut b) = (Vec::new(), Vec::new());
        state.points(0, 100, &mut a);
        state.points(1, 100, &mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn attractors_stay_bounded_after_normalising() {
        for attractor in Attractor::ALL {
            let mut state = ChaosState::default();
            state.prepare(attractor, 1, 0.0);
            let mut pts = Vec::new();
            state.points(0, 5000, &mut pts);
            for p in pts {
                assert!(p.abs().max_element() < 3.0, "{attractor:?} {p}");
            }
        }
    }

    #[test]
    fn heads_advance_with_time() {
        let mut state = ChaosState::default();
        state.prepare(Attractor::Rossler, 1, 0.0);
        let before = state.heads[0];
        state.prepare(Attractor::Rossler, 1, 0.5);
        assert_ne!(before, state.heads[0]);
    }
}
