//! Simulated phosphor persistence.
//!
//! A read head sweeps through the current channel pair at an artistic
//! "beam speed". The trail behind it covers a fixed time span, so a faster
//! beam shows more samples, and each sample is dimmed by how far the beam
//! jumped to reach it (a slow beam deposits more energy per spot).

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::channel::ChannelPair;
use crate::constants::{
    BRIGHTNESS_EPSILON, BRIGHTNESS_K, PERSISTENCE_SEC, TRAIL_CAPACITY, TRAIL_HEAD_FLOOR,
};
use crate::error::{Result, ScopeError};

/// GPU-ready trail vertex.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TrailPoint {
    pub pos: [f32; 3],
    pub brightness: f32,
}

#[derive(Clone, Debug)]
pub struct TrailConfig {
    pub capacity: usize,
    pub persistence_sec: f32,
    /// Inter-sample distance at which brightness starts to fall off.
    pub brightness_k: f32,
    /// Newest entries drawn at full brightness regardless of beam velocity.
    pub head_floor: usize,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: TRAIL_CAPACITY,
            persistence_sec: PERSISTENCE_SEC,
            brightness_k: BRIGHTNESS_K,
            head_floor: TRAIL_HEAD_FLOOR,
        }
    }
}

impl TrailConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ScopeError::InvalidConfig("trail capacity must be > 0".into()));
        }
        if !(self.persistence_sec.is_finite() && self.persistence_sec > 0.0) {
            return Err(ScopeError::InvalidConfig("persistence must be > 0".into()));
        }
        if !(self.brightness_k.is_finite() && self.brightness_k > 0.0) {
            return Err(ScopeError::InvalidConfig("brightness k must be > 0".into()));
        }
        Ok(())
    }
}

pub struct TrailBuffer {
    config: TrailConfig,
    points: Vec<TrailPoint>,
    active: usize,
    head: f64,
}

impl TrailBuffer {
    pub fn new(config: TrailConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            points: vec![TrailPoint::default(); config.capacity],
            config,
            active: 0,
            head: 0.0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.points.len()
    }

    pub fn active_len(&self) -> usize {
        self.active
    }

    pub fn head(&self) -> f64 {
        self.head
    }

    /// `min(capacity, floor(speed * persistence))`
    pub fn active_len_for(&self, speed: f32) -> usize {
        let n = (speed.max(0.0) * self.config.persistence_sec).floor();
        if n.is_finite() {
            (n as usize).min(self.capacity())
        } else {
            0
        }
    }

    /// Newest entry first. Entries past the active range are stale and never
    /// cleared.
    pub fn draw_range(&self) -> &[TrailPoint] {
        &self.points[..self.active]
    }

    /// Move the head `speed * dt` samples through `pair` and rebuild the
    /// trail behind it. Returns the beam position, or `None` for an empty pair.
    pub fn advance(&mut self, pair: &ChannelPair, speed: f32, dt: f32) -> Option<Vec2> {
        if pair.is_empty() {
            self.active = 0;
            return None;
        }
        let len = pair.len() as f64;
        let step = (speed as f64 * dt as f64).max(0.0);
        if step.is_finite() {
            self.head = (self.head + step).rem_euclid(len);
        }
        let head = self.head.floor() as isize;
        let beam = pair.point_wrapped(head)?;

        self.active = self.active_len_for(speed);
        let span = self.active.max(1) as f32;
        for (i, slot) in self.points[..self.active].iter_mut().enumerate() {
            let idx = head - i as isize;
            let pos = pair.point_wrapped(idx).unwrap_or(beam);
            let prev = pair.point_wrapped(idx - 1).unwrap_or(pos);
            // linear fade over the persistence window
            let age = 1.0 - i as f32 / span;
            let brightness = if i < self.config.head_floor {
                age
            } else {
                let d = pos.distance(prev);
                let velocity = (self.config.brightness_k / (d + BRIGHTNESS_EPSILON)).min(1.0);
                velocity * age
            };
            let brightness = if brightness.is_finite() {
                brightness.clamp(0.0, 1.0)
            } else {
                0.0
            };
            *slot = TrailPoint {
                pos: [pos.x, pos.y, 0.0],
                brightness,
            };
        }
        log::trace!("[trail] head={:.1} active={}", self.head, self.active);
        Some(beam)
    }
}
