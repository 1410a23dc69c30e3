//! Channel pairs: the unit of geometry handed to the renderer.

use glam::Vec2;

/// Two equal-length sample buffers, read either as (time, amplitude) in Y-T
/// mode or as an XY point cloud.
///
/// Construction truncates to the shorter input, so `a.len() == b.len()` holds
/// for every value of this type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelPair {
    a: Vec<f32>,
    b: Vec<f32>,
}

impl ChannelPair {
    pub fn new(mut a: Vec<f32>, mut b: Vec<f32>) -> Self {
        if a.len() != b.len() {
            log::debug!(
                "[channel] length mismatch a={} b={}, truncating",
                a.len(),
                b.len()
            );
            let n = a.len().min(b.len());
            a.truncate(n);
            b.truncate(n);
        }
        Self { a, b }
    }

    pub fn zeroed(len: usize) -> Self {
        Self {
            a: vec![0.0; len],
            b: vec![0.0; len],
        }
    }

    pub fn from_points(points: &[Vec2]) -> Self {
        Self {
            a: points.iter().map(|p| p.x).collect(),
            b: points.iter().map(|p| p.y).collect(),
        }
    }

    /// Y-T layout: sample index spread over x in [-1, 1], amplitude on y.
    pub fn from_yt(samples: &[f32]) -> Self {
        let n = samples.len();
        let denom = n.saturating_sub(1).max(1) as f32;
        let a = (0..n).map(|i| i as f32 / denom * 2.0 - 1.0).collect();
        Self {
            a,
            b: samples.to_vec(),
        }
    }

    /// XY layout from a mono signal: channel B is channel A delayed by
    /// `delay` samples (wrapping), which draws a phase-delay Lissajous.
    pub fn from_mono_xy(samples: &[f32], delay: usize) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self::default();
        }
        let b = (0..n).map(|i| samples[(i + n - delay % n) % n]).collect();
        Self {
            a: samples.to_vec(),
            b,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.a.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn a(&self) -> &[f32] {
        &self.a
    }

    pub fn b(&self) -> &[f32] {
        &self.b
    }

    #[inline]
    pub fn point(&self, i: usize) -> Vec2 {
        Vec2::new(self.a[i], self.b[i])
    }

    /// Point at `i` modulo the pair length; `None` only for an empty pair.
    #[inline]
    pub fn point_wrapped(&self, i: isize) -> Option<Vec2> {
        let n = self.len() as isize;
        if n == 0 {
            return None;
        }
        Some(self.point(i.rem_euclid(n) as usize))
    }

    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.a.iter().zip(&self.b).map(|(x, y)| Vec2::new(*x, *y))
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, p: Vec2) {
        self.a[i] = p.x;
        self.b[i] = p.y;
    }
}
