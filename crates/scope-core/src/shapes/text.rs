//! Text as one continuous beam path.
//!
//! Glyph loops are laid out left to right, each loop rotated to start at its
//! bottom-left point and closed back on itself. Optional baseline
//! connectors join consecutive glyphs (drop, cross, rise) so the beam never
//! cuts through a letter on its way to the next one.

use glam::{Vec2, Vec3};

use crate::font::{FontOutlineProvider, GlyphOutline};

#[derive(Debug, Default)]
pub struct TextState {
    key: Option<(String, bool)>,
    path: Vec<Vec2>,
}

impl TextState {
    pub fn path(&self) -> &[Vec2] {
        &self.path
    }

    /// Rebuild the path when the text or connector setting changes.
    pub fn prepare(&mut self, text: &str, connectors: bool, font: &dyn FontOutlineProvider) {
        if matches!(&self.key, Some((t, c)) if t == text && *c == connectors) {
            return;
        }
        self.key = Some((text.to_owned(), connectors));
        self.path = match font.outline(text) {
            Ok(glyphs) => normalize(build_path(&glyphs, connectors)),
            Err(e) => {
                log::warn!("[text] {e}, drawing a baseline instead");
                vec![Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)]
            }
        };
    }

    pub fn points(&self, count: usize, out: &mut Vec<Vec3>) {
        out.extend(
            resample(&self.path, count)
                .into_iter()
                .map(|p| p.extend(0.0)),
        );
    }
}

/// Rotate a loop so it starts at its lowest point (ties: leftmost).
pub fn start_bottom_left(loop_: &[Vec2]) -> Vec<Vec2> {
    let Some(start) = loop_
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)))
        .map(|(i, _)| i)
    else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(loop_.len() + 1);
    out.extend_from_slice(&loop_[start..]);
    out.extend_from_slice(&loop_[..start]);
    out
}

/// Concatenate glyph outlines into one path in font units.
pub fn build_path(glyphs: &[GlyphOutline], connectors: bool) -> Vec<Vec2> {
    let baseline = glyphs
        .iter()
        .flat_map(|g| g.loops.iter().flatten())
        .map(|p| p.y)
        .fold(f32::INFINITY, f32::min);
    let baseline = if baseline.is_finite() { baseline } else { 0.0 };

    let mut path: Vec<Vec2> = Vec::new();
    let mut pen = 0.0;
    for glyph in glyphs {
        let mut first_loop = true;
        for loop_ in &glyph.loops {
            let mut ordered: Vec<Vec2> = start_bottom_left(loop_)
                .into_iter()
                .map(|p| p + Vec2::new(pen, 0.0))
                .collect();
            let Some(&start) = ordered.first() else {
                continue;
            };
            ordered.push(start);
            if first_loop && connectors {
                if let Some(&prev) = path.last() {
                    path.push(Vec2::new(prev.x, baseline));
                    path.push(Vec2::new(start.x, baseline));
                }
            }
            first_loop = false;
            path.extend(ordered);
        }
        pen += glyph.advance;
    }
    path
}

/// Centre the path and scale it uniformly so its larger extent spans [-1, 1].
pub fn normalize(path: Vec<Vec2>) -> Vec<Vec2> {
    if path.is_empty() {
        return path;
    }
    let (min, max) = path
        .iter()
        .fold((Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)), |(lo, hi), p| {
            (lo.min(*p), hi.max(*p))
        });
    let center = (min + max) * 0.5;
    let extent = (max - min).max_element();
    let k = if extent > f32::EPSILON { 2.0 / extent } else { 1.0 };
    path.into_iter().map(|p| (p - center) * k).collect()
}

/// Linear interpolation over a virtual fractional index into `path`.
pub fn resample(path: &[Vec2], count: usize) -> Vec<Vec2> {
    match path.len() {
        0 => return vec![Vec2::ZERO; count],
        1 => return vec![path[0]; count],
        _ => {}
    }
    let last = (path.len() - 1) as f32;
    let denom = count.saturating_sub(1).max(1) as f32;
    (0..count)
        .map(|k| {
            let u = k as f32 / denom * last;
            let i = (u.floor() as usize).min(path.len() - 2);
            path[i].lerp(path[i + 1], u - i as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::StrokeFont;

    #[test]
    fn loops_start_bottom_left() {
        let loop_ = [
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        let ordered = start_bottom_left(&loop_);
        assert_eq!(ordered[0], Vec2::new(0.0, 0.0));
        assert_eq!(ordered[1], Vec2::new(0.0, 1.0));
        assert_eq!(ordered.len(), 4);
    }

    #[test]
    fn connectors_run_along_baseline() {
        let glyphs = StrokeFont.outline("TT").unwrap();
        let with = build_path(&glyphs, true);
        let without = build_path(&glyphs, false);
        assert_eq!(with.len(), without.len() + 2);
        let baseline_hits = with.iter().filter(|p| p.y == 0.0).count();
        assert!(baseline_hits > without.iter().filter(|p| p.y == 0.0).count());
    }

    #[test]
    fn normalised_path_fits_unit_box() {
        let glyphs = StrokeFont.outline("HELLO").unwrap();
        let path = normalize(build_path(&glyphs, true));
        let max = path.iter().map(|p| p.abs().max_element()).fold(0.0, f32::max);
        assert!((max - 1.0).abs() < 1e-5);
    }

    #[test]
    fn resample_hits_both_ends() {
        let path = [Vec2::ZERO, Vec2::X, Vec2::ONE];
        let pts = resample(&path, 5);
        assert_eq!(pts[0], Vec2::ZERO);
        assert_eq!(pts[2], Vec2::X);
        assert_eq!(pts[4], Vec2::ONE);
    }

    #[test]
    fn missing_glyphs_fall_back_to_a_line() {
        let mut state = TextState::default();
        state.prepare("~", true, &StrokeFont);
        assert_eq!(state.path().len(), 2);
    }
}
