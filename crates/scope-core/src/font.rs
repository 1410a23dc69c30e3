//! Glyph outlines for the text shape.

use glam::Vec2;

use crate::error::{Result, ScopeError};

/// Closed loops of one glyph in font units, y up, pen origin at (0, 0).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphOutline {
    /// Each loop is implicitly closed; the first point is not repeated.
    pub loops: Vec<Vec<Vec2>>,
    pub advance: f32,
}

/// Anything that can turn a string into glyph outlines.
///
/// Implementations return one entry per drawable character, left to right,
/// and fail with [`ScopeError::Font`] when nothing in `text` can be drawn.
pub trait FontOutlineProvider {
    fn outline(&self, text: &str) -> Result<Vec<GlyphOutline>>;
}

type Strokes = &'static [&'static [(u8, u8)]];

/// Built-in single-stroke font on a 4 x 6 grid.
///
/// Open strokes are traced out and back so every loop is closed, which is
/// what a continuous beam needs anyway.
#[derive(Clone, Copy, Debug, Default)]
pub struct StrokeFont;

impl StrokeFont {
    pub const ADVANCE: f32 = 5.0;
    pub const SPACE_ADVANCE: f32 = 3.0;
    pub const CAP_HEIGHT: f32 = 6.0;

    fn strokes(c: char) -> Option<Strokes> {
        let s: Strokes = match c.to_ascii_uppercase() {
            'A' => &[&[(0, 0), (0, 4), (2, 6), (4, 4), (4, 0)], &[(0, 3), (4, 3)]],
            'B' => &[
                &[(0, 0), (0, 6), (3, 6), (4, 5), (4, 4), (3, 3), (0, 3)],
                &[(3, 3), (4, 2), (4, 1), (3, 0), (0, 0)],
            ],
            'C' => &[&[(4, 6), (1, 6), (0, 5), (0, 1), (1, 0), (4, 0)]],
            'D' => &[&[(0, 0), (0, 6), (2, 6), (4, 4), (4, 2), (2, 0), (0, 0)]],
            'E' => &[&[(4, 6), (0, 6), (0, 0), (4, 0)], &[(0, 3), (3, 3)]],
            'F' => &[&[(4, 6), (0, 6), (0, 0)], &[(0, 3), (3, 3)]],
            'G' => &[&[
                (4, 5),
                (3, 6),
                (1, 6),
                (0, 5),
                (0, 1),
                (1, 0),
                (3, 0),
                (4, 1),
                (4, 3),
                (2, 3),
            ]],
            'H' => &[&[(0, 0), (0, 6)], &[(4, 0), (4, 6)], &[(0, 3), (4, 3)]],
            'I' => &[&[(1, 6), (3, 6)], &[(2, 6), (2, 0)], &[(1, 0), (3, 0)]],
            'J' => &[&[(4, 6), (4, 1), (3, 0), (1, 0), (0, 1)]],
            'K' => &[&[(0, 0), (0, 6)], &[(4, 6), (0, 2)], &[(1, 3), (4, 0)]],
            'L' => &[&[(0, 6), (0, 0), (4, 0)]],
            'M' => &[&[(0, 0), (0, 6), (2, 3), (4, 6), (4, 0)]],
            'N' => &[&[(0, 0), (0, 6), (4, 0), (4, 6)]],
            'O' => &[RING],
            'P' => &[&[(0, 0), (0, 6), (3, 6), (4, 5), (4, 4), (3, 3), (0, 3)]],
            'Q' => &[RING, &[(2, 2), (4, 0)]],
            'R' => &[
                &[(0, 0), (0, 6), (3, 6), (4, 5), (4, 4), (3, 3), (0, 3)],
                &[(2, 3), (4, 0)],
            ],
            'S' => &[&[
                (4, 5),
                (3, 6),
                (1, 6),
                (0, 5),
                (0, 4),
                (1, 3),
                (3, 3),
                (4, 2),
                (4, 1),
                (3, 0),
                (1, 0),
                (0, 1),
            ]],
            'T' => &[&[(0, 6), (4, 6)], &[(2, 6), (2, 0)]],
            'U' => &[&[(0, 6), (0, 1), (1, 0), (3, 0), (4, 1), (4, 6)]],
            'V' => &[&[(0, 6), (2, 0), (4, 6)]],
            'W' => &[&[(0, 6), (1, 0), (2, 3), (3, 0), (4, 6)]],
            'X' => &[&[(0, 0), (4, 6)], &[(0, 6), (4, 0)]],
            'Y' => &[&[(0, 6), (2, 3), (4, 6)], &[(2, 3), (2, 0)]],
            'Z' => &[&[(0, 6), (4, 6), (0, 0), (4, 0)]],
            '0' => &[RING, &[(0, 1), (4, 5)]],
            '1' => &[&[(1, 5), (2, 6), (2, 0)], &[(1, 0), (3, 0)]],
            '2' => &[&[(0, 5), (1, 6), (3, 6), (4, 5), (4, 4), (0, 0), (4, 0)]],
            '3' => &[
                &[
                    (0, 5),
                    (1, 6),
                    (3, 6),
                    (4, 5),
                    (4, 4),
                    (3, 3),
                    (4, 2),
                    (4, 1),
                    (3, 0),
                    (1, 0),
                    (0, 1),
                ],
                &[(1, 3), (3, 3)],
            ],
            '4' => &[&[(3, 0), (3, 6), (0, 2), (4, 2)]],
            '5' => &[&[(4, 6), (0, 6), (0, 3), (3, 3), (4, 2), (4, 1), (3, 0), (0, 0)]],
            '6' => &[&[
                (4, 5),
                (3, 6),
                (1, 6),
                (0, 5),
                (0, 1),
                (1, 0),
                (3, 0),
                (4, 1),
                (4, 2),
                (3, 3),
                (0, 3),
            ]],
            '7' => &[&[(0, 6), (4, 6), (1, 0)]],
            '8' => &[&[
                (1, 3),
                (0, 4),
                (0, 5),
                (1, 6),
                (3, 6),
                (4, 5),
                (4, 4),
                (3, 3),
                (1, 3),
                (0, 2),
                (0, 1),
                (1, 0),
                (3, 0),
                (4, 1),
                (4, 2),
                (3, 3),
            ]],
            '9' => &[&[
                (4, 3),
                (1, 3),
                (0, 4),
                (0, 5),
                (1, 6),
                (3, 6),
                (4, 5),
                (4, 1),
                (3, 0),
                (0, 0),
            ]],
            '-' => &[&[(0, 3), (4, 3)]],
            '.' => &[&[(1, 0), (2, 0), (2, 1), (1, 1), (1, 0)]],
            '!' => &[&[(2, 6), (2, 2)], &[(2, 1), (2, 0)]],
            '?' => &[
                &[(0, 5), (1, 6), (3, 6), (4, 5), (4, 4), (2, 3), (2, 2)],
                &[(2, 1), (2, 0)],
            ],
            _ => return None,
        };
        Some(s)
    }

    fn glyph(strokes: Strokes) -> GlyphOutline {
        let loops = strokes
            .iter()
            .map(|stroke| {
                let pts: Vec<Vec2> = stroke
                    .iter()
                    .map(|&(x, y)| Vec2::new(x as f32, y as f32))
                    .collect();
                close_stroke(pts)
            })
            .collect();
        GlyphOutline {
            loops,
            advance: Self::ADVANCE,
        }
    }
}

const RING: &[(u8, u8)] = &[
    (1, 0),
    (0, 1),
    (0, 5),
    (1, 6),
    (3, 6),
    (4, 5),
    (4, 1),
    (3, 0),
    (1, 0),
];

/// Closed polylines drop the repeated end point; open ones are traced back
/// along themselves.
fn close_stroke(mut pts: Vec<Vec2>) -> Vec<Vec2> {
    if pts.len() > 2 && pts.first() == pts.last() {
        pts.pop();
        return pts;
    }
    let back: Vec<Vec2> = pts.iter().rev().skip(1).take(pts.len().saturating_sub(2)).copied().collect();
    pts.extend(back);
    pts
}

impl FontOutlineProvider for StrokeFont {
    fn outline(&self, text: &str) -> Result<Vec<GlyphOutline>> {
        let mut glyphs = Vec::with_capacity(text.len());
        for c in text.chars() {
            if c == ' ' {
                glyphs.push(GlyphOutline {
                    loops: Vec::new(),
                    advance: Self::SPACE_ADVANCE,
                });
                continue;
            }
            match Self::strokes(c) {
                Some(strokes) => glyphs.push(Self::glyph(strokes)),
                None => log::debug!("[font] no glyph for {c:?}, skipping"),
            }
        }
        if glyphs.iter().all(|g| g.loops.is_empty()) {
            return Err(ScopeError::Font(format!("nothing drawable in {text:?}")));
        }
        Ok(glyphs)
    }
}
