// Host-side integration tests for the shape generators and the shared
// layout/projection step, including the cube, text and chaos scenarios.

use glam::{Vec2, Vec3};
use scope_core::layout::{clamp_unit, LayoutMode, Projection};
use scope_core::shapes::{self, cube, Attractor, GeneratorState, ShapeContext, ShapeKind, ShapeParams};
use scope_core::{ChannelPair, StrokeFont};

fn generate(params: &ShapeParams, ticks: usize) -> ChannelPair {
    let ctx = ShapeContext { font: &StrokeFont };
    let mut state = GeneratorState::new(params.kind.clone(), params.seed);
    let mut pair = shapes::tick(&mut state, 1.0 / 60.0, params, &ctx);
    for _ in 1..ticks {
        pair = shapes::tick(&mut state, 1.0 / 60.0, params, &ctx);
    }
    pair
}

#[test]
fn grid_layout_partitions_points_and_fills_remainder() {
    for (rows, cols, points) in [(2, 3, 2000), (3, 3, 1000), (1, 4, 999), (4, 5, 4001)] {
        let params = ShapeParams {
            kind: ShapeKind::Brain,
            points_count: points,
            layout: LayoutMode::Grid { rows, cols },
            ..ShapeParams::default()
        };
        let pair = generate(&params, 3);
        let passes = rows * cols;
        let written = (points / passes) * passes;
        assert_eq!(pair.len(), points);
        assert!(pair.points().all(|p| p.is_finite()));
        for i in written..points {
            assert_eq!(pair.point(i), pair.point(written - 1), "{rows}x{cols} index {i}");
        }
    }
}

#[test]
fn clamping_holds_for_adversarial_scales() {
    for kind in [
        ShapeKind::Cube,
        ShapeKind::Planet,
        ShapeKind::Chaos(Attractor::Rossler),
        ShapeKind::Brain,
        ShapeKind::Eye,
        ShapeKind::Text("WAVE".into()),
    ] {
        let params = ShapeParams {
            kind: kind.clone(),
            target_scale: Some(1.0e6),
            ..ShapeParams::default()
        };
        let pair = generate(&params, 2);
        for p in pair.points() {
            assert!(p.x.abs() <= 1.0 && p.y.abs() <= 1.0, "{kind:?} {p}");
        }
    }
    let huge = Projection::Perspective { distance: 3.0 }.project(Vec3::splat(1.0e30), 1.0e30);
    let clipped = clamp_unit(huge);
    assert!(clipped.x.abs() <= 1.0 && clipped.y.abs() <= 1.0);
}

#[test]
fn cube_scenario_is_a_closed_stroke_over_every_edge() {
    let params = ShapeParams {
        kind: ShapeKind::Cube,
        points_count: 2000,
        clone_count: 1,
        layout: LayoutMode::Polygon,
        rotation_speed: Vec3::ZERO,
        ..ShapeParams::default()
    };
    let pair = generate(&params, 1);
    assert_eq!(pair.len(), 2000);
    assert!(pair.points().all(|p| p.is_finite() && p.x.abs() <= 1.0 && p.y.abs() <= 1.0));
    assert!((pair.point(0) - pair.point(1999)).length() < 1e-4);

    let mut raw = Vec::new();
    cube::points(2000, &mut raw);
    assert!(raw.iter().all(|p| p.abs().max_element() <= 1.5));
    // every cube edge midpoint lies on (or next to) the stroke
    for a in 0..8 {
        for b in (a + 1)..8 {
            let d = cube::VERTICES[a] - cube::VERTICES[b];
            if d.abs().cmpeq(Vec3::ZERO).bitmask().count_ones() != 2 {
                continue;
            }
            let mid = (cube::VERTICES[a] + cube::VERTICES[b]) * 0.5;
            let nearest = raw.iter().map(|p| p.distance(mid)).fold(f32::MAX, f32::min);
            assert!(nearest < 0.02, "edge {a}-{b} missed by {nearest}");
        }
    }
}

#[test]
fn text_scenario_visits_both_glyphs_without_jumps() {
    let params = ShapeParams {
        kind: ShapeKind::Text("AI".into()),
        points_count: 4000,
        ..ShapeParams::default()
    };
    let pair = generate(&params, 1);
    assert_eq!(pair.len(), 4000);
    let left = pair.points().filter(|p| p.x < -0.2).count();
    let right = pair.points().filter(|p| p.x > 0.2).count();
    assert!(left > 500 && right > 500, "left {left} right {right}");
    let max_jump = pair
        .points()
        .zip(pair.points().skip(1))
        .map(|(a, b)| a.distance(b))
        .fold(0.0f32, f32::max);
    assert!(max_jump < 0.05, "max jump {max_jump}");
}

#[test]
fn chaos_scenario_diverges_but_stays_bounded() {
    let lorenz = Attractor::Lorenz;
    let start = lorenz.initial_condition();
    let a = lorenz.trajectory(start, 10_000, 0.01);
    let b = lorenz.trajectory(start + Vec3::new(0.01, 0.0, 0.0), 10_000, 0.01);
    let initial = a[0].distance(b[0]);
    let late_max = a[5_000..]
        .iter()
        .zip(&b[5_000..])
        .map(|(p, q)| p.distance(*q))
        .fold(0.0f32, f32::max);
    assert!(late_max > 100.0 * initial, "separation only grew to {late_max}");
    for p in a.iter().chain(&b) {
        assert!(p.x.abs() < 30.0 && p.y.abs() < 40.0 && p.z > -1.0 && p.z < 60.0, "{p}");
    }
}

#[test]
fn clones_diverge_visibly_in_chaos_mode() {
    let params = ShapeParams {
        kind: ShapeKind::Chaos(Attractor::Lorenz),
        points_count: 3000,
        clone_count: 3,
        rotation_speed: Vec3::ZERO,
        ..ShapeParams::default()
    };
    let pair = generate(&params, 30);
    let first: Vec<Vec2> = pair.points().take(1000).collect();
    let second: Vec<Vec2> = pair.points().skip(1000).take(1000).collect();
    let centre = |pts: &[Vec2]| pts.iter().copied().sum::<Vec2>() / pts.len() as f32;
    // each clone sits on its own circle position
    assert!(centre(&first).distance(centre(&second)) > 0.1);
}

#[test]
fn formation_animates_when_clone_count_changes() {
    let ctx = ShapeContext { font: &StrokeFont };
    let mut params = ShapeParams {
        kind: ShapeKind::Planet,
        points_count: 1200,
        clone_count: 1,
        ..ShapeParams::default()
    };
    let mut state = GeneratorState::new(params.kind.clone(), 1);
    shapes::tick(&mut state, 0.016, &params, &ctx);
    params.clone_count = 3;
    shapes::tick(&mut state, 0.016, &params, &ctx);
    let targets = LayoutMode::Polygon.target_offsets(3);
    let offsets = state.layout().offsets();
    assert_eq!(offsets.len(), 3);
    // one tick in, instances are still far from their targets
    assert!(offsets[1].distance(targets[1]) > 0.4);
}
