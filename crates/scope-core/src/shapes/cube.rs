use glam::Vec3;

pub const VERTICES: [Vec3; 8] = [
    Vec3::new(-1.0, -1.0, -1.0),
    Vec3::new(1.0, -1.0, -1.0),
    Vec3::new(1.0, 1.0, -1.0),
    Vec3::new(-1.0, 1.0, -1.0),
    Vec3::new(-1.0, -1.0, 1.0),
    Vec3::new(1.0, -1.0, 1.0),
    Vec3::new(1.0, 1.0, 1.0),
    Vec3::new(-1.0, 1.0, 1.0),
];

/// One continuous stroke over all 12 edges (four are retraced), starting and
/// ending at vertex 0.
pub const PATH: [usize; 17] = [0, 1, 2, 3, 0, 4, 5, 1, 5, 6, 2, 6, 7, 3, 7, 4, 0];

/// `count` points spread evenly over the 16 path segments, first and last
/// point both on vertex 0.
pub fn points(count: usize, out: &mut Vec<Vec3>) {
    let segments = (PATH.len() - 1) as f32;
    let denom = count.saturating_sub(1).max(1) as f32;
    out.extend((0..count).map(|k| {
        let u = k as f32 / denom * segments;
        let seg = (u.floor() as usize).min(PATH.len() - 2);
        let t = u - seg as f32;
        VERTICES[PATH[seg]].lerp(VERTICES[PATH[seg + 1]], t)
    }));
}
