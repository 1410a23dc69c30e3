// Host-side integration tests for feature extraction, beat detection and
// phosphor trails.

use glam::Vec2;
use scope_core::constants::{BEAT_HISTORY_LEN, BEAT_THRESHOLD, TRAIL_CAPACITY};
use scope_core::features::BeatConfig;
use scope_core::{
    AnalyserSource, BeatDetector, ChannelPair, FeatureConfig, FeatureExtractor, SoftwareAnalyser,
    TrailBuffer, TrailConfig,
};

#[test]
fn beat_fires_after_steady_history() {
    for m in [0.05f32, 0.2, 0.5] {
        let mut det = BeatDetector::new(BeatConfig::default());
        for i in 0..BEAT_HISTORY_LEN {
            assert!(!det.push(m, i as f64 * 23.0).fired);
        }
        let rec = det.push(1.5 * BEAT_THRESHOLD * m, 5_000.0);
        assert!(rec.fired, "M={m}");
        assert!(rec.confidence > 0.0 && rec.confidence <= 1.0, "M={m}");
    }
}

#[test]
fn bass_tone_lands_in_low_band() {
    let sr = 44_100.0;
    let mut analyser = SoftwareAnalyser::new(sr, 2048).unwrap();
    analyser.smoothing = 0.0;
    let tone: Vec<f32> = (0..2048)
        .map(|i| 0.8 * (std::f32::consts::TAU * 86.0 * i as f32 / sr).sin())
        .collect();
    analyser.push_samples(&tone);

    let mut fx = FeatureExtractor::new(FeatureConfig::default()).unwrap();
    let f = fx.poll(0.0, &mut analyser).cloned().unwrap();
    assert_eq!(f.spectrum.len(), 1024);
    assert!(f.low.instant > f.mid.instant, "low {} mid {}", f.low.instant, f.mid.instant);
    assert!(f.low.instant > f.high.instant);
    assert!(f.rms > 0.9, "rms {}", f.rms);
    assert!(f.spectrum.iter().all(|v| v.is_finite() && *v >= 0.0));
}

#[test]
fn feature_poll_is_rate_limited() {
    let mut analyser = SoftwareAnalyser::new(44_100.0, 2048).unwrap();
    let mut fx = FeatureExtractor::new(FeatureConfig::default()).unwrap();
    assert!(fx.poll(0.0, &mut analyser).is_some());
    assert!(fx.poll(20.0, &mut analyser).is_none());
    assert!(fx.poll(34.0, &mut analyser).is_some());
    assert_eq!(analyser.fft_size(), 2048);
}

#[test]
fn trail_length_tracks_speed_within_capacity() {
    let mut trail = TrailBuffer::new(TrailConfig::default()).unwrap();
    let pts: Vec<Vec2> = (0..4096)
        .map(|i| {
            let t = i as f32 / 4096.0 * std::f32::consts::TAU;
            Vec2::new(t.cos() * 0.8, (3.0 * t).sin() * 0.8)
        })
        .collect();
    let pair = ChannelPair::from_points(&pts);
    for speed in [100.0f32, 2_500.0, 12_000.0, 1.0e7] {
        trail.advance(&pair, speed, 1.0 / 60.0);
        assert!(trail.active_len() <= TRAIL_CAPACITY);
        assert_eq!(trail.active_len(), trail.active_len_for(speed));
        let range = trail.draw_range();
        for w in range.windows(2) {
            assert!(w[1].brightness <= w[0].brightness, "speed {speed}");
        }
    }
}

#[test]
fn slow_beam_is_brighter_than_fast_beam() {
    let dense: Vec<Vec2> = (0..4096).map(|i| Vec2::new(i as f32 * 1e-4, 0.0)).collect();
    let sparse: Vec<Vec2> = (0..4096).map(|i| Vec2::new((i % 2) as f32 * 0.5, 0.0)).collect();
    let mut a = TrailBuffer::new(TrailConfig::default()).unwrap();
    let mut b = TrailBuffer::new(TrailConfig::default()).unwrap();
    a.advance(&ChannelPair::from_points(&dense), 4000.0, 0.1);
    b.advance(&ChannelPair::from_points(&sparse), 4000.0, 0.1);
    let mid = a.active_len() / 2;
    assert!(a.draw_range()[mid].brightness > b.draw_range()[mid].brightness);
}
