// Host-side integration tests for signal generation and trigger alignment.

use scope_core::{
    find_trigger, find_trigger_point, generate, SignalConfig, TriggerEdge, Waveform,
    WindowConfig, WindowExtractor,
};

#[test]
fn generated_length_matches_rate_times_duration() {
    for (sr, dur) in [(44_100.0, 0.5), (48_000.0, 0.021), (8_000.0, 0.0), (22_050.0, 1.0)] {
        let config = SignalConfig {
            sample_rate: sr,
            duration_sec: dur,
            ..SignalConfig::default()
        };
        for w in Waveform::ALL {
            let buf = generate(w, &config).unwrap();
            assert_eq!(buf.len(), (sr * dur).round() as usize, "{w:?} sr={sr} dur={dur}");
        }
    }
}

#[test]
fn every_waveform_respects_offset_and_amplitude() {
    let config = SignalConfig {
        frequency_hz: 313.0,
        amplitude: 0.4,
        phase: 1.1,
        offset_dc: -0.3,
        sample_rate: 44_100.0,
        duration_sec: 0.2,
        seed: 3,
    };
    for w in Waveform::ALL {
        for s in generate(w, &config).unwrap() {
            assert!(s >= -0.7 - 1e-6 && s <= 0.1 + 1e-6, "{w:?} produced {s}");
        }
    }
}

#[test]
fn trigger_point_returns_the_single_crossing() {
    for k in [1usize, 5, 63] {
        let buf: Vec<f32> = (0..64).map(|i| if i < k { -0.5 } else { 0.5 }).collect();
        assert_eq!(find_trigger_point(&buf, 0.0, TriggerEdge::Rising), k);
        let inverted: Vec<f32> = buf.iter().map(|s| -s).collect();
        assert_eq!(find_trigger_point(&inverted, 0.0, TriggerEdge::Falling), k);
    }
}

#[test]
fn trigger_without_crossing_is_unaligned() {
    let flat = vec![-0.2f32; 32];
    assert_eq!(find_trigger_point(&flat, 0.0, TriggerEdge::Rising), 0);
    assert_eq!(find_trigger(&flat, 0.0, TriggerEdge::Rising), None);
}

#[test]
fn trigger_level_is_honoured() {
    let ramp: Vec<f32> = (0..10).map(|i| i as f32 * 0.1).collect();
    assert_eq!(find_trigger(&ramp, 0.45, TriggerEdge::Rising), Some(5));
}

#[test]
fn auto_scale_converges_for_constant_input() {
    let config = SignalConfig {
        frequency_hz: 441.0,
        amplitude: 0.2,
        sample_rate: 44_100.0,
        duration_sec: 2048.0 / 44_100.0,
        ..SignalConfig::default()
    };
    let input = generate(Waveform::Sine, &config).unwrap();
    let peak = input.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    let mut w = WindowExtractor::new(WindowConfig::default(), 2048).unwrap();
    let mut scale = 0.0;
    for tick in 0..300 {
        scale = w.extract(&input, tick as f64 * 33.0).scale;
    }
    let target = 0.8 / peak;
    assert!((scale - target).abs() < 1e-3, "scale {scale} target {target}");
}
