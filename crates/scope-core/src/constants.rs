// Shared tuning constants for the signal-to-geometry pipeline.
//
// Values here are calibration choices (time constants, clamp limits, rule
// table entries) and are kept out of the code paths that use them.

// Analyser
pub const DEFAULT_SAMPLE_RATE: f32 = 44_100.0;
pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const MIN_FFT_SIZE: usize = 256;
pub const MAX_FFT_SIZE: usize = 16_384;
pub const ANALYSER_SMOOTHING: f32 = 0.8; // matches WebAudio smoothingTimeConstant
pub const ANALYSER_MIN_DB: f32 = -100.0;

// Spectrum normalisation: (dB + OFFSET) / SPAN, floored at 0
pub const DB_NORMALIZE_OFFSET: f32 = 100.0;
pub const DB_NORMALIZE_SPAN: f32 = 100.0;

// Analysis cadence (milliseconds between ticks)
pub const ANALYSIS_INTERVAL_MS: f64 = 33.0; // ~30 Hz
pub const RENDER_INTERVAL_MS: f64 = 1000.0 / 60.0;

// Loudness and bands
pub const RMS_GAIN: f32 = 2.0;
pub const LOW_BAND_HZ: (f32, f32) = (20.0, 160.0);
pub const MID_BAND_HZ: (f32, f32) = (160.0, 2000.0);
pub const HIGH_BAND_HZ: (f32, f32) = (2000.0, 12_000.0);
pub const BAND_SMOOTHING_ALPHA: f32 = 0.15;

// Beat detection
pub const BEAT_HISTORY_LEN: usize = 43; // ~1 s of RMS at ~43 Hz
pub const BEAT_THRESHOLD: f32 = 1.4;
pub const BEAT_COOLDOWN_MS: f64 = 120.0;
pub const BEAT_MIN_MEAN: f32 = 1e-4; // silence never produces beats

// Window extraction
pub const DEFAULT_WINDOW_SIZE: usize = 1024;
pub const AUTO_SCALE_TARGET_PEAK: f32 = 0.8;
pub const AUTO_SCALE_ALPHA: f32 = 0.18;
pub const AUTO_SCALE_MIN_PEAK: f32 = 1e-6;
pub const XY_DELAY_SAMPLES: usize = 32; // phase delay for mono Lissajous

// Layout and projection
pub const OFFSET_LERP: f32 = 0.05; // per tick
pub const SCALE_LERP: f32 = 0.05; // per tick
pub const CIRCLE_LAYOUT_RADIUS: f32 = 0.5;
pub const GRID_LAYOUT_SPAN: f32 = 1.8; // total width/height covered by grid centres
pub const GRID_CELL_FILL: f32 = 0.9; // fraction of a cell the content may occupy
pub const POLYGON_CLONE_SCALE: f32 = 0.45; // scale factor once clones share the circle
pub const MIN_SCALE: f32 = 1e-3;
pub const MIN_PROJECTION_DEPTH: f32 = 0.05; // keeps z + dist away from zero

// Shape generation
pub const DEFAULT_POINTS_COUNT: usize = 2000;
pub const PLANET_TURNS: f32 = 12.0;
pub const CHAOS_DT: f32 = 0.01;
pub const CHAOS_WARMUP_STEPS: usize = 1000;
pub const CHAOS_ADVANCE_STEPS_PER_SEC: f32 = 120.0;
pub const CHAOS_INSTANCE_PERTURBATION: f32 = 0.01;
pub const BRAIN_HEMISPHERE_GAP: f32 = 0.08;
pub const BRAIN_UNDERSIDE_FLATTEN: f32 = 0.6;
pub const BRAIN_ELONGATION: f32 = 1.3;
pub const BRAIN_WRINKLE_AMPLITUDE: f32 = 0.15;
pub const BRAIN_WRINKLE_FREQUENCY: f32 = 8.0;
pub const EYE_SCLERA_FRACTION: f32 = 0.6;
pub const EYE_PUPIL_COUNT: usize = 3;
pub const EYE_PUPIL_RADIUS: f32 = 0.18;
pub const EYE_PUPIL_LIFT: f32 = 1.05; // pupils sit slightly outside the sclera
pub const EYE_CONE_HALF_ANGLE: f32 = 0.6; // radians
pub const EYE_WANDER_RATE: f64 = 0.35; // noise-space units per second

// Trail / phosphor persistence
pub const TRAIL_CAPACITY: usize = 8192;
pub const PERSISTENCE_SEC: f32 = 0.15;
pub const BRIGHTNESS_K: f32 = 0.02; // inter-sample distance giving full brightness
pub const BRIGHTNESS_EPSILON: f32 = 1e-4;
pub const TRAIL_HEAD_FLOOR: usize = 8; // newest entries ignore velocity dimming

// Decision engine
pub const DROP_CONFIDENCE: f32 = 0.8;
pub const DROP_RMS: f32 = 0.5;
pub const FALLBACK_SWITCH_FACTOR: f64 = 1.5;
pub const GLITCH_DURATION_MS: f64 = 400.0;
pub const GRID_COMPLEXITY_THRESHOLD: f32 = 0.6;
pub const GRID_ROWS: usize = 2;
pub const GRID_COLS: usize = 3;
pub const PHYSICS_RATE_PER_SEC: f32 = 4.0;
pub const STABILITY_RECOVERY_BOOST: f32 = 3.0;
pub const HIGH_COMPLEXITY_GLITCH: f32 = 0.9;
pub const HIGH_COMPLEXITY_GLITCH_PROB: f32 = 0.02; // per fast tick

// Colors
pub const PHOSPHOR_GREEN: [f32; 3] = [0.2, 1.0, 0.3];
pub const CYAN: [f32; 3] = [0.2, 0.9, 1.0];
pub const MAGENTA: [f32; 3] = [1.0, 0.2, 0.9];
pub const RED: [f32; 3] = [1.0, 0.2, 0.1];
pub const ORANGE: [f32; 3] = [1.0, 0.55, 0.1];
pub const RED_SHIFT_RMS_GATE: f32 = 0.4;

// Render modifiers (base + span * feature)
pub const LINE_WIDTH_BASE: f32 = 1.5;
pub const LINE_WIDTH_SPAN: f32 = 2.5;
pub const BLOOM_BASE: f32 = 0.6;
pub const BLOOM_SPAN: f32 = 0.9;
