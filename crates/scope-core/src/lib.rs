//! Audio-reactive oscilloscope core.
//!
//! Pure logic only: signal generation, windowing, feature extraction, shape
//! generators, projection, phosphor trails and the auto-pilot. Platform
//! front-ends supply an [`AnalyserSource`] and consume [`RenderFrame`]s.

pub mod channel;
pub mod constants;
pub mod decision;
pub mod error;
pub mod features;
pub mod font;
pub mod layout;
pub mod profile;
pub mod scope;
pub mod session;
pub mod shapes;
pub mod signal;
pub mod source;
pub mod trail;
pub mod window;

pub use channel::ChannelPair;
pub use decision::{DecisionEngine, ModeDecision, Physics};
pub use error::{Result, ScopeError};
pub use features::{AudioFeatures, BeatDetector, FeatureConfig, FeatureExtractor};
pub use font::{FontOutlineProvider, GlyphOutline, StrokeFont};
pub use layout::{LayoutMode, Projection};
pub use profile::{profile_or_default, BrainProfile, JsonProfileClassifier, ProfileClassifier};
pub use scope::{DisplayMode, RenderFrame, RenderModifiers, Scope, ScopeConfig, VisualMode};
pub use session::{open_or_fallback, CaptureSession, PlaybackBackend, SourceKind, TransportState};
pub use shapes::{Attractor, GeneratorState, ShapeContext, ShapeKind, ShapeParams};
pub use signal::{find_trigger, find_trigger_point, generate, SignalConfig, TriggerEdge, Waveform};
pub use source::{AnalyserSource, SoftwareAnalyser, SyntheticSource};
pub use trail::{TrailBuffer, TrailConfig, TrailPoint};
pub use window::{WindowConfig, WindowExtractor, WindowFrame};
