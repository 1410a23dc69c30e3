//! Track profile consumed by the decision engine.
//!
//! Profiles come from an external classifier as JSON. Parsing is lenient:
//! missing fields take neutral defaults and unknown enum strings map to a
//! neutral variant. Invalid JSON, or a field of the wrong JSON type, is an
//! error the caller turns into the default profile.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScopeError};
use crate::shapes::Attractor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Neutral,
    Calm,
    Energetic,
    Dark,
    Organic,
    Retro,
    Digital,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Frenetic,
    Fast,
    #[default]
    Medium,
    Slow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBias {
    RedShift,
    BlueCool,
    NeonMix,
    #[default]
    GreenDefault,
}

/// Visual mode names a profile may ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    #[serde(alias = "default")]
    Waveform,
    Cube,
    Text,
    Planet,
    Chaos,
    Brain,
    Eye,
}

impl ModeName {
    pub const DEFAULT_POOL: [ModeName; 5] = [
        ModeName::Cube,
        ModeName::Planet,
        ModeName::Chaos,
        ModeName::Brain,
        ModeName::Eye,
    ];
}

fn parse_lenient<T: for<'de> Deserialize<'de> + Default>(s: Option<&str>) -> T {
    s.and_then(|s| {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        serde_json::from_value(serde_json::Value::String(normalized)).ok()
    })
    .unwrap_or_default()
}

#[derive(Clone, Debug, PartialEq)]
pub struct BrainProfile {
    pub mood: Mood,
    /// 0..1
    pub complexity_preference: f32,
    pub pace: Pace,
    pub color_bias: ColorBias,
    /// Never empty.
    pub preferred_modes: Vec<ModeName>,
    pub suggested_words: Vec<String>,
    pub suggested_attractors: Vec<Attractor>,
    pub description: String,
}

impl Default for BrainProfile {
    fn default() -> Self {
        Self {
            mood: Mood::Neutral,
            complexity_preference: 0.5,
            pace: Pace::Medium,
            color_bias: ColorBias::GreenDefault,
            preferred_modes: ModeName::DEFAULT_POOL.to_vec(),
            suggested_words: vec!["SCOPE".into(), "SIGNAL".into(), "WAVE".into()],
            suggested_attractors: Attractor::ALL.to_vec(),
            description: "default profile".into(),
        }
    }
}

/// Wire shape as sent by the classifier. Enum-like fields stay strings here
/// so one unknown value only resets that field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProfile {
    mood: Option<String>,
    complexity_preference: Option<f64>,
    pace: Option<String>,
    color_bias: Option<String>,
    preferred_modes: Vec<String>,
    suggested_words: Vec<String>,
    suggested_attractors: Vec<String>,
    description: Option<String>,
}

impl From<RawProfile> for BrainProfile {
    fn from(raw: RawProfile) -> Self {
        let defaults = BrainProfile::default();
        let complexity = raw
            .complexity_preference
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0) as f32)
            .unwrap_or(defaults.complexity_preference);
        let modes: Vec<ModeName> = raw
            .preferred_modes
            .iter()
            .filter_map(|m| parse_lenient::<Option<ModeName>>(Some(m)))
            .collect();
        let attractors: Vec<Attractor> = raw
            .suggested_attractors
            .iter()
            .filter_map(|a| Attractor::from_name(a))
            .collect();
        let words: Vec<String> = raw
            .suggested_words
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        Self {
            mood: parse_lenient(raw.mood.as_deref()),
            complexity_preference: complexity,
            pace: parse_lenient(raw.pace.as_deref()),
            color_bias: parse_lenient(raw.color_bias.as_deref()),
            preferred_modes: if modes.is_empty() {
                defaults.preferred_modes
            } else {
                modes
            },
            suggested_words: if words.is_empty() {
                defaults.suggested_words
            } else {
                words
            },
            suggested_attractors: if attractors.is_empty() {
                defaults.suggested_attractors
            } else {
                attractors
            },
            description: raw.description.unwrap_or_default(),
        }
    }
}

impl BrainProfile {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawProfile = serde_json::from_str(json)?;
        Ok(raw.into())
    }
}

/// Turns a track (and a free-text prompt) into a profile.
pub trait ProfileClassifier {
    fn classify(&self, audio: &[u8], prompt: &str) -> Result<BrainProfile>;
}

/// Classifier backed by an already fetched JSON response body.
#[derive(Clone, Debug)]
pub struct JsonProfileClassifier {
    body: String,
}

impl JsonProfileClassifier {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

impl ProfileClassifier for JsonProfileClassifier {
    fn classify(&self, _audio: &[u8], _prompt: &str) -> Result<BrainProfile> {
        if self.body.trim().is_empty() {
            return Err(ScopeError::Profile("empty classifier response".into()));
        }
        BrainProfile::from_json(&self.body)
    }
}

/// Classify, substituting the default profile on any failure.
pub fn profile_or_default(
    classifier: &dyn ProfileClassifier,
    audio: &[u8],
    prompt: &str,
) -> BrainProfile {
    match classifier.classify(audio, prompt) {
        Ok(profile) => {
            log::info!(
                "[profile] mood={:?} pace={:?} color={:?} modes={}",
                profile.mood,
                profile.pace,
                profile.color_bias,
                profile.preferred_modes.len()
            );
            profile
        }
        Err(e) => {
            log::warn!("[profile] classification failed ({e}), using default profile");
            BrainProfile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_profile() {
        let json = r#"{
            "mood": "Organic",
            "complexity_preference": 0.8,
            "pace": "frenetic",
            "color_bias": "neon_mix",
            "preferred_modes": ["chaos", "text", "warp-drive"],
            "suggested_words": ["LOVE", " "],
            "suggested_attractors": ["aizawa"],
            "description": "lush"
        }"#;
        let p = BrainProfile::from_json(json).unwrap();
        assert_eq!(p.mood, Mood::Organic);
        assert_eq!(p.pace, Pace::Frenetic);
        assert_eq!(p.color_bias, ColorBias::NeonMix);
        assert_eq!(p.preferred_modes, vec![ModeName::Chaos, ModeName::Text]);
        assert_eq!(p.suggested_words, vec!["LOVE".to_string()]);
        assert_eq!(p.suggested_attractors, vec![Attractor::Aizawa]);
        assert!((p.complexity_preference - 0.8).abs() < 1e-6);
    }

    #[test]
    fn unknown_values_fall_back_per_field() {
        let p = BrainProfile::from_json(r#"{"mood":"sparkly","pace":"glacial","complexity_preference":7}"#)
            .unwrap();
        assert_eq!(p.mood, Mood::Neutral);
        assert_eq!(p.pace, Pace::Medium);
        assert_eq!(p.complexity_preference, 1.0);
        assert_eq!(p.preferred_modes, ModeName::DEFAULT_POOL.to_vec());
    }

    #[test]
    fn spaced_names_are_normalised() {
        let p = BrainProfile::from_json(r#"{"color_bias":"Blue Cool"}"#).unwrap();
        assert_eq!(p.color_bias, ColorBias::BlueCool);
    }

    #[test]
    fn malformed_json_uses_default_profile() {
        let classifier = JsonProfileClassifier::new("{not json");
        assert!(classifier.classify(&[], "").is_err());
        assert_eq!(profile_or_default(&classifier, &[], ""), BrainProfile::default());
        let empty = JsonProfileClassifier::new("  ");
        assert_eq!(profile_or_default(&empty, &[], ""), BrainProfile::default());
    }
}
