//! Voice profiles and their reconciliation across batches.
//!
//! The engine reports voice attributes opportunistically — one batch may
//! know a character's gender, a later one their accent. Merging keeps the
//! most detailed value per field and never discards an established
//! non-default value for a default one.

use serde::{Deserialize, Serialize};

/// Neutral value for the numeric voice attributes.
const DEFAULT_LEVEL: f32 = 1.0;

/// Voice attributes for one character, used downstream for narration
/// synthesis. Fields at their defaults mean "not yet known".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// e.g. "male", "female", "neutral".
    #[serde(default)]
    pub gender: String,
    /// e.g. "kid", "teen", "young", "adult", "middle-aged", "elderly".
    #[serde(default)]
    pub age: String,
    /// Free-form description or "neutral".
    #[serde(default)]
    pub accent: String,
    #[serde(default = "default_level")]
    pub pitch: f32,
    #[serde(default = "default_level")]
    pub speed: f32,
    #[serde(default = "default_level")]
    pub energy: f32,
}

fn default_level() -> f32 {
    DEFAULT_LEVEL
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            gender: String::new(),
            age: String::new(),
            accent: String::new(),
            pitch: DEFAULT_LEVEL,
            speed: DEFAULT_LEVEL,
            energy: DEFAULT_LEVEL,
        }
    }
}

impl VoiceProfile {
    /// True when every field is still at its default.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Strategy contract for reconciling two partial voice records.
pub trait VoiceMerger: Send + Sync {
    fn merge(
        &self,
        existing: Option<&VoiceProfile>,
        incoming: Option<&VoiceProfile>,
    ) -> Option<VoiceProfile>;
}

/// Field-by-field "more detail wins" merger: the existing value is kept
/// unless it is default and the incoming value is not. Existing wins ties,
/// so call order matters only between equally-detailed sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferDetailedVoiceMerger;

impl VoiceMerger for PreferDetailedVoiceMerger {
    fn merge(
        &self,
        existing: Option<&VoiceProfile>,
        incoming: Option<&VoiceProfile>,
    ) -> Option<VoiceProfile> {
        match (existing, incoming) {
            (None, None) => None,
            (Some(e), None) => Some(e.clone()),
            (None, Some(i)) => Some(i.clone()),
            (Some(e), Some(i)) => Some(VoiceProfile {
                gender: pick_string(&e.gender, &i.gender),
                age: pick_string(&e.age, &i.age),
                accent: pick_string(&e.accent, &i.accent),
                pitch: pick_level(e.pitch, i.pitch),
                speed: pick_level(e.speed, i.speed),
                energy: pick_level(e.energy, i.energy),
            }),
        }
    }
}

fn pick_string(existing: &str, incoming: &str) -> String {
    if existing.trim().is_empty() && !incoming.trim().is_empty() {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}

fn pick_level(existing: f32, incoming: f32) -> f32 {
    if existing == DEFAULT_LEVEL && incoming != DEFAULT_LEVEL {
        incoming
    } else {
        existing
    }
}
