//! Lenient parsing of engine responses.
//!
//! Small models answer the batched-analysis prompt with a compact object,
//! one entry per character:
//!
//! ```text
//! {"Harry": {"D": ["Expecto Patronum!"], "T": ["brave"], "V": "male,teen,british,1.0,1.1"}}
//! ```
//!
//! but wrap it in prose, markdown fences, and inconsistent key casing
//! (`D`/`dialogs`/`dialogue`...). These helpers recover the structured data
//! for [`ExtractionEngine`](super::engine::ExtractionEngine) implementations;
//! the orchestrator itself never parses raw model output.

use serde_json::Value;

use super::error::AnalysisError;
use super::types::ExtractedCharacter;
use super::voice::VoiceProfile;

/// Numeric voice fields outside this range are treated as model noise.
const LEVEL_RANGE: std::ops::RangeInclusive<f32> = 0.5..=1.5;

/// Locate the JSON block inside a raw model response: fenced ```json blocks
/// first, then any fenced block that looks like JSON, then the outermost
/// brace pair.
pub fn extract_json_block(response: &str) -> Result<&str, AnalysisError> {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return Ok(after_fence[..end].trim());
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            if block.starts_with('{') || block.starts_with('[') {
                return Ok(block);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return Ok(&trimmed[start..=end]);
        }
    }

    Err(AnalysisError::JsonParsing(
        "No JSON block found in engine response".to_string(),
    ))
}

/// Parse a batched-analysis response into extracted characters, in the
/// order the model listed them.
///
/// Per-character entries that are not objects are skipped; unknown keys are
/// ignored; dialog/trait lists keep only string elements. A response whose
/// JSON is an empty object yields an empty list, not an error.
pub fn parse_batched_response(response: &str) -> Result<Vec<ExtractedCharacter>, AnalysisError> {
    let json_str = extract_json_block(response)?;
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| AnalysisError::JsonParsing(e.to_string()))?;

    let Value::Object(entries) = value else {
        return Err(AnalysisError::JsonParsing(
            "Expected a top-level object of characters".to_string(),
        ));
    };

    let mut characters = Vec::new();
    for (name, char_data) in entries {
        let Value::Object(fields) = char_data else {
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }

        let mut character = ExtractedCharacter {
            name,
            ..ExtractedCharacter::default()
        };

        for (key, value) in fields {
            match key.to_lowercase().as_str() {
                "d" | "dialogs" | "dialogue" | "dialogues" => {
                    character.dialogs = string_list(&value);
                }
                "t" | "traits" | "trait" => {
                    character.traits = string_list(&value);
                }
                "v" | "voice" | "voice_profile" => {
                    character.voice_profile = match value {
                        Value::String(s) if !s.trim().is_empty() => Some(parse_voice_string(&s)),
                        Value::Object(_) => serde_json::from_value(value).ok(),
                        _ => None,
                    };
                }
                _ => {}
            }
        }

        characters.push(character);
    }

    Ok(characters)
}

/// Parse the compact voice format `"Gender,Age,Accent,Pitch,Speed[,Energy]"`
/// (e.g. `"male,young,neutral,1.0,1.2"`).
///
/// Missing trailing fields and unparseable or out-of-range numeric fields
/// stay at their defaults — a mangled voice string still yields a usable
/// profile.
pub fn parse_voice_string(voice: &str) -> VoiceProfile {
    let mut profile = VoiceProfile::default();
    let mut parts = voice.split(',').map(str::trim);

    if let Some(gender) = parts.next() {
        profile.gender = gender.to_lowercase();
    }
    if let Some(age) = parts.next() {
        profile.age = age.to_lowercase();
    }
    if let Some(accent) = parts.next() {
        profile.accent = accent.to_lowercase();
    }
    if let Some(pitch) = parts.next() {
        profile.pitch = parse_level(pitch, profile.pitch);
    }
    if let Some(speed) = parts.next() {
        profile.speed = parse_level(speed, profile.speed);
    }
    if let Some(energy) = parts.next() {
        profile.energy = parse_level(energy, profile.energy);
    }

    profile
}

fn parse_level(raw: &str, fallback: f32) -> f32 {
    raw.parse::<f32>()
        .ok()
        .filter(|v| LEVEL_RANGE.contains(v))
        .unwrap_or(fallback)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::to_string)
            .collect(),
        // A lone string instead of a one-element list is common.
        Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
