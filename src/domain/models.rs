//! Domain models for property notes and AI extraction.
//!
//! These mirror the JSON shapes exchanged with the notes backend and the
//! extraction service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One property listing as stored by the notes repository.
///
/// Only `id` is guaranteed; structured fields stay `None` until an
/// extraction has been persisted for the note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyNote {
    /// Repository-assigned identifier.
    pub id: i64,
    /// Unstructured source text.
    #[serde(default)]
    pub raw_text: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub access_instructions: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub parking_info: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub amenities: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub confidence_tip: Option<String>,
    /// Extraction confidence on a 0-10 scale.
    #[serde(default, deserialize_with = "lenient::score")]
    pub confidence_score: Option<u8>,
}

impl PropertyNote {
    /// Create a note that has not been through extraction yet.
    #[cfg(test)]
    #[must_use]
    pub fn unextracted(id: i64, raw_text: impl Into<String>) -> Self {
        Self {
            id,
            raw_text: raw_text.into(),
            postcode: None,
            city: None,
            access_instructions: None,
            parking_info: None,
            amenities: None,
            confidence_tip: None,
            confidence_score: None,
        }
    }

    /// Whether any structured field has been filled in.
    #[must_use]
    pub const fn is_extracted(&self) -> bool {
        self.postcode.is_some()
            || self.city.is_some()
            || self.access_instructions.is_some()
            || self.parking_info.is_some()
            || self.amenities.is_some()
            || self.confidence_score.is_some()
    }
}

/// Structured fields returned by the extraction service for one input text.
///
/// Carries no `id`: results are matched to notes by position. Fields the
/// service adds beyond the known set are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    #[serde(default, deserialize_with = "lenient::text")]
    pub postcode: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub access_instructions: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub parking_info: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub amenities: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub confidence_tip: Option<String>,
    #[serde(default, deserialize_with = "lenient::score")]
    pub confidence_score: Option<u8>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Decoders for model-filled fields, which may arrive off-typed.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Text given as a string, a scalar or a list. Lists are joined with
    /// `", "`; objects are kept as JSON.
    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_from_value))
    }

    fn text_from_value(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Array(items) => {
                let parts: Vec<String> = items.into_iter().filter_map(text_from_value).collect();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            other => Some(other.to_string()),
        }
    }

    /// Score given as a number or a numeric string. Only whole values in
    /// `u8` range are kept; anything else reads as no score.
    pub fn score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u8>, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?
            .as_ref()
            .and_then(score_from_value))
    }

    fn score_from_value(value: &Value) -> Option<u8> {
        let whole = match value {
            Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_number)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<u64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(whole_number))
            }
            _ => None,
        };
        whole.and_then(|v| u8::try_from(v).ok())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn whole_number(f: f64) -> Option<u64> {
        (f.is_finite() && f >= 0.0 && f <= f64::from(u8::MAX) && f.fract() == 0.0)
            .then_some(f as u64)
    }
}

/// AI provider behind the extraction service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    #[default]
    OpenAi,
}

/// Model names the extraction service accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelName {
    #[default]
    #[serde(rename = "gpt-4o-mini")]
    Gpt4oMini,
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpt4oMini => write!(f, "gpt-4o-mini"),
        }
    }
}

impl std::str::FromStr for ModelName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt-4o-mini" => Ok(Self::Gpt4oMini),
            _ => Err(format!("Unsupported model: {s}. Use: gpt-4o-mini")),
        }
    }
}

/// Model selector sent as `aiModel` on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiModel {
    #[serde(rename = "type")]
    pub provider: AiProvider,
    pub model: ModelName,
}

/// Per-run knobs shared by both workflow paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Free-form markdown or plain rules appended to the extraction prompt.
    pub custom_rules: String,
    pub ai_model: AiModel,
}

impl ExtractionOptions {
    #[must_use]
    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.custom_rules = rules.into();
        self
    }
}

/// Bucket a confidence score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLevel {
    Positive,
    Warning,
    Error,
}

impl ConfidenceLevel {
    /// 10 is positive, 8 needs attention, anything under 8 is urgent.
    /// A 9, or anything above 10, falls in no bucket.
    #[must_use]
    pub const fn from_score(score: u8) -> Option<Self> {
        match score {
            10 => Some(Self::Positive),
            8 => Some(Self::Warning),
            s if s < 8 => Some(Self::Error),
            _ => None,
        }
    }
}

/// Counts of notes per confidence bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfidenceSummary {
    pub positive: usize,
    pub warning: usize,
    pub error: usize,
}

impl ConfidenceSummary {
    /// Tally the confidence scores of a note list.
    #[must_use]
    pub fn from_notes(notes: &[PropertyNote]) -> Self {
        notes
            .iter()
            .filter_map(|n| n.confidence_score.and_then(ConfidenceLevel::from_score))
            .fold(Self::default(), |mut acc, level| {
                match level {
                    ConfidenceLevel::Positive => acc.positive += 1,
                    ConfidenceLevel::Warning => acc.warning += 1,
                    ConfidenceLevel::Error => acc.error += 1,
                }
                acc
            })
    }
}
