use serde::{Deserialize, Deserializer, Serialize};

/// Summary used when every analysis attempt failed
pub const DEGRADED_SUMMARY: &str = "Error summarizing email.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default = "default_topic", deserialize_with = "topic_or_default")]
    pub topic: String,
    #[serde(default = "default_insight", deserialize_with = "insight_or_default")]
    pub insight: String,
}

fn default_topic() -> String {
    "Unknown".to_string()
}

fn default_insight() -> String {
    "No insight provided".to_string()
}

/// `null` reads as the field's default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn topic_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_topic))
}

fn insight_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_insight))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub word: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinyin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub english: String,
}

/// A chunk of the original text with transliteration and glosses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningSegment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub original: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pinyin: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub translation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vocabulary: Vec<VocabularyEntry>,
}

/// JSON object the model is asked to return.
///
/// `summary`, `action_required` and `reason` are mandatory: a response
/// without them counts as unparseable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelAnalysis {
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
    pub action_required: bool,
    pub reason: String,
    #[serde(default)]
    pub learning_segments: Option<Vec<LearningSegment>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub summary: String,
    pub action_required: bool,
    pub reason: String,
    pub sections: Vec<Section>,
    pub learning_segments: Option<Vec<LearningSegment>>,
    pub unsubscribe_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DegradedAnalysis {
    pub reason: String,
    pub unsubscribe_link: Option<String>,
}

/// Outcome of analyzing one email
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    Analyzed(Analysis),
    /// Retries exhausted; carries sentinel values
    Degraded(DegradedAnalysis),
}

impl AnalysisResult {
    pub fn from_model(model: ModelAnalysis, translation_mode: bool, unsubscribe_link: Option<String>) -> Self {
        AnalysisResult::Analyzed(Analysis {
            summary: model.summary,
            action_required: model.action_required,
            reason: model.reason,
            sections: model.sections,
            learning_segments: if translation_mode { model.learning_segments } else { None },
            unsubscribe_link,
        })
    }

    pub fn degraded(reason: impl Into<String>, unsubscribe_link: Option<String>) -> Self {
        AnalysisResult::Degraded(DegradedAnalysis {
            reason: reason.into(),
            unsubscribe_link,
        })
    }

    pub fn summary(&self) -> &str {
        match self {
            AnalysisResult::Analyzed(a) => &a.summary,
            AnalysisResult::Degraded(_) => DEGRADED_SUMMARY,
        }
    }

    pub fn action_required(&self) -> bool {
        match self {
            AnalysisResult::Analyzed(a) => a.action_required,
            AnalysisResult::Degraded(_) => false,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            AnalysisResult::Analyzed(a) => &a.reason,
            AnalysisResult::Degraded(d) => &d.reason,
        }
    }

    pub fn sections(&self) -> &[Section] {
        match self {
            AnalysisResult::Analyzed(a) => &a.sections,
            AnalysisResult::Degraded(_) => &[],
        }
    }

    pub fn learning_segments(&self) -> Option<&[LearningSegment]> {
        match self {
            AnalysisResult::Analyzed(a) => a.learning_segments.as_deref(),
            AnalysisResult::Degraded(_) => None,
        }
    }

    pub fn unsubscribe_link(&self) -> Option<&str> {
        match self {
            AnalysisResult::Analyzed(a) => a.unsubscribe_link.as_deref(),
            AnalysisResult::Degraded(d) => d.unsubscribe_link.as_deref(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, AnalysisResult::Degraded(_))
    }
}
