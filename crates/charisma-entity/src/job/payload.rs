//! Typed job payload definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// AI provider selected for an analysis.
///
/// A closed set; unknown provider ids fail deserialization instead of
/// reaching a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisProvider {
    /// OpenAI models.
    Openai,
    /// Anthropic models.
    Anthropic,
    /// Google models.
    Google,
    /// Groq-hosted models.
    Groq,
}

impl AnalysisProvider {
    /// Return the provider id.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Groq => "groq",
        }
    }
}

impl fmt::Display for AnalysisProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Input for an analysis job, stored as the job's JSON payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    /// Raw conversation text to analyze.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    /// Original upload name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Analysis template selected by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    /// Model id within the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider that runs the analysis.
    pub provider: AnalysisProvider,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_rejected() {
        let raw = serde_json::json!({ "provider": "mistral", "model": "large" });
        assert!(serde_json::from_value::<AnalysisPayload>(raw).is_err());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let payload = AnalysisPayload {
            file_content: None,
            file_name: None,
            template_id: Some("default".into()),
            model: None,
            provider: AnalysisProvider::Groq,
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "template_id": "default", "provider": "groq" })
        );
    }
}
