//! Job type enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of analysis work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Analysis of a single uploaded conversation.
    ConversationAnalysis,
    /// Analysis of several conversations in one run.
    BatchAnalysis,
    /// A self-reflection report generated from past analyses.
    SelfReflection,
}

impl JobType {
    /// Whether completion publishes an `analysis_complete` event.
    pub fn produces_analysis(&self) -> bool {
        matches!(self, Self::ConversationAnalysis | Self::BatchAnalysis)
    }

    /// Return the type as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConversationAnalysis => "conversation_analysis",
            Self::BatchAnalysis => "batch_analysis",
            Self::SelfReflection => "self_reflection",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
