use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::question::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Practice,
    FullTest,
}

/// A single skill section, or the whole test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSection {
    Reading,
    Listening,
    Speaking,
    Writing,
    Full,
}

impl SessionSection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionSection::Reading => "reading",
            SessionSection::Listening => "listening",
            SessionSection::Speaking => "speaking",
            SessionSection::Writing => "writing",
            SessionSection::Full => "full",
        }
    }

    pub fn skill(&self) -> Option<Section> {
        match self {
            SessionSection::Reading => Some(Section::Reading),
            SessionSection::Listening => Some(Section::Listening),
            SessionSection::Speaking => Some(Section::Speaking),
            SessionSection::Writing => Some(Section::Writing),
            SessionSection::Full => None,
        }
    }
}

impl From<Section> for SessionSection {
    fn from(section: Section) -> Self {
        match section {
            Section::Reading => SessionSection::Reading,
            Section::Listening => SessionSection::Listening,
            Section::Speaking => SessionSection::Speaking,
            Section::Writing => SessionSection::Writing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub answer: JsonValue,
    pub time_spent: u32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSession {
    pub id: Uuid,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub section: SessionSection,
    pub questions: Vec<String>,
    pub answers: BTreeMap<String, AnswerRecord>,
    pub scores: BTreeMap<String, f64>,
    pub feedback: BTreeMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub time_remaining: u32,
    pub total_time: u32,
    pub status: SessionStatus,
}

impl TestSession {
    pub fn time_used(&self) -> u32 {
        self.total_time.saturating_sub(self.time_remaining)
    }

    pub fn total_score(&self) -> f64 {
        self.scores.values().sum()
    }

    /// Mean of recorded per-question scores, zero when nothing was scored.
    pub fn average_score(&self) -> f64 {
        if self.scores.is_empty() {
            0.0
        } else {
            self.total_score() / self.scores.len() as f64
        }
    }
}
