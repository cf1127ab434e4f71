use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::question::{Difficulty, Section};
use super::session::{SessionKind, SessionSection};
use crate::error::{Error, Result};

pub const SESSION_STARTED: &str = "session_started";
pub const QUESTION_ANSWERED: &str = "question_answered";
pub const TIME_SPENT: &str = "time_spent";
pub const SESSION_COMPLETED: &str = "session_completed";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStartedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SessionSection>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnsweredData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSpentData {
    #[serde(default)]
    pub minutes: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SessionSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCompletedData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SessionSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_answered: Option<u32>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<f64>,
}

/// What happened. Known tags carry a typed payload; anything else keeps its raw JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    SessionStarted(SessionStartedData),
    QuestionAnswered(QuestionAnsweredData),
    TimeSpent(TimeSpentData),
    SessionCompleted(SessionCompletedData),
    Custom { event_type: String, data: JsonValue },
}

fn typed<T: DeserializeOwned>(event_type: &str, data: JsonValue) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| Error::BadRequest(format!("Invalid eventData for {}: {}", event_type, e)))
}

impl EventPayload {
    pub fn from_parts(event_type: &str, data: JsonValue) -> Result<Self> {
        let data = if data.is_null() { json!({}) } else { data };
        let payload = match event_type {
            SESSION_STARTED => EventPayload::SessionStarted(typed(event_type, data)?),
            QUESTION_ANSWERED => EventPayload::QuestionAnswered(typed(event_type, data)?),
            TIME_SPENT => EventPayload::TimeSpent(typed(event_type, data)?),
            SESSION_COMPLETED => EventPayload::SessionCompleted(typed(event_type, data)?),
            other => EventPayload::Custom {
                event_type: other.to_string(),
                data,
            },
        };
        Ok(payload)
    }

    pub fn event_type(&self) -> &str {
        match self {
            EventPayload::SessionStarted(_) => SESSION_STARTED,
            EventPayload::QuestionAnswered(_) => QUESTION_ANSWERED,
            EventPayload::TimeSpent(_) => TIME_SPENT,
            EventPayload::SessionCompleted(_) => SESSION_COMPLETED,
            EventPayload::Custom { event_type, .. } => event_type.as_str(),
        }
    }

    pub fn data(&self) -> JsonValue {
        let value = match self {
            EventPayload::SessionStarted(d) => serde_json::to_value(d),
            EventPayload::QuestionAnswered(d) => serde_json::to_value(d),
            EventPayload::TimeSpent(d) => serde_json::to_value(d),
            EventPayload::SessionCompleted(d) => serde_json::to_value(d),
            EventPayload::Custom { data, .. } => Ok(data.clone()),
        };
        value.unwrap_or(JsonValue::Null)
    }

    /// Section label carried by the payload, if any.
    pub fn section(&self) -> Option<&str> {
        match self {
            EventPayload::SessionStarted(d) => d.section.as_ref().map(SessionSection::as_str),
            EventPayload::QuestionAnswered(d) => d.section.as_ref().map(Section::as_str),
            EventPayload::TimeSpent(d) => d.section.as_ref().map(SessionSection::as_str),
            EventPayload::SessionCompleted(d) => d.section.as_ref().map(SessionSection::as_str),
            EventPayload::Custom { data, .. } => data.get("section").and_then(JsonValue::as_str),
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            EventPayload::QuestionAnswered(d) => d.score,
            EventPayload::SessionCompleted(d) => d.score,
            EventPayload::Custom { data, .. } => data.get("score").and_then(JsonValue::as_f64),
            _ => None,
        }
    }

    /// Seconds reported by the payload's `timeSpent` field.
    pub fn time_spent(&self) -> Option<f64> {
        match self {
            EventPayload::QuestionAnswered(d) => d.time_spent,
            EventPayload::SessionCompleted(d) => d.time_spent,
            EventPayload::Custom { data, .. } => {
                data.get("timeSpent").and_then(JsonValue::as_f64)
            }
            _ => None,
        }
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        match self {
            EventPayload::QuestionAnswered(d) => d.difficulty,
            EventPayload::Custom { data, .. } => data
                .get("difficulty")
                .and_then(JsonValue::as_str)
                .and_then(Difficulty::parse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub user_id: String,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl AnalyticsEvent {
    pub fn is(&self, event_type: &str) -> bool {
        self.payload.event_type() == event_type
    }

    /// Payload section equals `section`, or the tag mentions it (`reading_started`).
    pub fn concerns(&self, section: Section) -> bool {
        self.payload.section() == Some(section.as_str())
            || self.payload.event_type().contains(section.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreTally {
    pub total: f64,
    pub count: u32,
}

impl ScoreTally {
    pub fn add(&mut self, score: f64) {
        self.total += score;
        self.count += 1;
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAnalytics {
    pub user_id: String,
    pub total_sessions: u32,
    pub total_questions: u32,
    pub average_score: f64,
    /// Minutes.
    pub time_spent: f64,
    pub last_active: DateTime<Utc>,
    pub strongest_section: Option<Section>,
    pub weakest_section: Option<Section>,
    pub improvement_rate: f64,
    pub streak_days: u32,
    #[serde(skip)]
    pub scored_answers: u32,
    #[serde(skip)]
    pub section_scores: BTreeMap<Section, ScoreTally>,
}

impl UserAnalytics {
    pub fn new(user_id: impl Into<String>, first_seen: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_sessions: 0,
            total_questions: 0,
            average_score: 0.0,
            time_spent: 0.0,
            last_active: first_seen,
            strongest_section: None,
            weakest_section: None,
            improvement_rate: 0.0,
            streak_days: 1,
            scored_answers: 0,
            section_scores: BTreeMap::new(),
        }
    }

    /// Folds one event into the running counters.
    pub fn apply(&mut self, event: &AnalyticsEvent) {
        match &event.payload {
            EventPayload::SessionStarted(_) => self.total_sessions += 1,
            EventPayload::QuestionAnswered(data) => {
                self.total_questions += 1;
                if let Some(score) = data.score {
                    self.scored_answers += 1;
                    let prior = self.average_score * (self.scored_answers - 1) as f64;
                    self.average_score = (prior + score) / self.scored_answers as f64;
                    if let Some(section) = data.section {
                        self.section_scores.entry(section).or_default().add(score);
                        self.rank_sections();
                    }
                }
            }
            EventPayload::TimeSpent(data) => self.time_spent += data.minutes.max(0.0),
            _ => {}
        }

        let last_day = self.last_active.date_naive();
        let this_day = event.timestamp.date_naive();
        let gap = (this_day - last_day).num_days();
        if gap == 1 {
            self.streak_days += 1;
        } else if gap > 1 {
            self.streak_days = 1;
        }
        if event.timestamp > self.last_active {
            self.last_active = event.timestamp;
        }
    }

    fn rank_sections(&mut self) {
        let means: Vec<(Section, f64)> = self
            .section_scores
            .iter()
            .filter_map(|(section, tally)| tally.mean().map(|m| (*section, m)))
            .collect();
        self.strongest_section = means
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, _)| *s);
        self.weakest_section = means
            .iter()
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(s, _)| *s);
    }
}
