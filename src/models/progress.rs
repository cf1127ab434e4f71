use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionSection;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    pub user_id: String,
    pub section: SessionSection,
}

impl ProgressKey {
    pub fn new(user_id: impl Into<String>, section: SessionSection) -> Self {
        Self {
            user_id: user_id.into(),
            section,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub user_id: String,
    pub section: SessionSection,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub average_score: f64,
    pub last_practiced: Option<DateTime<Utc>>,
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub sessions_completed: u32,
    /// Seconds.
    pub total_time_spent: u64,
}

impl UserProgress {
    pub fn empty(user_id: impl Into<String>, section: SessionSection) -> Self {
        Self {
            user_id: user_id.into(),
            section,
            total_questions: 0,
            correct_answers: 0,
            average_score: 0.0,
            last_practiced: None,
            weak_areas: Vec::new(),
            recommendations: Vec::new(),
            sessions_completed: 0,
            total_time_spent: 0,
        }
    }
}
