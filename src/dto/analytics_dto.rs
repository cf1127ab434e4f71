use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::analytics::UserAnalytics;
use crate::models::question::Section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "7d")]
    Week,
    #[default]
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl Timeframe {
    pub fn days(&self) -> Option<i64> {
        match self {
            Timeframe::Week => Some(7),
            Timeframe::Month => Some(30),
            Timeframe::Quarter => Some(90),
            Timeframe::All => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub event_type: String,
    #[serde(default)]
    pub event_data: JsonValue,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventResponse {
    pub success: bool,
    pub event_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub section: Option<Section>,
    #[serde(default)]
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserAnalyticsResponse {
    pub analytics: Option<UserAnalytics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub attempts: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DifficultyBreakdown {
    pub easy: DifficultyStats,
    pub medium: DifficultyStats,
    pub hard: DifficultyStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAnalytics {
    pub section: Section,
    pub total_attempts: usize,
    pub average_score: f64,
    pub average_time_per_question: f64,
    pub difficulty_breakdown: DifficultyBreakdown,
    pub common_mistakes: Vec<String>,
    /// Mean score per week, oldest of the last four weeks first.
    pub improvement_trend: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionAnalyticsResponse {
    pub analytics: Vec<SectionAnalytics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub date: String,
    pub average_score: f64,
    pub questions_answered: usize,
    pub time_spent: f64,
    pub section: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressOverTimeResponse {
    pub progress: Vec<ProgressPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub date: DateTime<Utc>,
    pub section: Option<String>,
    pub score: Option<f64>,
    pub questions_answered: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub date: String,
    pub questions_answered: usize,
    pub average_score: f64,
    pub time_spent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_sessions: u32,
    pub total_questions: u32,
    pub average_score: f64,
    pub time_spent: f64,
    pub streak_days: u32,
    pub recent_activity: Vec<RecentActivity>,
    pub section_scores: BTreeMap<Section, f64>,
    pub weekly_progress: Vec<DailyProgress>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub dashboard: DashboardSummary,
}
