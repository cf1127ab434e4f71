use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::models::grading::GradingResult;
use crate::models::session::{SessionKind, SessionSection, TestSession};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub section: SessionSection,
    #[serde(default)]
    pub question_ids: Vec<String>,
    pub time_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1))]
    pub question_id: String,
    pub answer: JsonValue,
    #[serde(default)]
    pub time_spent: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session: TestSession,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub success: bool,
    pub session: TestSession,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading: Option<GradingResult>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionResponse {
    pub success: bool,
    pub session: TestSession,
    pub total_score: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<TestSession>,
    pub total: usize,
}
