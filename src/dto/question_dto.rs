use serde::{Deserialize, Serialize};

use crate::models::question::{Question, Section};

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionListQuery {
    pub difficulty: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<Question>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RandomQuestionsQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RandomQuestionsResponse {
    pub questions: Vec<Question>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DifficultyCounts {
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionStats {
    pub section: Section,
    pub total: usize,
    pub by_difficulty: DifficultyCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionStatsResponse {
    pub stats: Vec<SectionStats>,
}
