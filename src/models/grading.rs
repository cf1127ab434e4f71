use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grammar: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fluency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coherence: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_response: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub score: u32,
    pub max_score: u32,
    pub percentage: u32,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub detailed_analysis: DetailedAnalysis,
}
