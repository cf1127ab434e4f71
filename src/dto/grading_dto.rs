use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::models::question::Section;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingRequest {
    #[serde(default)]
    pub question_id: Option<String>,
    pub question_type: Section,
    #[serde(default)]
    pub user_answer: String,
    pub correct_answer: Option<String>,
    pub audio_url: Option<String>,
    /// Accepted for compatibility; the heuristic graders ignore it.
    pub rubric: Option<JsonValue>,
}
