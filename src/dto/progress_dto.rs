use serde::{Deserialize, Serialize};

use crate::models::progress::UserProgress;
use crate::models::session::SessionSection;

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressQuery {
    pub section: Option<SessionSection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ProgressPayload {
    Single(UserProgress),
    All(Vec<UserProgress>),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressResponse {
    pub progress: ProgressPayload,
}
