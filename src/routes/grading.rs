use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json},
};

use crate::dto::grading_dto::GradingRequest;
use crate::error::Result;
use crate::AppState;

/// Grades a single answer. A missing `correctAnswer` falls back to the bank's key when
/// `questionId` names a stored item.
#[utoipa::path(
    post,
    path = "/grade",
    request_body = GradingRequest,
    responses(
        (status = 200, description = "Score breakdown and feedback", body = GradingResult),
        (status = 400, description = "Invalid payload or missing answer key")
    )
)]
#[axum::debug_handler]
pub async fn grade_answer(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GradingRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let stored_key = payload
        .question_id
        .as_deref()
        .and_then(|id| state.question_service.get(id))
        .and_then(|q| q.correct_answer.clone());
    let correct = payload.correct_answer.or(stored_key);

    tracing::debug!(
        question_id = ?payload.question_id,
        question_type = %payload.question_type,
        "grading request"
    );
    let result = state.grading_service.grade(
        payload.question_type,
        &payload.user_answer,
        correct.as_deref(),
        payload.audio_url.as_deref(),
    )?;
    Ok(Json(result))
}
