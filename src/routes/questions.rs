use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Json},
};

use crate::dto::question_dto::{
    QuestionListQuery, QuestionListResponse, QuestionStatsResponse, RandomQuestionsQuery,
    RandomQuestionsResponse,
};
use crate::error::Result;
use crate::models::question::{Difficulty, Section};
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_RANDOM_COUNT: usize = 5;

#[utoipa::path(
    get,
    path = "/questions/{section}",
    params(
        ("section" = String, Path, description = "reading | listening | speaking | writing"),
        ("difficulty" = Option<String>, Query, description = "easy | medium | hard"),
        ("limit" = Option<usize>, Query, description = "Page size, default 10"),
        ("offset" = Option<usize>, Query, description = "Items to skip, default 0")
    ),
    responses(
        (status = 200, description = "Questions in the section", body = QuestionListResponse),
        (status = 400, description = "Invalid section")
    )
)]
#[axum::debug_handler]
pub async fn list_questions(
    State(state): State<AppState>,
    Path(section): Path<String>,
    query: std::result::Result<Query<QuestionListQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let section: Section = section.parse()?;
    let Query(query) = query?;
    let difficulty = query.difficulty.as_deref().and_then(Difficulty::parse);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let page = state
        .question_service
        .list(section, difficulty, limit, offset);
    Ok(Json(QuestionListResponse {
        questions: page.questions,
        total: page.total,
        offset,
        limit,
    }))
}

#[utoipa::path(
    get,
    path = "/questions/random/{section}",
    params(
        ("section" = String, Path, description = "reading | listening | speaking | writing"),
        ("count" = Option<usize>, Query, description = "How many to draw, default 5")
    ),
    responses(
        (status = 200, description = "Shuffled questions", body = RandomQuestionsResponse),
        (status = 400, description = "Invalid section")
    )
)]
#[axum::debug_handler]
pub async fn random_questions(
    State(state): State<AppState>,
    Path(section): Path<String>,
    query: std::result::Result<Query<RandomQuestionsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let section: Section = section.parse()?;
    let Query(query) = query?;
    let count = query.count.unwrap_or(DEFAULT_RANDOM_COUNT);

    let questions = state.question_service.random(section, count);
    Ok(Json(RandomQuestionsResponse {
        total: questions.len(),
        questions,
    }))
}

#[utoipa::path(
    get,
    path = "/questions/stats",
    responses(
        (status = 200, description = "Counts per section and difficulty", body = QuestionStatsResponse)
    )
)]
#[axum::debug_handler]
pub async fn question_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(QuestionStatsResponse {
        stats: state.question_service.stats(),
    }))
}
