use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::{IntoResponse, Json},
};

use crate::dto::progress_dto::{ProgressPayload, ProgressQuery, ProgressResponse};
use crate::error::Result;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/progress/{user_id}",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("section" = Option<String>, Query, description = "reading | listening | speaking | writing | full; omit for all four skills")
    ),
    responses(
        (status = 200, description = "One record, or one per skill section", body = ProgressResponse),
        (status = 400, description = "Invalid section")
    )
)]
#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let progress = match query.section {
        Some(section) => ProgressPayload::Single(state.progress_service.get(&user_id, section)?),
        None => ProgressPayload::All(state.progress_service.all_sections(&user_id)?),
    };
    Ok(Json(ProgressResponse { progress }))
}
