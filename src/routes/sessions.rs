use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::dto::session_dto::{
    CompleteSessionResponse, CreateSessionRequest, SessionListQuery, SessionListResponse,
    SessionResponse, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::error::{Error, Result};
use crate::utils::validation::validated;
use crate::AppState;

const DEFAULT_PAGE_SIZE: usize = 10;

/// Malformed ids cannot name a stored session, so they read as unknown.
fn session_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| Error::NotFound("Session not found".to_string()))
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session started", body = SessionResponse),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_session(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;
    let session = state.session_service.create_session(payload)?;
    Ok(Json(SessionResponse { session }))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session found", body = SessionResponse),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let session = state.session_service.get_session(session_id(&id)?)?;
    Ok(Json(SessionResponse { session }))
}

#[utoipa::path(
    put,
    path = "/sessions/{id}/answer",
    params(("id" = String, Path, description = "Session id")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Answer recorded", body = SubmitAnswerResponse),
        (status = 400, description = "Invalid payload or session closed"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<SubmitAnswerRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let id = session_id(&id)?;
    let Json(payload) = payload?;
    let payload = validated(payload)?;
    let (session, grading) = state.session_service.submit_answer(id, payload)?;
    Ok(Json(SubmitAnswerResponse {
        success: true,
        session,
        grading,
    }))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/complete",
    params(("id" = String, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session completed", body = CompleteSessionResponse),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn complete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let done = state.session_service.complete_session(session_id(&id)?)?;
    Ok(Json(CompleteSessionResponse {
        success: true,
        session: done.session,
        total_score: done.total_score,
        average_score: done.average_score.round(),
    }))
}

#[utoipa::path(
    get,
    path = "/sessions/user/{user_id}",
    params(
        ("user_id" = String, Path, description = "Owner of the sessions"),
        ("limit" = Option<usize>, Query, description = "Page size, default 10"),
        ("offset" = Option<usize>, Query, description = "Items to skip, default 0")
    ),
    responses(
        (status = 200, description = "Newest sessions first", body = SessionListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<SessionListQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let (sessions, total) = state.session_service.list_user_sessions(
        &user_id,
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
        query.offset.unwrap_or(0),
    )?;
    Ok(Json(SessionListResponse { sessions, total }))
}
