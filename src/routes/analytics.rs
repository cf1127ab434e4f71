use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Json},
};

use crate::dto::analytics_dto::{
    AnalyticsQuery, DashboardResponse, ProgressOverTimeResponse, RecommendationsResponse,
    SectionAnalyticsResponse, TrackEventRequest, TrackEventResponse, UserAnalyticsResponse,
};
use crate::error::Result;
use crate::models::analytics::EventPayload;
use crate::utils::validation::validated;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/events",
    request_body = TrackEventRequest,
    responses(
        (status = 200, description = "Event stored", body = TrackEventResponse),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn track_event(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TrackEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;
    let event_payload = EventPayload::from_parts(&payload.event_type, payload.event_data)?;
    let event = state
        .analytics_service
        .record_event(&payload.user_id, event_payload, payload.session_id)?;
    Ok(Json(TrackEventResponse {
        success: true,
        event_id: event.id,
    }))
}

#[utoipa::path(
    get,
    path = "/analytics/{user_id}",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("timeframe" = Option<String>, Query, description = "7d | 30d | 90d | all, default 30d")
    ),
    responses(
        (status = 200, description = "Totals over the timeframe, null for unknown users", body = UserAnalyticsResponse),
        (status = 400, description = "Invalid timeframe")
    )
)]
#[axum::debug_handler]
pub async fn get_user_analytics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let analytics = state
        .analytics_service
        .user_analytics(&user_id, query.timeframe)?;
    Ok(Json(UserAnalyticsResponse { analytics }))
}

#[utoipa::path(
    get,
    path = "/analytics/{user_id}/sections",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("section" = Option<String>, Query, description = "Single section; omit for all four"),
        ("timeframe" = Option<String>, Query, description = "7d | 30d | 90d | all, default 30d")
    ),
    responses(
        (status = 200, description = "Per-section breakdown", body = SectionAnalyticsResponse),
        (status = 400, description = "Invalid section or timeframe")
    )
)]
#[axum::debug_handler]
pub async fn get_section_analytics(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let analytics = state
        .analytics_service
        .section_analytics(&user_id, query.section, query.timeframe)?;
    Ok(Json(SectionAnalyticsResponse { analytics }))
}

#[utoipa::path(
    get,
    path = "/analytics/{user_id}/progress",
    params(
        ("user_id" = String, Path, description = "User id"),
        ("section" = Option<String>, Query, description = "Restrict to one section"),
        ("timeframe" = Option<String>, Query, description = "7d groups by day, longer windows by week")
    ),
    responses(
        (status = 200, description = "Chronological buckets", body = ProgressOverTimeResponse),
        (status = 400, description = "Invalid section or timeframe")
    )
)]
#[axum::debug_handler]
pub async fn get_progress_over_time(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<AnalyticsQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let progress = state
        .analytics_service
        .progress_over_time(&user_id, query.section, query.timeframe)?;
    Ok(Json(ProgressOverTimeResponse { progress }))
}

#[utoipa::path(
    get,
    path = "/analytics/{user_id}/recommendations",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "At most five suggestions", body = RecommendationsResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let recommendations = state.analytics_service.recommendations(&user_id)?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

#[utoipa::path(
    get,
    path = "/analytics/{user_id}/dashboard",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let dashboard = state.analytics_service.dashboard(&user_id)?;
    Ok(Json(DashboardResponse { dashboard }))
}
