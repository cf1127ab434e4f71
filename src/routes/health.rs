use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::error::Error;

#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
    });
    (StatusCode::OK, Json(body))
}

pub async fn not_found() -> Error {
    Error::NotFound("Not found".to_string())
}

pub async fn method_not_allowed() -> Error {
    Error::MethodNotAllowed
}
