use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use toefl_prep_backend::{
    config::Config,
    routes::build_router,
    services::payment_gateway::SandboxPaymentGateway,
    utils::{random::FixedOffset, time::FixedClock},
    AppState,
};
use tower::ServiceExt;

fn setup_app() -> Router {
    let state = AppState::with_parts(
        &Config::default(),
        Arc::new(FixedClock::new(Utc::now())),
        Arc::new(FixedOffset(0)),
        Arc::new(SandboxPaymentGateway),
    )
    .expect("app state");
    build_router(state)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn lists_reading_questions_with_paging() {
    let app = setup_app();

    let (status, body) = get_json(&app, "/questions/reading").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["offset"], 0);
    assert_eq!(body["limit"], 10);
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q["section"] == "reading"));

    let (_, body) = get_json(&app, "/questions/reading?limit=1&offset=1").await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["questions"].as_array().unwrap().len(), 1);

    let (_, body) = get_json(&app, "/questions/reading?offset=10").await;
    assert_eq!(body["total"], 3);
    assert!(body["questions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn difficulty_filter_narrows_the_total() {
    let app = setup_app();
    let (status, body) = get_json(&app, "/questions/reading?difficulty=easy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["questions"][0]["id"], "r3");
}

#[tokio::test]
async fn unknown_section_is_rejected() {
    let app = setup_app();
    let (status, body) = get_json(&app, "/questions/math").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = get_json(&app, "/questions/random/math").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn random_draw_is_capped_by_section_size() {
    let app = setup_app();

    let (status, body) = get_json(&app, "/questions/random/reading?count=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);

    let (_, body) = get_json(&app, "/questions/random/reading?count=50").await;
    assert_eq!(body["total"], 3);
    let mut ids: Vec<&str> = body["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
}

#[tokio::test]
async fn stats_cover_every_section() {
    let app = setup_app();
    let (status, body) = get_json(&app, "/questions/stats").await;
    assert_eq!(status, StatusCode::OK);
    let stats = body["stats"].as_array().unwrap();
    assert_eq!(stats.len(), 4);

    let reading = stats.iter().find(|s| s["section"] == "reading").unwrap();
    assert_eq!(reading["total"], 3);
    assert_eq!(reading["byDifficulty"]["easy"], 1);
    let writing = stats.iter().find(|s| s["section"] == "writing").unwrap();
    assert_eq!(writing["total"], 1);
}

#[tokio::test]
async fn grading_uses_the_bank_key_when_none_is_given() {
    let app = setup_app();
    let (status, body) = post_json(
        &app,
        "/grade",
        json!({
            "questionId": "r3",
            "questionType": "reading",
            "userAnswer": "Before puberty"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 10);
    assert_eq!(body["maxScore"], 10);
    assert_eq!(body["percentage"], 100);
}

#[tokio::test]
async fn grading_reading_without_a_key_fails() {
    let app = setup_app();
    let (status, body) = post_json(
        &app,
        "/grade",
        json!({ "questionType": "reading", "userAnswer": "anything" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn grading_writing_scores_by_heuristics() {
    let app = setup_app();
    let essay = "word ".repeat(320);
    let (status, body) = post_json(
        &app,
        "/grade",
        json!({ "questionType": "writing", "userAnswer": essay }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["maxScore"], 30);
    assert!(body["score"].as_u64().unwrap() <= 30);
    assert!(body["feedback"].is_string());
}

#[tokio::test]
async fn grading_rejects_unknown_question_type() {
    let app = setup_app();
    let (status, _) = post_json(
        &app,
        "/grade",
        json!({ "questionType": "math", "userAnswer": "2" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
