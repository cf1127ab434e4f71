use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
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
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0).unwrap(),
    ));
    let state = AppState::with_parts(
        &Config::default(),
        clock,
        Arc::new(FixedOffset(0)),
        Arc::new(SandboxPaymentGateway),
    )
    .expect("app state");
    build_router(state)
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let req = match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn track(app: &Router, user: &str, event_type: &str, data: JsonValue) -> JsonValue {
    let (status, body) = call(
        app,
        "POST",
        "/events",
        Some(json!({ "userId": user, "eventType": event_type, "eventData": data })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn tracked_answers_feed_the_dashboard() {
    let app = setup_app();
    let ack = track(&app, "alice", "session_started", json!({ "section": "reading", "type": "practice" })).await;
    assert_eq!(ack["success"], true);
    assert!(ack["eventId"].is_string());

    for score in [60, 80, 100] {
        track(
            &app,
            "alice",
            "question_answered",
            json!({ "section": "reading", "score": score, "timeSpent": 40, "difficulty": "medium" }),
        )
        .await;
    }

    let (status, body) = call(&app, "GET", "/analytics/alice/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    let dashboard = &body["dashboard"];
    assert_eq!(dashboard["totalSessions"], 1);
    assert_eq!(dashboard["totalQuestions"], 3);
    assert_eq!(dashboard["averageScore"], 80.0);
    assert_eq!(dashboard["sectionScores"]["reading"], 80.0);
    assert_eq!(dashboard["sectionScores"]["writing"], 0.0);

    let weekly = dashboard["weeklyProgress"].as_array().unwrap();
    assert_eq!(weekly.len(), 7);
    assert_eq!(weekly[6]["date"], "2024-05-15");
    assert_eq!(weekly[6]["questionsAnswered"], 3);
    assert_eq!(weekly[0]["questionsAnswered"], 0);
}

#[tokio::test]
async fn unknown_users_get_empty_views() {
    let app = setup_app();

    let (status, body) = call(&app, "GET", "/analytics/ghost", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["analytics"].is_null());

    let (_, body) = call(&app, "GET", "/analytics/ghost/dashboard", None).await;
    assert_eq!(body["dashboard"]["totalSessions"], 0);
    assert!(body["dashboard"]["recentActivity"].as_array().unwrap().is_empty());

    let (_, body) = call(&app, "GET", "/analytics/ghost/recommendations", None).await;
    assert_eq!(
        body["recommendations"],
        json!(["Start with a practice session to get personalized recommendations"])
    );
}

#[tokio::test]
async fn user_analytics_respects_timeframe() {
    let app = setup_app();
    track(&app, "bob", "question_answered", json!({ "section": "listening", "score": 70 })).await;

    let (status, body) = call(&app, "GET", "/analytics/bob?timeframe=7d", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["analytics"]["userId"], "bob");
    assert_eq!(body["analytics"]["totalQuestions"], 1);
    assert_eq!(body["analytics"]["averageScore"], 70.0);

    let (status, body) = call(&app, "GET", "/analytics/bob?timeframe=1y", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn section_breakdown_covers_all_sections() {
    let app = setup_app();
    track(&app, "carol", "question_answered", json!({ "section": "writing", "score": 90, "difficulty": "hard" })).await;

    let (status, body) = call(&app, "GET", "/analytics/carol/sections", None).await;
    assert_eq!(status, StatusCode::OK);
    let sections = body["analytics"].as_array().unwrap();
    assert_eq!(sections.len(), 4);
    let writing = sections.iter().find(|s| s["section"] == "writing").unwrap();
    assert_eq!(writing["totalAttempts"], 1);
    assert_eq!(writing["difficultyBreakdown"]["hard"]["attempts"], 1);
    assert_eq!(writing["improvementTrend"].as_array().unwrap().len(), 4);

    let (_, body) = call(&app, "GET", "/analytics/carol/sections?section=writing", None).await;
    assert_eq!(body["analytics"].as_array().unwrap().len(), 1);

    let (status, _) = call(&app, "GET", "/analytics/carol/sections?section=math", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn progress_over_time_groups_by_day_for_a_week() {
    let app = setup_app();
    track(&app, "dave", "question_answered", json!({ "section": "reading", "score": 50 })).await;
    track(&app, "dave", "question_answered", json!({ "section": "reading", "score": 70 })).await;

    let (status, body) = call(&app, "GET", "/analytics/dave/progress?timeframe=7d&section=reading", None).await;
    assert_eq!(status, StatusCode::OK);
    let points = body["progress"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["date"], "2024-05-15");
    assert_eq!(points[0]["averageScore"], 60.0);
    assert_eq!(points[0]["questionsAnswered"], 2);
    assert_eq!(points[0]["section"], "reading");
}

#[tokio::test]
async fn malformed_events_are_rejected() {
    let app = setup_app();

    let (status, _) = call(
        &app,
        "POST",
        "/events",
        Some(json!({ "userId": "", "eventType": "question_answered" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        "/events",
        Some(json!({ "userId": "erin", "eventType": "question_answered", "eventData": { "score": "high" } })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("question_answered"));

    let ack = track(&app, "erin", "flashcard_flipped", json!({ "deck": 3 })).await;
    assert_eq!(ack["success"], true);
}

#[tokio::test]
async fn recommendations_reflect_low_scores() {
    let app = setup_app();
    track(&app, "frank", "question_answered", json!({ "section": "speaking", "score": 40 })).await;

    let (status, body) = call(&app, "GET", "/analytics/frank/recommendations", None).await;
    assert_eq!(status, StatusCode::OK);
    let recs = body["recommendations"].as_array().unwrap();
    assert!(recs.len() <= 5);
    assert_eq!(
        recs[0],
        "Focus on fundamental concepts before attempting practice tests"
    );
}
