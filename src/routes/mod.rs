pub mod analytics;
pub mod grading;
pub mod health;
pub mod payments;
pub mod progress;
pub mod questions;
pub mod sessions;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::cors::api_cors;
use crate::AppState;
use health::{method_not_allowed, not_found};

/// The complete HTTP surface with CORS and request tracing applied.
pub fn build_router(state: AppState) -> Router {
    let question_routes = Router::new()
        .route(
            "/questions/stats",
            get(questions::question_stats).fallback(method_not_allowed),
        )
        .route(
            "/questions/random/:section",
            get(questions::random_questions).fallback(method_not_allowed),
        )
        .route(
            "/questions/:section",
            get(questions::list_questions).fallback(method_not_allowed),
        );

    let session_routes = Router::new()
        .route(
            "/sessions",
            post(sessions::create_session).fallback(method_not_allowed),
        )
        .route(
            "/sessions/user/:user_id",
            get(sessions::list_user_sessions).fallback(method_not_allowed),
        )
        .route(
            "/sessions/:id",
            get(sessions::get_session).fallback(method_not_allowed),
        )
        .route(
            "/sessions/:id/answer",
            put(sessions::submit_answer).fallback(method_not_allowed),
        )
        .route(
            "/sessions/:id/complete",
            post(sessions::complete_session).fallback(method_not_allowed),
        )
        .route(
            "/progress/:user_id",
            get(progress::get_progress).fallback(method_not_allowed),
        )
        .route(
            "/grade",
            post(grading::grade_answer).fallback(method_not_allowed),
        );

    let analytics_routes = Router::new()
        .route(
            "/events",
            post(analytics::track_event).fallback(method_not_allowed),
        )
        .route(
            "/analytics/:user_id",
            get(analytics::get_user_analytics).fallback(method_not_allowed),
        )
        .route(
            "/analytics/:user_id/sections",
            get(analytics::get_section_analytics).fallback(method_not_allowed),
        )
        .route(
            "/analytics/:user_id/progress",
            get(analytics::get_progress_over_time).fallback(method_not_allowed),
        )
        .route(
            "/analytics/:user_id/recommendations",
            get(analytics::get_recommendations).fallback(method_not_allowed),
        )
        .route(
            "/analytics/:user_id/dashboard",
            get(analytics::get_dashboard).fallback(method_not_allowed),
        );

    let payment_routes = Router::new()
        .route(
            "/plans",
            get(payments::list_plans).fallback(method_not_allowed),
        )
        .route(
            "/subscribe",
            post(payments::subscribe).fallback(method_not_allowed),
        )
        .route(
            "/subscription/:user_id",
            get(payments::get_subscription).fallback(method_not_allowed),
        )
        .route(
            "/subscription/:user_id/cancel",
            post(payments::cancel_subscription).fallback(method_not_allowed),
        )
        .route(
            "/subscription/:user_id/reactivate",
            post(payments::reactivate_subscription).fallback(method_not_allowed),
        )
        .route(
            "/subscription/:user_id/usage",
            get(payments::get_usage).fallback(method_not_allowed),
        )
        .route(
            "/webhook/paypal",
            post(payments::paypal_webhook).fallback(method_not_allowed),
        );

    Router::new()
        .route("/health", get(health::health).fallback(method_not_allowed))
        .merge(question_routes)
        .merge(session_routes)
        .merge(analytics_routes)
        .merge(payment_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
}
