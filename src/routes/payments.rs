use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Json},
};
use subtle::ConstantTimeEq;

use crate::dto::subscription_dto::{
    PayPalWebhookEvent, PlansResponse, ReactivateRequest, SubscribeRequest,
    SubscriptionChangeResponse, SubscriptionStatusResponse, UsageResponse, WebhookAck,
};
use crate::error::{Error, Result};
use crate::services::subscription_service::SubscriptionLookup;
use crate::utils::validation::validated;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/plans",
    responses((status = 200, description = "Available plans", body = PlansResponse))
)]
#[axum::debug_handler]
pub async fn list_plans(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(PlansResponse {
        plans: state.subscription_service.plans(),
    }))
}

#[utoipa::path(
    post,
    path = "/subscribe",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscription created", body = SubscriptionChangeResponse),
        (status = 400, description = "Invalid plan or payment verification failed")
    )
)]
#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;
    let subscription = state.subscription_service.subscribe(
        &payload.user_id,
        &payload.plan_id,
        &payload.paypal_order_id,
    )?;
    Ok(Json(SubscriptionChangeResponse {
        success: true,
        subscription,
        message: "Subscription created successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/subscription/{user_id}",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Current subscription, or status no_subscription", body = SubscriptionStatusResponse)
    )
)]
#[axum::debug_handler]
pub async fn get_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let response = match state.subscription_service.get_for_user(&user_id)? {
        SubscriptionLookup::Found {
            subscription,
            is_active,
        } => SubscriptionStatusResponse {
            subscription: Some(subscription),
            is_active: Some(is_active),
            status: None,
        },
        SubscriptionLookup::NoSubscription => SubscriptionStatusResponse {
            subscription: None,
            is_active: None,
            status: Some("no_subscription".to_string()),
        },
    };
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/subscription/{user_id}/cancel",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Subscription cancelled", body = SubscriptionChangeResponse),
        (status = 400, description = "Subscription is not active"),
        (status = 404, description = "No subscription")
    )
)]
#[axum::debug_handler]
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let subscription = state.subscription_service.cancel(&user_id)?;
    Ok(Json(SubscriptionChangeResponse {
        success: true,
        subscription,
        message: "Subscription cancelled successfully".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/subscription/{user_id}/reactivate",
    params(("user_id" = String, Path, description = "User id")),
    request_body = ReactivateRequest,
    responses(
        (status = 200, description = "Subscription reactivated", body = SubscriptionChangeResponse),
        (status = 400, description = "Payment verification failed"),
        (status = 404, description = "No subscription")
    )
)]
#[axum::debug_handler]
pub async fn reactivate_subscription(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: std::result::Result<Json<ReactivateRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload?;
    let payload = validated(payload)?;
    let subscription = state
        .subscription_service
        .reactivate(&user_id, &payload.paypal_order_id)?;
    Ok(Json(SubscriptionChangeResponse {
        success: true,
        subscription,
        message: "Subscription reactivated successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/subscription/{user_id}/usage",
    params(("user_id" = String, Path, description = "User id")),
    responses((status = 200, description = "Usage for the current month", body = UsageResponse))
)]
#[axum::debug_handler]
pub async fn get_usage(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse> {
    let usage = state.analytics_service.usage(&user_id)?;
    Ok(Json(UsageResponse { usage }))
}

#[utoipa::path(
    post,
    path = "/webhook/paypal",
    request_body = PayPalWebhookEvent,
    responses(
        (status = 200, description = "Notification acknowledged", body = WebhookAck),
        (status = 401, description = "Missing or wrong webhook secret")
    )
)]
#[axum::debug_handler]
pub async fn paypal_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<PayPalWebhookEvent>, JsonRejection>,
) -> Result<impl IntoResponse> {
    verify_secret(&headers, state.config.paypal_webhook_secret.as_deref())?;
    let Json(event) = payload?;
    let handled = state
        .subscription_service
        .handle_webhook(&event)
        .map_or("ignored", |kind| kind.as_str());
    Ok(Json(WebhookAck {
        success: true,
        handled: handled.to_string(),
    }))
}

/// No configured secret means the endpoint is open.
fn verify_secret(headers: &HeaderMap, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let Some(secret_hdr) = headers.get("x-webhook-secret") else {
        return Err(Error::Unauthorized("missing_webhook_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if ConstantTimeEq::ct_eq(provided.as_bytes(), expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".into()))
    }
}
