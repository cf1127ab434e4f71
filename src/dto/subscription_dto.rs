use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::models::subscription::{PaymentPlan, Subscription};

#[derive(Debug, Clone, Serialize)]
pub struct PlansResponse {
    pub plans: Vec<PaymentPlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    #[validate(length(min = 1))]
    pub plan_id: String,
    #[validate(length(min = 1))]
    pub paypal_order_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReactivateRequest {
    #[validate(length(min = 1))]
    pub paypal_order_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionChangeResponse {
    pub success: bool,
    pub subscription: Subscription,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub subscription: Option<Subscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayPalWebhookEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub resource: JsonValue,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub handled: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub questions_attempted: u32,
    pub practice_tests_taken: u32,
    pub study_time_minutes: f64,
    pub current_streak: u32,
    pub monthly_limit: u32,
    pub remaining_questions: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub usage: UsageStats,
}
