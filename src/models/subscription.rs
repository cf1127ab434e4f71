use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::time::add_months;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Trial,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    Monthly,
    Yearly,
}

impl PlanInterval {
    pub fn months(&self) -> u32 {
        match self {
            PlanInterval::Monthly => 1,
            PlanInterval::Yearly => 12,
        }
    }

    pub fn period_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        add_months(start, self.months())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub interval: PlanInterval,
    pub features: Vec<String>,
    pub trial_days: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: String,
    pub status: SubscriptionStatus,
    pub plan_id: String,
    pub plan_name: String,
    pub amount: Decimal,
    pub currency: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paypal_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trial_end_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
}

/// An active subscription whose paid period has run out.
pub fn is_expired(subscription: &Subscription, now: DateTime<Utc>) -> bool {
    subscription.status == SubscriptionStatus::Active && now > subscription.end_date
}

/// The record as a reader should see it at `now`; the stored copy is left alone.
pub fn effective(subscription: &Subscription, now: DateTime<Utc>) -> Subscription {
    let mut view = subscription.clone();
    if is_expired(subscription, now) {
        view.status = SubscriptionStatus::Expired;
    }
    view
}

pub fn is_active(subscription: &Subscription, now: DateTime<Utc>) -> bool {
    subscription.status == SubscriptionStatus::Active && now <= subscription.end_date
}
