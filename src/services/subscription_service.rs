use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::store::KeyValueStore;
use crate::dto::subscription_dto::PayPalWebhookEvent;
use crate::error::{Error, Result};
use crate::models::subscription::{
    effective, is_active, PaymentPlan, PlanInterval, Subscription, SubscriptionStatus,
};
use crate::services::payment_gateway::PaymentGateway;
use crate::utils::time::Clock;

/// PayPal notifications the ledger knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookKind {
    SubscriptionActivated,
    SubscriptionCancelled,
    SubscriptionExpired,
    PaymentCompleted,
}

impl WebhookKind {
    pub fn parse(event_type: &str) -> Option<Self> {
        match event_type {
            "BILLING.SUBSCRIPTION.ACTIVATED" => Some(WebhookKind::SubscriptionActivated),
            "BILLING.SUBSCRIPTION.CANCELLED" => Some(WebhookKind::SubscriptionCancelled),
            "BILLING.SUBSCRIPTION.EXPIRED" => Some(WebhookKind::SubscriptionExpired),
            "PAYMENT.SALE.COMPLETED" => Some(WebhookKind::PaymentCompleted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookKind::SubscriptionActivated => "subscription_activated",
            WebhookKind::SubscriptionCancelled => "subscription_cancelled",
            WebhookKind::SubscriptionExpired => "subscription_expired",
            WebhookKind::PaymentCompleted => "payment_completed",
        }
    }
}

/// Read-side view of a user's subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionLookup {
    Found {
        subscription: Subscription,
        is_active: bool,
    },
    NoSubscription,
}

pub fn plan_catalog() -> Vec<PaymentPlan> {
    vec![
        PaymentPlan {
            id: "toefl_monthly".to_string(),
            name: "TOEFL Prep Monthly".to_string(),
            description: "Full access to all TOEFL preparation materials".to_string(),
            amount: Decimal::new(1000, 2),
            currency: "USD".to_string(),
            interval: PlanInterval::Monthly,
            features: [
                "Unlimited practice questions",
                "AI-powered grading and feedback",
                "Full-length practice tests",
                "Progress tracking and analytics",
                "Speaking practice with voice recording",
                "Writing practice with detailed feedback",
                "Mobile app access",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            trial_days: 7,
        },
        PaymentPlan {
            id: "toefl_yearly".to_string(),
            name: "TOEFL Prep Yearly".to_string(),
            description: "Full access with 2 months free".to_string(),
            amount: Decimal::new(10000, 2),
            currency: "USD".to_string(),
            interval: PlanInterval::Yearly,
            features: [
                "All monthly plan features",
                "2 months free (save $20)",
                "Priority customer support",
                "Advanced analytics",
                "Personalized study plans",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
            trial_days: 14,
        },
    ]
}

#[derive(Clone)]
pub struct SubscriptionService {
    plans: Arc<Vec<PaymentPlan>>,
    subscriptions: Arc<dyn KeyValueStore<Uuid, Subscription>>,
    by_user: Arc<dyn KeyValueStore<String, Uuid>>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionService {
    pub fn new(
        subscriptions: Arc<dyn KeyValueStore<Uuid, Subscription>>,
        by_user: Arc<dyn KeyValueStore<String, Uuid>>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            plans: Arc::new(plan_catalog()),
            subscriptions,
            by_user,
            gateway,
            clock,
        }
    }

    pub fn plans(&self) -> Vec<PaymentPlan> {
        self.plans.to_vec()
    }

    fn plan(&self, plan_id: &str) -> Option<&PaymentPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    fn verify(&self, order_id: &str) -> Result<()> {
        if self.gateway.verify_payment(order_id)? {
            Ok(())
        } else {
            Err(Error::BadRequest("Payment verification failed".to_string()))
        }
    }

    /// Creates a fresh active subscription and points the user at it, replacing any
    /// previous one.
    pub fn subscribe(&self, user_id: &str, plan_id: &str, order_id: &str) -> Result<Subscription> {
        let plan = self
            .plan(plan_id)
            .ok_or_else(|| Error::BadRequest("Invalid plan".to_string()))?;
        self.verify(order_id)?;

        let start = self.clock.now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            status: SubscriptionStatus::Active,
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            amount: plan.amount,
            currency: plan.currency.clone(),
            start_date: start,
            end_date: plan.interval.period_end(start),
            paypal_subscription_id: Some(order_id.to_string()),
            trial_end_date: None,
            auto_renew: true,
        };

        self.subscriptions.put(subscription.id, subscription.clone())?;
        self.by_user.put(user_id.to_string(), subscription.id)?;

        tracing::info!(
            user_id,
            plan_id,
            subscription_id = %subscription.id,
            end_date = %subscription.end_date,
            "Subscription created"
        );
        Ok(subscription)
    }

    fn stored_for(&self, user_id: &str) -> Result<Option<Subscription>> {
        let Some(id) = self.by_user.get(&user_id.to_string())? else {
            return Ok(None);
        };
        self.subscriptions.get(&id)
    }

    /// Expiry is applied to the returned view only.
    pub fn get_for_user(&self, user_id: &str) -> Result<SubscriptionLookup> {
        let now = self.clock.now();
        Ok(match self.stored_for(user_id)? {
            Some(stored) => SubscriptionLookup::Found {
                is_active: is_active(&stored, now),
                subscription: effective(&stored, now),
            },
            None => SubscriptionLookup::NoSubscription,
        })
    }

    pub fn cancel(&self, user_id: &str) -> Result<Subscription> {
        let now = self.clock.now();
        let stored = self
            .stored_for(user_id)?
            .ok_or_else(|| Error::NotFound("No active subscription found".to_string()))?;

        let current = effective(&stored, now).status;
        if !matches!(current, SubscriptionStatus::Active | SubscriptionStatus::Trial) {
            return Err(Error::BadRequest(
                "Only active or trial subscriptions can be cancelled".to_string(),
            ));
        }

        if let Some(external) = &stored.paypal_subscription_id {
            match self.gateway.cancel_subscription(external) {
                Ok(true) => {}
                Ok(false) => tracing::warn!(external_id = %external, "PayPal declined cancellation"),
                Err(e) => {
                    tracing::warn!(external_id = %external, error = ?e, "PayPal cancellation failed")
                }
            }
        }

        let cancelled = self
            .subscriptions
            .modify(&stored.id, &mut |sub| {
                sub.status = SubscriptionStatus::Cancelled;
                sub.auto_renew = false;
            })?
            .ok_or_else(|| Error::NotFound("Subscription not found".to_string()))?;

        tracing::info!(user_id, subscription_id = %cancelled.id, "Subscription cancelled");
        Ok(cancelled)
    }

    /// Any status goes back to active with a fresh period starting now.
    pub fn reactivate(&self, user_id: &str, order_id: &str) -> Result<Subscription> {
        let stored = self
            .stored_for(user_id)?
            .ok_or_else(|| Error::NotFound("No subscription found".to_string()))?;
        self.verify(order_id)?;

        let now = self.clock.now();
        let interval = self.plan(&stored.plan_id).map(|p| p.interval);
        let reactivated = self
            .subscriptions
            .modify(&stored.id, &mut |sub| {
                sub.status = SubscriptionStatus::Active;
                sub.auto_renew = true;
                sub.paypal_subscription_id = Some(order_id.to_string());
                if let Some(interval) = interval {
                    sub.end_date = interval.period_end(now);
                }
            })?
            .ok_or_else(|| Error::NotFound("Subscription not found".to_string()))?;

        tracing::info!(
            user_id,
            subscription_id = %reactivated.id,
            end_date = %reactivated.end_date,
            "Subscription reactivated"
        );
        Ok(reactivated)
    }

    /// Routes a provider notification by its type. The ledger itself is left unchanged.
    pub fn handle_webhook(&self, event: &PayPalWebhookEvent) -> Option<WebhookKind> {
        let kind = WebhookKind::parse(&event.event_type);
        let resource_id = event.resource.get("id").and_then(JsonValue::as_str);
        match kind {
            Some(kind) => tracing::info!(
                event_type = %event.event_type,
                webhook_id = ?event.id,
                resource_id = ?resource_id,
                handled = kind.as_str(),
                "PayPal webhook received"
            ),
            None => tracing::info!(
                event_type = %event.event_type,
                webhook_id = ?event.id,
                "PayPal webhook ignored"
            ),
        }
        kind
    }
}
