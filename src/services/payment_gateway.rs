use crate::error::Result;

/// Outbound calls to the payment provider.
#[cfg_attr(test, mockall::automock)]
pub trait PaymentGateway: Send + Sync {
    /// Whether the provider confirms that the order was paid.
    fn verify_payment(&self, order_id: &str) -> Result<bool>;

    fn cancel_subscription(&self, external_id: &str) -> Result<bool>;
}

/// Stand-in provider that approves every order. No network traffic.
#[derive(Debug, Default, Clone, Copy)]
pub struct SandboxPaymentGateway;

impl PaymentGateway for SandboxPaymentGateway {
    fn verify_payment(&self, order_id: &str) -> Result<bool> {
        tracing::info!(order_id, "Verifying PayPal payment (sandbox)");
        Ok(true)
    }

    fn cancel_subscription(&self, external_id: &str) -> Result<bool> {
        tracing::info!(external_id, "Cancelling PayPal subscription (sandbox)");
        Ok(true)
    }
}
