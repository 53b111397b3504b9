//! Payment gateway abstraction

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LifecycleError;

/// Payment gateway trait
///
/// Abstracts the gateway so the lifecycle rules can run against Razorpay in
/// production and a recording double in tests.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an order the customer pays at checkout
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, LifecycleError>;

    /// Refund `amount` of a captured payment
    async fn refund(
        &self,
        payment_id: &str,
        amount: i64,
        notes: HashMap<String, String>,
    ) -> Result<GatewayRefund, LifecycleError>;
}

/// Gateway order creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    /// Amount in minor currency units
    pub amount: i64,
    /// Merchant reference
    pub receipt: String,
    /// Free-form notes echoed back in webhooks
    pub notes: HashMap<String, String>,
}

/// Gateway order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    /// Gateway order ID
    pub id: String,
    /// Amount in minor currency units
    pub amount: i64,
    /// ISO currency code
    pub currency: String,
}

/// Gateway refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRefund {
    /// Refund ID
    pub id: String,
    /// Refunded amount
    pub amount: i64,
}

/// What the checkout widget hands back after a successful payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Gateway order that was paid
    pub order_id: String,
    /// Captured payment
    pub payment_id: String,
    /// Hex HMAC-SHA256 of `order_id|payment_id`
    pub signature: String,
}
