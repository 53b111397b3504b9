//! Razorpay payment gateway implementation

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::GatewayConfig;
use crate::error::LifecycleError;
use crate::gateway::{GatewayOrder, GatewayRefund, OrderRequest, PaymentGateway};

/// Razorpay payment gateway
#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    config: GatewayConfig,
}

impl RazorpayGateway {
    /// Create a new Razorpay gateway
    pub fn new(config: GatewayConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated JSON request to Razorpay
    async fn razorpay_request<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, LifecycleError> {
        let url = format!("{}{endpoint}", self.config.api_base);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Razorpay API request failed");
                LifecycleError::Gateway(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Razorpay API error");
            return Err(LifecycleError::Gateway(format!(
                "Razorpay API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Razorpay response");
            LifecycleError::Gateway(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self, request), fields(receipt = %request.receipt))]
    async fn create_order(&self, request: OrderRequest) -> Result<GatewayOrder, LifecycleError> {
        debug!(amount = request.amount, "Creating Razorpay order");

        let body = RazorpayOrderBody {
            amount: request.amount,
            currency: &self.config.currency,
            receipt: &request.receipt,
            notes: &request.notes,
        };

        let order: RazorpayOrder = self.razorpay_request("/orders", &body).await?;

        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    #[instrument(skip(self, notes))]
    async fn refund(
        &self,
        payment_id: &str,
        amount: i64,
        notes: HashMap<String, String>,
    ) -> Result<GatewayRefund, LifecycleError> {
        debug!(payment_id = %payment_id, amount, "Requesting Razorpay refund");

        let body = RazorpayRefundBody {
            amount,
            notes: &notes,
        };

        let refund: RazorpayRefund = self
            .razorpay_request(&format!("/payments/{payment_id}/refund"), &body)
            .await?;

        Ok(GatewayRefund {
            id: refund.id,
            amount: refund.amount,
        })
    }
}

// Razorpay API request/response types

#[derive(Debug, Serialize)]
struct RazorpayOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: &'a HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct RazorpayRefundBody<'a> {
    amount: i64,
    notes: &'a HashMap<String, String>,
}

/// Razorpay order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayOrder {
    /// Order ID
    pub id: String,
    /// Amount in paise
    pub amount: i64,
    /// Currency
    pub currency: String,
    /// Merchant receipt
    #[serde(default)]
    pub receipt: Option<String>,
    /// Order status (`created`, `attempted`, `paid`)
    pub status: String,
}

/// Razorpay refund
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayRefund {
    /// Refund ID
    pub id: String,
    /// Refunded payment
    pub payment_id: String,
    /// Amount in paise
    pub amount: i64,
    /// Refund status
    #[serde(default)]
    pub status: Option<String>,
}
