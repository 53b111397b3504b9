//! Razorpay signature verification and webhook parsing

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, error, info, instrument};

use tiffin_types::SubscriptionId;

use crate::error::LifecycleError;
use crate::gateway::PaymentConfirmation;

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Payment captured
    PaymentCaptured,
    /// Payment failed
    PaymentFailed,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment.captured" => Self::PaymentCaptured,
            "payment.failed" => Self::PaymentFailed,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event type
    pub event_type: WebhookEventType,
    /// Payment the event is about, for payment events
    pub payment: Option<PaymentData>,
    /// When the event was created (Unix timestamp)
    pub created_at: i64,
}

/// Payment event data
#[derive(Debug, Clone)]
pub struct PaymentData {
    /// Payment ID
    pub payment_id: String,
    /// Gateway order the payment settles
    pub order_id: Option<String>,
    /// Amount in minor currency units
    pub amount: i64,
    /// Payment status
    pub status: String,
    /// Subscription named in the order notes, if any
    pub subscription_id: Option<SubscriptionId>,
    /// Failure reason for failed payments
    pub error_description: Option<String>,
}

/// Webhook handler for processing Razorpay events
#[derive(Clone)]
pub struct WebhookHandler {
    webhook_secret: String,
}

impl WebhookHandler {
    /// Create a new webhook handler
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Verify and parse a webhook payload
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, LifecycleError> {
        if !verify_hmac(self.webhook_secret.as_bytes(), payload, signature)? {
            error!("Webhook signature verification failed");
            return Err(LifecycleError::Webhook(
                "Signature verification failed".to_string(),
            ));
        }

        let raw_event: RawRazorpayEvent = serde_json::from_slice(payload)
            .map_err(|e| LifecycleError::Webhook(e.to_string()))?;

        debug!(event_type = %raw_event.event, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event.as_str());
        let payment = match event_type {
            WebhookEventType::PaymentCaptured | WebhookEventType::PaymentFailed => {
                let entity = raw_event
                    .payload
                    .payment
                    .map(|p| p.entity)
                    .ok_or_else(|| {
                        LifecycleError::Webhook("payment event without payment".to_string())
                    })?;
                Some(Self::parse_payment(entity)?)
            }
            WebhookEventType::Unknown(_) => {
                info!("Received unknown webhook event type");
                None
            }
        };

        Ok(WebhookEvent {
            event_type,
            payment,
            created_at: raw_event.created_at,
        })
    }

    fn parse_payment(entity: RawPayment) -> Result<PaymentData, LifecycleError> {
        let subscription_id = entity
            .notes
            .get("subscription_id")
            .map(|id| SubscriptionId::parse(id))
            .transpose()
            .map_err(|e| LifecycleError::Webhook(format!("bad subscription_id note: {e}")))?;

        Ok(PaymentData {
            payment_id: entity.id,
            order_id: entity.order_id,
            amount: entity.amount,
            status: entity.status,
            subscription_id,
            error_description: entity.error_description,
        })
    }
}

/// Verify the checkout signature over `order_id|payment_id`
pub fn verify_payment_signature(
    key_secret: &str,
    payment: &PaymentConfirmation,
) -> Result<(), LifecycleError> {
    let message = format!("{}|{}", payment.order_id, payment.payment_id);
    if verify_hmac(key_secret.as_bytes(), message.as_bytes(), &payment.signature)? {
        Ok(())
    } else {
        Err(LifecycleError::PaymentVerification(
            "signature mismatch".to_string(),
        ))
    }
}

/// Hex HMAC-SHA256 of `message` under `key`
pub fn sign(key: &[u8], message: &[u8]) -> Result<String, LifecycleError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|_| LifecycleError::Internal("HMAC error".to_string()))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hmac(key: &[u8], message: &[u8], signature: &str) -> Result<bool, LifecycleError> {
    let expected = sign(key, message)?;
    Ok(constant_time_eq(
        signature.trim().to_ascii_lowercase().as_bytes(),
        expected.as_bytes(),
    ))
}

/// Constant-time comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// Raw Razorpay event for parsing
#[derive(Debug, Deserialize)]
struct RawRazorpayEvent {
    event: String,
    #[serde(default)]
    payload: RawPayload,
    #[serde(default)]
    created_at: i64,
}

#[derive(Debug, Default, Deserialize)]
struct RawPayload {
    payment: Option<RawPaymentWrapper>,
}

#[derive(Debug, Deserialize)]
struct RawPaymentWrapper {
    entity: RawPayment,
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    id: String,
    amount: i64,
    status: String,
    order_id: Option<String>,
    #[serde(default, deserialize_with = "notes_map")]
    notes: HashMap<String, String>,
    error_description: Option<String>,
}

/// Razorpay sends `notes: []` when an order carries no notes
fn notes_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Notes {
        Map(HashMap<String, String>),
        List(Vec<serde_json::Value>),
    }

    Ok(match Notes::deserialize(deserializer)? {
        Notes::Map(map) => map,
        Notes::List(_) => HashMap::new(),
    })
}
