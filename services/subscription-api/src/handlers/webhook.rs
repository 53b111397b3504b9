//! Razorpay webhook handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;

use tiffin_lifecycle::{LifecycleError, PaymentData, RenewalPayment, WebhookEvent, WebhookEventType};

use super::shared::record_op_duration;
use crate::state::AppState;

/// Header carrying the hex HMAC-SHA256 of the raw body
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// POST /webhooks/razorpay
///
/// Verify the signature, then settle renewal payments. Captured payments
/// renew the subscription named in the order notes; failed ones expire it.
/// Lifecycle rejections are acknowledged so Razorpay stops retrying.
pub async fn razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();

    let Some(sig_header) = headers.get(SIGNATURE_HEADER) else {
        tracing::warn!("Missing X-Razorpay-Signature header");
        return StatusCode::BAD_REQUEST;
    };

    let Ok(signature) = sig_header.to_str() else {
        tracing::warn!("Invalid X-Razorpay-Signature header encoding");
        return StatusCode::BAD_REQUEST;
    };

    let event = match state.webhooks.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected webhook");
            metrics::counter!("webhooks_processed_total", "status" => "rejected").increment(1);
            return StatusCode::BAD_REQUEST;
        }
    };

    let status = match apply_event(&state, event).await {
        Ok(()) => {
            metrics::counter!("webhooks_processed_total", "status" => "success").increment(1);
            StatusCode::OK
        }
        Err(e) if e.is_client_error() => {
            tracing::info!(error = %e, "Webhook acknowledged without change");
            metrics::counter!("webhooks_processed_total", "status" => "ignored").increment(1);
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(error = ?e, "Webhook processing failed");
            metrics::counter!("webhooks_processed_total", "status" => "error").increment(1);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    record_op_duration("process_webhook", start, status.is_success());
    status
}

async fn apply_event(state: &AppState, event: WebhookEvent) -> Result<(), LifecycleError> {
    let Some(payment) = event.payment else {
        tracing::debug!(event_type = ?event.event_type, "Ignoring webhook event");
        return Ok(());
    };
    let Some(subscription_id) = payment.subscription_id else {
        // Checkout payments are confirmed by the client with their signature
        tracing::debug!(payment_id = %payment.payment_id, "Payment not tied to a renewal");
        return Ok(());
    };

    match event.event_type {
        WebhookEventType::PaymentCaptured => {
            let PaymentData {
                payment_id, amount, ..
            } = payment;
            let outcome = state
                .lifecycle
                .renew(
                    subscription_id,
                    Some(RenewalPayment { payment_id, amount }),
                    Utc::now(),
                )
                .await?;
            tracing::info!(
                %subscription_id,
                renewal_date = %outcome.subscription.renewal_date,
                "Renewed from captured payment"
            );
        }
        WebhookEventType::PaymentFailed => {
            tracing::warn!(
                %subscription_id,
                reason = payment.error_description.as_deref().unwrap_or("unknown"),
                "Renewal payment failed"
            );
            state.lifecycle.expire(subscription_id).await?;
        }
        WebhookEventType::Unknown(_) => {}
    }

    Ok(())
}
