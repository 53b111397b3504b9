//! Tiffin Lifecycle - Subscription lifecycle rules
//!
//! The Subscription Lifecycle Manager: pause, resume, cancel and skip under
//! the platform's notice windows, skip limits and refund policy, plus the
//! paid side of the lifecycle (checkout, trials, renewal, expiry), the credit
//! ledger and the Razorpay gateway.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tiffin_lifecycle::{GatewayConfig, LifecycleService, RazorpayGateway, Stores};
//!
//! let config = GatewayConfig::new("rzp_key", "rzp_secret", "whsec");
//! let gateway = Arc::new(RazorpayGateway::new(config.clone()));
//! let lifecycle = LifecycleService::new(Stores::from(repos), gateway, config.key_secret);
//!
//! let outcome = lifecycle.pause(&actor, subscription_id, None, Utc::now()).await?;
//! ```

pub mod billing;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod notice;
pub mod orders;
pub mod policy;
pub mod razorpay;
pub mod schedule;
pub mod service;
pub mod stores;
pub mod webhook;

pub use billing::{
    Checkout, CheckoutItem, CheckoutRequest, ConvertRequest, RenewalOutcome, RenewalPayment,
    RenewalQuote, SubscribeRequest, TrialRequest, RENEWAL_LEAD_DAYS,
};
pub use catalog::{Catalog, NewPlan, NewTrialType, PlanUpdate, TrialTypeUpdate};
pub use config::GatewayConfig;
pub use error::{LifecycleError, LifecycleResult};
pub use gateway::{GatewayOrder, GatewayRefund, OrderRequest, PaymentConfirmation, PaymentGateway};
pub use ledger::{CreditLedger, Redemption};
pub use notice::{auto_cancel_eligible, ensure_lead_time};
pub use orders::MarkOutcome;
pub use policy::Settlement;
pub use razorpay::RazorpayGateway;
pub use service::{
    CancelOutcome, LifecycleService, PauseOutcome, ResumeOutcome, SkipOutcome, SubscriptionView,
    SweepReport,
};
pub use stores::Stores;
pub use webhook::{
    constant_time_eq, verify_payment_signature, PaymentData, WebhookEvent, WebhookEventType,
    WebhookHandler,
};
