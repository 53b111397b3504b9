//! Payment gateway configuration

const RAZORPAY_API_BASE: &str = "https://api.razorpay.com/v1";

/// Razorpay credentials and endpoint
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// API key ID
    pub key_id: String,
    /// API key secret; also signs checkout payments
    pub key_secret: String,
    /// Webhook signing secret
    pub webhook_secret: String,
    /// API base URL
    pub api_base: String,
    /// ISO currency code for orders
    pub currency: String,
}

impl GatewayConfig {
    /// Create a new gateway config
    pub fn new(
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            key_secret: key_secret.into(),
            webhook_secret: webhook_secret.into(),
            api_base: RAZORPAY_API_BASE.to_string(),
            currency: "INR".to_string(),
        }
    }

    /// Point the client at another base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}
