//! Lifecycle errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use tiffin_types::{InvalidInput, Slot};

/// Lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Actor may not touch this resource
    #[error("not allowed to act on this {0}")]
    Unauthorized(&'static str),

    /// Resource not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Action not allowed from the current status
    #[error("cannot {action} from status {from}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Attempted action
        action: &'static str,
    },

    /// Request arrived inside the notice window
    #[error("{required_hours}h notice required; deadline was {deadline}")]
    NoticeViolation {
        /// Configured lead time
        required_hours: u32,
        /// Last instant the request would have been accepted
        deadline: DateTime<Utc>,
    },

    /// Per-slot skip limit for the cycle reached
    #[error("{slot} skip limit of {limit} per cycle reached")]
    LimitExceeded {
        /// Slot being skipped
        slot: Slot,
        /// Configured limit
        limit: u32,
    },

    /// Malformed or inconsistent input
    #[error("{0}")]
    Validation(String),

    /// Lost a race with a concurrent update
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payment signature did not verify
    #[error("payment verification failed: {0}")]
    PaymentVerification(String),

    /// Payment gateway error
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Webhook verification or processing error
    #[error("webhook error: {0}")]
    Webhook(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] tiffin_db::DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<InvalidInput> for LifecycleError {
    fn from(err: InvalidInput) -> Self {
        Self::Validation(err.0)
    }
}

impl LifecycleError {
    /// Build a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Gateway(_) | Self::Database(_) | Self::Internal(_)
        )
    }
}

/// Result type for lifecycle operations
pub type LifecycleResult<T> = Result<T, LifecycleError>;
