//! Cancellation settlement policy

use serde::{Deserialize, Serialize};

use tiffin_types::{Credit, RefundChoice, RefundPolicy};

use crate::error::LifecycleError;

/// How the unused balance of a cancelled subscription goes back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementMethod {
    /// Gateway refund
    Refund,
    /// Platform credit
    Credit,
}

/// Pick the settlement method for a cancellation.
///
/// Fixed policies ignore the customer's choice. Under
/// [`RefundPolicy::CustomerChoice`] a missing choice falls back to `default`,
/// or is rejected when there is none.
pub fn resolve(
    policy: RefundPolicy,
    choice: Option<RefundChoice>,
    default: Option<RefundChoice>,
) -> Result<SettlementMethod, LifecycleError> {
    match policy {
        RefundPolicy::RefundOnly => Ok(SettlementMethod::Refund),
        RefundPolicy::CreditOnly => Ok(SettlementMethod::Credit),
        RefundPolicy::CustomerChoice => match choice.or(default) {
            Some(RefundChoice::Refund) => Ok(SettlementMethod::Refund),
            Some(RefundChoice::Credit) => Ok(SettlementMethod::Credit),
            None => Err(LifecycleError::validation(
                "refund_choice is required: choose refund or credit",
            )),
        },
    }
}

/// Outcome of settling a cancelled subscription's balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Settlement {
    /// Nothing was owed
    Nothing,
    /// Balance returned as credit
    Credited {
        /// Minted credit
        credit: Credit,
    },
    /// Balance refunded through the gateway
    Refunded {
        /// Refunded amount
        amount: i64,
        /// Gateway refund ID
        refund_id: String,
    },
    /// The gateway refused the refund; operations must retry it
    RefundPending {
        /// Amount still owed
        amount: i64,
    },
}
