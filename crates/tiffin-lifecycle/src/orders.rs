//! Delivery outcomes recorded by vendors and riders

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};

use tiffin_types::{Actor, Credit, CreditSource, Order, OrderId, OrderOutcome, OrderStatus, Role};

use crate::error::{LifecycleError, LifecycleResult};
use crate::service::{lost_race, LifecycleService};

/// Result of recording an outcome
#[derive(Debug, Clone, Serialize)]
pub struct MarkOutcome {
    /// Updated order
    pub order: Order,
    /// Credit minted for a vendor skip
    pub credit: Option<Credit>,
}

/// Outcomes each role may record
fn may_record(role: Role, outcome: OrderOutcome) -> bool {
    match role {
        Role::Admin => true,
        Role::Vendor => matches!(
            outcome,
            OrderOutcome::Delivered | OrderOutcome::SkippedByVendor | OrderOutcome::FailedOps
        ),
        Role::Rider => matches!(
            outcome,
            OrderOutcome::Delivered | OrderOutcome::NoShow | OrderOutcome::FailedOps
        ),
        Role::Customer => false,
    }
}

impl LifecycleService {
    /// Record the final outcome of a scheduled order
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, role = %actor.role))]
    pub async fn mark_order(
        &self,
        actor: &Actor,
        order_id: OrderId,
        outcome: OrderOutcome,
        now: DateTime<Utc>,
    ) -> LifecycleResult<MarkOutcome> {
        if !may_record(actor.role, outcome) {
            return Err(LifecycleError::Unauthorized("order"));
        }

        let order: Order = self
            .stores
            .orders
            .find_by_id(order_id.0)
            .await?
            .ok_or(LifecycleError::NotFound("order"))?
            .try_into()?;
        let sub = self.load(order.subscription_id).await?;
        if actor.role == Role::Vendor && actor.user_id != sub.vendor_id {
            return Err(LifecycleError::Unauthorized("order"));
        }

        if order.status != OrderStatus::Scheduled {
            return Err(LifecycleError::InvalidTransition {
                from: order.status.to_string(),
                action: "record an outcome",
            });
        }

        let settings = self.settings().await?;
        if order.service_date > settings.local_date(now) {
            return Err(LifecycleError::validation("order is not due yet"));
        }

        let status = OrderStatus::from(outcome);
        if !self
            .stores
            .orders
            .transition(order_id.0, OrderStatus::Scheduled, status)
            .await?
        {
            return Err(lost_race());
        }

        let credit = if outcome == OrderOutcome::SkippedByVendor && order.price > 0 {
            Some(
                self.ledger
                    .mint(
                        sub.consumer_id,
                        Some(sub.id),
                        order.price,
                        CreditSource::VendorSkip,
                        settings.credit_expiry(now),
                    )
                    .await?,
            )
        } else {
            None
        };

        info!(order_id = %order_id, %status, "Order outcome recorded");

        Ok(MarkOutcome {
            order: Order { status, ..order },
            credit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_outcomes() {
        assert!(may_record(Role::Vendor, OrderOutcome::SkippedByVendor));
        assert!(!may_record(Role::Vendor, OrderOutcome::NoShow));
        assert!(may_record(Role::Rider, OrderOutcome::NoShow));
        assert!(!may_record(Role::Rider, OrderOutcome::SkippedByVendor));
        assert!(!may_record(Role::Customer, OrderOutcome::Delivered));
        assert!(may_record(Role::Admin, OrderOutcome::NoShow));
    }
}
