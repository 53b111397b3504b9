//! Credit ledger
//!
//! Credits are append-only entries. Redemption walks available entries in
//! expiry order, marks each consumed entry `used`, and writes the unspent part
//! of the last one back as a fresh entry with the same expiry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tiffin_db::{CreateCredit, CreditRepository};
use tiffin_types::{Credit, CreditId, CreditSource, SubscriptionId, UserId};

use crate::error::LifecycleError;

/// Result of redeeming credit against a charge
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Redemption {
    /// Amount covered by credit
    pub applied: i64,
    /// Entries consumed
    pub used: Vec<CreditId>,
    /// Entry written for the unspent part of the last consumed credit
    pub remainder: Option<Credit>,
}

/// Credit ledger over a [`CreditRepository`]
#[derive(Clone)]
pub struct CreditLedger {
    credits: Arc<dyn CreditRepository>,
}

impl CreditLedger {
    /// Create a new ledger
    pub fn new(credits: Arc<dyn CreditRepository>) -> Self {
        Self { credits }
    }

    /// Write a new available credit
    #[instrument(skip(self))]
    pub async fn mint(
        &self,
        consumer_id: UserId,
        subscription_id: Option<SubscriptionId>,
        amount: i64,
        source: CreditSource,
        expires_at: DateTime<Utc>,
    ) -> Result<Credit, LifecycleError> {
        if amount <= 0 {
            return Err(LifecycleError::validation("credit amount must be positive"));
        }

        let row = self
            .credits
            .create(CreateCredit {
                id: Uuid::new_v4(),
                consumer_id: consumer_id.0,
                subscription_id: subscription_id.map(|s| s.0),
                amount,
                source,
                expires_at,
            })
            .await?;

        metrics::counter!("credits_minted_total", "source" => source.as_str()).increment(1);
        info!(credit_id = %row.id, amount, source = source.as_str(), "Credit minted");

        Ok(row.try_into()?)
    }

    /// Every credit of a customer, newest first
    pub async fn list(&self, consumer_id: UserId) -> Result<Vec<Credit>, LifecycleError> {
        self.credits
            .find_by_consumer(consumer_id.0)
            .await?
            .into_iter()
            .map(|row| Credit::try_from(row).map_err(LifecycleError::from))
            .collect()
    }

    /// Credit redeemable at `now`
    pub async fn balance(
        &self,
        consumer_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<i64, LifecycleError> {
        let rows = self.credits.find_redeemable(consumer_id.0, now).await?;
        Ok(rows.iter().map(|r| r.amount).sum())
    }

    /// Redeem up to `amount`, soonest expiry first
    #[instrument(skip(self))]
    pub async fn redeem(
        &self,
        consumer_id: UserId,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<Redemption, LifecycleError> {
        let mut redemption = Redemption::default();
        if amount <= 0 {
            return Ok(redemption);
        }

        for row in self.credits.find_redeemable(consumer_id.0, now).await? {
            let outstanding = amount - redemption.applied;
            if outstanding == 0 {
                break;
            }

            if !self.credits.mark_used(row.id).await? {
                debug!(credit_id = %row.id, "Credit consumed concurrently; skipping");
                continue;
            }
            redemption.used.push(CreditId(row.id));

            let take = row.amount.min(outstanding);
            redemption.applied += take;

            if take < row.amount {
                let remainder = self
                    .credits
                    .create(CreateCredit {
                        id: Uuid::new_v4(),
                        consumer_id: row.consumer_id,
                        subscription_id: row.subscription_id,
                        amount: row.amount - take,
                        source: row.source.parse().map_err(|e| {
                            LifecycleError::Internal(format!("stored credit source: {e}"))
                        })?,
                        expires_at: row.expires_at,
                    })
                    .await?;
                redemption.remainder = Some(remainder.try_into()?);
            }
        }

        if redemption.applied < amount {
            warn!(
                requested = amount,
                applied = redemption.applied,
                "Credit balance did not cover redemption"
            );
        }

        Ok(redemption)
    }

    /// Undo a redemption: consumed entries become available again and the
    /// remainder entry is retired, restoring the balance with its expiries
    #[instrument(skip(self, redemption), fields(applied = redemption.applied))]
    pub async fn reverse(&self, redemption: &Redemption) -> Result<(), LifecycleError> {
        if let Some(remainder) = &redemption.remainder {
            if !self.credits.mark_used(remainder.id.0).await? {
                warn!(credit_id = %remainder.id, "Remainder credit already spent");
            }
        }
        for id in &redemption.used {
            if !self.credits.mark_available(id.0).await? {
                warn!(credit_id = %id, "Redeemed credit no longer marked used");
            }
        }

        if redemption.applied > 0 {
            info!(applied = redemption.applied, "Redemption reversed");
        }
        Ok(())
    }

    /// Flip every available credit past its expiry to expired
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64, LifecycleError> {
        let expired = self.credits.expire_due(now).await?;
        if expired > 0 {
            info!(expired, "Expired credits");
        }
        Ok(expired)
    }
}
