//! # Campaign Ledger
//!
//! Escrow-style fund pooling. Creators open time-boxed campaigns with a
//! goal; contributors pool value into them; goal and deadline alone decide
//! the outcome:
//!
//! - goal reached: the creator may claim the whole pool, exactly once;
//! - deadline passed with the goal unmet: each contributor may withdraw
//!   exactly their own balance.
//!
//! | Phase        | Entry Point(s)                                                |
//! |--------------|---------------------------------------------------------------|
//! | Creation     | [`CampaignRegistry::create_campaign`]                         |
//! | Funding      | [`CampaignRegistry::contribute`]                              |
//! | Settlement   | [`CampaignRegistry::claim_funds`], [`CampaignRegistry::get_refund`] |
//! | Metadata     | [`CampaignRegistry::update_campaign_details`]                 |
//! | Queries      | `get_campaign_stats`, `get_campaign`, `contribution_of`, `campaign_count` |
//! | Persistence  | [`CampaignRegistry::snapshot`], [`CampaignRegistry::restore`] |
//!
//! ## Architecture
//!
//! Transition rules live in [`ledger`]; identifier allocation and the
//! per-campaign locks live in [`storage`]. This file contains the public
//! entry points: each one locates the campaign, serializes on its lock,
//! delegates to the ledger and publishes the resulting notification.
//!
//! Time, custody of funds, and notification delivery are injected through
//! the [`Clock`], [`Treasury`] and [`EventSink`] traits.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

pub mod clock;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod storage;
pub mod treasury;
pub mod types;

#[cfg(test)]
mod test_concurrency;
#[cfg(test)]
mod test_events;

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{CampaignEvent, EventSink, MemorySink, Notification};
pub use ledger::CampaignLedger;
pub use storage::{RegistrySnapshot, StoredCampaign};
pub use treasury::{InMemoryTreasury, TransferError, Treasury};
pub use types::{
    AccountId, Amount, Campaign, CampaignConfig, CampaignId, CampaignState, CampaignStats,
    CampaignStatus, Timestamp, SECONDS_PER_DAY,
};

use storage::{CampaignStore, SharedLedger};

/// Owns every campaign and routes operations to their ledgers.
pub struct CampaignRegistry {
    store: RwLock<CampaignStore>,
    treasury: Arc<dyn Treasury>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl CampaignRegistry {
    /// Create an empty registry; the first campaign gets id 0.
    pub fn new(
        treasury: impl Treasury + 'static,
        clock: impl Clock + 'static,
        sink: impl EventSink + 'static,
    ) -> Self {
        Self::with_store(CampaignStore::new(), treasury, clock, sink)
    }

    /// Rebuild a registry from a snapshot taken with [`Self::snapshot`].
    ///
    /// Nothing is published for the restored campaigns.
    pub fn restore(
        snapshot: RegistrySnapshot,
        treasury: impl Treasury + 'static,
        clock: impl Clock + 'static,
        sink: impl EventSink + 'static,
    ) -> Result<Self> {
        let store = CampaignStore::from_snapshot(snapshot)?;
        info!(next_id = store.next_id(), "campaign registry restored");
        Ok(Self::with_store(store, treasury, clock, sink))
    }

    fn with_store(
        store: CampaignStore,
        treasury: impl Treasury + 'static,
        clock: impl Clock + 'static,
        sink: impl EventSink + 'static,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            treasury: Arc::new(treasury),
            clock: Arc::new(clock),
            sink: Arc::new(sink),
        }
    }

    async fn campaign(&self, id: CampaignId) -> Result<SharedLedger> {
        self.store.read().await.get(id)
    }

    // ─────────────────────────────────────────────────────────
    // Creation
    // ─────────────────────────────────────────────────────────

    /// Open a campaign for `creator` running `duration_days` full days from now.
    pub async fn create_campaign(
        &self,
        creator: &AccountId,
        title: impl Into<String>,
        description: impl Into<String>,
        goal: Amount,
        duration_days: u64,
    ) -> Result<CampaignId> {
        if goal.is_zero() {
            debug!(creator = %creator, "create rejected: zero goal");
            return Err(LedgerError::InvalidGoal);
        }
        let created_at = self.clock.now();
        let deadline = Some(duration_days)
            .filter(|days| *days > 0)
            .and_then(|days| days.checked_mul(SECONDS_PER_DAY))
            .and_then(|duration| created_at.0.checked_add(duration))
            .map(Timestamp)
            .ok_or_else(|| {
                debug!(creator = %creator, duration_days, "create rejected: bad duration");
                LedgerError::InvalidDuration
            })?;

        let mut store = self.store.write().await;
        let id = store.get_and_increment_campaign_id();
        let config = CampaignConfig {
            id,
            creator: creator.clone(),
            goal,
            created_at,
            deadline,
        };
        let (ledger, notification) = CampaignLedger::open(config, title.into(), description.into());
        store.insert(ledger);
        self.sink.publish(notification);
        drop(store);

        info!(campaign = %id, creator = %creator, goal = %goal, deadline = %deadline, "campaign created");
        Ok(id)
    }

    // ─────────────────────────────────────────────────────────
    // Funding and settlement
    // ─────────────────────────────────────────────────────────

    /// Add `amount`, attached by `contributor`, to the campaign's pool.
    pub async fn contribute(
        &self,
        id: CampaignId,
        contributor: &AccountId,
        amount: Amount,
    ) -> Result<()> {
        let campaign = self.campaign(id).await?;
        let mut ledger = campaign.lock().await;
        let now = self.clock.now();

        let notification = ledger
            .contribute(contributor, amount, now)
            .inspect_err(|e| debug!(campaign = %id, contributor = %contributor, "contribution rejected: {e}"))?;
        self.sink.publish(notification);

        info!(
            campaign = %id,
            contributor = %contributor,
            amount = %amount,
            total = %ledger.total_pooled(),
            "contribution recorded"
        );
        Ok(())
    }

    /// Pay the whole pool to the creator once the goal has been reached.
    ///
    /// The campaign stays locked across the transfer; if the treasury fails,
    /// nothing is committed and the error is returned as
    /// [`LedgerError::Transfer`].
    pub async fn claim_funds(&self, id: CampaignId, caller: &AccountId) -> Result<Amount> {
        let campaign = self.campaign(id).await?;
        let mut ledger = campaign.lock().await;

        let amount = ledger
            .check_claim(caller)
            .inspect_err(|e| debug!(campaign = %id, caller = %caller, "claim rejected: {e}"))?;
        self.treasury
            .transfer(caller, amount)
            .await
            .inspect_err(|e| debug!(campaign = %id, caller = %caller, "claim transfer failed: {e}"))?;

        let notification = ledger.commit_claim(self.clock.now());
        self.sink.publish(notification);

        info!(campaign = %id, creator = %caller, amount = %amount, "funds claimed");
        Ok(amount)
    }

    /// Return `caller`'s whole balance after a failed campaign's deadline.
    pub async fn get_refund(&self, id: CampaignId, caller: &AccountId) -> Result<Amount> {
        let campaign = self.campaign(id).await?;
        let mut ledger = campaign.lock().await;

        let amount = ledger
            .check_refund(caller, self.clock.now())
            .inspect_err(|e| debug!(campaign = %id, caller = %caller, "refund rejected: {e}"))?;
        self.treasury
            .transfer(caller, amount)
            .await
            .inspect_err(|e| debug!(campaign = %id, caller = %caller, "refund transfer failed: {e}"))?;

        let notification = ledger.commit_refund(caller, amount, self.clock.now());
        self.sink.publish(notification);

        info!(
            campaign = %id,
            contributor = %caller,
            amount = %amount,
            total = %ledger.total_pooled(),
            "refund issued"
        );
        Ok(amount)
    }

    // ─────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────

    pub async fn update_campaign_details(
        &self,
        id: CampaignId,
        caller: &AccountId,
        new_title: impl Into<String>,
        new_description: impl Into<String>,
    ) -> Result<()> {
        let campaign = self.campaign(id).await?;
        let mut ledger = campaign.lock().await;

        let notification = ledger
            .update_details(
                caller,
                new_title.into(),
                new_description.into(),
                self.clock.now(),
            )
            .inspect_err(|e| debug!(campaign = %id, caller = %caller, "update rejected: {e}"))?;
        self.sink.publish(notification);

        info!(campaign = %id, "campaign details updated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub async fn get_campaign_stats(
        &self,
        id: CampaignId,
        contributor: &AccountId,
    ) -> Result<CampaignStats> {
        let campaign = self.campaign(id).await?;
        let ledger = campaign.lock().await;
        Ok(ledger.stats(contributor, self.clock.now()))
    }

    pub async fn get_campaign(&self, id: CampaignId) -> Result<Campaign> {
        let campaign = self.campaign(id).await?;
        let ledger = campaign.lock().await;
        Ok(ledger.snapshot())
    }

    pub async fn contribution_of(&self, id: CampaignId, contributor: &AccountId) -> Result<Amount> {
        let campaign = self.campaign(id).await?;
        let ledger = campaign.lock().await;
        Ok(ledger.contribution_of(contributor))
    }

    /// The id the next created campaign will receive.
    pub async fn campaign_count(&self) -> u64 {
        self.store.read().await.next_id()
    }

    /// Capture every campaign and the counter.
    ///
    /// Holds the store read lock throughout, so no campaign can be created
    /// while the snapshot is taken; each campaign is captured between two of
    /// its own operations.
    pub async fn snapshot(&self) -> RegistrySnapshot {
        let store = self.store.read().await;
        let mut campaigns = Vec::new();
        for campaign in store.all() {
            let ledger = campaign.lock().await;
            campaigns.push(StoredCampaign {
                config: ledger.config().clone(),
                state: ledger.state().clone(),
            });
        }
        RegistrySnapshot {
            next_id: store.next_id(),
            campaigns,
        }
    }
}
