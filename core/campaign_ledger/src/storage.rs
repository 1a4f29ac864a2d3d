//! # Storage
//!
//! In-memory campaign store owned by the registry, plus the serializable
//! snapshot layout used to persist and restore it.
//!
//! | Item        | Type                                              | Description                       |
//! |-------------|---------------------------------------------------|-----------------------------------|
//! | `next_id`   | `u64`                                             | Auto-increment campaign counter   |
//! | `campaigns` | `BTreeMap<CampaignId, Arc<Mutex<CampaignLedger>>>` | One lockable ledger per campaign  |
//!
//! Each campaign sits behind its own async mutex so that operations on one
//! campaign are serialized while different campaigns proceed in parallel.
//! The store itself is only locked long enough to allocate an id or to look
//! a campaign up.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::errors::{LedgerError, Result};
use crate::ledger::CampaignLedger;
use crate::types::{Amount, CampaignConfig, CampaignId, CampaignState, CampaignStatus};

pub(crate) type SharedLedger = Arc<Mutex<CampaignLedger>>;

#[derive(Debug, Default)]
pub(crate) struct CampaignStore {
    next_id: u64,
    campaigns: BTreeMap<CampaignId, SharedLedger>,
}

impl CampaignStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reads, increments, and stores the campaign counter.
    /// Returns the id to use for the *current* campaign (pre-increment value).
    pub(crate) fn get_and_increment_campaign_id(&mut self) -> CampaignId {
        let current = self.next_id;
        self.next_id += 1;
        CampaignId(current)
    }

    pub(crate) fn next_id(&self) -> u64 {
        self.next_id
    }

    pub(crate) fn insert(&mut self, ledger: CampaignLedger) {
        self.campaigns
            .insert(ledger.id(), Arc::new(Mutex::new(ledger)));
    }

    pub(crate) fn get(&self, id: CampaignId) -> Result<SharedLedger> {
        self.campaigns
            .get(&id)
            .cloned()
            .ok_or(LedgerError::CampaignNotFound(id))
    }

    pub(crate) fn all(&self) -> Vec<SharedLedger> {
        self.campaigns.values().cloned().collect()
    }

    /// Rebuild a store from a snapshot, rejecting campaigns whose books do not
    /// balance and layouts that would let the counter hand out an identifier
    /// that is already taken.
    pub(crate) fn from_snapshot(snapshot: RegistrySnapshot) -> Result<Self> {
        let mut store = Self {
            next_id: snapshot.next_id,
            campaigns: BTreeMap::new(),
        };
        for stored in snapshot.campaigns {
            let id = stored.config.id;
            if id.0 >= snapshot.next_id {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "campaign {id} is not below the counter {}",
                    snapshot.next_id
                )));
            }
            if store.campaigns.contains_key(&id) {
                return Err(LedgerError::InvalidSnapshot(format!(
                    "campaign {id} appears twice"
                )));
            }
            stored.validate()?;
            store.insert(CampaignLedger::from_parts(stored.config, stored.state));
        }
        Ok(store)
    }
}

/// One campaign as persisted: immutable config and mutable state kept apart.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredCampaign {
    pub config: CampaignConfig,
    pub state: CampaignState,
}

impl StoredCampaign {
    /// Check the campaign against the accounting rules every live ledger keeps.
    fn validate(&self) -> Result<()> {
        let (config, state) = (&self.config, &self.state);
        let id = config.id;
        let invalid =
            |reason: String| LedgerError::InvalidSnapshot(format!("campaign {id}: {reason}"));

        if config.goal.is_zero() {
            return Err(invalid("goal is zero".into()));
        }
        if config.deadline <= config.created_at {
            return Err(invalid(format!(
                "deadline {} is not after creation {}",
                config.deadline, config.created_at
            )));
        }

        if state.status == CampaignStatus::Claimed {
            if !state.total_pooled.is_zero() {
                return Err(invalid(format!(
                    "claimed but still pools {}",
                    state.total_pooled
                )));
            }
            return Ok(());
        }

        let mut sum = Amount::ZERO;
        for (contributor, amount) in &state.contributions {
            if amount.is_zero() {
                return Err(invalid(format!("zero balance kept for {contributor}")));
            }
            sum = sum
                .checked_add(*amount)
                .ok_or_else(|| invalid("balances overflow".into()))?;
        }
        if sum != state.total_pooled {
            return Err(invalid(format!(
                "pools {} but balances sum to {sum}",
                state.total_pooled
            )));
        }

        let goal_met = state.total_pooled >= config.goal;
        match state.status {
            CampaignStatus::Open if goal_met => Err(invalid(format!(
                "open with {} pooled against goal {}",
                state.total_pooled, config.goal
            ))),
            CampaignStatus::GoalReached if !goal_met => Err(invalid(format!(
                "goal reached with only {} pooled against goal {}",
                state.total_pooled, config.goal
            ))),
            _ => Ok(()),
        }
    }
}

/// Durable layout of the whole registry.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// The id the next created campaign will receive.
    pub next_id: u64,
    /// Campaigns ordered by id.
    pub campaigns: Vec<StoredCampaign>,
}
