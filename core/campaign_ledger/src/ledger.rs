//! # Campaign ledger
//!
//! The per-campaign accounting state machine. A [`CampaignLedger`] owns the
//! campaign's immutable config and its mutable state, and enforces every
//! transition rule:
//!
//! | Operation   | Requires                                   | Effect                              |
//! |-------------|--------------------------------------------|-------------------------------------|
//! | contribute  | `now < deadline`, `Open`, `amount > 0`     | balance += amount, latch on goal    |
//! | claim       | creator, `GoalReached`, pool > 0           | `Claimed`, pool drained             |
//! | refund      | `now >= deadline`, `Open`, balance > 0     | balance zeroed, pool decremented    |
//! | update      | creator, `now < deadline`, `Open`          | title/description replaced          |
//!
//! Claims and refunds are split into a `check_*` step, which validates and
//! returns the amount to pay out without touching state, and a `commit_*`
//! step, which the registry calls only after the treasury transfer succeeded.
//! All checks of an operation run before any of its mutations.

use tracing::info;

use crate::errors::{LedgerError, Result};
use crate::events::{CampaignEvent, Notification};
use crate::types::{
    AccountId, Amount, Campaign, CampaignConfig, CampaignId, CampaignState, CampaignStats,
    CampaignStatus, Timestamp,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignLedger {
    config: CampaignConfig,
    state: CampaignState,
}

impl CampaignLedger {
    /// Open a new campaign and produce its `CampaignCreated` notification.
    pub fn open(config: CampaignConfig, title: String, description: String) -> (Self, Notification) {
        let mut ledger = Self {
            config,
            state: CampaignState::new(title, description),
        };
        let event = CampaignEvent::CampaignCreated {
            id: ledger.config.id,
            creator: ledger.config.creator.clone(),
            title: ledger.state.title.clone(),
            goal: ledger.config.goal,
            deadline: ledger.config.deadline,
        };
        let created_at = ledger.config.created_at;
        let notification = ledger.emit(event, created_at);
        (ledger, notification)
    }

    /// Rebuild a ledger from stored parts without emitting anything.
    pub fn from_parts(config: CampaignConfig, state: CampaignState) -> Self {
        Self { config, state }
    }

    pub fn id(&self) -> CampaignId {
        self.config.id
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    pub fn state(&self) -> &CampaignState {
        &self.state
    }

    pub fn status(&self) -> CampaignStatus {
        self.state.status
    }

    pub fn total_pooled(&self) -> Amount {
        self.state.total_pooled
    }

    pub fn contribution_of(&self, contributor: &AccountId) -> Amount {
        self.state.contribution_of(contributor)
    }

    pub fn snapshot(&self) -> Campaign {
        Campaign::from_parts(&self.config, &self.state)
    }

    fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.config.deadline
    }

    fn emit(&mut self, event: CampaignEvent, now: Timestamp) -> Notification {
        let notification = Notification {
            sequence: self.state.next_sequence,
            emitted_at: now,
            event,
        };
        self.state.next_sequence += 1;
        notification
    }

    // ─────────────────────────────────────────────────────────
    // Contributions
    // ─────────────────────────────────────────────────────────

    /// Record `amount` from `contributor`, latching to `GoalReached` once the
    /// pool meets the goal.
    pub fn contribute(
        &mut self,
        contributor: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<Notification> {
        if self.has_ended(now) {
            return Err(LedgerError::CampaignEnded);
        }
        if self.state.status != CampaignStatus::Open {
            return Err(LedgerError::CampaignCompleted);
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroContribution);
        }

        let balance = self
            .contribution_of(contributor)
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        let total = self
            .state
            .total_pooled
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;

        self.state.contributions.insert(contributor.clone(), balance);
        self.state.total_pooled = total;
        if total >= self.config.goal {
            self.state.status = CampaignStatus::GoalReached;
            info!(campaign = %self.config.id, total = %total, goal = %self.config.goal, "campaign goal reached");
        }

        let event = CampaignEvent::ContributionMade {
            id: self.config.id,
            contributor: contributor.clone(),
            amount,
        };
        Ok(self.emit(event, now))
    }

    // ─────────────────────────────────────────────────────────
    // Claim
    // ─────────────────────────────────────────────────────────

    /// Validate a claim by `caller` and return the amount to pay out.
    pub fn check_claim(&self, caller: &AccountId) -> Result<Amount> {
        if *caller != self.config.creator {
            return Err(LedgerError::NotCreator);
        }
        match self.state.status {
            CampaignStatus::Open => return Err(LedgerError::GoalNotReached),
            CampaignStatus::Claimed => return Err(LedgerError::AlreadyClaimed),
            CampaignStatus::GoalReached => {}
        }
        if self.state.total_pooled.is_zero() {
            return Err(LedgerError::NothingToClaim);
        }
        Ok(self.state.total_pooled)
    }

    /// Mark the campaign claimed and drain the pool.
    ///
    /// Contributor entries are left untouched.
    pub fn commit_claim(&mut self, now: Timestamp) -> Notification {
        let amount = self.state.total_pooled;
        self.state.status = CampaignStatus::Claimed;
        self.state.total_pooled = Amount::ZERO;

        let event = CampaignEvent::FundsClaimed {
            id: self.config.id,
            creator: self.config.creator.clone(),
            amount,
        };
        self.emit(event, now)
    }

    // ─────────────────────────────────────────────────────────
    // Refund
    // ─────────────────────────────────────────────────────────

    /// Validate a refund to `caller` and return their outstanding balance.
    pub fn check_refund(&self, caller: &AccountId, now: Timestamp) -> Result<Amount> {
        if !self.has_ended(now) {
            return Err(LedgerError::CampaignNotEnded);
        }
        if self.state.status != CampaignStatus::Open {
            return Err(LedgerError::GoalWasReached);
        }
        let balance = self.contribution_of(caller);
        if balance.is_zero() {
            return Err(LedgerError::NoContribution);
        }
        if balance > self.state.total_pooled {
            return Err(LedgerError::PoolShortfall {
                balance,
                pooled: self.state.total_pooled,
            });
        }
        Ok(balance)
    }

    /// Zero `caller`'s balance and remove it from the pool.
    ///
    /// `amount` must be the value returned by [`Self::check_refund`] under the
    /// same lock, which bounds it by the pool.
    pub fn commit_refund(
        &mut self,
        caller: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Notification {
        self.state.contributions.remove(caller);
        self.state.total_pooled = self
            .state
            .total_pooled
            .checked_sub(amount)
            .unwrap_or(Amount::ZERO);

        let event = CampaignEvent::RefundIssued {
            id: self.config.id,
            contributor: caller.clone(),
            amount,
        };
        self.emit(event, now)
    }

    // ─────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────

    pub fn update_details(
        &mut self,
        caller: &AccountId,
        new_title: String,
        new_description: String,
        now: Timestamp,
    ) -> Result<Notification> {
        if *caller != self.config.creator {
            return Err(LedgerError::NotCreator);
        }
        if self.has_ended(now) {
            return Err(LedgerError::CampaignEnded);
        }
        if self.state.status != CampaignStatus::Open {
            return Err(LedgerError::CampaignCompleted);
        }

        self.state.title = new_title.clone();
        self.state.description = new_description.clone();

        let event = CampaignEvent::CampaignUpdated {
            id: self.config.id,
            new_title,
            new_description,
        };
        Ok(self.emit(event, now))
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn stats(&self, contributor: &AccountId, now: Timestamp) -> CampaignStats {
        let total = self.state.total_pooled;
        // `goal` is never zero; the creation path rejects it.
        let percent_of_goal = total.0.saturating_mul(100) / self.config.goal.0.max(1);
        CampaignStats {
            user_contribution: self.contribution_of(contributor),
            total_raised: total,
            percent_of_goal,
            remaining_time: now.saturating_until(self.config.deadline),
        }
    }
}
