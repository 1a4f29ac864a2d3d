//! # Types
//!
//! Shared data structures used across the campaign ledger.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A campaign is held internally as two parts:
//!
//! - [`CampaignConfig`] — written once at creation; never mutated.
//! - [`CampaignState`] — mutated by contributions, claims, refunds and
//!   metadata edits.
//!
//! The public API exposes the reconstructed [`Campaign`] struct for convenience.
//!
//! ### Status as a one-way latch
//!
//! [`CampaignStatus`] only moves forward:
//!
//! ```text
//! Open ──► GoalReached ──► Claimed
//! ```
//!
//! A campaign whose deadline passes while still `Open` stays `Open`; expiry is
//! derived from the clock, not stored.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of one campaign day, in clock units (seconds).
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Identifier of a campaign, allocated by the registry and never reused.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CampaignId(pub u64);

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of an account (creator or contributor).
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A non-negative monetary amount in the ledger's single asset.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

/// A point in time, in seconds.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Seconds from `self` until `later`, or zero if `later` is not after `self`.
    pub fn saturating_until(self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a campaign.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum CampaignStatus {
    /// Accepting contributions; the goal has not been reached.
    #[default]
    Open,
    /// Goal met or exceeded. The creator may claim; refunds are closed.
    GoalReached,
    /// Pool paid out to the creator. Terminal.
    Claimed,
}

impl CampaignStatus {
    /// Position in the forward-only lifecycle.
    pub fn rank(self) -> u8 {
        match self {
            CampaignStatus::Open => 0,
            CampaignStatus::GoalReached => 1,
            CampaignStatus::Claimed => 2,
        }
    }
}

/// Immutable campaign configuration, written once at creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CampaignConfig {
    pub id: CampaignId,
    pub creator: AccountId,
    pub goal: Amount,
    pub created_at: Timestamp,
    pub deadline: Timestamp,
}

/// Mutable campaign state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CampaignState {
    pub title: String,
    pub description: String,
    pub total_pooled: Amount,
    pub status: CampaignStatus,
    /// Outstanding balance per contributor. Claims drain `total_pooled` only,
    /// so entries keep their historical values after a claim.
    pub contributions: BTreeMap<AccountId, Amount>,
    /// Sequence number the next emitted notification of this campaign will carry.
    pub next_sequence: u64,
}

impl CampaignState {
    pub fn new(title: String, description: String) -> Self {
        Self {
            title,
            description,
            total_pooled: Amount::ZERO,
            status: CampaignStatus::Open,
            contributions: BTreeMap::new(),
            next_sequence: 0,
        }
    }

    /// Outstanding balance of `contributor`, zero when absent.
    pub fn contribution_of(&self, contributor: &AccountId) -> Amount {
        self.contributions
            .get(contributor)
            .copied()
            .unwrap_or_default()
    }
}

/// Full representation of a campaign.
///
/// Used as the public query type; reconstructed from the config and state.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    /// Unique identifier (auto-incremented).
    pub id: CampaignId,
    /// Account entitled to claim the pool on success.
    pub creator: AccountId,
    pub title: String,
    pub description: String,
    /// Funding target; reaching it latches the campaign to `GoalReached`.
    pub goal: Amount,
    /// Creation time.
    pub created_at: Timestamp,
    /// Contributions are accepted strictly before this instant.
    pub deadline: Timestamp,
    /// Sum of live contributions.
    pub total_pooled: Amount,
    pub status: CampaignStatus,
    pub contributions: BTreeMap<AccountId, Amount>,
}

impl Campaign {
    pub fn from_parts(config: &CampaignConfig, state: &CampaignState) -> Self {
        Self {
            id: config.id,
            creator: config.creator.clone(),
            title: state.title.clone(),
            description: state.description.clone(),
            goal: config.goal,
            created_at: config.created_at,
            deadline: config.deadline,
            total_pooled: state.total_pooled,
            status: state.status,
            contributions: state.contributions.clone(),
        }
    }
}

/// Read-only per-contributor view of a campaign.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub user_contribution: Amount,
    pub total_raised: Amount,
    /// `floor(total_raised * 100 / goal)`. Not clamped: overfunded campaigns
    /// report more than 100.
    pub percent_of_goal: u128,
    /// Seconds left before the deadline, zero once it has passed.
    pub remaining_time: u64,
}
