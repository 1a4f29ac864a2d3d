//! Notifications emitted by the ledger for external observers.
//!
//! Every committed transition publishes exactly one [`Notification`] to the
//! registry's [`EventSink`]. Notifications of one campaign carry consecutive
//! sequence numbers starting at 0 and are published while the campaign is
//! locked, so a sink observes them in commit order.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Amount, CampaignId, Timestamp};

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CampaignEvent {
    CampaignCreated {
        id: CampaignId,
        creator: AccountId,
        title: String,
        goal: Amount,
        deadline: Timestamp,
    },
    ContributionMade {
        id: CampaignId,
        contributor: AccountId,
        amount: Amount,
    },
    FundsClaimed {
        id: CampaignId,
        creator: AccountId,
        amount: Amount,
    },
    RefundIssued {
        id: CampaignId,
        contributor: AccountId,
        amount: Amount,
    },
    CampaignUpdated {
        id: CampaignId,
        new_title: String,
        new_description: String,
    },
}

impl CampaignEvent {
    pub fn campaign_id(&self) -> CampaignId {
        match self {
            CampaignEvent::CampaignCreated { id, .. }
            | CampaignEvent::ContributionMade { id, .. }
            | CampaignEvent::FundsClaimed { id, .. }
            | CampaignEvent::RefundIssued { id, .. }
            | CampaignEvent::CampaignUpdated { id, .. } => *id,
        }
    }

    /// Short identifier, stable across releases; used as the audit `event_type`.
    pub fn name(&self) -> &'static str {
        match self {
            CampaignEvent::CampaignCreated { .. } => "campaign_created",
            CampaignEvent::ContributionMade { .. } => "contribution_made",
            CampaignEvent::FundsClaimed { .. } => "funds_claimed",
            CampaignEvent::RefundIssued { .. } => "refund_issued",
            CampaignEvent::CampaignUpdated { .. } => "campaign_updated",
        }
    }

    /// The account that triggered the event.
    pub fn actor(&self) -> Option<&AccountId> {
        match self {
            CampaignEvent::CampaignCreated { creator, .. }
            | CampaignEvent::FundsClaimed { creator, .. } => Some(creator),
            CampaignEvent::ContributionMade { contributor, .. }
            | CampaignEvent::RefundIssued { contributor, .. } => Some(contributor),
            CampaignEvent::CampaignUpdated { .. } => None,
        }
    }

    /// The amount moved (or, for creation, the goal).
    pub fn amount(&self) -> Option<Amount> {
        match self {
            CampaignEvent::CampaignCreated { goal, .. } => Some(*goal),
            CampaignEvent::ContributionMade { amount, .. }
            | CampaignEvent::FundsClaimed { amount, .. }
            | CampaignEvent::RefundIssued { amount, .. } => Some(*amount),
            CampaignEvent::CampaignUpdated { .. } => None,
        }
    }
}

/// A [`CampaignEvent`] stamped with its position in the campaign's history.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub sequence: u64,
    pub emitted_at: Timestamp,
    pub event: CampaignEvent,
}

/// Consumer of ledger notifications (audit log, UI feed).
///
/// `publish` is called with the campaign lock held and must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn publish(&self, notification: Notification) {
        (**self).publish(notification);
    }
}

/// Sink that keeps every notification in memory, in publication order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Notifications of a single campaign, in publication order.
    pub fn for_campaign(&self, id: CampaignId) -> Vec<Notification> {
        self.all()
            .into_iter()
            .filter(|n| n.event.campaign_id() == id)
            .collect()
    }

    pub fn last(&self) -> Option<Notification> {
        self.all().pop()
    }

    pub fn len(&self) -> usize {
        self.notifications
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for MemorySink {
    fn publish(&self, notification: Notification) {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push(notification);
        }
    }
}
