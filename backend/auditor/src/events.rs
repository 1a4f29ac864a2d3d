//! Audit rows derived from campaign ledger notifications.

use campaign_ledger::Notification;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::errors::{AuditError, Result};

/// All recognised event kinds, keyed by the ledger's event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    CampaignCreated,
    ContributionMade,
    FundsClaimed,
    RefundIssued,
    CampaignUpdated,
    /// A stored event type this build does not know.
    Unknown,
}

impl EventKind {
    /// Parse a stored `event_type` back into an [`EventKind`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "campaign_created" => Self::CampaignCreated,
            "contribution_made" => Self::ContributionMade,
            "funds_claimed" => Self::FundsClaimed,
            "refund_issued" => Self::RefundIssued,
            "campaign_updated" => Self::CampaignUpdated,
            _ => Self::Unknown,
        }
    }
}

/// A decoded notification, ready to be stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub campaign_id: i64,
    pub sequence: i64,
    pub actor: Option<String>,
    /// Decimal string; amounts can exceed SQLite's integer range.
    pub amount: Option<String>,
    /// The full event as JSON.
    pub payload: String,
    pub emitted_at: i64,
}

impl AuditEvent {
    pub fn from_notification(notification: &Notification) -> Result<Self> {
        let event = &notification.event;
        Ok(AuditEvent {
            event_type: event.name().to_string(),
            campaign_id: to_i64(event.campaign_id().0, "campaign id")?,
            sequence: to_i64(notification.sequence, "sequence")?,
            actor: event.actor().map(|actor| actor.as_str().to_owned()),
            amount: event.amount().map(|amount| amount.to_string()),
            payload: serde_json::to_string(event)?,
            emitted_at: to_i64(notification.emitted_at.0, "timestamp")?,
        })
    }
}

fn to_i64(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| AuditError::EventDecode(format!("{what} {value} exceeds the storable range")))
}

/// An event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_type: String,
    pub campaign_id: i64,
    pub sequence: i64,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub emitted_at: i64,
    pub created_at: i64,
}

impl EventRecord {
    pub fn kind(&self) -> EventKind {
        EventKind::from_name(&self.event_type)
    }

    pub fn amount_value(&self) -> Option<u128> {
        self.amount.as_deref().and_then(|a| a.parse().ok())
    }

    /// `emitted_at` rendered as RFC 3339 UTC.
    pub fn emitted_at_rfc3339(&self) -> Option<String> {
        DateTime::from_timestamp(self.emitted_at, 0).map(|dt| dt.to_rfc3339())
    }
}

/// Money flow of one campaign, reconstructed from its recorded feed.
///
/// Amounts are decimal strings for the same reason as in [`AuditEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub campaign_id: i64,
    pub event_count: usize,
    pub goal: Option<String>,
    pub contributed: String,
    pub refunded: String,
    pub claimed: String,
    /// `contributed - refunded - claimed`: what the feed says is still pooled.
    pub pooled: String,
    pub last_sequence: Option<i64>,
}

impl CampaignSummary {
    pub fn from_records(campaign_id: i64, records: &[EventRecord]) -> Self {
        let mut goal = None;
        let (mut contributed, mut refunded, mut claimed) = (0u128, 0u128, 0u128);
        for record in records {
            let amount = record.amount_value().unwrap_or(0);
            match record.kind() {
                EventKind::CampaignCreated => goal = record.amount.clone(),
                EventKind::ContributionMade => contributed = contributed.saturating_add(amount),
                EventKind::RefundIssued => refunded = refunded.saturating_add(amount),
                EventKind::FundsClaimed => claimed = claimed.saturating_add(amount),
                EventKind::CampaignUpdated | EventKind::Unknown => {}
            }
        }
        let pooled = contributed.saturating_sub(refunded).saturating_sub(claimed);
        CampaignSummary {
            campaign_id,
            event_count: records.len(),
            goal,
            contributed: contributed.to_string(),
            refunded: refunded.to_string(),
            claimed: claimed.to_string(),
            pooled: pooled.to_string(),
            last_sequence: records.iter().map(|r| r.sequence).max(),
        }
    }
}
