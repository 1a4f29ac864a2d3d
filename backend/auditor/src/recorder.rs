//! Background task that drains ledger notifications into the audit log.
//!
//! The ledger publishes synchronously while it holds a campaign lock, so
//! [`ChannelSink`] only enqueues; the [`run`] loop does the database work.

use std::time::Duration;

use campaign_ledger::{EventSink, Notification};
use sqlx::SqlitePool;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::db;
use crate::errors::Result;
use crate::events::AuditEvent;

/// Upper bound on notifications written in one transaction.
const MAX_BATCH: usize = 256;

/// First pause after a failed write; doubled on every further failure.
const RETRY_BACKOFF: Duration = Duration::from_millis(100);
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// [`EventSink`] that forwards notifications to a recorder task.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn publish(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            warn!(
                campaign = %e.0.event.campaign_id(),
                sequence = e.0.sequence,
                "Audit recorder stopped; notification not recorded"
            );
        }
    }
}

/// Outcome of a recorder run.
#[derive(Debug, Default)]
pub struct RecorderReport {
    /// Newly stored rows.
    pub stored: usize,
    /// Notifications still unwritten when the recorder was shut down, in
    /// publication order. Hand them to another recorder to keep the log whole.
    pub unwritten: Vec<Notification>,
}

/// Record notifications until every sender is dropped or `shutdown` fires.
///
/// A batch whose write fails is retried with backoff before anything newer
/// is read, so the log never skips a notification. On shutdown, notifications
/// already queued get one more write attempt; whatever still cannot be stored
/// is returned in [`RecorderReport::unwritten`].
pub async fn run(
    pool: SqlitePool,
    mut receiver: UnboundedReceiver<Notification>,
    shutdown: CancellationToken,
) -> RecorderReport {
    info!("Audit recorder started");
    let mut report = RecorderReport::default();

    'recv: loop {
        let first = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = receiver.recv() => match next {
                Some(notification) => notification,
                None => break,
            },
        };

        let mut batch = vec![first];
        while batch.len() < MAX_BATCH {
            match receiver.try_recv() {
                Ok(notification) => batch.push(notification),
                Err(_) => break,
            }
        }

        let mut backoff = RETRY_BACKOFF;
        loop {
            match record_batch(&pool, &batch).await {
                Ok(stored) => {
                    report.stored += stored;
                    break;
                }
                Err(e) => {
                    warn!(
                        "Audit write error, retrying {} notifications in {backoff:?}: {e}",
                        batch.len()
                    );
                    tokio::select! {
                        _ = shutdown.cancelled() => {
                            report.unwritten.append(&mut batch);
                            break 'recv;
                        }
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_RETRY_BACKOFF);
                }
            }
        }
    }

    // Flush whatever was queued before the stop.
    receiver.close();
    let mut rest = Vec::new();
    while let Some(notification) = receiver.recv().await {
        rest.push(notification);
    }
    if !rest.is_empty() {
        match record_batch(&pool, &rest).await {
            Ok(stored) => report.stored += stored,
            Err(e) => {
                error!("Audit write error during shutdown: {e}");
                report.unwritten.extend(rest);
            }
        }
    }

    if !report.unwritten.is_empty() {
        error!(
            "Audit recorder stopped with {} unwritten notifications",
            report.unwritten.len()
        );
    }
    info!("Audit recorder stopped after {} records", report.stored);
    report
}

/// Decode and store one batch. Undecodable notifications are logged and skipped.
async fn record_batch(pool: &SqlitePool, batch: &[Notification]) -> Result<usize> {
    let decoded: Vec<AuditEvent> = batch
        .iter()
        .filter_map(|notification| match AuditEvent::from_notification(notification) {
            Ok(event) => Some(event),
            Err(e) => {
                error!("Skipping notification: {e}");
                None
            }
        })
        .collect();

    let inserted = db::insert_events(pool, &decoded).await?;
    info!(
        "Received {} notifications → {} new records stored",
        batch.len(),
        inserted
    );
    Ok(inserted)
}
