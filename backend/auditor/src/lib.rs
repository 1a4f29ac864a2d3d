//! Campaign audit log.
//!
//! Consumes the notifications a [`campaign_ledger::CampaignRegistry`]
//! publishes, records them in SQLite, and serves the recorded feed over a
//! read-only REST API.
//!
//! The `auditor` binary only serves the API. Notifications are written by
//! the process that embeds the registry, through a [`recorder::ChannelSink`]
//! and a [`recorder::run`] task; `auditor-demo` does exactly that for a
//! scripted campaign lifecycle. Wiring a registry to the log:
//!
//! ```no_run
//! # async fn wire() -> auditor::errors::Result<()> {
//! use auditor::{db, recorder::{self, ChannelSink}};
//! use campaign_ledger::{CampaignRegistry, InMemoryTreasury, SystemClock};
//! use tokio_util::sync::CancellationToken;
//!
//! let pool = db::init_pool("sqlite:./campaign_audit.db", 5).await?;
//! let (sink, receiver) = ChannelSink::new();
//! tokio::spawn(recorder::run(pool, receiver, CancellationToken::new()));
//! let registry = CampaignRegistry::new(InMemoryTreasury::new(), SystemClock, sink);
//! # let _ = registry;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod recorder;
