//! Audit demo — embeds a campaign registry in-process.
//!
//! Runs one funded and one failed campaign against an in-memory treasury and
//! a manual clock, records every notification into `DATABASE_URL` through
//! the recorder, then logs the summaries the read API would serve.

use campaign_ledger::{
    AccountId, Amount, CampaignId, CampaignRegistry, Clock, InMemoryTreasury, ManualClock,
    RegistrySnapshot, SystemClock, SECONDS_PER_DAY,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auditor::config::Config;
use auditor::db;
use auditor::events::CampaignSummary;
use auditor::recorder::{self, ChannelSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    let pool = db::init_pool(&config.database_url, config.max_connections).await?;

    // ─── Recorder ─────────────────────────────────────────
    let (sink, receiver) = ChannelSink::new();
    let recorder = tokio::spawn(recorder::run(
        pool.clone(),
        receiver,
        CancellationToken::new(),
    ));

    // Continue numbering after whatever the log already holds.
    let next_id = u64::try_from(db::next_campaign_id(&pool).await?)?;
    let snapshot = RegistrySnapshot {
        next_id,
        campaigns: Vec::new(),
    };

    let treasury = InMemoryTreasury::new();
    let clock = ManualClock::new(SystemClock.now());
    let creator = AccountId::from("creator");
    let (alice, bob) = (AccountId::from("alice"), AccountId::from("bob"));

    let (funded, failed) = {
        let registry = CampaignRegistry::restore(snapshot, treasury.clone(), clock.clone(), sink)?;

        let funded = registry
            .create_campaign(&creator, "Village well", "Dig a well", Amount(100), 7)
            .await?;
        let failed = registry
            .create_campaign(&creator, "School roof", "Fix the roof", Amount(1_000), 7)
            .await?;

        registry.contribute(funded, &alice, Amount(60)).await?;
        registry.contribute(funded, &bob, Amount(50)).await?;
        registry.contribute(failed, &alice, Amount(25)).await?;
        registry
            .update_campaign_details(failed, &creator, "School roof", "Fix the roof before winter")
            .await?;

        let claimed = registry.claim_funds(funded, &creator).await?;
        info!("Creator claimed {claimed} from campaign {funded}");

        clock.advance(7 * SECONDS_PER_DAY);
        let refunded = registry.get_refund(failed, &alice).await?;
        info!("Alice was refunded {refunded} from campaign {failed}");

        (funded, failed)
        // Dropping the registry closes the channel and stops the recorder.
    };

    let report = recorder.await?;
    if !report.unwritten.is_empty() {
        anyhow::bail!(
            "{} notifications could not be recorded",
            report.unwritten.len()
        );
    }
    info!("Recorded {} notifications", report.stored);

    for id in [funded, failed] {
        log_summary(&pool, id).await?;
    }
    info!(
        "Treasury paid out: creator {}, alice {}",
        treasury.balance_of(&creator),
        treasury.balance_of(&alice)
    );
    Ok(())
}

async fn log_summary(pool: &sqlx::SqlitePool, id: CampaignId) -> anyhow::Result<()> {
    let campaign_id = i64::try_from(id.0)?;
    let records = db::get_events_for_campaign(pool, campaign_id).await?;
    let summary = CampaignSummary::from_records(campaign_id, &records);
    info!(
        "Campaign {id}: {} events, contributed {}, refunded {}, claimed {}, pooled {}",
        summary.event_count, summary.contributed, summary.refunded, summary.claimed, summary.pooled
    );
    Ok(())
}
