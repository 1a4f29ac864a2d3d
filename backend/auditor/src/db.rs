//! Database layer — migrations, inserts and queries.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;
use crate::events::{AuditEvent, EventRecord};

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    // Make sure the file is created if it doesn't exist yet.
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

// ─────────────────────────────────────────────────────────
// Event writes
// ─────────────────────────────────────────────────────────

/// Persist a batch of decoded events in one transaction.  Events whose
/// `(campaign_id, sequence)` is already stored are silently ignored, so
/// recording the same notification twice is harmless.
pub async fn insert_events(pool: &SqlitePool, events: &[AuditEvent]) -> Result<usize> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;
    for ev in events {
        let rows_affected = sqlx::query(
            r#"
            INSERT OR IGNORE INTO events
                (event_type, campaign_id, sequence, actor, amount, payload, emitted_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&ev.event_type)
        .bind(ev.campaign_id)
        .bind(ev.sequence)
        .bind(&ev.actor)
        .bind(&ev.amount)
        .bind(&ev.payload)
        .bind(ev.emitted_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        count += rows_affected as usize;
    }
    tx.commit().await?;
    Ok(count)
}

// ─────────────────────────────────────────────────────────
// Event reads
// ─────────────────────────────────────────────────────────

/// Fetch all events for a given campaign, in emission order.
pub async fn get_events_for_campaign(
    pool: &SqlitePool,
    campaign_id: i64,
) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, campaign_id, sequence, actor, amount, payload,
               emitted_at, created_at
        FROM   events
        WHERE  campaign_id = ?1
        ORDER  BY sequence ASC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Fetch all events, in the order they were recorded.
pub async fn get_all_events(pool: &SqlitePool) -> Result<Vec<EventRecord>> {
    let rows = sqlx::query_as::<_, EventRecord>(
        r#"
        SELECT id, event_type, campaign_id, sequence, actor, amount, payload,
               emitted_at, created_at
        FROM   events
        ORDER  BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// First campaign id with nothing recorded after it, so a fresh registry
/// writing into an existing log does not collide with older campaigns.
pub async fn next_campaign_id(pool: &SqlitePool) -> Result<i64> {
    let next = sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(MAX(campaign_id) + 1, 0) FROM events",
    )
    .fetch_one(pool)
    .await?;
    Ok(next)
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // One connection: every connection to `:memory:` is its own database.
    init_pool("sqlite::memory:", 1).await.unwrap()
}
