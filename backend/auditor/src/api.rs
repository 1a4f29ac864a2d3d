//! Axum REST API handlers over the recorded audit feed. Read-only.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db;
use crate::events::{CampaignSummary, EventRecord};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

/// Build the router with every audit route mounted.
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(get_all_events))
        .route("/campaigns/:id/events", get(get_campaign_events))
        .route("/campaigns/:id/summary", get(get_campaign_summary))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub record: EventRecord,
    pub emitted_at_utc: Option<String>,
}

impl From<EventRecord> for EventView {
    fn from(record: EventRecord) -> Self {
        let emitted_at_utc = record.emitted_at_rfc3339();
        EventView {
            record,
            emitted_at_utc,
        }
    }
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub campaign_id: i64,
    pub count: usize,
    pub events: Vec<EventView>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventView>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error })).into_response()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /campaigns/:id/events`
///
/// Returns the recorded feed of one campaign, in emission order.
pub async fn get_campaign_events(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<i64>,
) -> impl IntoResponse {
    match db::get_events_for_campaign(&state.pool, campaign_id).await {
        Ok(records) => {
            let events: Vec<EventView> = records.into_iter().map(EventView::from).collect();
            (
                StatusCode::OK,
                Json(EventsResponse {
                    campaign_id,
                    count: events.len(),
                    events,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /campaigns/:id/summary`
///
/// Money flow of one campaign derived from its feed; 404 when nothing was
/// recorded for it.
pub async fn get_campaign_summary(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<i64>,
) -> impl IntoResponse {
    match db::get_events_for_campaign(&state.pool, campaign_id).await {
        Ok(records) if records.is_empty() => error_response(
            StatusCode::NOT_FOUND,
            format!("no events recorded for campaign {campaign_id}"),
        ),
        Ok(records) => (
            StatusCode::OK,
            Json(CampaignSummary::from_records(campaign_id, &records)),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// `GET /events`
///
/// Returns all recorded events across all campaigns.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    match db::get_all_events(&state.pool).await {
        Ok(records) => {
            let events: Vec<EventView> = records.into_iter().map(EventView::from).collect();
            (
                StatusCode::OK,
                Json(AllEventsResponse {
                    count: events.len(),
                    events,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
