// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::ActivityItem;
use crate::services::{FeedMode, FeedSource, RefreshOutcome};
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/feed", get(get_feed))
        .route("/api/feed/mode", get(get_mode).put(set_mode))
        .route("/api/feed/refresh", post(refresh_feed))
}

// ─── Feed ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FeedQuery {
    /// Switch to this mode before returning the feed
    mode: Option<FeedMode>,
}

/// Feed response.
#[derive(Serialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FeedResponse {
    pub mode: FeedMode,
    /// Generation token of the refresh that produced `items`
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub generation: u64,
    /// Newest first
    pub items: Vec<ActivityItem>,
    /// Sources that failed; the feed is partial if non-empty
    pub failed_sources: Vec<FeedSource>,
    /// True if this request's refresh was superseded by a newer one
    pub stale: bool,
}

impl FeedResponse {
    fn from_outcome(outcome: RefreshOutcome, mode: FeedMode) -> Self {
        let stale = outcome.is_stale();
        match outcome {
            RefreshOutcome::Applied(feed)
            | RefreshOutcome::Stale {
                current: Some(feed),
                ..
            } => Self {
                mode: feed.snapshot.mode,
                generation: feed.generation,
                items: feed.snapshot.items,
                failed_sources: feed.snapshot.failed_sources,
                stale,
            },
            // Superseded before anything was ever shown
            RefreshOutcome::Stale {
                generation,
                current: None,
            } => Self {
                mode,
                generation,
                items: Vec::new(),
                failed_sources: Vec::new(),
                stale,
            },
        }
    }
}

/// Get the viewer's feed.
///
/// Returns the visible feed, building it when none exists for the selected
/// mode. Passing `mode` switches mode (and rebuilds) when it differs from the
/// current one.
async fn get_feed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    params: std::result::Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<FeedResponse>> {
    let Query(params) = params.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let session = state.feed_sessions.get_or_create(&user.user_id);

    tracing::debug!(
        user_id = %user.user_id,
        requested = ?params.mode,
        "Fetching feed"
    );

    let outcome = session.load(&state.feed_service, params.mode).await?;

    let mode = session.mode().await;
    Ok(Json(FeedResponse::from_outcome(outcome, mode)))
}

/// Rebuild the viewer's feed in the current mode.
async fn refresh_feed(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FeedResponse>> {
    let session = state.feed_sessions.get_or_create(&user.user_id);
    let outcome = session.refresh(&state.feed_service).await?;
    let mode = session.mode().await;
    Ok(Json(FeedResponse::from_outcome(outcome, mode)))
}

// ─── Feed Mode ───────────────────────────────────────────────

/// Current feed mode.
#[derive(Serialize, Deserialize, Debug)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ModeBody {
    pub mode: FeedMode,
}

async fn get_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<ModeBody> {
    let session = state.feed_sessions.get_or_create(&user.user_id);
    Json(ModeBody {
        mode: session.mode().await,
    })
}

/// Switch feed mode and return the rebuilt feed.
async fn set_mode(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: std::result::Result<Json<ModeBody>, JsonRejection>,
) -> Result<Json<FeedResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    tracing::info!(user_id = %user.user_id, mode = body.mode.as_str(), "Setting feed mode");

    let session = state.feed_sessions.get_or_create(&user.user_id);
    let outcome = session.set_mode(&state.feed_service, body.mode).await?;
    let mode = session.mode().await;
    Ok(Json(FeedResponse::from_outcome(outcome, mode)))
}
