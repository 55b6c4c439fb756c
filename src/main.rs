// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community Feed API Server
//!
//! Serves the merged activity timeline (routes, events, exercise and
//! learning path completions) to the mobile app.

use community_feed::{
    config::Config,
    db::FirestoreDb,
    services::{FeedService, FeedSessions},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Community Feed API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    tracing::info!(
        routes = config.feed_limits.routes,
        events = config.feed_limits.events,
        exercise_completions = config.feed_limits.exercise_completions,
        path_exercise_completions = config.feed_limits.path_exercise_completions,
        "Feed source limits"
    );
    let feed_service = FeedService::new(db, config.feed_limits);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        feed_service,
        feed_sessions: FeedSessions::new(),
    });

    spawn_session_eviction(state.clone());

    // Build router
    let app = community_feed::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drop feed sessions nobody has used recently.
fn spawn_session_eviction(state: Arc<AppState>) {
    let max_idle = state.config.session_idle_timeout;
    tokio::spawn(async move {
        // interval() panics on a zero period
        let period = (max_idle / 4).max(std::time::Duration::from_secs(1));
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            state.feed_sessions.evict_idle(max_idle);
        }
    });
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("community_feed=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
