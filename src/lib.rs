// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Community activity feed for the route-sharing and driving-practice app.
//!
//! This crate merges route and event creation, exercise completions and
//! inferred learning path completions into one viewer-scoped timeline, and
//! serves it to the app over an authenticated HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::{FeedService, FeedSessions};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub feed_service: FeedService<FirestoreDb>,
    pub feed_sessions: FeedSessions,
}
