// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community feed orchestration.
//!
//! Handles the core workflow:
//! 1. Resolve the viewer's following set (following mode only)
//! 2. Fetch the four activity sources concurrently
//! 3. Detect learning path completions
//! 4. Merge and sort into one timeline

use crate::db::FeedStore;
use crate::error::{AppError, Result};
use crate::models::ActivityItem;
use crate::services::follow::resolve_following;
use crate::services::path_completion::detect_path_completions;
use crate::services::sources::{
    fetch_events, fetch_exercise_completions, fetch_path_exercise_completions, fetch_routes,
    FeedLimits, FeedScope, FeedSource,
};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which users' activity the viewer wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FeedMode {
    #[default]
    All,
    Following,
}

impl FeedMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedMode::All => "all",
            FeedMode::Following => "following",
        }
    }
}

/// Result of one feed build.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    pub mode: FeedMode,
    /// Newest first
    pub items: Vec<ActivityItem>,
    /// Sources that failed and contributed nothing
    pub failed_sources: Vec<FeedSource>,
}

impl FeedSnapshot {
    pub fn is_partial(&self) -> bool {
        !self.failed_sources.is_empty()
    }
}

/// Builds viewer-scoped activity feeds from a [`FeedStore`].
#[derive(Debug, Clone)]
pub struct FeedService<S> {
    store: S,
    limits: FeedLimits,
}

impl<S: FeedStore> FeedService<S> {
    pub fn new(store: S, limits: FeedLimits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Build the feed for a viewer.
    ///
    /// In following mode, an empty following set scopes every source to
    /// nobody and the feed is empty; it does not fall back to everyone.
    ///
    /// Returns [`AppError::FeedUnavailable`] only if every source failed.
    pub async fn build_feed(&self, viewer_id: &str, mode: FeedMode) -> Result<FeedSnapshot> {
        let scope = match mode {
            FeedMode::All => FeedScope::Everyone,
            FeedMode::Following => {
                FeedScope::Actors(resolve_following(&self.store, viewer_id).await)
            }
        };

        let store = &self.store;
        let limits = self.limits;
        let scope = &scope;

        let (routes, events, exercises, paths) = tokio::join!(
            fetch_routes(store, scope, limits.routes),
            fetch_events(store, scope, limits.events),
            fetch_exercise_completions(store, scope, limits.exercise_completions),
            async {
                let records =
                    fetch_path_exercise_completions(store, scope, limits.path_exercise_completions)
                        .await?;
                detect_path_completions(store, records).await
            },
        );

        let (mut items, failed_sources) = merge_sources(vec![
            (FeedSource::Routes, routes),
            (FeedSource::Events, events),
            (FeedSource::ExerciseCompletions, exercises),
            (FeedSource::PathCompletions, paths),
        ]);

        if failed_sources.len() == FeedSource::ALL.len() {
            return Err(AppError::FeedUnavailable(failed_sources.len()));
        }

        sort_feed(&mut items);

        tracing::info!(
            viewer_id,
            mode = mode.as_str(),
            items = items.len(),
            failed = failed_sources.len(),
            "Feed built"
        );

        Ok(FeedSnapshot {
            mode,
            items,
            failed_sources,
        })
    }
}

/// Concatenate per-source results, logging and skipping failed sources.
///
/// No de-duplication across sources: a path completion and its underlying
/// exercise completions are all kept.
pub fn merge_sources(
    results: Vec<(FeedSource, Result<Vec<ActivityItem>>)>,
) -> (Vec<ActivityItem>, Vec<FeedSource>) {
    let mut items = Vec::new();
    let mut failed = Vec::new();

    for (source, result) in results {
        match result {
            Ok(source_items) => {
                tracing::debug!(
                    source = source.as_str(),
                    count = source_items.len(),
                    "Source fetched"
                );
                items.extend(source_items);
            }
            Err(e) => {
                tracing::warn!(source = source.as_str(), error = %e, "Source unavailable");
                failed.push(source);
            }
        }
    }

    (items, failed)
}

/// Newest first; ties broken by kind rank, then by id.
pub fn sort_feed(items: &mut [ActivityItem]) {
    items.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.kind().cmp(&b.kind()))
            .then_with(|| a.id.cmp(&b.id))
    });
}
