// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-viewer feed state with stale-result protection.
//!
//! Every refresh takes a new generation token. When a build finishes, its
//! result becomes the visible feed only if no newer refresh has been issued
//! since, so a slow response can never overwrite a fresher one.

use crate::db::FeedStore;
use crate::error::Result;
use crate::services::feed::{FeedMode, FeedService, FeedSnapshot};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// The feed currently presented to a viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleFeed {
    /// Generation token of the refresh that produced this feed
    pub generation: u64,
    pub snapshot: FeedSnapshot,
}

/// What happened to a refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// This refresh is now the visible feed.
    Applied(VisibleFeed),
    /// A newer refresh was issued while this one ran; its result was
    /// discarded. Carries whatever is visible right now.
    Stale {
        generation: u64,
        current: Option<VisibleFeed>,
    },
}

impl RefreshOutcome {
    /// The feed to show after this refresh, if any.
    pub fn visible(&self) -> Option<&VisibleFeed> {
        match self {
            RefreshOutcome::Applied(feed) => Some(feed),
            RefreshOutcome::Stale { current, .. } => current.as_ref(),
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RefreshOutcome::Stale { .. })
    }
}

/// One viewer's feed: selected mode, latest issued token, visible state.
#[derive(Debug)]
pub struct FeedSession {
    viewer_id: String,
    mode: RwLock<FeedMode>,
    latest_generation: AtomicU64,
    visible: RwLock<Option<VisibleFeed>>,
    last_access: Mutex<Instant>,
}

impl FeedSession {
    pub fn new(viewer_id: impl Into<String>, mode: FeedMode) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            mode: RwLock::new(mode),
            latest_generation: AtomicU64::new(0),
            visible: RwLock::new(None),
            last_access: Mutex::new(Instant::now()),
        }
    }

    pub fn viewer_id(&self) -> &str {
        &self.viewer_id
    }

    pub async fn mode(&self) -> FeedMode {
        *self.mode.read().await
    }

    /// Latest generation token issued (0 before the first refresh).
    pub fn latest_generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// The feed currently visible, if any refresh has been applied.
    pub async fn current(&self) -> Option<VisibleFeed> {
        self.visible.read().await.clone()
    }

    /// Mark the session as used now.
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_access.lock() {
            *last = Instant::now();
        }
    }

    /// Time since the session was last used.
    pub fn idle_for(&self) -> Duration {
        self.last_access
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// The feed for `requested` (or the current mode), reusing the visible
    /// feed only when it was built for that mode.
    ///
    /// A failed `set_mode` leaves the new mode selected with the old feed
    /// visible; this rebuilds in that case instead of serving the old feed.
    pub async fn load<S: FeedStore>(
        &self,
        service: &FeedService<S>,
        requested: Option<FeedMode>,
    ) -> Result<RefreshOutcome> {
        let current_mode = self.mode().await;
        let mode = requested.unwrap_or(current_mode);

        if mode != current_mode {
            return self.set_mode(service, mode).await;
        }

        match self.current().await {
            Some(feed) if feed.snapshot.mode == mode => Ok(RefreshOutcome::Applied(feed)),
            _ => self.refresh(service).await,
        }
    }

    /// Switch mode and rebuild the feed for it.
    pub async fn set_mode<S: FeedStore>(
        &self,
        service: &FeedService<S>,
        mode: FeedMode,
    ) -> Result<RefreshOutcome> {
        {
            let mut current = self.mode.write().await;
            if *current != mode {
                tracing::debug!(
                    viewer_id = %self.viewer_id,
                    from = current.as_str(),
                    to = mode.as_str(),
                    "Feed mode changed"
                );
            }
            *current = mode;
        }
        self.refresh(service).await
    }

    /// Rebuild the feed for the current mode.
    ///
    /// A failed build only surfaces as an error if it is still the latest
    /// refresh; the previously visible feed is left untouched either way.
    pub async fn refresh<S: FeedStore>(&self, service: &FeedService<S>) -> Result<RefreshOutcome> {
        // Token order matches mode-read order.
        let (generation, mode) = {
            let mode = self.mode.read().await;
            let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
            (generation, *mode)
        };

        tracing::debug!(
            viewer_id = %self.viewer_id,
            generation,
            mode = mode.as_str(),
            "Feed refresh started"
        );

        let result = service.build_feed(&self.viewer_id, mode).await;

        let mut visible = self.visible.write().await;
        let superseded = generation != self.latest_generation.load(Ordering::SeqCst)
            || visible.as_ref().is_some_and(|v| v.generation > generation);

        if superseded {
            tracing::debug!(
                viewer_id = %self.viewer_id,
                generation,
                latest = self.latest_generation.load(Ordering::SeqCst),
                "Discarding stale feed result"
            );
            return Ok(RefreshOutcome::Stale {
                generation,
                current: visible.clone(),
            });
        }

        let feed = VisibleFeed {
            generation,
            snapshot: result?,
        };
        *visible = Some(feed.clone());
        Ok(RefreshOutcome::Applied(feed))
    }
}

/// Feed sessions keyed by viewer ID.
#[derive(Debug, Default, Clone)]
pub struct FeedSessions {
    sessions: Arc<DashMap<String, Arc<FeedSession>>>,
}

impl FeedSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing session for the viewer, or a new one in the default mode.
    /// Either way the session is marked as used.
    pub fn get_or_create(&self, viewer_id: &str) -> Arc<FeedSession> {
        let session = self
            .sessions
            .entry(viewer_id.to_string())
            .or_insert_with(|| Arc::new(FeedSession::new(viewer_id, FeedMode::default())))
            .clone();
        session.touch();
        session
    }

    /// Drop sessions unused for longer than `max_idle`. Returns how many
    /// were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.idle_for() <= max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.sessions.len(), "Evicted idle feed sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
