// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Resolves who a viewer follows.

use crate::db::FeedStore;
use std::collections::HashSet;

/// Look up the set of user IDs the viewer follows.
///
/// Fails closed: a missing viewer ID or a failed lookup yields an empty set,
/// so callers treat "no graph" and "empty graph" the same way.
pub async fn resolve_following<S: FeedStore>(store: &S, viewer_id: &str) -> HashSet<String> {
    if viewer_id.is_empty() {
        tracing::debug!("No viewer ID, following set is empty");
        return HashSet::new();
    }

    match store.list_following(viewer_id).await {
        Ok(ids) => {
            let following: HashSet<String> = ids.into_iter().collect();
            tracing::debug!(viewer_id, count = following.len(), "Resolved following set");
            following
        }
        Err(e) => {
            tracing::warn!(viewer_id, error = %e, "Follow lookup failed, using empty set");
            HashSet::new()
        }
    }
}
