// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Learning path completion detection.
//!
//! There is no stored "path completed" record. Instead, a user's exercise
//! completions for a path are grouped and compared against the number of
//! exercises in the path; a full group yields one synthetic
//! `LearningPathCompleted` item.

use crate::db::FeedStore;
use crate::error::AppError;
use crate::models::{ActivityData, ActivityItem, ActivityUser, PathExerciseCompletionRecord};
use crate::services::sources::load_profiles;
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};

const MAX_CONCURRENT_PATH_LOOKUPS: usize = 16;

/// One user's completions for one learning path, one record per exercise.
#[derive(Debug, Clone)]
pub struct PathCompletionAggregate {
    pub learning_path_id: String,
    pub user_id: String,
    /// Ordered by completion time, oldest first
    pub completions: Vec<PathExerciseCompletionRecord>,
}

impl PathCompletionAggregate {
    pub fn completed_count(&self) -> usize {
        self.completions.len()
    }

    /// When the most recent distinct exercise was finished.
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.completions.last().map(|c| c.completed_at)
    }

    /// A path with no exercises is never complete.
    pub fn is_complete(&self, total_exercise_count: u32) -> bool {
        total_exercise_count > 0 && self.completed_count() >= total_exercise_count as usize
    }

    /// Deterministic raw id for the synthetic item.
    ///
    /// Both parts are percent-encoded so a `:` inside an id cannot make two
    /// different pairs collide.
    pub fn synthetic_id(&self) -> String {
        format!(
            "{}:{}",
            urlencoding::encode(&self.learning_path_id),
            urlencoding::encode(&self.user_id)
        )
    }
}

/// Group completions by `(learning_path_id, user_id)`.
///
/// Repeat completions of the same exercise count once, at their earliest
/// time. Output is ordered by path ID, then user ID.
pub fn aggregate_completions(
    records: Vec<PathExerciseCompletionRecord>,
) -> Vec<PathCompletionAggregate> {
    let mut groups: BTreeMap<(String, String), BTreeMap<String, PathExerciseCompletionRecord>> =
        BTreeMap::new();

    for record in records {
        let exercises = groups
            .entry((record.learning_path_id.clone(), record.user_id.clone()))
            .or_default();
        match exercises.get(&record.exercise_id) {
            Some(existing) if existing.completed_at <= record.completed_at => {}
            _ => {
                exercises.insert(record.exercise_id.clone(), record);
            }
        }
    }

    groups
        .into_iter()
        .map(|((learning_path_id, user_id), exercises)| {
            let mut completions: Vec<PathExerciseCompletionRecord> =
                exercises.into_values().collect();
            completions.sort_by(|a, b| {
                a.completed_at
                    .cmp(&b.completed_at)
                    .then_with(|| a.exercise_id.cmp(&b.exercise_id))
            });
            PathCompletionAggregate {
                learning_path_id,
                user_id,
                completions,
            }
        })
        .collect()
}

/// Resolved metadata needed to judge and describe a path.
#[derive(Debug, Clone)]
struct PathMetadata {
    title: String,
    total_exercise_count: u32,
}

/// Fetch a path's record and exercise count concurrently.
///
/// Returns `None` (and logs) if either lookup fails, or the path is gone or
/// deactivated.
async fn lookup_path<S: FeedStore>(store: &S, learning_path_id: &str) -> Option<PathMetadata> {
    let (path, count) = tokio::join!(
        store.get_learning_path(learning_path_id),
        store.count_path_exercises(learning_path_id),
    );

    let path = match path {
        Ok(Some(path)) if path.active => path,
        Ok(Some(_)) => {
            tracing::debug!(learning_path_id, "Learning path deactivated, skipping");
            return None;
        }
        Ok(None) => {
            tracing::debug!(learning_path_id, "Learning path not found, skipping");
            return None;
        }
        Err(e) => {
            tracing::warn!(learning_path_id, error = %e, "Learning path lookup failed, skipping");
            return None;
        }
    };

    match count {
        Ok(total_exercise_count) => Some(PathMetadata {
            title: path.title,
            total_exercise_count,
        }),
        Err(e) => {
            tracing::warn!(learning_path_id, error = %e, "Exercise count lookup failed, skipping");
            None
        }
    }
}

/// Synthesize `LearningPathCompleted` items from raw completions.
///
/// Path lookups that fail are skipped without error. Only a failed profile
/// lookup is returned as an error.
pub async fn detect_path_completions<S: FeedStore>(
    store: &S,
    records: Vec<PathExerciseCompletionRecord>,
) -> Result<Vec<ActivityItem>, AppError> {
    let aggregates = aggregate_completions(records);
    if aggregates.is_empty() {
        return Ok(Vec::new());
    }

    let path_ids: BTreeSet<String> = aggregates
        .iter()
        .map(|a| a.learning_path_id.clone())
        .collect();

    let metadata: HashMap<String, PathMetadata> = stream::iter(path_ids)
        .map(|id: String| async move {
            let meta = lookup_path(store, &id).await;
            (id, meta)
        })
        .buffer_unordered(MAX_CONCURRENT_PATH_LOOKUPS)
        .filter_map(|(id, meta)| async move { meta.map(|m| (id, m)) })
        .collect()
        .await;

    let completed: Vec<(&PathCompletionAggregate, &PathMetadata)> = aggregates
        .iter()
        .filter_map(|aggregate| {
            let meta = metadata.get(aggregate.learning_path_id.as_str())?;
            aggregate
                .is_complete(meta.total_exercise_count)
                .then_some((aggregate, meta))
        })
        .collect();

    if completed.is_empty() {
        return Ok(Vec::new());
    }

    let profiles = load_profiles(store, completed.iter().map(|(a, _)| &a.user_id)).await?;

    let items: Vec<ActivityItem> = completed
        .into_iter()
        .filter_map(|(aggregate, meta)| {
            let user = ActivityUser::from(profiles.get(&aggregate.user_id)?);
            let created_at = aggregate.last_completed_at()?;
            Some(ActivityItem::new(
                &aggregate.synthetic_id(),
                user,
                created_at,
                ActivityData::LearningPathCompleted {
                    learning_path_id: aggregate.learning_path_id.clone(),
                    title: meta.title.clone(),
                    exercise_count: meta.total_exercise_count,
                },
            ))
        })
        .collect();

    tracing::debug!(
        groups = aggregates.len(),
        completed = items.len(),
        "Detected learning path completions"
    );

    Ok(items)
}
