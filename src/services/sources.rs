// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-source activity fetchers.
//!
//! Each fetcher pushes the viewer's scope down into the store query, then
//! joins the rows with the acting user's public profile. Rows whose user
//! can no longer be resolved are dropped.
//!
//! Limits are applied by the store before the global sort, so a busy source
//! can crowd out older items that would otherwise have outranked another
//! source's items. That truncation is accepted.

use crate::db::{FeedStore, SourceQuery};
use crate::error::AppError;
use crate::models::{
    ActivityData, ActivityItem, ActivityUser, PathExerciseCompletionRecord, UserProfile,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The independent data sources merged into the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum FeedSource {
    Routes,
    Events,
    ExerciseCompletions,
    PathCompletions,
}

impl FeedSource {
    pub const ALL: [FeedSource; 4] = [
        FeedSource::Routes,
        FeedSource::Events,
        FeedSource::ExerciseCompletions,
        FeedSource::PathCompletions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedSource::Routes => "routes",
            FeedSource::Events => "events",
            FeedSource::ExerciseCompletions => "exercise_completions",
            FeedSource::PathCompletions => "path_completions",
        }
    }
}

/// Whose activity a fetch may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Everyone,
    /// Only these actors. An empty set matches nothing.
    Actors(HashSet<String>),
}

impl FeedScope {
    /// Store query for this scope. Actor IDs are sorted so identical scopes
    /// always produce identical queries.
    pub fn query(&self, limit: u32) -> SourceQuery {
        match self {
            FeedScope::Everyone => SourceQuery::everyone(limit),
            FeedScope::Actors(ids) => {
                let mut actors: Vec<String> = ids.iter().cloned().collect();
                actors.sort();
                SourceQuery::actors(actors, limit)
            }
        }
    }
}

/// Per-source row limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedLimits {
    pub routes: u32,
    pub events: u32,
    pub exercise_completions: u32,
    /// Raw rows fed to path completion detection
    pub path_exercise_completions: u32,
}

impl Default for FeedLimits {
    fn default() -> Self {
        Self {
            routes: 30,
            events: 30,
            exercise_completions: 50,
            path_exercise_completions: 100,
        }
    }
}

/// Recently created routes.
pub async fn fetch_routes<S: FeedStore>(
    store: &S,
    scope: &FeedScope,
    limit: u32,
) -> Result<Vec<ActivityItem>, AppError> {
    let query = scope.query(limit);
    if query.matches_nothing() {
        return Ok(Vec::new());
    }

    let routes: Vec<_> = store
        .list_routes(&query)
        .await?
        .into_iter()
        .filter(|r| r.visibility.is_feed_visible())
        .collect();
    let profiles = load_profiles(store, routes.iter().map(|r| &r.creator_id)).await?;

    Ok(attach_users(
        FeedSource::Routes,
        routes,
        &profiles,
        |r| &r.creator_id,
        |r, user| {
            ActivityItem::new(
                &r.id,
                user,
                r.created_at,
                ActivityData::RouteCreated {
                    route_id: r.id.clone(),
                    name: r.name,
                    description: r.description,
                    difficulty: r.difficulty,
                },
            )
        },
    ))
}

/// Recently created events.
pub async fn fetch_events<S: FeedStore>(
    store: &S,
    scope: &FeedScope,
    limit: u32,
) -> Result<Vec<ActivityItem>, AppError> {
    let query = scope.query(limit);
    if query.matches_nothing() {
        return Ok(Vec::new());
    }

    let events: Vec<_> = store
        .list_events(&query)
        .await?
        .into_iter()
        .filter(|e| e.visibility.is_feed_visible())
        .collect();
    let profiles = load_profiles(store, events.iter().map(|e| &e.created_by)).await?;

    Ok(attach_users(
        FeedSource::Events,
        events,
        &profiles,
        |e| &e.created_by,
        |e, user| {
            ActivityItem::new(
                &e.id,
                user,
                e.created_at,
                ActivityData::EventCreated {
                    event_id: e.id.clone(),
                    title: e.title,
                    description: e.description,
                    location: e.location,
                    event_date: e.event_date,
                },
            )
        },
    ))
}

/// Recently completed single exercises.
pub async fn fetch_exercise_completions<S: FeedStore>(
    store: &S,
    scope: &FeedScope,
    limit: u32,
) -> Result<Vec<ActivityItem>, AppError> {
    let query = scope.query(limit);
    if query.matches_nothing() {
        return Ok(Vec::new());
    }

    let completions = store.list_exercise_completions(&query).await?;
    let profiles = load_profiles(store, completions.iter().map(|c| &c.user_id)).await?;

    Ok(attach_users(
        FeedSource::ExerciseCompletions,
        completions,
        &profiles,
        |c| &c.user_id,
        |c, user| {
            ActivityItem::new(
                &c.id,
                user,
                c.completed_at,
                ActivityData::ExerciseCompleted {
                    completion_id: c.id.clone(),
                    exercise_id: c.exercise_id,
                    exercise_title: c.exercise_title,
                    route_id: c.route_id,
                },
            )
        },
    ))
}

/// Raw learning path exercise completions, input to completion detection.
pub async fn fetch_path_exercise_completions<S: FeedStore>(
    store: &S,
    scope: &FeedScope,
    limit: u32,
) -> Result<Vec<PathExerciseCompletionRecord>, AppError> {
    let query = scope.query(limit);
    if query.matches_nothing() {
        return Ok(Vec::new());
    }
    store.list_path_exercise_completions(&query).await
}

/// Fetch profiles for the distinct actors in a batch of rows.
pub(crate) async fn load_profiles<'a, S: FeedStore>(
    store: &S,
    actor_ids: impl Iterator<Item = &'a String>,
) -> Result<HashMap<String, UserProfile>, AppError> {
    let mut ids: Vec<String> = actor_ids
        .collect::<HashSet<_>>()
        .into_iter()
        .cloned()
        .collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    ids.sort();
    store.get_profiles(&ids).await
}

/// Build feed items for rows whose actor has a profile, dropping the rest.
fn attach_users<T>(
    source: FeedSource,
    records: Vec<T>,
    profiles: &HashMap<String, UserProfile>,
    actor_id: impl Fn(&T) -> &String,
    build: impl Fn(T, ActivityUser) -> ActivityItem,
) -> Vec<ActivityItem> {
    let total = records.len();
    let items: Vec<ActivityItem> = records
        .into_iter()
        .filter_map(|record| {
            let user = ActivityUser::from(profiles.get(actor_id(&record))?);
            Some(build(record, user))
        })
        .collect();

    if items.len() < total {
        tracing::debug!(
            source = source.as_str(),
            dropped = total - items.len(),
            "Dropped rows with unresolvable users"
        );
    }
    items
}
