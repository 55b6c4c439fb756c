// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides the read queries behind the community feed:
//! - Follows (viewer's following set)
//! - Routes and events (creation activity)
//! - Exercise and learning path completions
//! - Learning paths and their exercise counts
//! - User profiles (acting user identity)

use crate::db::{collections, FeedStore, SourceQuery};
use crate::error::AppError;
use crate::models::{
    EventRecord, ExerciseCompletionRecord, Follow, LearningPath, PathExerciseCompletionRecord,
    RouteRecord, UserProfile, Visibility,
};
use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore caps a query at 30 disjunctions; each `in` value multiplies them.
const MAX_QUERY_DISJUNCTIONS: usize = 30;

/// Shape of a "recent records" query against one collection.
#[derive(Debug, Clone, Copy)]
struct RecentQuery {
    collection: &'static str,
    /// Timestamp field used for ordering
    time_field: &'static str,
    /// Field holding the acting user's ID
    actor_field: &'static str,
    /// Exclude private records
    visible_only: bool,
}

impl RecentQuery {
    /// Maximum actor IDs per query so the `in` filters stay under the cap.
    fn actor_chunk_size(&self) -> usize {
        if self.visible_only {
            MAX_QUERY_DISJUNCTIONS / Visibility::FEED_VISIBLE.len()
        } else {
            MAX_QUERY_DISJUNCTIONS
        }
    }
}

const ROUTES_QUERY: RecentQuery = RecentQuery {
    collection: collections::ROUTES,
    time_field: "created_at",
    actor_field: "creator_id",
    visible_only: true,
};

const EVENTS_QUERY: RecentQuery = RecentQuery {
    collection: collections::EVENTS,
    time_field: "created_at",
    actor_field: "created_by",
    visible_only: true,
};

const EXERCISE_COMPLETIONS_QUERY: RecentQuery = RecentQuery {
    collection: collections::EXERCISE_COMPLETIONS,
    time_field: "completed_at",
    actor_field: "user_id",
    visible_only: false,
};

const PATH_EXERCISE_COMPLETIONS_QUERY: RecentQuery = RecentQuery {
    collection: collections::PATH_EXERCISE_COMPLETIONS,
    time_field: "completed_at",
    actor_field: "user_id",
    visible_only: false,
};

/// Result of the exercise count aggregation.
#[derive(Debug, Deserialize)]
struct ExerciseCount {
    count: u64,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Writes (seeding and tooling) ────────────────────────────

    /// Create or replace a document.
    pub async fn upsert<T>(&self, collection: &str, doc_id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(doc_id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Recent Record Queries ───────────────────────────────────

    /// Run a recency query, chunking the actor filter to respect Firestore's
    /// disjunction cap.
    ///
    /// Chunks are queried concurrently, merged, re-sorted and truncated to the
    /// limit so the result matches a single unchunked query.
    async fn query_recent<T>(
        &self,
        recent: RecentQuery,
        query: &SourceQuery,
        sort_key: fn(&T) -> DateTime<Utc>,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        if query.matches_nothing() {
            return Ok(Vec::new());
        }

        let Some(actors) = &query.actors else {
            return self.query_chunk(recent, None, query.limit).await;
        };

        let chunks: Vec<Vec<String>> = actors
            .chunks(recent.actor_chunk_size())
            .map(<[String]>::to_vec)
            .collect();

        if chunks.len() == 1 {
            return self.query_chunk(recent, chunks.into_iter().next(), query.limit).await;
        }

        tracing::debug!(
            collection = recent.collection,
            actors = actors.len(),
            chunks = chunks.len(),
            "Splitting actor filter across queries"
        );

        let results = stream::iter(chunks)
            .map(|chunk| self.query_chunk::<T>(recent, Some(chunk), query.limit))
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Vec<T>, AppError>>>()
            .await;

        let mut merged = Vec::new();
        for result in results {
            merged.extend(result?);
        }
        merged.sort_by(|a, b| sort_key(b).cmp(&sort_key(a)));
        merged.truncate(query.limit as usize);
        Ok(merged)
    }

    async fn query_chunk<T>(
        &self,
        recent: RecentQuery,
        actors: Option<Vec<String>>,
        limit: u32,
    ) -> Result<Vec<T>, AppError>
    where
        T: for<'de> Deserialize<'de> + Send,
    {
        let visible: Vec<&'static str> = Visibility::FEED_VISIBLE
            .iter()
            .map(|v| v.as_str())
            .collect();

        self.get_client()?
            .fluent()
            .select()
            .from(recent.collection)
            .filter(move |q| {
                q.for_all([
                    if recent.visible_only {
                        q.field("visibility").is_in(visible.clone())
                    } else {
                        None
                    },
                    actors
                        .clone()
                        .and_then(|ids| q.field(recent.actor_field).is_in(ids)),
                ])
            })
            .order_by([(
                recent.time_field,
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj::<T>()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

impl FeedStore for FirestoreDb {
    async fn list_following(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let user_id = user_id.to_string();
        let follows: Vec<Follow> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::FOLLOWS)
            .filter(move |q| q.field("follower_id").eq(user_id.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(follows.into_iter().map(|f| f.following_id).collect())
    }

    async fn list_routes(&self, query: &SourceQuery) -> Result<Vec<RouteRecord>, AppError> {
        self.query_recent(ROUTES_QUERY, query, |r: &RouteRecord| r.created_at)
            .await
    }

    async fn list_events(&self, query: &SourceQuery) -> Result<Vec<EventRecord>, AppError> {
        self.query_recent(EVENTS_QUERY, query, |e: &EventRecord| e.created_at)
            .await
    }

    async fn list_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> Result<Vec<ExerciseCompletionRecord>, AppError> {
        self.query_recent(
            EXERCISE_COMPLETIONS_QUERY,
            query,
            |c: &ExerciseCompletionRecord| c.completed_at,
        )
        .await
    }

    async fn list_path_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> Result<Vec<PathExerciseCompletionRecord>, AppError> {
        self.query_recent(
            PATH_EXERCISE_COMPLETIONS_QUERY,
            query,
            |c: &PathExerciseCompletionRecord| c.completed_at,
        )
        .await
    }

    async fn count_path_exercises(&self, learning_path_id: &str) -> Result<u32, AppError> {
        let learning_path_id = learning_path_id.to_string();
        let counts: Vec<ExerciseCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::LEARNING_PATH_EXERCISES)
            .filter(move |q| q.field("learning_path_id").eq(learning_path_id.clone()))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = counts.first().map_or(0, |c| c.count);
        u32::try_from(count)
            .map_err(|_| AppError::Database("Learning path exercise count overflow".to_string()))
    }

    async fn get_learning_path(
        &self,
        learning_path_id: &str,
    ) -> Result<Option<LearningPath>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::LEARNING_PATHS)
            .obj()
            .one(learning_path_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch profiles with bounded concurrency, one document read per user.
    async fn get_profiles(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, UserProfile>, AppError> {
        let client = self.get_client()?;
        let unique: HashSet<String> = user_ids.iter().cloned().collect();

        let profiles = stream::iter(unique)
            .map(|user_id: String| async move {
                client
                    .fluent()
                    .select()
                    .by_id_in(collections::USERS)
                    .obj::<UserProfile>()
                    .one(&user_id)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<Option<UserProfile>, AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<Option<UserProfile>>, AppError>>()?;

        Ok(profiles
            .into_iter()
            .flatten()
            .map(|p| (p.id.clone(), p))
            .collect())
    }
}
