// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use community_feed::config::Config;
use community_feed::db::{FeedStore, FirestoreDb, SourceQuery};
use community_feed::error::AppError;
use community_feed::models::{
    EventRecord, ExerciseCompletionRecord, LearningPath, PathExerciseCompletionRecord,
    RouteRecord, UserProfile, Visibility,
};
use community_feed::routes::create_router;
use community_feed::services::{FeedService, FeedSessions};
use community_feed::AppState;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Check if emulator is available via environment variable.
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app with an offline database (every query fails).
/// Returns the router and the shared state.
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let feed_service = FeedService::new(FirestoreDb::new_mock(), config.feed_limits);

    let state = Arc::new(AppState {
        config,
        feed_service,
        feed_sessions: FeedSessions::new(),
    });

    (create_router(state.clone()), state)
}

/// Create a signed session token for `user_id`.
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    community_feed::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create JWT")
}

// ─── Fixtures ────────────────────────────────────────────────────

pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
}

pub fn profile(id: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        display_name: format!("Driver {}", id),
        avatar_url: None,
    }
}

pub fn route(id: &str, creator: &str, secs: i64, visibility: Visibility) -> RouteRecord {
    RouteRecord {
        id: id.to_string(),
        name: format!("Route {}", id),
        description: None,
        difficulty: Some("beginner".to_string()),
        visibility,
        creator_id: creator.to_string(),
        created_at: ts(secs),
    }
}

pub fn event(id: &str, creator: &str, secs: i64, visibility: Visibility) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        title: format!("Event {}", id),
        description: None,
        location: Some("Parking lot B".to_string()),
        event_date: None,
        visibility,
        created_by: creator.to_string(),
        created_at: ts(secs),
    }
}

pub fn exercise(id: &str, user: &str, secs: i64) -> ExerciseCompletionRecord {
    ExerciseCompletionRecord {
        id: id.to_string(),
        user_id: user.to_string(),
        exercise_id: format!("exercise-{}", id),
        exercise_title: Some("Parallel parking".to_string()),
        route_id: None,
        completed_at: ts(secs),
    }
}

pub fn path_completion(
    path: &str,
    user: &str,
    exercise: &str,
    secs: i64,
) -> PathExerciseCompletionRecord {
    PathExerciseCompletionRecord {
        id: format!("{}-{}-{}", path, user, exercise),
        user_id: user.to_string(),
        exercise_id: exercise.to_string(),
        learning_path_id: path.to_string(),
        completed_at: ts(secs),
    }
}

pub fn learning_path(id: &str, active: bool) -> LearningPath {
    LearningPath {
        id: id.to_string(),
        title: format!("Path {}", id),
        active,
    }
}

// ─── In-memory store ─────────────────────────────────────────────

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Following,
    Routes,
    Events,
    ExerciseCompletions,
    PathCompletions,
    Profiles,
}

/// In-memory [`FeedStore`] with failure injection and query recording.
#[derive(Default)]
pub struct InMemoryStore {
    pub profiles: Vec<UserProfile>,
    /// (follower, following)
    pub follows: Vec<(String, String)>,
    pub routes: Vec<RouteRecord>,
    pub events: Vec<EventRecord>,
    pub exercise_completions: Vec<ExerciseCompletionRecord>,
    pub path_completions: Vec<PathExerciseCompletionRecord>,
    pub learning_paths: Vec<LearningPath>,
    pub path_exercise_counts: HashMap<String, u32>,
    /// Paths whose exercise count lookup fails
    pub failing_counts: HashSet<String>,
    failing: Mutex<HashSet<Op>>,
    queries: Mutex<Vec<(Op, SourceQuery)>>,
    route_gates: Mutex<VecDeque<Option<oneshot::Receiver<()>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(mut self, ids: &[&str]) -> Self {
        self.profiles.extend(ids.iter().map(|id| profile(id)));
        self
    }

    pub fn follow(mut self, follower: &str, following: &str) -> Self {
        self.follows
            .push((follower.to_string(), following.to_string()));
        self
    }

    pub fn set_failing(&self, ops: &[Op]) {
        *self.failing.lock().unwrap() = ops.iter().copied().collect();
    }

    /// Source queries issued so far, in call order.
    pub fn queries(&self) -> Vec<(Op, SourceQuery)> {
        self.queries.lock().unwrap().clone()
    }

    /// Make the next `list_routes` call wait until the returned sender fires
    /// (or is dropped).
    pub fn gate_next_routes_call(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.route_gates.lock().unwrap().push_back(Some(rx));
        tx
    }

    /// Let the next `list_routes` call through without waiting.
    pub fn pass_next_routes_call(&self) {
        self.route_gates.lock().unwrap().push_back(None);
    }

    fn check(&self, op: Op) -> Result<(), AppError> {
        if self.failing.lock().unwrap().contains(&op) {
            Err(AppError::Database(format!("{:?} unavailable", op)))
        } else {
            Ok(())
        }
    }

    fn record(&self, op: Op, query: &SourceQuery) {
        self.queries.lock().unwrap().push((op, query.clone()));
    }
}

fn recent<T: Clone>(
    rows: &[T],
    query: &SourceQuery,
    actor: impl Fn(&T) -> &str,
    time: impl Fn(&T) -> DateTime<Utc>,
    keep: impl Fn(&T) -> bool,
) -> Vec<T> {
    let mut selected: Vec<T> = rows
        .iter()
        .filter(|row| keep(row))
        .filter(|row| match &query.actors {
            None => true,
            Some(actors) => actors.iter().any(|a| a == actor(row)),
        })
        .cloned()
        .collect();
    selected.sort_by(|a, b| time(b).cmp(&time(a)));
    selected.truncate(query.limit as usize);
    selected
}

impl FeedStore for InMemoryStore {
    async fn list_following(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        self.check(Op::Following)?;
        Ok(self
            .follows
            .iter()
            .filter(|(follower, _)| follower == user_id)
            .map(|(_, following)| following.clone())
            .collect())
    }

    async fn list_routes(&self, query: &SourceQuery) -> Result<Vec<RouteRecord>, AppError> {
        self.record(Op::Routes, query);
        let gate = self.route_gates.lock().unwrap().pop_front().flatten();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check(Op::Routes)?;
        Ok(recent(
            &self.routes,
            query,
            |r| r.creator_id.as_str(),
            |r| r.created_at,
            |r| r.visibility.is_feed_visible(),
        ))
    }

    async fn list_events(&self, query: &SourceQuery) -> Result<Vec<EventRecord>, AppError> {
        self.record(Op::Events, query);
        self.check(Op::Events)?;
        Ok(recent(
            &self.events,
            query,
            |e| e.created_by.as_str(),
            |e| e.created_at,
            |e| e.visibility.is_feed_visible(),
        ))
    }

    async fn list_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> Result<Vec<ExerciseCompletionRecord>, AppError> {
        self.record(Op::ExerciseCompletions, query);
        self.check(Op::ExerciseCompletions)?;
        Ok(recent(
            &self.exercise_completions,
            query,
            |c| c.user_id.as_str(),
            |c| c.completed_at,
            |_| true,
        ))
    }

    async fn list_path_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> Result<Vec<PathExerciseCompletionRecord>, AppError> {
        self.record(Op::PathCompletions, query);
        self.check(Op::PathCompletions)?;
        Ok(recent(
            &self.path_completions,
            query,
            |c| c.user_id.as_str(),
            |c| c.completed_at,
            |_| true,
        ))
    }

    async fn count_path_exercises(&self, learning_path_id: &str) -> Result<u32, AppError> {
        if self.failing_counts.contains(learning_path_id) {
            return Err(AppError::Database("count unavailable".to_string()));
        }
        Ok(self
            .path_exercise_counts
            .get(learning_path_id)
            .copied()
            .unwrap_or(0))
    }

    async fn get_learning_path(
        &self,
        learning_path_id: &str,
    ) -> Result<Option<LearningPath>, AppError> {
        Ok(self
            .learning_paths
            .iter()
            .find(|p| p.id == learning_path_id)
            .cloned())
    }

    async fn get_profiles(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, UserProfile>, AppError> {
        self.check(Op::Profiles)?;
        Ok(self
            .profiles
            .iter()
            .filter(|p| user_ids.contains(&p.id))
            .map(|p| (p.id.clone(), p.clone()))
            .collect())
    }
}
