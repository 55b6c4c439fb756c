//! Database layer (Firestore) and the query interface the feed depends on.

pub mod firestore;

pub use self::firestore::FirestoreDb;

use crate::error::AppError;
use crate::models::{
    EventRecord, ExerciseCompletionRecord, LearningPath, PathExerciseCompletionRecord,
    RouteRecord, UserProfile,
};
use std::collections::HashMap;
use std::future::Future;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const FOLLOWS: &str = "follows";
    pub const ROUTES: &str = "routes";
    pub const EVENTS: &str = "events";
    pub const EXERCISE_COMPLETIONS: &str = "exercise_completions";
    pub const PATH_EXERCISE_COMPLETIONS: &str = "learning_path_exercise_completions";
    pub const LEARNING_PATHS: &str = "learning_paths";
    /// Exercises belonging to a learning path (keyed by exercise id)
    pub const LEARNING_PATH_EXERCISES: &str = "learning_path_exercises";
}

/// Row-fetch parameters shared by the four activity sources.
///
/// Results are always ordered newest first and truncated to `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    /// Restrict to records created/completed by these users.
    /// `None` means everyone. `Some` with an empty list matches nothing.
    pub actors: Option<Vec<String>>,
    pub limit: u32,
}

impl SourceQuery {
    pub fn everyone(limit: u32) -> Self {
        Self {
            actors: None,
            limit,
        }
    }

    pub fn actors(actors: Vec<String>, limit: u32) -> Self {
        Self {
            actors: Some(actors),
            limit,
        }
    }

    /// True when the actor filter cannot match any record.
    pub fn matches_nothing(&self) -> bool {
        self.limit == 0 || self.actors.as_ref().is_some_and(|a| a.is_empty())
    }
}

/// Queries the activity feed needs from the backing store.
///
/// Route and event listings never return private records.
pub trait FeedStore: Send + Sync {
    /// User IDs that `user_id` follows.
    fn list_following(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<String>, AppError>> + Send;

    /// Non-private routes, newest first.
    fn list_routes(
        &self,
        query: &SourceQuery,
    ) -> impl Future<Output = Result<Vec<RouteRecord>, AppError>> + Send;

    /// Non-private events, newest first.
    fn list_events(
        &self,
        query: &SourceQuery,
    ) -> impl Future<Output = Result<Vec<EventRecord>, AppError>> + Send;

    /// Single exercise completions, most recently completed first.
    fn list_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> impl Future<Output = Result<Vec<ExerciseCompletionRecord>, AppError>> + Send;

    /// Learning path exercise completions, most recently completed first.
    fn list_path_exercise_completions(
        &self,
        query: &SourceQuery,
    ) -> impl Future<Output = Result<Vec<PathExerciseCompletionRecord>, AppError>> + Send;

    /// Number of exercises that make up a learning path.
    fn count_path_exercises(
        &self,
        learning_path_id: &str,
    ) -> impl Future<Output = Result<u32, AppError>> + Send;

    /// Learning path metadata, `None` if the path no longer exists.
    fn get_learning_path(
        &self,
        learning_path_id: &str,
    ) -> impl Future<Output = Result<Option<LearningPath>, AppError>> + Send;

    /// Public profiles for the given user IDs. Unknown IDs are omitted.
    fn get_profiles(
        &self,
        user_ids: &[String],
    ) -> impl Future<Output = Result<HashMap<String, UserProfile>, AppError>> + Send;
}
