//! Exercise and learning path progress records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user finished a single exercise (usually attached to a route).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseCompletionRecord {
    /// Completion ID (also used as document ID)
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    /// Exercise title, denormalized at completion time
    pub exercise_title: Option<String>,
    /// Route the exercise belongs to, if any
    pub route_id: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub completed_at: DateTime<Utc>,
}

/// A user finished one exercise of a learning path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathExerciseCompletionRecord {
    /// Completion ID (also used as document ID)
    pub id: String,
    pub user_id: String,
    pub exercise_id: String,
    pub learning_path_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub completed_at: DateTime<Utc>,
}

/// Learning path metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningPath {
    /// Path ID (also used as document ID)
    pub id: String,
    pub title: String,
    /// Deactivated paths no longer produce completion activity
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
