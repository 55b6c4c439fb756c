// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Unified feed item model shared by all activity sources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::UserProfile;

/// Discriminant for the kind of activity an item describes.
///
/// Declaration order is the tiebreak rank used when two items share a
/// timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityKind {
    RouteCreated,
    EventCreated,
    ExerciseCompleted,
    LearningPathCompleted,
}

impl ActivityKind {
    /// Prefix used to namespace item ids by source.
    pub fn id_prefix(self) -> &'static str {
        match self {
            ActivityKind::RouteCreated => "route",
            ActivityKind::EventCreated => "event",
            ActivityKind::ExerciseCompleted => "exercise",
            ActivityKind::LearningPathCompleted => "path-completed",
        }
    }
}

/// Public identity of the user who performed an activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityUser {
    pub id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for ActivityUser {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            avatar_url: profile.avatar_url.clone(),
        }
    }
}

/// Type-specific payload. Serialized as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ActivityData {
    RouteCreated {
        route_id: String,
        name: String,
        description: Option<String>,
        difficulty: Option<String>,
    },
    EventCreated {
        event_id: String,
        title: String,
        description: Option<String>,
        location: Option<String>,
        event_date: Option<DateTime<Utc>>,
    },
    ExerciseCompleted {
        completion_id: String,
        exercise_id: String,
        exercise_title: Option<String>,
        route_id: Option<String>,
    },
    LearningPathCompleted {
        learning_path_id: String,
        title: String,
        exercise_count: u32,
    },
}

impl ActivityData {
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityData::RouteCreated { .. } => ActivityKind::RouteCreated,
            ActivityData::EventCreated { .. } => ActivityKind::EventCreated,
            ActivityData::ExerciseCompleted { .. } => ActivityKind::ExerciseCompleted,
            ActivityData::LearningPathCompleted { .. } => ActivityKind::LearningPathCompleted,
        }
    }
}

/// One entry of the community timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityItem {
    /// Source-prefixed id, unique within one feed snapshot.
    pub id: String,
    pub user: ActivityUser,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: ActivityData,
}

impl ActivityItem {
    /// Build an item whose id is `{prefix}:{raw_id}` for the payload's kind.
    pub fn new(
        raw_id: &str,
        user: ActivityUser,
        created_at: DateTime<Utc>,
        data: ActivityData,
    ) -> Self {
        Self {
            id: format!("{}:{}", data.kind().id_prefix(), raw_id),
            user,
            created_at,
            data,
        }
    }

    pub fn kind(&self) -> ActivityKind {
        self.data.kind()
    }
}
