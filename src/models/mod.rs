// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod content;
pub mod learning;
pub mod user;

pub use activity::{ActivityData, ActivityItem, ActivityKind, ActivityUser};
pub use content::{EventRecord, RouteRecord, Visibility};
pub use learning::{ExerciseCompletionRecord, LearningPath, PathExerciseCompletionRecord};
pub use user::{Follow, UserProfile};
