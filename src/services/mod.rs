// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod feed;
pub mod follow;
pub mod path_completion;
pub mod session;
pub mod sources;

pub use feed::{FeedMode, FeedService, FeedSnapshot};
pub use follow::resolve_following;
pub use path_completion::{aggregate_completions, detect_path_completions, PathCompletionAggregate};
pub use session::{FeedSession, FeedSessions, RefreshOutcome, VisibleFeed};
pub use sources::{FeedLimits, FeedScope, FeedSource};
