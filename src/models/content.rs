// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! User-created content: practice routes and events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who may see a route or event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    /// Visibilities that may appear in the community feed.
    pub const FEED_VISIBLE: [Visibility; 2] = [Visibility::Public, Visibility::Unlisted];

    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }

    pub fn is_feed_visible(self) -> bool {
        !matches!(self, Visibility::Private)
    }
}

/// Stored practice route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    /// Route ID (also used as document ID)
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Difficulty label ("beginner", "intermediate", "advanced")
    pub difficulty: Option<String>,
    pub visibility: Visibility,
    /// User who created the route
    pub creator_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Stored community event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event ID (also used as document ID)
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Free-form meeting point
    pub location: Option<String>,
    /// When the event takes place
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub event_date: Option<DateTime<Utc>>,
    pub visibility: Visibility,
    /// User who created the event
    pub created_by: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}
