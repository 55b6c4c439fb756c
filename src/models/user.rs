//! User profile and follow graph models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public user profile stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID (also used as document ID)
    pub id: String,
    /// Name shown next to the user's activity
    pub display_name: String,
    /// Profile picture URL
    pub avatar_url: Option<String>,
}

/// Directed follow edge. No self-follow guard at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    /// The user who follows
    pub follower_id: String,
    /// The user being followed
    pub following_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
}
