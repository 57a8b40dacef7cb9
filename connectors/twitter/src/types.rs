//! Twitter API v1.1 payload types.
//!
//! Only the fields the harvester reads are modelled; everything else in the
//! payload is ignored on deserialization.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Tweet Types
// ─────────────────────────────────────────────────────────────────────────────

/// A status (tweet) as returned by the v1.1 timeline endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    /// Tweet ID
    pub id: u64,

    /// Tweet ID as a string
    #[serde(default)]
    pub id_str: Option<String>,

    /// Tweet text (compat mode, may be truncated)
    #[serde(default)]
    pub text: Option<String>,

    /// Untruncated text (extended mode)
    #[serde(default)]
    pub full_text: Option<String>,

    /// Creation timestamp, e.g. `Wed Oct 10 20:19:24 +0000 2018`
    pub created_at: String,

    /// Like count
    #[serde(default)]
    pub favorite_count: u64,

    /// Retweet count
    #[serde(default)]
    pub retweet_count: u64,

    /// Tagged place
    #[serde(default)]
    pub place: Option<Place>,

    /// Author
    #[serde(default)]
    pub user: Option<User>,

    /// Present when this status is a retweet
    #[serde(default)]
    pub retweeted_status: Option<Box<Tweet>>,

    /// Language (BCP47)
    #[serde(default)]
    pub lang: Option<String>,
}

impl Tweet {
    /// The longest text available: `full_text` in extended mode, else `text`.
    #[must_use]
    pub fn full_text(&self) -> &str {
        self.full_text
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }

    #[must_use]
    pub const fn is_retweet(&self) -> bool {
        self.retweeted_status.is_some()
    }
}

/// Place object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Place ID
    pub id: String,

    /// Full name (e.g., "San Francisco, CA")
    pub full_name: String,

    /// Place name
    #[serde(default)]
    pub name: Option<String>,

    /// Country
    #[serde(default)]
    pub country: Option<String>,

    /// Country code
    #[serde(default)]
    pub country_code: Option<String>,

    /// Place type
    #[serde(default)]
    pub place_type: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// User Types
// ─────────────────────────────────────────────────────────────────────────────

/// Twitter user object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// User ID
    pub id: u64,

    /// User ID as a string
    #[serde(default)]
    pub id_str: Option<String>,

    /// Display name
    pub name: String,

    /// Handle without @
    pub screen_name: String,

    /// User bio
    #[serde(default)]
    pub description: Option<String>,

    /// User location
    #[serde(default)]
    pub location: Option<String>,

    /// Whether the account is protected (private)
    #[serde(default)]
    pub protected: bool,

    /// Whether the account is verified
    #[serde(default)]
    pub verified: bool,

    #[serde(default)]
    pub followers_count: u64,

    #[serde(default)]
    pub friends_count: u64,

    #[serde(default)]
    pub statuses_count: u64,

    /// Account creation timestamp
    #[serde(default)]
    pub created_at: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pagination Types
// ─────────────────────────────────────────────────────────────────────────────

/// A `cursor`-paginated page of users (friends/list, followers/list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCursorPage {
    #[serde(default)]
    pub users: Vec<User>,

    /// Zero when there are no further pages
    #[serde(default)]
    pub next_cursor: i64,

    #[serde(default)]
    pub previous_cursor: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// v1.1 error envelope: `{"errors":[{"code":32,"message":"..."}]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,

    /// Some endpoints answer with a bare `error` string instead
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default)]
    pub code: Option<i32>,

    #[serde(default)]
    pub message: Option<String>,
}
