//! Entities and wire schemas for the bloom API.

use serde::{Deserialize, Serialize};

/// A single post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bloom {
    /// Server-assigned identifier.
    pub id: i64,
    /// Username of the poster.
    pub sender: String,
    /// Post body.
    pub content: String,
    /// ISO-8601 send time.
    pub sent_timestamp: String,
    /// Author of the bloom this one reshares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_sender: Option<String>,
    /// Number of times this bloom was reshared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rebloom_count: Option<u64>,
}

impl Bloom {
    /// Returns true if this bloom is a reshare.
    pub fn is_rebloom(&self) -> bool {
        self.original_sender.is_some()
    }
}

/// A cached profile.
///
/// The API returns different subsets of these fields depending on the
/// endpoint, so everything except the key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique key.
    pub username: String,
    /// Number of blooms the user has sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_blooms: Option<u64>,
    /// Users following this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<String>>,
    /// Users this user follows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows: Option<Vec<String>>,
    /// Whether this is the logged-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    /// Whether the logged-in user follows this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    /// Full bloom list, from `/blooms/{username}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blooms: Option<Vec<Bloom>>,
    /// Latest blooms, from `/profile/{username}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_blooms: Option<Vec<Bloom>>,
}

impl Profile {
    /// Creates an empty profile for `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Overlays every field present in `patch`.
    ///
    /// The key is never changed by a patch.
    pub fn apply(&mut self, patch: ProfilePatch) {
        let ProfilePatch {
            username: _,
            total_blooms,
            followers,
            follows,
            is_self,
            is_following,
            blooms,
            recent_blooms,
        } = patch;

        if total_blooms.is_some() {
            self.total_blooms = total_blooms;
        }
        if followers.is_some() {
            self.followers = followers;
        }
        if follows.is_some() {
            self.follows = follows;
        }
        if is_self.is_some() {
            self.is_self = is_self;
        }
        if is_following.is_some() {
            self.is_following = is_following;
        }
        if blooms.is_some() {
            self.blooms = blooms;
        }
        if recent_blooms.is_some() {
            self.recent_blooms = recent_blooms;
        }
    }
}

/// A partial profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// Username, when the payload carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Number of blooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_blooms: Option<u64>,
    /// Followers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<String>>,
    /// Followed users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows: Option<Vec<String>>,
    /// Self flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_self: Option<bool>,
    /// Following flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
    /// Full bloom list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blooms: Option<Vec<Bloom>>,
    /// Latest blooms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_blooms: Option<Vec<Bloom>>,
}

impl ProfilePatch {
    /// A patch that only sets the bloom list.
    pub fn blooms(blooms: Vec<Bloom>) -> Self {
        Self {
            blooms: Some(blooms),
            ..Self::default()
        }
    }
}

/// Client-side record of authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Bearer token.
    pub token: Option<String>,
    /// Logged-in username.
    pub current_user: Option<String>,
    /// Whether the client believes it is logged in.
    pub is_logged_in: bool,
}

/// `POST /login` and `POST /register` request body.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    /// Username.
    pub username: &'a str,
    /// Password.
    pub password: &'a str,
}

/// `POST /login` and `POST /register` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Whether the server accepted the credentials.
    pub success: bool,
    /// Access token, present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Generic `{success}` body returned by write endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessResponse {
    /// Whether the write was applied.
    pub success: bool,
}

/// `POST /bloom` request body.
#[derive(Debug, Clone, Serialize)]
pub struct NewBloom<'a> {
    /// Post body.
    pub content: &'a str,
    /// Set when resharing another user's bloom.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_sender: Option<&'a str>,
}

/// `POST /follow` request body.
#[derive(Debug, Clone, Serialize)]
pub struct FollowRequest<'a> {
    /// User to follow.
    pub follow_username: &'a str,
}

/// One entry of `GET /suggested-follows/{n}`.
///
/// Servers send either bare usernames or `{"username": ...}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Suggestion {
    /// Bare username.
    Name(String),
    /// Object carrying a username.
    Entry {
        /// Suggested username.
        username: String,
    },
}

impl Suggestion {
    /// Returns the suggested username.
    pub fn into_username(self) -> String {
        match self {
            Suggestion::Name(username) | Suggestion::Entry { username } => username,
        }
    }
}
