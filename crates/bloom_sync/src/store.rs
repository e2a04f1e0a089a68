//! Process-wide client state and the container that owns it.
//!
//! The sync layer only writes through two verbs: [`StateContainer::update`]
//! shallow-merges a [`StatePatch`], and [`StateContainer::clear`] tears the
//! session and all derived data down. Reads go through snapshots.

use crate::model::{Bloom, Profile, Session};
use parking_lot::RwLock;

/// Everything the client keeps between operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    /// Authentication state.
    pub session: Session,
    /// Cached profiles, unique by username.
    pub profiles: Vec<Profile>,
    /// Home timeline.
    pub timeline_blooms: Vec<Bloom>,
    /// Result of the last hashtag query.
    pub hashtag_blooms: Vec<Bloom>,
    /// Hashtag the last query was for, with its leading `#`.
    pub current_hashtag: Option<String>,
    /// Suggested usernames.
    pub who_to_follow: Vec<String>,
    /// Bloom last fetched by id.
    pub single_bloom: Option<Bloom>,
}

impl AppState {
    /// Looks up a cached profile.
    pub fn profile(&self, username: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.username == username)
    }
}

/// A shallow update to [`AppState`].
///
/// Only fields that are set are written. `Option<Option<_>>` fields use the
/// outer `Option` for "present in the patch" so that a value can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    /// New token.
    pub token: Option<Option<String>>,
    /// New logged-in username.
    pub current_user: Option<Option<String>>,
    /// New logged-in flag.
    pub is_logged_in: Option<bool>,
    /// Replacement profile collection.
    pub profiles: Option<Vec<Profile>>,
    /// Replacement timeline.
    pub timeline_blooms: Option<Vec<Bloom>>,
    /// Replacement hashtag result.
    pub hashtag_blooms: Option<Vec<Bloom>>,
    /// New current hashtag.
    pub current_hashtag: Option<Option<String>>,
    /// Replacement suggestion list.
    pub who_to_follow: Option<Vec<String>>,
    /// New single bloom.
    pub single_bloom: Option<Option<Bloom>>,
}

impl StatePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a fresh session for `username` holding `token`.
    pub fn logged_in(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: Some(Some(token.into())),
            current_user: Some(Some(username.into())),
            is_logged_in: Some(true),
            ..Self::default()
        }
    }

    /// Sets the current user.
    pub fn current_user(mut self, username: Option<String>) -> Self {
        self.current_user = Some(username);
        self
    }

    /// Sets the logged-in flag.
    pub fn is_logged_in(mut self, value: bool) -> Self {
        self.is_logged_in = Some(value);
        self
    }

    /// Replaces the profile collection.
    pub fn profiles(mut self, profiles: Vec<Profile>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Replaces the timeline.
    pub fn timeline_blooms(mut self, blooms: Vec<Bloom>) -> Self {
        self.timeline_blooms = Some(blooms);
        self
    }

    /// Replaces the hashtag result and its marker.
    pub fn hashtag(mut self, hashtag: impl Into<String>, blooms: Vec<Bloom>) -> Self {
        self.current_hashtag = Some(Some(hashtag.into()));
        self.hashtag_blooms = Some(blooms);
        self
    }

    /// Replaces the suggestion list.
    pub fn who_to_follow(mut self, usernames: Vec<String>) -> Self {
        self.who_to_follow = Some(usernames);
        self
    }

    /// Sets the single bloom.
    pub fn single_bloom(mut self, bloom: Bloom) -> Self {
        self.single_bloom = Some(Some(bloom));
        self
    }

    /// Writes the present fields into `state`.
    pub fn apply_to(self, state: &mut AppState) {
        if let Some(token) = self.token {
            state.session.token = token;
        }
        if let Some(user) = self.current_user {
            state.session.current_user = user;
        }
        if let Some(flag) = self.is_logged_in {
            state.session.is_logged_in = flag;
        }
        if let Some(profiles) = self.profiles {
            state.profiles = profiles;
        }
        if let Some(blooms) = self.timeline_blooms {
            state.timeline_blooms = blooms;
        }
        if let Some(blooms) = self.hashtag_blooms {
            state.hashtag_blooms = blooms;
        }
        if let Some(tag) = self.current_hashtag {
            state.current_hashtag = tag;
        }
        if let Some(usernames) = self.who_to_follow {
            state.who_to_follow = usernames;
        }
        if let Some(bloom) = self.single_bloom {
            state.single_bloom = bloom;
        }
    }
}

/// The state container the sync layer reads and writes.
pub trait StateContainer: Send + Sync {
    /// Returns a copy of the current state.
    fn snapshot(&self) -> AppState;

    /// Shallow-merges `patch` into the state.
    fn update(&self, patch: StatePatch);

    /// Clears the session and everything derived from it.
    fn clear(&self);

    /// Returns the current session.
    fn session(&self) -> Session {
        self.snapshot().session
    }
}

/// An in-memory, versioned state container.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Versioned>,
}

#[derive(Debug, Default)]
struct Versioned {
    version: u64,
    state: AppState,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with `state`.
    pub fn with_state(state: AppState) -> Self {
        Self {
            inner: RwLock::new(Versioned { version: 0, state }),
        }
    }

    /// Number of writes applied so far.
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }
}

impl StateContainer for MemoryStore {
    fn snapshot(&self) -> AppState {
        self.inner.read().state.clone()
    }

    fn session(&self) -> Session {
        self.inner.read().state.session.clone()
    }

    fn update(&self, patch: StatePatch) {
        let mut inner = self.inner.write();
        patch.apply_to(&mut inner.state);
        inner.version += 1;
    }

    fn clear(&self) {
        let mut inner = self.inner.write();
        inner.state = AppState::default();
        inner.version += 1;
    }
}
