//! Profile cache merging.

use crate::model::{Profile, ProfilePatch};
use crate::store::{StateContainer, StatePatch};
use std::sync::Arc;
use tracing::debug;

/// Returns `profiles` with `patch` merged into the entry for `username`.
///
/// The entry is found by linear search and shallow-merged; if there is none,
/// a new entry seeded with `username` is appended. Other entries and their
/// order are untouched.
pub fn merge_profile(profiles: &[Profile], username: &str, patch: ProfilePatch) -> Vec<Profile> {
    let mut profiles = profiles.to_vec();

    match profiles.iter_mut().find(|p| p.username == username) {
        Some(existing) => existing.apply(patch),
        None => {
            let mut profile = Profile::new(username);
            profile.apply(patch);
            profiles.push(profile);
        }
    }

    profiles
}

/// Upserts partial profile updates into the cache.
pub struct EntityMerger<S: StateContainer> {
    store: Arc<S>,
}

impl<S: StateContainer> EntityMerger<S> {
    /// Creates a merger writing to `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Merges `patch` into the cached profile for `username`.
    ///
    /// The whole collection is replaced through the store's update verb.
    pub fn upsert_profile(&self, username: &str, patch: ProfilePatch) {
        let profiles = self.store.snapshot().profiles;
        let merged = merge_profile(&profiles, username, patch);
        debug!(username, cached = merged.len(), "profile merged");
        self.store.update(StatePatch::new().profiles(merged));
    }
}
