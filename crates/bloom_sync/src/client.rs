//! The sync client: every action UI code can invoke.
//!
//! Operations never return an error. A failure is escalated once where it
//! is detected and the operation then reports [`Outcome::Failed`], or an
//! empty list for list reads. After a successful write the affected entities
//! are refetched from the server instead of being patched locally.

use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::escalator::{ErrorDisplay, ErrorEscalator, TracingDisplay, LOGIN_ENDPOINT, REGISTER_ENDPOINT};
use crate::executor::RequestExecutor;
use crate::http::ReqwestClient;
use crate::merger::EntityMerger;
use crate::model::{
    AuthResponse, Bloom, Credentials, FollowRequest, NewBloom, ProfilePatch, SuccessResponse,
    Suggestion,
};
use crate::store::{AppState, MemoryStore, StateContainer, StatePatch};
use crate::transport::{HttpClient, Method};
use futures::join;
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const BLOOM_ENDPOINT: &str = "/bloom";
const FOLLOW_ENDPOINT: &str = "/follow";
const HOME_ENDPOINT: &str = "/home";
const SELF_PROFILE_ENDPOINT: &str = "/profile";

/// Uniform result of a sync operation.
///
/// Serializes as the success payload, or as `{"success": false}`.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation succeeded with this payload.
    Success(T),
    /// The operation failed; the error was already escalated.
    Failed,
}

impl<T> Outcome<T> {
    /// Returns true on success.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns the payload, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failed => None,
        }
    }

    /// Maps the payload.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failed => Outcome::Failed,
        }
    }
}

impl<T> From<SyncResult<T>> for Outcome<T> {
    fn from(result: SyncResult<T>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(_) => Outcome::Failed,
        }
    }
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Outcome::Success(value) => value.serialize(serializer),
            Outcome::Failed => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("success", &false)?;
                map.end()
            }
        }
    }
}

/// Counters describing client activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Requests issued.
    pub requests: u64,
    /// Failures escalated.
    pub failures: u64,
    /// Sessions torn down by credential failures.
    pub sessions_cleared: u64,
}

/// The synchronization layer between UI actions and the bloom API.
pub struct SyncClient<C: HttpClient, S: StateContainer> {
    config: ClientConfig,
    executor: RequestExecutor<C, S>,
    escalator: ErrorEscalator<S>,
    merger: EntityMerger<S>,
    store: Arc<S>,
    requests: AtomicU64,
}

impl SyncClient<ReqwestClient, MemoryStore> {
    /// Creates a client talking to a live API with an in-memory store.
    ///
    /// Errors are displayed by logging them.
    pub fn connect(config: ClientConfig) -> Self {
        Self::new(
            config,
            ReqwestClient::new(),
            Arc::new(MemoryStore::new()),
            Arc::new(TracingDisplay),
        )
    }
}

impl<C: HttpClient, S: StateContainer> SyncClient<C, S> {
    /// Creates a client from its collaborators.
    pub fn new(config: ClientConfig, client: C, store: Arc<S>, display: Arc<dyn ErrorDisplay>) -> Self {
        Self {
            executor: RequestExecutor::new(config.api_origin.clone(), client, Arc::clone(&store)),
            escalator: ErrorEscalator::new(Arc::clone(&store), display),
            merger: EntityMerger::new(Arc::clone(&store)),
            store,
            config,
            requests: AtomicU64::new(0),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the state container.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns the HTTP client.
    pub fn http(&self) -> &C {
        self.executor.client()
    }

    /// Returns a snapshot of the cached state.
    pub fn state(&self) -> AppState {
        self.store.snapshot()
    }

    /// Returns activity counters.
    pub fn stats(&self) -> SyncStats {
        SyncStats {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.escalator.escalated(),
            sessions_cleared: self.escalator.sessions_cleared(),
        }
    }

    /// Issues one call, escalating any failure.
    async fn call<T, B>(&self, method: Method, endpoint: &str, body: Option<&B>) -> SyncResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.executor
            .execute_as(endpoint, method, body)
            .await
            .map_err(|e| self.escalator.escalate(e, endpoint))
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> SyncResult<T> {
        self.call::<T, ()>(Method::Get, endpoint, None).await
    }

    // ====== Auth

    /// Logs in and loads the timeline, own profile and suggestions.
    pub async fn login(&self, username: &str, password: &str) -> Outcome<AuthResponse> {
        let credentials = Credentials { username, password };
        let data: AuthResponse = match self
            .call(Method::Post, LOGIN_ENDPOINT, Some(&credentials))
            .await
        {
            Ok(data) => data,
            Err(_) => return Outcome::Failed,
        };

        if let (true, Some(token)) = (data.success, data.token.as_deref()) {
            self.store.update(StatePatch::logged_in(token, username));
            info!(username, "logged in");

            let _ = join!(
                self.get_blooms(None),
                self.get_profile(Some(username)),
                self.get_who_to_follow()
            );
        }

        Outcome::Success(data)
    }

    /// Registers a new account and loads its profile.
    pub async fn signup(&self, username: &str, password: &str) -> Outcome<AuthResponse> {
        let credentials = Credentials { username, password };
        let data: AuthResponse = match self
            .call(Method::Post, REGISTER_ENDPOINT, Some(&credentials))
            .await
        {
            Ok(data) => data,
            Err(_) => return Outcome::Failed,
        };

        if let (true, Some(token)) = (data.success, data.token.as_deref()) {
            self.store.update(StatePatch::logged_in(token, username));
            info!(username, "registered");

            let _ = self.get_profile(Some(username)).await;
        }

        Outcome::Success(data)
    }

    /// Drops the local session. Never contacts the server.
    pub fn logout(&self) -> Outcome<()> {
        self.store.clear();
        info!("logged out");
        Outcome::Success(())
    }

    // ====== Blooms

    /// Fetches one bloom and keeps it as the single bloom to show.
    pub async fn get_bloom(&self, id: i64) -> Outcome<Bloom> {
        match self.get::<Bloom>(&format!("/bloom/{}", id)).await {
            Ok(bloom) => {
                self.store.update(StatePatch::new().single_bloom(bloom.clone()));
                Outcome::Success(bloom)
            }
            Err(_) => Outcome::Failed,
        }
    }

    /// Fetches the home timeline, or the blooms of `username`.
    ///
    /// A user's blooms are merged into their cached profile; the timeline
    /// replaces the cached one. On failure the target is reset to empty.
    pub async fn get_blooms(&self, username: Option<&str>) -> Vec<Bloom> {
        let endpoint = match username {
            Some(username) => format!("/blooms/{}", encode_segment(username)),
            None => HOME_ENDPOINT.to_string(),
        };

        let blooms = self.get::<Vec<Bloom>>(&endpoint).await.unwrap_or_default();

        match username {
            Some(username) => self
                .merger
                .upsert_profile(username, ProfilePatch::blooms(blooms.clone())),
            None => self
                .store
                .update(StatePatch::new().timeline_blooms(blooms.clone())),
        }

        blooms
    }

    /// Fetches blooms tagged with `hashtag`, with or without its leading `#`.
    pub async fn get_blooms_by_hashtag(&self, hashtag: &str) -> Outcome<Vec<Bloom>> {
        let tag = hashtag.strip_prefix('#').unwrap_or(hashtag);
        let endpoint = format!("/hashtag/{}", encode_segment(tag));

        match self.get::<Vec<Bloom>>(&endpoint).await {
            Ok(blooms) => {
                self.store
                    .update(StatePatch::new().hashtag(format!("#{}", tag), blooms.clone()));
                Outcome::Success(blooms)
            }
            Err(_) => Outcome::Failed,
        }
    }

    /// Posts a bloom, then refreshes the timeline and own profile.
    pub async fn post_bloom(&self, content: &str) -> Outcome<SuccessResponse> {
        self.send_bloom(NewBloom {
            content,
            original_sender: None,
        })
        .await
    }

    /// Reshares `bloom`, crediting its original author.
    pub async fn rebloom(&self, bloom: &Bloom) -> Outcome<SuccessResponse> {
        let original = bloom.original_sender.as_deref().unwrap_or(&bloom.sender);
        self.send_bloom(NewBloom {
            content: &bloom.content,
            original_sender: Some(original),
        })
        .await
    }

    async fn send_bloom(&self, bloom: NewBloom<'_>) -> Outcome<SuccessResponse> {
        let length = bloom.content.chars().count();
        if length > self.config.max_bloom_length {
            let error = SyncError::InvalidRequest(format!(
                "bloom is {} characters long, the limit is {}",
                length, self.config.max_bloom_length
            ));
            self.escalator.escalate(error, BLOOM_ENDPOINT);
            return Outcome::Failed;
        }

        match self
            .call::<SuccessResponse, _>(Method::Post, BLOOM_ENDPOINT, Some(&bloom))
            .await
        {
            Ok(data) => {
                if data.success {
                    let _ = join!(self.get_blooms(None), self.refresh_own_profile());
                }
                Outcome::Success(data)
            }
            Err(_) => Outcome::Failed,
        }
    }

    // ====== Users

    /// Fetches a profile into the cache.
    ///
    /// Without a username the authenticated identity is resolved first and
    /// becomes the current user; if that fails the client is marked as
    /// logged out.
    pub async fn get_profile(&self, username: Option<&str>) -> Outcome<ProfilePatch> {
        match username {
            Some(username) => {
                let endpoint = format!("/profile/{}", encode_segment(username));
                match self.get::<ProfilePatch>(&endpoint).await {
                    Ok(profile) => {
                        self.merger.upsert_profile(username, profile.clone());
                        Outcome::Success(profile)
                    }
                    Err(_) => Outcome::Failed,
                }
            }
            None => match self.resolve_self().await {
                Ok(profile) => Outcome::Success(profile),
                Err(_) => {
                    self.store
                        .update(StatePatch::new().is_logged_in(false).current_user(None));
                    Outcome::Failed
                }
            },
        }
    }

    async fn resolve_self(&self) -> SyncResult<ProfilePatch> {
        let identity: ProfilePatch = self.get(SELF_PROFILE_ENDPOINT).await?;
        let username = identity.username.clone().ok_or_else(|| {
            self.escalator.escalate(
                SyncError::Schema("profile response has no username".into()),
                SELF_PROFILE_ENDPOINT,
            )
        })?;

        let endpoint = format!("/profile/{}", encode_segment(&username));
        let full: ProfilePatch = self.get(&endpoint).await?;
        self.merger.upsert_profile(&username, full);
        self.store.update(
            StatePatch::new()
                .current_user(Some(username))
                .is_logged_in(true),
        );

        Ok(identity)
    }

    async fn refresh_own_profile(&self) -> Outcome<ProfilePatch> {
        let current = self.store.session().current_user;
        self.get_profile(current.as_deref()).await
    }

    /// Follows `username`, then refreshes both profiles and the timeline.
    pub async fn follow_user(&self, username: &str) -> Outcome<SuccessResponse> {
        let body = FollowRequest {
            follow_username: username,
        };
        let result = self.call(Method::Post, FOLLOW_ENDPOINT, Some(&body)).await;
        self.after_follow_change(username, result).await
    }

    /// Unfollows `username`, then refreshes both profiles and the timeline.
    pub async fn unfollow_user(&self, username: &str) -> Outcome<SuccessResponse> {
        let endpoint = format!("/unfollow/{}", encode_segment(username));
        let result = self.call::<_, ()>(Method::Post, &endpoint, None).await;
        self.after_follow_change(username, result).await
    }

    async fn after_follow_change(
        &self,
        username: &str,
        result: SyncResult<SuccessResponse>,
    ) -> Outcome<SuccessResponse> {
        match result {
            Ok(data) => {
                if data.success {
                    debug!(username, "follow graph changed, refetching");
                    let _ = join!(
                        self.get_profile(Some(username)),
                        self.refresh_own_profile(),
                        self.get_blooms(None)
                    );
                }
                Outcome::Success(data)
            }
            Err(_) => Outcome::Failed,
        }
    }

    /// Fetches follow suggestions. Failure leaves an empty list.
    pub async fn get_who_to_follow(&self) -> Vec<String> {
        let endpoint = format!("/suggested-follows/{}", self.config.suggested_follows);

        let usernames: Vec<String> = match self.get::<Vec<Suggestion>>(&endpoint).await {
            Ok(list) => list.into_iter().map(Suggestion::into_username).collect(),
            Err(_) => Vec::new(),
        };

        self.store
            .update(StatePatch::new().who_to_follow(usernames.clone()));
        usernames
    }
}

/// Percent-encodes one path segment.
fn encode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
