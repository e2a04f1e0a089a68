//! # Bloom Sync
//!
//! Client-side synchronization layer for the bloom social feed.
//!
//! This crate provides:
//! - A request executor that attaches credentials and classifies outcomes
//! - Error escalation that tears the session down on credential failures
//! - A shallow-merge profile cache
//! - The user-facing operations: auth, posting, timelines, profiles, follows
//!
//! ## Architecture
//!
//! Every operation follows the same shape:
//! 1. Issue the request through [`RequestExecutor`]
//! 2. On failure, escalate exactly once through [`ErrorEscalator`]
//! 3. On success, write the result into the [`StateContainer`]
//! 4. After a write, refetch the affected entities concurrently
//!
//! The server is authoritative. Nothing is patched optimistically; cached
//! state only ever reflects server responses.
//!
//! ## Example
//!
//! ```no_run
//! use bloom_sync::{ClientConfig, SyncClient};
//!
//! # async fn run() {
//! let client = SyncClient::connect(ClientConfig::default());
//! if client.login("ada", "secret").await.is_success() {
//!     for bloom in client.state().timeline_blooms {
//!         println!("{}: {}", bloom.sender, bloom.content);
//!     }
//! }
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod config;
mod error;
mod escalator;
mod executor;
mod http;
mod merger;
mod model;
mod store;
mod transport;

pub use client::{Outcome, SyncClient, SyncStats};
pub use config::{ClientConfig, DEFAULT_API_ORIGIN, DEFAULT_SUGGESTED_FOLLOWS, MAX_BLOOM_LENGTH};
pub use error::{SyncError, SyncResult};
pub use escalator::{
    is_auth_endpoint, ErrorDisplay, ErrorEscalator, RecordingDisplay, TracingDisplay,
    LOGIN_ENDPOINT, REGISTER_ENDPOINT,
};
pub use executor::{classify, ApiResponse, RequestExecutor};
pub use http::ReqwestClient;
pub use merger::{merge_profile, EntityMerger};
pub use model::{
    AuthResponse, Bloom, Credentials, FollowRequest, NewBloom, Profile, ProfilePatch, Session,
    SuccessResponse, Suggestion,
};
pub use store::{AppState, MemoryStore, StateContainer, StatePatch};
pub use transport::{HttpClient, HttpRequest, HttpResponse, Method, MockHttpClient, MockReply};
