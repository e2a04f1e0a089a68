//! Failure escalation.
//!
//! Every failure passes through [`ErrorEscalator::escalate`] once, at the
//! point where it is detected. Credential failures on authenticated
//! endpoints tear the session down; every failure is shown to the user
//! through an [`ErrorDisplay`]. The error is handed back so the operation
//! can still run its own fallback.

use crate::error::SyncError;
use crate::store::StateContainer;
use crate::transport::path_of;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Login endpoint.
pub const LOGIN_ENDPOINT: &str = "/login";

/// Registration endpoint.
pub const REGISTER_ENDPOINT: &str = "/register";

/// Receives classified errors and shows them to the user.
pub trait ErrorDisplay: Send + Sync {
    /// Shows one error.
    fn display(&self, error: &SyncError);
}

/// Displays errors by logging them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDisplay;

impl ErrorDisplay for TracingDisplay {
    fn display(&self, error: &SyncError) {
        warn!(status = ?error.status(), "{}", error);
    }
}

/// Collects displayed errors, for tests and for callers that render later.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    errors: Mutex<Vec<SyncError>>,
}

impl RecordingDisplay {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything displayed so far.
    pub fn errors(&self) -> Vec<SyncError> {
        self.errors.lock().clone()
    }

    /// Number of errors displayed so far.
    pub fn count(&self) -> usize {
        self.errors.lock().len()
    }

    /// Removes and returns everything displayed so far.
    pub fn take(&self) -> Vec<SyncError> {
        std::mem::take(&mut *self.errors.lock())
    }
}

impl ErrorDisplay for RecordingDisplay {
    fn display(&self, error: &SyncError) {
        self.errors.lock().push(error.clone());
    }
}

/// Returns true for the endpoints that issue credentials.
///
/// A 401/403 from these means "wrong password", not "session expired".
pub fn is_auth_endpoint(endpoint: &str) -> bool {
    let path = path_of(endpoint);
    let path = path.split('?').next().unwrap_or(path);
    let path = path.trim_end_matches('/');
    path == LOGIN_ENDPOINT || path == REGISTER_ENDPOINT
}

/// Decides what a failure means for the session and reports it.
pub struct ErrorEscalator<S: StateContainer> {
    store: Arc<S>,
    display: Arc<dyn ErrorDisplay>,
    escalated: AtomicU64,
    sessions_cleared: AtomicU64,
}

impl<S: StateContainer> ErrorEscalator<S> {
    /// Creates an escalator that clears `store` and reports to `display`.
    pub fn new(store: Arc<S>, display: Arc<dyn ErrorDisplay>) -> Self {
        Self {
            store,
            display,
            escalated: AtomicU64::new(0),
            sessions_cleared: AtomicU64::new(0),
        }
    }

    /// Escalates one failure for `endpoint` and returns it.
    pub fn escalate(&self, error: SyncError, endpoint: &str) -> SyncError {
        if error.invalidates_session() && !is_auth_endpoint(endpoint) {
            info!(endpoint, status = ?error.status(), "credentials rejected, clearing session");
            self.store.clear();
            self.sessions_cleared.fetch_add(1, Ordering::Relaxed);
        }

        self.display.display(&error);
        self.escalated.fetch_add(1, Ordering::Relaxed);
        error
    }

    /// Number of failures escalated.
    pub fn escalated(&self) -> u64 {
        self.escalated.load(Ordering::Relaxed)
    }

    /// Number of times the session was torn down.
    pub fn sessions_cleared(&self) -> u64 {
        self.sessions_cleared.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StatePatch};

    fn logged_in() -> (Arc<MemoryStore>, Arc<RecordingDisplay>, ErrorEscalator<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store.update(StatePatch::logged_in("tok", "ada"));
        let display = Arc::new(RecordingDisplay::new());
        let escalator = ErrorEscalator::new(Arc::clone(&store), display.clone());
        (store, display, escalator)
    }

    #[test]
    fn auth_endpoint_detection() {
        assert!(is_auth_endpoint("/login"));
        assert!(is_auth_endpoint("/register"));
        assert!(is_auth_endpoint("http://localhost:3000/login"));
        assert!(!is_auth_endpoint("/home"));
        assert!(!is_auth_endpoint("/profile/login"));
    }

    #[test]
    fn unauthorized_clears_session() {
        for status in [401, 403] {
            let (store, display, escalator) = logged_in();
            let err = escalator.escalate(SyncError::response(status, None), "/home");

            assert_eq!(err.status(), Some(status));
            let session = store.session();
            assert_eq!(session.token, None);
            assert_eq!(session.current_user, None);
            assert!(!session.is_logged_in);
            assert_eq!(display.count(), 1);
            assert_eq!(escalator.sessions_cleared(), 1);
        }
    }

    #[test]
    fn unauthorized_on_login_keeps_session() {
        for endpoint in ["/login", "/register"] {
            let (store, display, escalator) = logged_in();
            escalator.escalate(SyncError::response(403, Some("Incorrect password".into())), endpoint);

            assert!(store.session().is_logged_in);
            assert_eq!(store.session().token.as_deref(), Some("tok"));
            assert_eq!(display.count(), 1);
            assert_eq!(escalator.sessions_cleared(), 0);
        }
    }

    #[test]
    fn other_failures_only_display() {
        let (store, display, escalator) = logged_in();
        escalator.escalate(SyncError::response(500, None), "/home");
        escalator.escalate(SyncError::transport("connection refused"), "/home");

        assert!(store.session().is_logged_in);
        assert_eq!(display.count(), 2);
        assert_eq!(escalator.escalated(), 2);
        assert_eq!(
            display.take(),
            vec![
                SyncError::response(500, None),
                SyncError::transport("connection refused")
            ]
        );
        assert_eq!(display.count(), 0);
    }
}
