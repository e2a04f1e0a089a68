//! CLI command implementations.

pub mod feed;
pub mod output;
pub mod session;
pub mod social;

use bloom_sync::{ErrorDisplay, MemoryStore, Outcome, ReqwestClient, SyncClient, SyncError};

/// The client every command runs against.
pub type Client = SyncClient<ReqwestClient, MemoryStore>;

/// Result of a command.
pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Prints escalated errors to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDisplay;

impl ErrorDisplay for StderrDisplay {
    fn display(&self, error: &SyncError) {
        eprintln!("error: {}", error);
    }
}

/// Credentials supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Auth {
    username: Option<String>,
    password: Option<String>,
}

impl Auth {
    /// Creates credentials from optional flags.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self { username, password }
    }

    /// Returns true if both username and password were given.
    pub fn is_present(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Returns the username and password, or an error naming what is missing.
    pub fn credentials(&self) -> Result<(&str, &str), Box<dyn std::error::Error>> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) => Ok((username, password)),
            (None, _) => Err("--username (or BLOOM_USERNAME) is required".into()),
            (_, None) => Err("--password (or BLOOM_PASSWORD) is required".into()),
        }
    }

    /// Logs in, failing unless a session was established.
    pub async fn login(&self, client: &Client) -> CmdResult {
        let (username, password) = self.credentials()?;
        let response = require(client.login(username, password).await, "login")?;
        if !response.success || !client.state().session.is_logged_in {
            return Err("login was not accepted".into());
        }
        Ok(())
    }
}

/// Unwraps a successful outcome, or reports that `action` failed.
///
/// The underlying error has already been displayed.
pub fn require<T>(outcome: Outcome<T>, action: &str) -> Result<T, Box<dyn std::error::Error>> {
    outcome
        .success()
        .ok_or_else(|| format!("{} failed", action).into())
}
