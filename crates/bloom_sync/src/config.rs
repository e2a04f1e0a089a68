//! Configuration for the sync client.

use std::env;

/// Origin used when none is configured.
pub const DEFAULT_API_ORIGIN: &str = "http://localhost:3000";

/// Default number of suggested follows to request.
pub const DEFAULT_SUGGESTED_FOLLOWS: u32 = 3;

/// Longest bloom the API accepts, in characters.
pub const MAX_BLOOM_LENGTH: usize = 280;

/// Configuration for the sync client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API origin that relative endpoints are resolved against.
    pub api_origin: String,
    /// Number of suggestions requested by `get_who_to_follow`.
    pub suggested_follows: u32,
    /// Maximum bloom length checked before posting.
    pub max_bloom_length: usize,
}

impl ClientConfig {
    /// Creates a new configuration for the given API origin.
    pub fn new(api_origin: impl Into<String>) -> Self {
        let api_origin: String = api_origin.into();
        Self {
            api_origin: api_origin.trim_end_matches('/').to_string(),
            suggested_follows: DEFAULT_SUGGESTED_FOLLOWS,
            max_bloom_length: MAX_BLOOM_LENGTH,
        }
    }

    /// Loads configuration from the environment.
    ///
    /// Reads `BLOOM_API_ORIGIN` and `BLOOM_SUGGESTED_FOLLOWS`, falling back
    /// to defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        let origin = env::var("BLOOM_API_ORIGIN").unwrap_or_else(|_| DEFAULT_API_ORIGIN.into());
        let mut config = Self::new(origin);

        if let Some(count) = env::var("BLOOM_SUGGESTED_FOLLOWS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.suggested_follows = count;
        }

        config
    }

    /// Sets the number of suggested follows to request.
    pub fn with_suggested_follows(mut self, count: u32) -> Self {
        self.suggested_follows = count;
        self
    }

    /// Sets the maximum bloom length.
    pub fn with_max_bloom_length(mut self, length: usize) -> Self {
        self.max_bloom_length = length;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_ORIGIN)
    }
}
