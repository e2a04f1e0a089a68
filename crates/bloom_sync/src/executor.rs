//! Request execution and outcome classification.
//!
//! The executor turns an endpoint, a method and an optional body into one
//! HTTP call and classifies what came back:
//!
//! - the call never completed: [`SyncError::Transport`]
//! - a non-2xx status: [`SyncError::Response`], with the server's `message`
//!   or `API error: <status>`
//! - a 2xx JSON body: [`ApiResponse::Json`]
//! - any other 2xx: [`ApiResponse::Success`], the canonical `{success: true}`
//!
//! It never escalates; that is left to the caller so every failure is
//! reported exactly once.

use crate::error::{SyncError, SyncResult};
use crate::store::StateContainer;
use crate::transport::{HttpClient, HttpRequest, HttpResponse, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// A successful, parsed response.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    /// The server sent a JSON body.
    Json(Value),
    /// The server sent no JSON; stands for `{success: true}`.
    Success,
}

impl ApiResponse {
    /// Returns the response as JSON, materializing the success marker.
    pub fn into_value(self) -> Value {
        match self {
            ApiResponse::Json(value) => value,
            ApiResponse::Success => serde_json::json!({ "success": true }),
        }
    }

    /// Deserializes the response into an endpoint schema.
    pub fn decode<T: DeserializeOwned>(self) -> SyncResult<T> {
        Ok(serde_json::from_value(self.into_value())?)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Issues single API calls against a fixed origin.
pub struct RequestExecutor<C: HttpClient, S: StateContainer> {
    origin: String,
    client: C,
    store: Arc<S>,
}

impl<C: HttpClient, S: StateContainer> RequestExecutor<C, S> {
    /// Creates an executor for `origin`, reading the token from `store`.
    pub fn new(origin: impl Into<String>, client: C, store: Arc<S>) -> Self {
        Self {
            origin: origin.into(),
            client,
            store,
        }
    }

    /// Returns the API origin.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Returns the underlying HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Resolves `endpoint` against the origin unless it is already absolute.
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("{}{}", self.origin, endpoint)
        }
    }

    /// Performs one call and classifies the outcome.
    pub async fn execute<B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> SyncResult<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let body = body
            .map(|b| serde_json::to_vec(b))
            .transpose()
            .map_err(|e| SyncError::InvalidRequest(format!("Failed to encode body: {}", e)))?;

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = self.store.session().token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let request = HttpRequest {
            method,
            url: self.resolve(endpoint),
            headers,
            body,
        };
        debug!(%method, url = %request.url, "sending request");

        let response = self.client.send(request).await.map_err(|e| {
            warn!(%method, endpoint, error = %e, "request did not complete");
            SyncError::transport(e)
        })?;

        classify(response)
    }

    /// Performs one call and deserializes the result into `T`.
    pub async fn execute_as<T, B>(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&B>,
    ) -> SyncResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(endpoint, method, body).await?.decode()
    }
}

/// Classifies a completed response.
pub fn classify(response: HttpResponse) -> SyncResult<ApiResponse> {
    if !response.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&response.body)
            .ok()
            .and_then(|b| b.message);
        debug!(status = response.status, "request failed");
        return Err(SyncError::response(response.status, message));
    }

    if response.is_json() {
        let value = serde_json::from_slice(&response.body)?;
        Ok(ApiResponse::Json(value))
    } else {
        Ok(ApiResponse::Success)
    }
}
