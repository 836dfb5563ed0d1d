//! REST client for the telemetry backend.
//!
//! Every authenticated call attaches `Authorization: Bearer <token>` from
//! the injected [`StatePort`]. A 401/403 response clears the stored token
//! and surfaces [`ApiError::Unauthorized`]; the caller resolves it by
//! re-running [`login`](ApiClient::login) with configured credentials.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{DeviceRecord, Reading, SensorInfo};
use crate::persist::StatePort;

/// Errors from the REST backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token, or the backend rejected the one we had.
    #[error("authentication required")]
    Unauthorized,

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a response body.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for a response.
    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Connection(err.to_string())
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Http(err.to_string())
        }
    }
}

/// Bearer-token authenticated client for the telemetry REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoint: String,
    store: Arc<dyn StatePort>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl ApiClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Whether a token is currently stored.
    pub fn has_token(&self) -> bool {
        self.store.load_token().is_some()
    }

    /// `POST /auth/login`: exchange credentials for a bearer token.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.endpoint))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "login returned status {}",
                response.status()
            )));
        }

        let login: LoginResponse = response.json().await.map_err(|e| ApiError::Parse(e.to_string()))?;
        self.store.save_token(&login.token);
        Ok(())
    }

    /// `GET /devices`: the full device snapshot.
    pub async fn devices(&self) -> Result<Vec<DeviceRecord>, ApiError> {
        self.get_json("/devices", &[]).await
    }

    /// `GET /devices/{id}`: a single device record.
    pub async fn device(&self, device_id: &str) -> Result<DeviceRecord, ApiError> {
        self.get_json(&format!("/devices/{device_id}"), &[]).await
    }

    /// `GET /devices/{id}/readings`: bucketed readings over a time range.
    pub async fn readings(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        timebucket: &str,
    ) -> Result<Vec<Reading>, ApiError> {
        self.get_json(
            &format!("/devices/{device_id}/readings"),
            &readings_query(start, end, timebucket),
        )
        .await
    }

    /// `GET /sensors`: the sensor catalog.
    pub async fn sensors(&self) -> Result<Vec<SensorInfo>, ApiError> {
        self.get_json("/sensors", &[]).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let Some(token) = self.store.load_token() else {
            return Err(ApiError::Unauthorized);
        };

        let response = self
            .http
            .get(format!("{}{}", self.endpoint, path))
            .query(query)
            .bearer_auth(token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            // Token expired or revoked: clear it and force re-authentication.
            self.store.clear_token();
            return Err(ApiError::Unauthorized);
        }
        if !response.status().is_success() {
            return Err(ApiError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        response.json().await.map_err(|e| ApiError::Parse(e.to_string()))
    }
}

/// Query parameters for the bucketed-readings endpoint.
fn readings_query(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    timebucket: &str,
) -> [(&'static str, String); 3] {
    [
        ("start_date", start.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ("end_date", end.format("%Y-%m-%dT%H:%M:%SZ").to_string()),
        ("timebucket", timebucket.to_string()),
    ]
}

/// Builder for [`ApiClient`].
#[derive(Debug, Default)]
pub struct ApiClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl ApiClientBuilder {
    /// Set the backend base URL (e.g. "http://localhost:8000").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client with the given persistence port for the token.
    pub fn build(self, store: Arc<dyn StatePort>) -> ApiClient {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        ApiClient {
            http: client,
            endpoint: self
                .endpoint
                .map(|e| e.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use chrono::TimeZone;

    fn client() -> ApiClient {
        ApiClient::builder().build(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_builder_defaults() {
        let api = client();
        assert_eq!(api.endpoint, "http://localhost:8000");
        assert!(!api.has_token());
    }

    #[test]
    fn test_builder_trims_trailing_slash() {
        let api = ApiClient::builder()
            .endpoint("http://backend:9000/")
            .build(Arc::new(MemoryStore::new()));
        assert_eq!(api.endpoint, "http://backend:9000");
    }

    #[test]
    fn test_readings_query_format() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();

        let query = readings_query(start, end, "5m");
        assert_eq!(query[0], ("start_date", "2024-05-01T10:00:00Z".to_string()));
        assert_eq!(query[1], ("end_date", "2024-05-01T11:00:00Z".to_string()));
        assert_eq!(query[2], ("timebucket", "5m".to_string()));
    }

    #[tokio::test]
    async fn test_requests_without_token_are_unauthorized() {
        // No token stored: the request is rejected before touching the network.
        let api = client();
        let err = api.devices().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }
}
