//! HTTP client for the Kemia media API.
//!
//! Provides a minimal client with optional Bearer auth, a multipart POST
//! helper with typed error mapping, and the batch upload transport used by
//! the uploader crate.

pub mod transport;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use kemia_core::{TransportError, UploaderConfig};

/// Authentication strategy for the API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// No credential; the endpoint decides what anonymous callers may do.
    Anonymous,
}

/// API version prefix (e.g. "/api/v0"). Set KEMIA_API_VERSION to match the server.
pub fn api_prefix() -> String {
    let version = std::env::var("KEMIA_API_VERSION").unwrap_or_else(|_| "v0".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the Kemia media API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: String, auth: Auth, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Build a client from uploader configuration; the configured token, when
    /// present, is attached as a Bearer credential.
    pub fn from_config(config: &UploaderConfig) -> Result<Self, TransportError> {
        let auth = match &config.api_token {
            Some(token) => Auth::Bearer(token.clone()),
            None => Auth::Anonymous,
        };
        Self::new(
            config.api_url.clone(),
            auth,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::Anonymous => request,
        }
    }

    /// POST a multipart form and deserialize the JSON response.
    ///
    /// Non-2xx statuses map to [`TransportError::ServerRejected`]; connection
    /// faults map to [`TransportError::Network`]; an unparseable body is a
    /// contract violation, not a network issue.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, TransportError> {
        let url = self.build_url(path);
        let request = self.client.post(&url).multipart(form);
        let request = self.apply_auth(request);

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::ServerRejected {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let body: T = response.json().await.map_err(|e| {
            TransportError::ContractViolation(format!("Failed to parse response as JSON: {}", e))
        })?;

        Ok(body)
    }

    /// Raw client for custom requests. Caller must apply auth via build_url and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

// Re-export the transport surface for convenience.
pub use transport::{
    BatchOutcomes, DispatchMode, HttpTransport, ProgressSender, Transport, UploadOptions,
};
