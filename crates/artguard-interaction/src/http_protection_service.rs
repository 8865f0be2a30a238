//! HttpProtectionService - REST client for the external watermark service.
//!
//! Endpoints:
//! - `GET /health` capability probe
//! - `POST /watermark_batch` all layers of a cycle in one call
//! - `POST /watermark` one layer per call
//! - `POST /verify` watermark detection for one image
//!
//! Configuration priority: explicit config > environment variables (ARTGUARD_API_KEY)

use artguard_core::config::ServiceConfig;
use artguard_core::error::{ArtguardError, Result};
use artguard_core::protection::ProtectionRequest;
use artguard_core::protection::ProtectionService;
use artguard_core::protection::wire::{HealthResponse, LayerRequest, VerifyRequest, VerifyResponse};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::env;
use std::time::Duration;

/// Protection service reached over HTTP.
#[derive(Clone)]
pub struct HttpProtectionService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_timeout: Duration,
    health_timeout: Duration,
}

impl HttpProtectionService {
    /// Creates a new client for `base_url`.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let defaults = ServiceConfig::default();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(defaults.request_timeout_secs),
            health_timeout: Duration::from_secs(defaults.health_timeout_secs),
        }
    }

    /// Builds a client from configuration, falling back to `ARTGUARD_API_KEY` for the key.
    pub fn from_config(config: &ServiceConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| env::var("ARTGUARD_API_KEY").ok());

        tracing::info!(
            "[HttpProtectionService] Initialized with URL: {}, API key: {}",
            config.base_url,
            if api_key.is_some() { "present" } else { "none" }
        );

        Self::new(config.base_url.clone(), api_key)
            .with_timeouts(
                Duration::from_secs(config.request_timeout_secs),
                Duration::from_secs(config.health_timeout_secs),
            )
    }

    pub fn with_timeouts(mut self, request: Duration, health: Duration) -> Self {
        self.request_timeout = request;
        self.health_timeout = health;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Adds the bearer token when one is configured.
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(api_key) = &self.api_key {
            request.header("Authorization", format!("Bearer {}", api_key))
        } else {
            request
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .auth_request(request)
            .send()
            .await
            .map_err(|e| ArtguardError::transport(format!("{} request failed: {}", what, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ArtguardError::transport(format!(
                "{} returned {}: {}",
                what, status, error_text
            )));
        }

        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ArtguardError::parse(format!("Failed to parse {} response: {}", what, e)))
    }
}

#[async_trait]
impl ProtectionService for HttpProtectionService {
    async fn health(&self) -> Result<HealthResponse> {
        let request = self
            .client
            .get(self.endpoint("health"))
            .timeout(self.health_timeout);
        let response = self.send(request, "health").await?;
        Self::read_json(response, "health").await
    }

    async fn protect_batch(&self, request: &ProtectionRequest) -> Result<serde_json::Value> {
        tracing::debug!(
            "[HttpProtectionService] POST watermark_batch ({} layers)",
            request.layer_count
        );
        let builder = self
            .client
            .post(self.endpoint("watermark_batch"))
            .json(request)
            .timeout(self.request_timeout);
        let response = self.send(builder, "watermark_batch").await?;
        Self::read_json(response, "watermark_batch").await
    }

    async fn protect_layer(&self, request: &LayerRequest) -> Result<serde_json::Value> {
        let builder = self
            .client
            .post(self.endpoint("watermark"))
            .json(request)
            .timeout(self.request_timeout);
        let response = self.send(builder, "watermark").await?;
        Self::read_json(response, "watermark").await
    }

    async fn verify(&self, request: &VerifyRequest) -> Result<VerifyResponse> {
        let builder = self
            .client
            .post(self.endpoint("verify"))
            .json(request)
            .timeout(self.request_timeout);
        let response = self.send(builder, "verify").await?;
        Self::read_json(response, "verify").await
    }
}
