//! HTTP capability client.
//!
//! Maps each engine capability onto one endpoint of the generation
//! service host:
//!
//! - text  -> `POST /chat-completion`
//! - image -> `POST /generate-images-leonardo`
//! - audio -> `POST /audio-generation`
//! - video -> `POST /create-video-with-subtitles`
//!
//! Responses are returned as raw JSON values; the engine decides what
//! to substitute downstream. Video responses are normalized so that a
//! `videoUrl` payload becomes `{url, type: "video"}`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use mediaflow_engine::{
    AudioRequest, CapabilityClient, FlowError, ImagePrompt, Result, TextRequest, VideoRequest,
};

use crate::config::ServiceConfig;

/// `CapabilityClient` backed by the generation service HTTP API.
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    config: ServiceConfig,
    http: reqwest::Client,
}

impl HttpServiceClient {
    /// Create a client from the given config.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FlowError::service(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, http })
    }

    /// Create a client from environment configuration.
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env())
    }

    async fn post_json<T: Serialize + ?Sized>(&self, endpoint: &str, body: &T) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, endpoint);
        log::debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await.map_err(|e| {
            FlowError::service(format!(
                "failed to reach generation service at {}: {}",
                url, e
            ))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(FlowError::service(format!(
                "generation service error ({}): {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FlowError::service(format!("failed to parse service response: {}", e)))
    }
}

#[async_trait]
impl CapabilityClient for HttpServiceClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<Value> {
        self.post_json("/chat-completion", request).await
    }

    async fn generate_images(&self, prompts: &[ImagePrompt]) -> Result<Value> {
        self.post_json("/generate-images-leonardo", prompts).await
    }

    async fn generate_audio(&self, request: &AudioRequest) -> Result<Value> {
        self.post_json("/audio-generation", request).await
    }

    async fn compose_video(&self, request: &VideoRequest) -> Result<Value> {
        let response = self.post_json("/create-video-with-subtitles", request).await?;
        Ok(normalize_video_response(response))
    }
}

/// The video endpoint answers with `{videoUrl}`; downstream consumers
/// expect `{url, type}`.
fn normalize_video_response(response: Value) -> Value {
    match response.get("videoUrl").and_then(Value::as_str) {
        Some(url) => serde_json::json!({ "url": url, "type": "video" }),
        None => response,
    }
}
