//! The capability invocation seam.
//!
//! Each node type maps to one request/response exchange against an
//! external generation service. The engine builds typed requests and
//! talks to the services through the `CapabilityClient` trait, so
//! hosts can plug in an HTTP client, a mock, or an in-process
//! implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::types::PropertyMap;

/// Default composed video width.
pub const DEFAULT_VIDEO_WIDTH: u64 = 1280;
/// Default composed video height.
pub const DEFAULT_VIDEO_HEIGHT: u64 = 720;
/// Default composed video topic.
pub const DEFAULT_VIDEO_TOPIC: &str = "flow";
/// Fallback audio duration (seconds) when the audio output carries none.
pub const DEFAULT_AUDIO_DURATION: f64 = 30.0;

/// Request for a text-generation invocation.
///
/// The resolved prompt is forwarded verbatim alongside the remaining
/// node properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    /// The placeholder-resolved prompt.
    pub prompt: String,
    /// The rest of the resolved property mapping.
    #[serde(flatten)]
    pub properties: PropertyMap,
}

/// One element of an image-generation request list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePrompt {
    /// The prompt for a single image.
    pub prompt: String,
}

/// Request for an audio-generation invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioRequest {
    /// The placeholder-resolved text to speak.
    pub text: String,
    /// The rest of the resolved property mapping.
    #[serde(flatten)]
    pub properties: PropertyMap,
}

/// The audio side of a video-composition request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioSource {
    /// URL of the generated audio.
    pub audio_url: String,
    /// Duration in seconds.
    pub audio_duration: f64,
    /// Media type reported by the audio service, if any.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Request for a video-composition invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    /// Flat list of image descriptors/URLs.
    pub image_sources: Vec<Value>,
    /// The audio track to compose against.
    pub audio_sources: AudioSource,
    /// Output height in pixels.
    pub height: u64,
    /// Output width in pixels.
    pub width: u64,
    /// Topic label carried through to the composer.
    pub topic: String,
}

/// Client for the four external generation capabilities.
///
/// Implementations perform the actual request/response exchange; the
/// engine only assembles requests and interprets results.
#[async_trait]
pub trait CapabilityClient: Send + Sync {
    /// Invoke text generation. The result is an opaque text payload.
    async fn generate_text(&self, request: &TextRequest) -> Result<Value>;

    /// Invoke image generation for a list of prompts.
    ///
    /// The result is a list of image descriptors, possibly nested
    /// under an `imageUrls` key.
    async fn generate_images(&self, prompts: &[ImagePrompt]) -> Result<Value>;

    /// Invoke audio generation. The result carries
    /// `{audioUrl, duration, type}`.
    async fn generate_audio(&self, request: &AudioRequest) -> Result<Value>;

    /// Invoke video composition. The result carries
    /// `{url, type: "video"}`.
    async fn compose_video(&self, request: &VideoRequest) -> Result<Value>;
}
