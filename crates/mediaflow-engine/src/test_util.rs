//! Scripted capability client shared by the engine's test modules.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::capability::{
    AudioRequest, CapabilityClient, ImagePrompt, TextRequest, VideoRequest,
};
use crate::error::{FlowError, Result};
use crate::types::Capability;

/// A request the scripted client received, in call order.
#[derive(Debug, Clone)]
pub enum RecordedCall {
    Text(TextRequest),
    Images(Vec<ImagePrompt>),
    Audio(AudioRequest),
    Video(VideoRequest),
}

impl RecordedCall {
    pub fn capability(&self) -> Capability {
        match self {
            RecordedCall::Text(_) => Capability::TextGeneration,
            RecordedCall::Images(_) => Capability::ImageGeneration,
            RecordedCall::Audio(_) => Capability::AudioGeneration,
            RecordedCall::Video(_) => Capability::VideoComposition,
        }
    }
}

/// Capability client returning canned responses and recording requests.
pub struct ScriptedClient {
    text_response: Value,
    image_response: Value,
    audio_response: Value,
    video_response: Value,
    fail_on: Option<Capability>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self {
            text_response: json!("generated text"),
            image_response: json!([{"imageUrls": ["image-1.png"]}]),
            audio_response: json!({"audioUrl": "audio-1.mp3", "duration": 4.2, "type": "audio/mpeg"}),
            video_response: json!({"url": "video-1.mp4", "type": "video"}),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedClient {
    pub fn with_text_response(mut self, response: Value) -> Self {
        self.text_response = response;
        self
    }

    pub fn with_audio_response(mut self, response: Value) -> Self {
        self.audio_response = response;
        self
    }

    /// Fail every invocation of the given capability.
    pub fn failing_on(mut self, capability: Capability) -> Self {
        self.fail_on = Some(capability);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, capability: Capability) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.capability() == capability)
            .count()
    }

    fn respond(&self, call: RecordedCall, response: &Value) -> Result<Value> {
        let capability = call.capability();
        self.calls.lock().unwrap().push(call);
        if self.fail_on == Some(capability) {
            return Err(FlowError::service(format!(
                "scripted {} failure",
                capability
            )));
        }
        Ok(response.clone())
    }
}

#[async_trait]
impl CapabilityClient for ScriptedClient {
    async fn generate_text(&self, request: &TextRequest) -> Result<Value> {
        self.respond(RecordedCall::Text(request.clone()), &self.text_response)
    }

    async fn generate_images(&self, prompts: &[ImagePrompt]) -> Result<Value> {
        self.respond(RecordedCall::Images(prompts.to_vec()), &self.image_response)
    }

    async fn generate_audio(&self, request: &AudioRequest) -> Result<Value> {
        self.respond(RecordedCall::Audio(request.clone()), &self.audio_response)
    }

    async fn compose_video(&self, request: &VideoRequest) -> Result<Value> {
        self.respond(RecordedCall::Video(request.clone()), &self.video_response)
    }
}
