//! Capability-keyed request construction and invocation.
//!
//! Maps a node's declared capability to the payload shape its service
//! expects, built from the node's placeholder-resolved properties and,
//! for video composition, the outputs of its upstream nodes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::capability::{
    AudioRequest, AudioSource, CapabilityClient, ImagePrompt, TextRequest, VideoRequest,
    DEFAULT_AUDIO_DURATION, DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_TOPIC, DEFAULT_VIDEO_WIDTH,
};
use crate::error::{FlowError, Result};
use crate::store::UpstreamInput;
use crate::types::{Capability, FlowNode, NodeOutput, PropertyMap};

static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Build the capability-specific request for `node` and invoke it.
///
/// `resolved` is the node's placeholder-resolved property mapping;
/// `upstream` are its dependency nodes with their cached outputs.
pub async fn dispatch(
    node: &FlowNode,
    resolved: &PropertyMap,
    upstream: &[UpstreamInput],
    client: &dyn CapabilityClient,
) -> Result<Value> {
    log::debug!(
        "Dispatching node '{}' as {}",
        node.display_name(),
        node.capability
    );

    match node.capability {
        Capability::TextGeneration => {
            let request = build_text_request(resolved);
            client.generate_text(&request).await
        }
        Capability::ImageGeneration => {
            let prompts = build_image_prompts(node, resolved)?;
            client.generate_images(&prompts).await
        }
        Capability::AudioGeneration => {
            let request = build_audio_request(resolved);
            client.generate_audio(&request).await
        }
        Capability::VideoComposition => {
            let request = build_video_request(node, resolved, upstream)?;
            client.compose_video(&request).await
        }
    }
}

fn build_text_request(resolved: &PropertyMap) -> TextRequest {
    TextRequest {
        prompt: string_property(resolved, "prompt"),
        properties: remaining_properties(resolved, &["prompt"]),
    }
}

fn build_audio_request(resolved: &PropertyMap) -> AudioRequest {
    AudioRequest {
        text: string_property(resolved, "text"),
        properties: remaining_properties(resolved, &["text"]),
    }
}

/// Parse the resolved prompt into an image request list.
///
/// A prompt starting with `[` is treated as a JSON list of prompt
/// objects after stripping embedded newline noise; anything else is
/// wrapped into a one-element list.
fn build_image_prompts(node: &FlowNode, resolved: &PropertyMap) -> Result<Vec<ImagePrompt>> {
    let prompt = string_property(resolved, "prompt");
    let prompt = prompt.trim();

    if prompt.starts_with('[') {
        let cleaned = strip_prompt_noise(prompt);
        serde_json::from_str::<Vec<ImagePrompt>>(&cleaned).map_err(|e| {
            FlowError::InvalidPromptFormat {
                node: node.display_name().to_string(),
                detail: e.to_string(),
            }
        })
    } else {
        Ok(vec![ImagePrompt {
            prompt: prompt.to_string(),
        }])
    }
}

fn build_video_request(
    node: &FlowNode,
    resolved: &PropertyMap,
    upstream: &[UpstreamInput],
) -> Result<VideoRequest> {
    let image_output = explicit_source(node, resolved, "imageSource")?
        .or_else(|| upstream_output(upstream, Capability::ImageGeneration))
        .ok_or_else(|| FlowError::MissingCompositionInput {
            node: node.display_name().to_string(),
            missing: "image",
        })?;

    let audio_output = explicit_source(node, resolved, "audioSource")?
        .or_else(|| upstream_output(upstream, Capability::AudioGeneration))
        .ok_or_else(|| FlowError::MissingCompositionInput {
            node: node.display_name().to_string(),
            missing: "audio",
        })?;

    Ok(VideoRequest {
        image_sources: normalize_image_sources(image_output),
        audio_sources: AudioSource {
            audio_url: audio_output
                .get("audioUrl")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            audio_duration: audio_output
                .get("duration")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_AUDIO_DURATION),
            media_type: audio_output
                .get("type")
                .and_then(Value::as_str)
                .map(str::to_string),
        },
        height: resolved
            .get("height")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_VIDEO_HEIGHT),
        width: resolved
            .get("width")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_VIDEO_WIDTH),
        topic: resolved
            .get("topic")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_VIDEO_TOPIC)
            .to_string(),
    })
}

/// A non-empty `imageSource`/`audioSource` property, JSON-parsed.
///
/// The property has already been placeholder-resolved, so a token that
/// referenced an upstream output holds that output's JSON text here.
fn explicit_source(node: &FlowNode, resolved: &PropertyMap, key: &str) -> Result<Option<Value>> {
    let Some(source) = resolved.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    serde_json::from_str(source)
        .map(Some)
        .map_err(|e| FlowError::InvalidPromptFormat {
            node: node.display_name().to_string(),
            detail: format!("{} is not valid JSON: {}", key, e),
        })
}

/// The cached success output of the first upstream node with the given
/// capability.
fn upstream_output(upstream: &[UpstreamInput], capability: Capability) -> Option<Value> {
    upstream
        .iter()
        .find(|input| input.capability == capability)
        .and_then(|input| input.output.as_ref())
        .and_then(NodeOutput::success_value)
        .cloned()
}

/// Flatten an image output into a plain source list.
///
/// Accepts the nested `[{imageUrls: [...]}]` shape, an already-flat
/// list, or a single descriptor.
fn normalize_image_sources(image_output: Value) -> Vec<Value> {
    match image_output {
        Value::Array(items) => {
            if let Some(urls) = items
                .first()
                .and_then(|v| v.get("imageUrls"))
                .and_then(Value::as_array)
            {
                urls.clone()
            } else {
                items
            }
        }
        other => vec![other],
    }
}

fn string_property(resolved: &PropertyMap, key: &str) -> String {
    resolved
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn remaining_properties(resolved: &PropertyMap, consumed: &[&str]) -> PropertyMap {
    let mut rest = resolved.clone();
    for key in consumed {
        rest.remove(*key);
    }
    rest
}

fn strip_prompt_noise(text: &str) -> String {
    let cleaned = text.replace("\\n", "").replace(['\n', '\r'], "");
    WHITESPACE_RUNS.replace_all(&cleaned, " ").into_owned()
}
