//! Enhancement backend contract
//!
//! The viewport only produces a cropped snapshot; upscaling it is someone
//! else's job. This module pins down that collaborator: what it receives,
//! how the prompt is phrased and the rule that a failed enhancement hands
//! back the original image instead of an error.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Input to an enhancement backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhanceRequest {
    /// Cropped image as a base64 data URL
    pub image_data_url: String,
    /// Oldest first; the last entry describes the current subject
    pub history: Vec<String>,
}

impl EnhanceRequest {
    pub fn new(image_data_url: impl Into<String>, history: Vec<String>) -> Self {
        Self {
            image_data_url: image_data_url.into(),
            history,
        }
    }

    /// Base64 payload of the image, without the `data:` header
    pub fn payload(&self) -> &str {
        data_url_payload(&self.image_data_url)
    }

    pub fn prompt(&self) -> String {
        build_prompt(&self.history)
    }
}

/// An image enhancement backend
pub trait Enhancer: Send + Sync {
    /// Returns the enhanced image as a data URL
    fn enhance(&self, request: EnhanceRequest) -> BoxFuture<'_, anyhow::Result<String>>;
}

/// Hands the input back untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughEnhancer;

impl Enhancer for PassthroughEnhancer {
    fn enhance(&self, request: EnhanceRequest) -> BoxFuture<'_, anyhow::Result<String>> {
        async move { Ok(request.image_data_url) }.boxed()
    }
}

/// Run `enhancer`, falling back to the original image on any failure
///
/// An empty history skips the backend entirely. A response that is not a
/// data URL with a payload counts as a failure.
pub async fn enhance_or_original(enhancer: &dyn Enhancer, request: EnhanceRequest) -> String {
    if request.history.is_empty() {
        log::warn!("Enhancement history is empty, keeping the original crop");
        return request.image_data_url;
    }

    let original = request.image_data_url.clone();
    match enhancer.enhance(request).await {
        Ok(url) if is_usable_data_url(&url) => url,
        Ok(_) => {
            log::warn!("Enhancer returned no image, keeping the original crop");
            original
        }
        Err(e) => {
            log::warn!("Enhancement failed, keeping the original crop: {:#}", e);
            original
        }
    }
}

fn is_usable_data_url(url: &str) -> bool {
    url.starts_with("data:") && !data_url_payload(url).is_empty()
}

/// Everything after the first comma of a data URL, or "" when there is none
pub fn data_url_payload(url: &str) -> &str {
    url.split_once(',').map_or("", |(_, payload)| payload)
}

/// Upscale instruction for the backend, keyed on the most recent history entry
pub fn build_prompt(history: &[String]) -> String {
    let subject = match history.last().map(|s| s.trim()) {
        Some(context) if !context.is_empty() => format!("photo of {context}"),
        _ => "image".to_string(),
    };
    format!(
        "The provided image is a low-resolution {subject}. Please upscale the image to a \
         high-resolution, perfectly detailed image.\n\n\
         **DO NOT add any elements or render outside of the provided reference image subject.** \
         The resulting image should be a clearer, higher-resolution version of the input, and \
         nothing more and match in shapes and colors.\n\n\
         However, if the content of the image can't be determined, you are free to be creative \
         and add objects or textures to match the shapes and colors within the image.\n"
    )
}

// ============================================================================
// Multi-part responses
// ============================================================================

/// One part of a generative backend's reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsePart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

/// Data URL of the first inline image among `parts`, if any
pub fn first_inline_image(parts: &[ResponsePart]) -> Option<String> {
    parts.iter().find_map(|part| match part {
        ResponsePart::InlineData { mime_type, data } => {
            Some(format!("data:{mime_type};base64,{data}"))
        }
        ResponsePart::Text(_) => None,
    })
}
