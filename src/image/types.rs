//! Core types for image generation.

use crate::prompt::{PromptSpec, DEFAULT_SIZE};
use serde::{Deserialize, Serialize};

/// One image produced by the generation service, pending download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResult {
    /// Where the image can be fetched. Empty if the service sent none.
    pub url: String,
}

impl ImageResult {
    /// Creates a result for the given URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Returns the URL, or `None` if it is blank.
    pub fn url(&self) -> Option<&str> {
        let url = self.url.trim();
        (!url.is_empty()).then_some(url)
    }
}

/// A request to generate images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// The text prompt describing the desired image.
    pub prompt: String,
    /// `"<width>*<height>"` size string.
    pub size: String,
    /// Attributes to avoid. Omitted from the request when empty.
    pub negative_prompt: String,
    /// Let the service extend the prompt.
    pub prompt_extend: bool,
    /// Add a watermark to the output.
    pub watermark: bool,
}

impl GenerationRequest {
    /// Creates a new request with the given prompt and default parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            size: DEFAULT_SIZE.to_string(),
            negative_prompt: String::new(),
            prompt_extend: true,
            watermark: false,
        }
    }

    /// Sets the size string.
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Sets the negative prompt.
    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.negative_prompt = negative_prompt.into();
        self
    }

    /// Enables or disables prompt extension.
    pub fn with_prompt_extend(mut self, prompt_extend: bool) -> Self {
        self.prompt_extend = prompt_extend;
        self
    }

    /// Enables or disables the watermark.
    pub fn with_watermark(mut self, watermark: bool) -> Self {
        self.watermark = watermark;
        self
    }
}

impl From<&PromptSpec> for GenerationRequest {
    fn from(spec: &PromptSpec) -> Self {
        Self::new(spec.prompt())
            .with_size(spec.size())
            .with_negative_prompt(spec.negative_prompt())
            .with_prompt_extend(spec.prompt_extend())
            .with_watermark(spec.watermark())
    }
}

// Wire format for the multimodal-generation endpoint.

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    pub model: String,
    pub input: WireInput,
    pub parameters: WireParameters,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireInput {
    pub messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: Vec<WireText>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireText {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireParameters {
    pub size: String,
    pub prompt_extend: bool,
    pub watermark: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

impl WireRequest {
    pub(crate) fn from_generation_request(req: &GenerationRequest, model: &str) -> Self {
        Self {
            model: model.to_string(),
            input: WireInput {
                messages: vec![WireMessage {
                    role: "user",
                    content: vec![WireText {
                        text: req.prompt.clone(),
                    }],
                }],
            },
            parameters: WireParameters {
                size: req.size.clone(),
                prompt_extend: req.prompt_extend,
                watermark: req.watermark,
                negative_prompt: (!req.negative_prompt.is_empty())
                    .then(|| req.negative_prompt.clone()),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub output: Option<WireOutput>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireOutput {
    #[serde(default)]
    pub choices: Vec<WireChoice>,
    #[serde(default)]
    pub results: Vec<WireResultItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireChoice {
    #[serde(default)]
    pub message: Option<WireChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireChoiceMessage {
    #[serde(default)]
    pub content: Vec<WireContentItem>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireContentItem {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireResultItem {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub image_count: Option<u32>,
}

/// Error body returned with non-200 statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The response shape images were found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ImageSource {
    /// `output.choices[*].message.content[*].image`
    Choices(Vec<ImageResult>),
    /// `output.results[*].url`
    Results(Vec<ImageResult>),
}

impl ImageSource {
    /// Picks images from `choices`, falling back to `results`.
    ///
    /// Returns `None` when neither shape yields an image.
    pub(crate) fn from_output(output: &WireOutput) -> Option<Self> {
        let choices: Vec<ImageResult> = output
            .choices
            .iter()
            .filter_map(|choice| choice.message.as_ref())
            .flat_map(|message| message.content.iter())
            .filter_map(|item| item.image.as_deref())
            .map(ImageResult::new)
            .collect();
        if !choices.is_empty() {
            return Some(Self::Choices(choices));
        }

        let results: Vec<ImageResult> = output
            .results
            .iter()
            .filter_map(|item| item.url.as_deref())
            .map(ImageResult::new)
            .collect();
        if !results.is_empty() {
            return Some(Self::Results(results));
        }

        None
    }

    /// Returns the images regardless of shape.
    pub(crate) fn into_images(self) -> Vec<ImageResult> {
        match self {
            Self::Choices(images) | Self::Results(images) => images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn output_from(value: serde_json::Value) -> WireOutput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_request_from_prompt_spec() {
        let spec = PromptSpec::parse("prompt:\nA cat\nsize=512*512\nwatermark=on").unwrap();
        let req = GenerationRequest::from(&spec);

        assert_eq!(req.prompt, "A cat");
        assert_eq!(req.size, "512*512");
        assert!(req.watermark);
        assert!(req.prompt_extend);
        assert!(req.negative_prompt.is_empty());
    }

    #[test]
    fn test_wire_request_shape() {
        let req = GenerationRequest::new("A cat").with_negative_prompt("blurry");
        let wire = WireRequest::from_generation_request(&req, "qwen-image-max");

        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            json!({
                "model": "qwen-image-max",
                "input": {
                    "messages": [{"role": "user", "content": [{"text": "A cat"}]}]
                },
                "parameters": {
                    "size": "1024*1024",
                    "prompt_extend": true,
                    "watermark": false,
                    "negative_prompt": "blurry"
                }
            })
        );
    }

    #[test]
    fn test_wire_request_skips_empty_negative_prompt() {
        let req = GenerationRequest::new("A cat");
        let wire = WireRequest::from_generation_request(&req, "qwen-image-max");
        let json = serde_json::to_value(&wire).unwrap();

        assert!(json["parameters"].get("negative_prompt").is_none());
    }

    #[test]
    fn test_source_from_choices() {
        let output = output_from(json!({
            "choices": [{
                "finish_reason": "stop",
                "message": {
                    "role": "assistant",
                    "content": [{"image": "http://x/img.png"}, {"text": "caption"}]
                }
            }]
        }));
        assert_eq!(
            ImageSource::from_output(&output),
            Some(ImageSource::Choices(vec![ImageResult::new("http://x/img.png")]))
        );
    }

    #[test]
    fn test_source_falls_back_to_results() {
        let output = output_from(json!({
            "choices": [],
            "results": [{"url": "http://x/a.png"}, {"code": "DataInspectionFailed"}, {"url": "http://x/b.png"}]
        }));
        let source = ImageSource::from_output(&output).unwrap();

        assert!(matches!(source, ImageSource::Results(_)));
        assert_eq!(
            source.into_images(),
            vec![ImageResult::new("http://x/a.png"), ImageResult::new("http://x/b.png")]
        );
    }

    #[test]
    fn test_source_none() {
        assert_eq!(ImageSource::from_output(&WireOutput::default()), None);

        let output = output_from(json!({"choices": [{"message": {"content": [{"text": "no"}]}}]}));
        assert_eq!(ImageSource::from_output(&output), None);
    }

    #[test]
    fn test_image_result_blank_url() {
        assert_eq!(ImageResult::new("  ").url(), None);
        assert_eq!(ImageResult::new("http://x").url(), Some("http://x"));
    }
}
