use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CloudConfig;
use crate::error::{OcrError, Result};

use super::engine::{EngineId, ImageRef, RecognitionEngine, DEFAULT_CONFIDENCE};

const FEATURE_TYPE: &str = "DOCUMENT_TEXT_DETECTION";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateRequest {
    requests: Vec<ImageRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_context: Option<ImageContext>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageContext {
    language_hints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    confidence: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    message: String,
}

#[derive(Clone, Debug)]
struct VisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    language_hints: Vec<String>,
}

enum CloudBackend {
    Ready(VisionClient),
    NotConfigured,
    Unavailable { reason: String },
}

/// Cloud engine speaking the Vision `images:annotate` protocol.
///
/// Without an API key the engine is simply not available (no probe error).
/// There are no retries here; a failed request is the orchestrator's cue to
/// move on.
pub struct CloudVisionEngine {
    backend: CloudBackend,
    last_confidence: Mutex<f32>,
}

impl VisionClient {
    fn new(config: &CloudConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Unavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            language_hints: config.language_hints.clone(),
        })
    }

    async fn annotate(&self, image_bytes: &[u8]) -> Result<(String, Option<f32>)> {
        let request = AnnotateRequest {
            requests: vec![ImageRequest {
                image: ImageContent {
                    content: STANDARD.encode(image_bytes),
                },
                features: vec![Feature {
                    kind: FEATURE_TYPE,
                }],
                image_context: (!self.language_hints.is_empty()).then(|| ImageContext {
                    language_hints: self.language_hints.clone(),
                }),
            }],
        };

        let resp = self
            .client
            .post(format!("{}/images:annotate", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::Engine(format!("API request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(OcrError::Engine(format!(
                "API request failed: {status} - {body}"
            )));
        }

        let annotated: AnnotateResponse = resp
            .json()
            .await
            .map_err(|e| OcrError::Engine(format!("Failed to parse response: {e}")))?;

        let response = annotated
            .responses
            .into_iter()
            .next()
            .ok_or_else(|| OcrError::Engine("No response from API".to_string()))?;

        if let Some(error) = response.error {
            return Err(OcrError::Engine(format!("API returned error: {}", error.message)));
        }

        let (text, confidence) = match response.full_text_annotation {
            Some(annotation) => {
                let confidence = mean_page_confidence(&annotation.pages);
                (annotation.text, confidence)
            }
            None => (
                response
                    .text_annotations
                    .into_iter()
                    .next()
                    .map(|a| a.description)
                    .unwrap_or_default(),
                None,
            ),
        };

        Ok((text.trim().to_string(), confidence))
    }
}

fn mean_page_confidence(pages: &[Page]) -> Option<f32> {
    let scores: Vec<f32> = pages.iter().filter_map(|p| p.confidence).collect();
    if scores.is_empty() {
        return None;
    }
    Some((scores.iter().sum::<f32>() / scores.len() as f32).clamp(0.0, 1.0))
}

impl CloudVisionEngine {
    pub fn new(config: &CloudConfig) -> Self {
        let backend = match &config.api_key {
            None => {
                info!("Cloud OCR API key not set - cloud engine disabled");
                CloudBackend::NotConfigured
            }
            Some(api_key) => match VisionClient::new(config, api_key.clone()) {
                Ok(client) => {
                    info!(base_url = %client.base_url, "Cloud Vision OCR backend initialized");
                    CloudBackend::Ready(client)
                }
                Err(e) => {
                    let reason = format!("Cloud Vision OCR backend unavailable: {e}");
                    warn!("{}", reason);
                    CloudBackend::Unavailable { reason }
                }
            },
        };

        Self {
            backend,
            last_confidence: Mutex::new(DEFAULT_CONFIDENCE),
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        match &self.backend {
            CloudBackend::Ready(client) => Some(&client.base_url),
            _ => None,
        }
    }
}

#[async_trait]
impl RecognitionEngine for CloudVisionEngine {
    fn id(&self) -> EngineId {
        EngineId::Cloud
    }

    fn name(&self) -> &str {
        "Cloud Vision"
    }

    async fn extract_text(&self, image: &ImageRef, cancel: &CancellationToken) -> Result<String> {
        let bytes = image.read_bytes().await?;

        let client = match &self.backend {
            CloudBackend::Ready(client) => client,
            CloudBackend::NotConfigured => {
                return Err(OcrError::Unavailable(
                    "API key required for cloud OCR".to_string(),
                ))
            }
            CloudBackend::Unavailable { reason } => {
                return Err(OcrError::Unavailable(reason.clone()))
            }
        };

        let (text, confidence) = tokio::select! {
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            result = client.annotate(&bytes) => result?,
        };

        if text.is_empty() {
            return Err(OcrError::Engine("No text detected in image".to_string()));
        }

        *self.last_confidence.lock().await = confidence.unwrap_or(DEFAULT_CONFIDENCE);
        debug!(image = %image, ?confidence, chars = text.len(), "Cloud Vision recognized text");

        Ok(text)
    }

    async fn is_available(&self) -> Result<bool> {
        match &self.backend {
            CloudBackend::Ready(_) => Ok(true),
            CloudBackend::NotConfigured => Ok(false),
            CloudBackend::Unavailable { reason } => Err(OcrError::Unavailable(reason.clone())),
        }
    }

    async fn last_confidence_score(&self) -> Result<f32> {
        Ok(*self.last_confidence.lock().await)
    }
}
