use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{OcrError, Result};

/// Confidence reported when an engine has not recorded one yet.
pub const DEFAULT_CONFIDENCE: f32 = 0.0;

/// Opaque reference to an image, either a filesystem path or a `file://` URI.
///
/// Resolution is left to the engine adapters; the orchestrator only passes it
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve to an existing file on disk.
    pub fn resolve(&self) -> Result<PathBuf> {
        let raw = self.0.trim();
        if raw.is_empty() {
            return Err(OcrError::InvalidInput("empty image reference".to_string()));
        }

        let path = PathBuf::from(raw.strip_prefix("file://").unwrap_or(raw));
        if !path.exists() {
            return Err(OcrError::InvalidInput(format!(
                "image does not exist: {}",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(OcrError::InvalidInput(format!(
                "image path is not a file: {}",
                path.display()
            )));
        }

        Ok(path)
    }

    /// Resolve and read the image bytes.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        let path = self.resolve()?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            OcrError::InvalidInput(format!("cannot read image {}: {e}", path.display()))
        })?;

        if bytes.is_empty() {
            return Err(OcrError::InvalidInput(format!(
                "image is empty: {}",
                path.display()
            )));
        }

        Ok(bytes)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ImageRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Which engine produced the text last returned by an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineId {
    #[default]
    None,
    OnDevice,
    Cloud,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EngineStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineStatus {
    /// Fold an availability probe into a status. A failed probe is reported
    /// as unavailable with the probe error attached.
    pub fn from_probe(probe: Result<bool>) -> Self {
        match probe {
            Ok(available) => Self {
                available,
                error: None,
            },
            Err(e) => Self {
                available: false,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Point-in-time availability of both engines. Recomputed on every query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub on_device: EngineStatus,
    pub cloud: EngineStatus,
}

impl ServiceStatus {
    pub fn any_available(&self) -> bool {
        self.on_device.available || self.cloud.available
    }
}

/// A text recognition backend.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    fn id(&self) -> EngineId;

    /// Human readable name used in logs and combined error messages.
    fn name(&self) -> &str;

    /// Recognize the text in one image. Unresolvable references fail with
    /// `InvalidInput` before any recognition is attempted.
    async fn extract_text(&self, image: &ImageRef, cancel: &CancellationToken) -> Result<String>;

    /// Recognize several images one after another, failing on the first error.
    async fn extract_text_from_multiple(
        &self,
        images: &[ImageRef],
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let mut texts = Vec::with_capacity(images.len());
        for image in images {
            texts.push(self.extract_text(image, cancel).await?);
        }
        Ok(texts)
    }

    /// Availability probe. `Err` means the probe itself failed.
    async fn is_available(&self) -> Result<bool>;

    /// Confidence of the most recent successful recognition, in `[0, 1]`.
    async fn last_confidence_score(&self) -> Result<f32>;
}
