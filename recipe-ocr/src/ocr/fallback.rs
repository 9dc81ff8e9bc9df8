use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::{OcrError, Result};

use super::engine::{
    EngineId, EngineStatus, ImageRef, RecognitionEngine, ServiceStatus, DEFAULT_CONFIDENCE,
};

/// Which engine is tried first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineOrder {
    #[default]
    OnDeviceFirst,
    CloudFirst,
}

impl From<&OrchestratorConfig> for EngineOrder {
    fn from(config: &OrchestratorConfig) -> Self {
        if config.prefer_cloud {
            EngineOrder::CloudFirst
        } else {
            EngineOrder::OnDeviceFirst
        }
    }
}

/// Text from one image together with its provenance.
struct Attempt {
    text: String,
    engine: EngineId,
    confidence: f32,
}

/// Runs the primary engine and, on failure, exactly one hop to the secondary.
///
/// The provenance fields are overwritten by every successful extraction and
/// cleared only by [`FallbackOrchestrator::reset`]. Extraction takes
/// `&mut self`, so one instance serves one in-flight request at a time;
/// share engines (they are `Arc`ed) rather than orchestrators.
pub struct FallbackOrchestrator {
    on_device: Arc<dyn RecognitionEngine>,
    cloud: Arc<dyn RecognitionEngine>,
    order: EngineOrder,
    last_used_engine: EngineId,
    last_confidence: f32,
}

impl FallbackOrchestrator {
    pub fn new(on_device: Arc<dyn RecognitionEngine>, cloud: Arc<dyn RecognitionEngine>) -> Self {
        Self::with_order(on_device, cloud, EngineOrder::default())
    }

    pub fn with_order(
        on_device: Arc<dyn RecognitionEngine>,
        cloud: Arc<dyn RecognitionEngine>,
        order: EngineOrder,
    ) -> Self {
        Self {
            on_device,
            cloud,
            order,
            last_used_engine: EngineId::None,
            last_confidence: DEFAULT_CONFIDENCE,
        }
    }

    pub fn order(&self) -> EngineOrder {
        self.order
    }

    fn primary(&self) -> &dyn RecognitionEngine {
        match self.order {
            EngineOrder::OnDeviceFirst => self.on_device.as_ref(),
            EngineOrder::CloudFirst => self.cloud.as_ref(),
        }
    }

    fn secondary(&self) -> &dyn RecognitionEngine {
        match self.order {
            EngineOrder::OnDeviceFirst => self.cloud.as_ref(),
            EngineOrder::CloudFirst => self.on_device.as_ref(),
        }
    }

    /// Extract text from one image, falling back once if the primary fails.
    pub async fn extract_text(
        &mut self,
        image: &ImageRef,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let attempt = self.attempt(image, cancel).await?;
        self.record(&attempt);
        Ok(attempt.text)
    }

    /// Extract text from every image, at most `concurrency` at a time.
    ///
    /// Failed images are dropped, so the result may be shorter than `images`;
    /// successes keep input order. Fails only when no image succeeds.
    pub async fn extract_text_from_multiple(
        &mut self,
        images: &[ImageRef],
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        if images.is_empty() {
            return Err(OcrError::InvalidInput("no images provided".to_string()));
        }

        let outcomes: Vec<Result<Attempt>> = stream::iter(
            images.iter().map(|image| self.attempt(image, cancel)),
        )
        .buffered(concurrency.max(1))
        .collect()
        .await;

        if cancel.is_cancelled() {
            return Err(OcrError::Cancelled);
        }

        let mut texts = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        let mut last_success = None;

        for (image, outcome) in images.iter().zip(outcomes) {
            match outcome {
                Ok(attempt) => {
                    texts.push(attempt.text.clone());
                    last_success = Some(attempt);
                }
                Err(e) => {
                    warn!(image = %image, error = %e, "Dropping image from batch");
                    errors.push(format!("{image}: {e}"));
                }
            }
        }

        match last_success {
            Some(attempt) => {
                self.record(&attempt);
                info!(
                    succeeded = texts.len(),
                    failed = errors.len(),
                    "Batch OCR finished"
                );
                Ok(texts)
            }
            None => Err(OcrError::BatchFailed(errors.join("; "))),
        }
    }

    async fn attempt(&self, image: &ImageRef, cancel: &CancellationToken) -> Result<Attempt> {
        let primary = self.primary();
        let primary_error = match primary.extract_text(image, cancel).await {
            Ok(text) => return Ok(Self::attempt_from(primary, text).await),
            Err(e) if !e.allows_fallback() => return Err(e),
            Err(e) => e,
        };

        let secondary = self.secondary();
        warn!(
            image = %image,
            error = %primary_error,
            "{} OCR failed, falling back to {}",
            primary.name(),
            secondary.name()
        );

        match secondary.extract_text(image, cancel).await {
            Ok(text) => Ok(Self::attempt_from(secondary, text).await),
            Err(OcrError::Cancelled) => Err(OcrError::Cancelled),
            Err(secondary_error) => Err(OcrError::AllEnginesFailed {
                primary: primary.name().to_string(),
                secondary: secondary.name().to_string(),
                primary_error: primary_error.to_string(),
                secondary_error: secondary_error.to_string(),
            }),
        }
    }

    async fn attempt_from(engine: &dyn RecognitionEngine, text: String) -> Attempt {
        let confidence = engine
            .last_confidence_score()
            .await
            .map(|score| score.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_CONFIDENCE);

        debug!(engine = engine.name(), confidence, "OCR attempt succeeded");
        Attempt {
            text,
            engine: engine.id(),
            confidence,
        }
    }

    fn record(&mut self, attempt: &Attempt) {
        self.last_used_engine = attempt.engine;
        self.last_confidence = attempt.confidence;
    }

    /// `Ok(true)` when at least one engine reports itself available. Probe
    /// failures count as unavailable and are visible in [`Self::service_status`],
    /// so this never returns `Err`.
    pub async fn is_available(&self) -> Result<bool> {
        Ok(self.service_status().await.any_available())
    }

    /// Probe both engines. Never fails; probe errors are reported per engine.
    pub async fn service_status(&self) -> ServiceStatus {
        let (on_device, cloud) =
            tokio::join!(self.on_device.is_available(), self.cloud.is_available());

        ServiceStatus {
            on_device: EngineStatus::from_probe(on_device),
            cloud: EngineStatus::from_probe(cloud),
        }
    }

    pub fn last_used_engine(&self) -> EngineId {
        self.last_used_engine
    }

    pub fn last_confidence_score(&self) -> f32 {
        self.last_confidence
    }

    pub fn reset(&mut self) {
        self.last_used_engine = EngineId::None;
        self.last_confidence = DEFAULT_CONFIDENCE;
    }
}
