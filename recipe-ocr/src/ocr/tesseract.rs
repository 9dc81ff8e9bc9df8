use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leptess::LepTess;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::OnDeviceConfig;
use crate::error::{OcrError, Result};

use super::engine::{EngineId, ImageRef, RecognitionEngine, DEFAULT_CONFIDENCE};
use super::preprocessing::preprocess_image;

enum TesseractBackend {
    Ready { tesseract: Arc<Mutex<LepTess>> },
    Unavailable { reason: String },
}

/// On-device engine backed by Tesseract through leptess.
///
/// A failed Tesseract initialisation does not fail construction; the engine
/// reports the reason from its availability probe and every extraction fails
/// with `Unavailable`, which lets the orchestrator fall back.
pub struct TesseractEngine {
    backend: TesseractBackend,
    config: OnDeviceConfig,
    last_confidence: Mutex<f32>,
}

fn create_tesseract(languages: &str) -> std::result::Result<LepTess, String> {
    LepTess::new(None, languages).map_err(|e| e.to_string())
}

impl TesseractEngine {
    pub fn new(config: &OnDeviceConfig) -> Self {
        let backend = match create_tesseract(&config.languages) {
            Ok(lt) => {
                info!(languages = %config.languages, "Tesseract OCR initialized");
                TesseractBackend::Ready {
                    tesseract: Arc::new(Mutex::new(lt)),
                }
            }
            Err(e) => {
                let reason = format!("Tesseract not available: {e}");
                warn!("{}", reason);
                TesseractBackend::Unavailable { reason }
            }
        };

        Self {
            backend,
            config: config.clone(),
            last_confidence: Mutex::new(DEFAULT_CONFIDENCE),
        }
    }

    /// An engine that never initialised, carrying `reason` as its probe error.
    pub fn unavailable(config: &OnDeviceConfig, reason: &str) -> Self {
        Self {
            backend: TesseractBackend::Unavailable {
                reason: reason.to_string(),
            },
            config: config.clone(),
            last_confidence: Mutex::new(DEFAULT_CONFIDENCE),
        }
    }

    async fn recognize(&self, image_bytes: Vec<u8>) -> Result<(String, f32)> {
        let tesseract = match &self.backend {
            TesseractBackend::Ready { tesseract } => Arc::clone(tesseract),
            TesseractBackend::Unavailable { reason } => {
                return Err(OcrError::Unavailable(reason.clone()))
            }
        };

        let config = self.config.clone();
        tokio::task::spawn_blocking(move || -> Result<(String, f32)> {
            let png = preprocess_image(&image_bytes, &config)?;

            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&png)
                .map_err(|e| OcrError::Engine(format!("Failed to set image: {e}")))?;
            let text = lt
                .get_utf8_text()
                .map_err(|e| OcrError::Engine(format!("Failed to extract text: {e}")))?;
            let confidence = (lt.mean_text_conf() as f32 / 100.0).clamp(0.0, 1.0);

            Ok((text.trim().to_string(), confidence))
        })
        .await
        .map_err(|e| OcrError::Engine(format!("OCR task panicked: {e}")))?
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    fn id(&self) -> EngineId {
        EngineId::OnDevice
    }

    fn name(&self) -> &str {
        "Tesseract"
    }

    async fn extract_text(&self, image: &ImageRef, cancel: &CancellationToken) -> Result<String> {
        let bytes = image.read_bytes().await?;
        let timeout_duration = Duration::from_secs(self.config.timeout_secs);

        let (text, confidence) = tokio::select! {
            _ = cancel.cancelled() => return Err(OcrError::Cancelled),
            result = tokio::time::timeout(timeout_duration, self.recognize(bytes)) => match result {
                Ok(inner) => inner?,
                Err(_) => {
                    return Err(OcrError::Engine(format!(
                        "OCR operation timed out after {} seconds",
                        self.config.timeout_secs
                    )))
                }
            },
        };

        if text.is_empty() {
            return Err(OcrError::Engine("No text detected in image".to_string()));
        }

        *self.last_confidence.lock().await = confidence;
        debug!(image = %image, confidence, chars = text.len(), "Tesseract recognized text");

        Ok(text)
    }

    async fn is_available(&self) -> Result<bool> {
        match &self.backend {
            TesseractBackend::Ready { .. } => Ok(true),
            TesseractBackend::Unavailable { reason } => {
                Err(OcrError::Unavailable(reason.clone()))
            }
        }
    }

    async fn last_confidence_score(&self) -> Result<f32> {
        Ok(*self.last_confidence.lock().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn make_config() -> OnDeviceConfig {
        OnDeviceConfig {
            languages: "eng".to_string(),
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 50,
        }
    }

    #[test]
    fn test_construction_never_fails() {
        let engine = TesseractEngine::new(&make_config());
        assert_eq!(engine.id(), EngineId::OnDevice);
        assert_eq!(engine.name(), "Tesseract");
    }

    #[tokio::test]
    async fn test_unavailable_probe_reports_reason() {
        let engine = TesseractEngine::unavailable(&make_config(), "Test unavailable");
        let err = engine.is_available().await.unwrap_err();
        assert!(matches!(err, OcrError::Unavailable(_)));
        assert!(err.to_string().contains("Test unavailable"));
    }

    #[tokio::test]
    async fn test_unavailable_extraction_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not really a png").unwrap();
        let image = ImageRef::new(file.path().to_string_lossy().to_string());

        let engine = TesseractEngine::unavailable(&make_config(), "Test unavailable");
        let result = engine
            .extract_text(&image, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(OcrError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_image_is_rejected_before_recognition() {
        let engine = TesseractEngine::unavailable(&make_config(), "Test unavailable");
        let result = engine
            .extract_text(&ImageRef::new("/no/such/recipe.jpg"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(OcrError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_default_confidence_before_any_recognition() {
        let engine = TesseractEngine::unavailable(&make_config(), "Test unavailable");
        assert_eq!(engine.last_confidence_score().await.unwrap(), 0.0);
    }
}
