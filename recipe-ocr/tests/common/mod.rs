#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;

use recipe_ocr::error::{OcrError, Result};
use recipe_ocr::ocr::{EngineId, ImageRef, RecognitionEngine};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Write `bytes` to a temp file and return it with a reference to it.
/// Keep the file handle alive for as long as the reference is used.
pub fn temp_image(bytes: &[u8]) -> (NamedTempFile, ImageRef) {
    let mut file = NamedTempFile::new().expect("Failed to create temp image");
    file.write_all(bytes).expect("Failed to write temp image");
    let image = ImageRef::new(file.path().to_string_lossy().to_string());
    (file, image)
}

/// Scripted answer of a [`MockEngine`] for one image.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Invalid(String),
}

impl Reply {
    fn into_result(self) -> Result<String> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(OcrError::Engine(message)),
            Reply::Invalid(message) => Err(OcrError::InvalidInput(message)),
        }
    }
}

/// In-memory engine with scripted replies, call counting and optional delay.
pub struct MockEngine {
    id: EngineId,
    name: &'static str,
    default_reply: Reply,
    replies: HashMap<String, Reply>,
    availability: std::result::Result<bool, String>,
    confidence: f32,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockEngine {
    pub fn new(id: EngineId, name: &'static str) -> Self {
        Self {
            id,
            name,
            default_reply: Reply::Fail(format!("{name} has no scripted reply")),
            replies: HashMap::new(),
            availability: Ok(true),
            confidence: 0.0,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn on_device() -> Self {
        Self::new(EngineId::OnDevice, "Tesseract")
    }

    pub fn cloud() -> Self {
        Self::new(EngineId::Cloud, "Cloud Vision")
    }

    pub fn succeeding(mut self, text: &str) -> Self {
        self.default_reply = Reply::Text(text.to_string());
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.default_reply = Reply::Fail(message.to_string());
        self
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.default_reply = Reply::Invalid(message.to_string());
        self
    }

    pub fn with_reply(mut self, image: &str, reply: Reply) -> Self {
        self.replies.insert(image.to_string(), reply);
        self
    }

    pub fn with_availability(mut self, availability: std::result::Result<bool, &str>) -> Self {
        self.availability = availability.map_err(String::from);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn reply_for(&self, image: &ImageRef) -> Reply {
        self.replies
            .get(image.as_str())
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    fn id(&self) -> EngineId {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    async fn extract_text(&self, image: &ImageRef, cancel: &CancellationToken) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let reply = self.reply_for(image);
        let delay = self.delay.unwrap_or_default();

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(OcrError::Cancelled),
            _ = tokio::time::sleep(delay) => reply.into_result(),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn is_available(&self) -> Result<bool> {
        self.availability.clone().map_err(OcrError::Engine)
    }

    async fn last_confidence_score(&self) -> Result<f32> {
        Ok(self.confidence)
    }
}
