//! OCR (Optical Character Recognition) Module
//!
//! Turns a photographed recipe into raw text using two interchangeable
//! recognition engines.
//!
//! # Architecture
//!
//! - `RecognitionEngine` trait defines the engine contract
//! - `TesseractEngine` is the on-device engine (leptess)
//! - `CloudVisionEngine` calls a remote `images:annotate` API over HTTP
//! - `FallbackOrchestrator` tries the primary engine, hops once to the
//!   secondary on failure, and tracks which engine produced the text
//!
//! The orchestrator returns raw text only. Cleanup and scoring live in
//! [`crate::processing`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let on_device = Arc::new(TesseractEngine::new(&config.on_device));
//! let cloud = Arc::new(CloudVisionEngine::new(&config.cloud));
//! let mut ocr = FallbackOrchestrator::new(on_device, cloud);
//! let text = ocr.extract_text(&ImageRef::new("recipe.jpg"), &cancel).await?;
//! ```

mod cloud;
mod engine;
mod fallback;
mod preprocessing;
mod tesseract;

pub use cloud::CloudVisionEngine;
pub use engine::{
    EngineId, EngineStatus, ImageRef, RecognitionEngine, ServiceStatus, DEFAULT_CONFIDENCE,
};
pub use fallback::{EngineOrder, FallbackOrchestrator};
pub use preprocessing::preprocess_image;
pub use tesseract::TesseractEngine;
