//! Recipe photo text extraction.
//!
//! [`ocr`] gets raw text out of an image with an on-device engine and a
//! single fallback hop to a cloud engine. [`processing`] turns that raw text
//! into clean, scored text and decides whether it looks like a recipe.

pub mod config;
pub mod error;
pub mod ocr;
pub mod processing;

pub use config::Config;
pub use error::{OcrError, Result};
pub use ocr::{
    CloudVisionEngine, EngineId, EngineOrder, EngineStatus, FallbackOrchestrator, ImageRef,
    RecognitionEngine, ServiceStatus, TesseractEngine,
};
pub use processing::{
    analyze, extract_confidence_score, process_text, validate_recipe_text, ProcessedText,
};
