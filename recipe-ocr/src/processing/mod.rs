//! Recipe text cleanup.
//!
//! Stateless functions that take raw OCR output and make it usable by a
//! recipe parser. Every call is independent; identical input gives
//! identical output.

mod normalize;
mod scoring;

use serde::Serialize;
use tracing::debug;

use crate::error::{OcrError, Result};

pub use normalize::{fix_ocr_errors, improve_structure, normalize_whitespace, remove_noise};
pub use scoring::{extract_confidence_score, validate_recipe_text};

/// Upper bound on pipeline passes; real input settles in two or three.
const MAX_PASSES: usize = 5;

/// Clean raw OCR text.
///
/// Runs, in order: whitespace normalization, OCR error fixes, structure
/// cleanup and noise removal. Stripping punctuation can expose new matches
/// for the earlier stages (`2-cups` becomes `2cups`), so the pipeline is
/// repeated until the text stops changing. Only blank input is rejected;
/// input made of nothing but punctuation comes back as an empty string.
pub fn process_text(raw: &str) -> Result<String> {
    if raw.trim().is_empty() {
        return Err(OcrError::EmptyText);
    }

    let mut text = run_stages(raw);
    for _ in 1..MAX_PASSES {
        let next = run_stages(&text);
        if next == text {
            break;
        }
        text = next;
    }

    Ok(text)
}

fn run_stages(text: &str) -> String {
    let text = normalize_whitespace(text);
    let text = fix_ocr_errors(&text);
    let text = improve_structure(&text);
    let text = remove_noise(&text);

    text.trim().to_string()
}

/// Cleaned text with its score and the outcome of the recipe check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedText {
    pub text: String,
    pub confidence: f32,
    pub is_recipe: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<String>,
}

/// Clean, score and validate in one go. A failed recipe check is recorded
/// in `validation_error`; the cleaned text is kept either way.
pub fn analyze(raw: &str) -> Result<ProcessedText> {
    let text = process_text(raw)?;
    let confidence = extract_confidence_score(&text);

    let (is_recipe, validation_error) = match validate_recipe_text(&text) {
        Ok(valid) => (valid, None),
        Err(e) => (false, Some(e.to_string())),
    };

    debug!(
        chars = text.len(),
        confidence,
        is_recipe,
        "Processed OCR text"
    );

    Ok(ProcessedText {
        text,
        confidence,
        is_recipe,
        validation_error,
    })
}
