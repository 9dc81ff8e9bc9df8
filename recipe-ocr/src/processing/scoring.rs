//! Heuristics applied to cleaned text: a confidence estimate and a
//! recipe-likeness check.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{OcrError, Result};

const BASE_CONFIDENCE: f32 = 0.5;
const MIN_RECIPE_LENGTH: usize = 20;
const MIN_RECIPE_INDICATORS: usize = 3;

const RECIPE_INDICATORS: [&str; 12] = [
    "ingredients",
    "directions",
    "instructions",
    "recipe",
    "cook",
    "bake",
    "mix",
    "cup",
    "tablespoon",
    "teaspoon",
    "preheat",
    "oven",
];

static MEASUREMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d\s*(?:cups?|tbsp|tsp|tablespoons?|teaspoons?)").expect("valid regex")
});

/// Estimate how trustworthy the text is, in `[0, 1]`.
///
/// Starts at 0.5 and adds for long lines (mean > 20 chars), many lines
/// (> 5), a section keyword and a quantity with a cooking unit.
pub fn extract_confidence_score(text: &str) -> f32 {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut score = BASE_CONFIDENCE;

    if !lines.is_empty() {
        let total: usize = lines.iter().map(|line| line.chars().count()).sum();
        let mean_length = total as f32 / lines.len() as f32;
        if mean_length > 20.0 {
            score += 0.1;
        }
    }

    if lines.len() > 5 {
        score += 0.1;
    }

    let lower = text.to_lowercase();
    if lower.contains("ingredients") || lower.contains("directions") {
        score += 0.2;
    }

    if MEASUREMENT.is_match(text) {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Check that the text plausibly is a recipe: at least 20 characters and
/// at least three distinct cooking words.
pub fn validate_recipe_text(text: &str) -> Result<bool> {
    if text.chars().count() < MIN_RECIPE_LENGTH {
        return Err(OcrError::TooShort);
    }

    let lower = text.to_lowercase();
    let indicators = RECIPE_INDICATORS
        .iter()
        .filter(|word| lower.contains(*word))
        .count();

    if indicators < MIN_RECIPE_INDICATORS {
        return Err(OcrError::NotRecipe { indicators });
    }

    Ok(true)
}
