use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend failure. Displayed verbatim so combined fallback messages
    /// carry the engine's own wording.
    #[error("{0}")]
    Engine(String),

    #[error("OCR unavailable: {0}")]
    Unavailable(String),

    #[error("Both {primary} and {secondary} OCR failed: {primary_error}; {secondary_error}")]
    AllEnginesFailed {
        primary: String,
        secondary: String,
        primary_error: String,
        secondary_error: String,
    },

    #[error("All OCR extractions failed: {0}")]
    BatchFailed(String),

    #[error("OCR operation cancelled")]
    Cancelled,

    #[error("No text to process")]
    EmptyText,

    #[error("Text is too short to be a recipe")]
    TooShort,

    #[error("Text does not appear to be a recipe")]
    NotRecipe { indicators: usize },
}

impl OcrError {
    /// Whether a failure on the primary engine should hand the image to the
    /// secondary engine. Bad input and cancellation surface immediately.
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, OcrError::InvalidInput(_) | OcrError::Cancelled)
    }

    /// True for the recipe-likeness failures, where the normalized text is
    /// still usable by the caller.
    pub fn is_validation(&self) -> bool {
        matches!(self, OcrError::TooShort | OcrError::NotRecipe { .. })
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_engines_failed_message_keeps_both_errors() {
        let err = OcrError::AllEnginesFailed {
            primary: "Tesseract".to_string(),
            secondary: "Cloud Vision".to_string(),
            primary_error: OcrError::Engine("Primary failed".to_string()).to_string(),
            secondary_error: OcrError::Engine("Secondary failed".to_string()).to_string(),
        };

        assert_eq!(
            err.to_string(),
            "Both Tesseract and Cloud Vision OCR failed: Primary failed; Secondary failed"
        );
    }

    #[test]
    fn test_fallback_eligibility() {
        assert!(OcrError::Engine("boom".to_string()).allows_fallback());
        assert!(OcrError::Unavailable("no model".to_string()).allows_fallback());
        assert!(!OcrError::InvalidInput("missing".to_string()).allows_fallback());
        assert!(!OcrError::Cancelled.allows_fallback());
    }

    #[test]
    fn test_processing_messages() {
        assert_eq!(OcrError::EmptyText.to_string(), "No text to process");
        assert_eq!(
            OcrError::TooShort.to_string(),
            "Text is too short to be a recipe"
        );
        assert_eq!(
            OcrError::NotRecipe { indicators: 1 }.to_string(),
            "Text does not appear to be a recipe"
        );
        assert!(OcrError::TooShort.is_validation());
        assert!(!OcrError::EmptyText.is_validation());
    }
}
