use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Parse `CLOUD_OCR_LANGUAGE_HINTS`, a comma-separated list such as `en,fr`.
fn parse_language_hints() -> Vec<String> {
    match env::var("CLOUD_OCR_LANGUAGE_HINTS") {
        Ok(val) => val
            .split(',')
            .map(str::trim)
            .filter(|hint| !hint.is_empty())
            .map(String::from)
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub const DEFAULT_CLOUD_BASE_URL: &str = "https://vision.googleapis.com/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub on_device: OnDeviceConfig,
    pub cloud: CloudConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Local Tesseract engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OnDeviceConfig {
    pub languages: String,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
}

/// Remote recognition API settings. Without an API key the cloud engine
/// reports itself as not available.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub language_hints: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    pub prefer_cloud: bool,
    pub batch_concurrency: usize,
}

impl Default for OnDeviceConfig {
    fn default() -> Self {
        Self {
            languages: "eng".to_string(),
            timeout_secs: 60,
            max_image_dimension: 4096,
            min_image_dimension: 50,
        }
    }
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout_secs: 30,
            language_hints: Vec::new(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            prefer_cloud: false,
            batch_concurrency: 4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            on_device: OnDeviceConfig {
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 50),
            },
            cloud: CloudConfig {
                api_key: env::var("CLOUD_OCR_API_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty()),
                base_url: parse_env_opt("CLOUD_OCR_BASE_URL"),
                timeout_secs: parse_env_or("CLOUD_OCR_TIMEOUT", 30),
                language_hints: parse_language_hints(),
            },
            orchestrator: OrchestratorConfig {
                prefer_cloud: parse_env_or("OCR_PREFER_CLOUD", false),
                batch_concurrency: parse_env_or("OCR_BATCH_CONCURRENCY", 4),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

impl CloudConfig {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_CLOUD_BASE_URL)
    }
}
