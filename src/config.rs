use crate::error::{MetricsError, Result};
use crate::schema::{DEFAULT_TARGET_ATTAINMENT, MAX_TARGET_ATTAINMENT, MIN_TARGET_ATTAINMENT};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Process-wide settings, read once at startup and shared by reference.
#[derive(Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
    /// Origins accepted by the HTTP layer. Empty means any origin.
    pub allowed_origins: Vec<String>,
    pub max_payload_bytes: usize,
    pub default_target_attainment: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            allowed_origins: Vec::new(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            default_target_attainment: DEFAULT_TARGET_ATTAINMENT,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("allowed_origins", &self.allowed_origins)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("default_target_attainment", &self.default_target_attainment)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let request_timeout = match get("NARRATIVE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_value::<u64>("NARRATIVE_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };

        let max_payload_bytes = match get("MAX_PAYLOAD_BYTES") {
            Some(raw) => parse_value::<usize>("MAX_PAYLOAD_BYTES", &raw)?,
            None => defaults.max_payload_bytes,
        };

        let default_target_attainment = match get("DEFAULT_TARGET_ATTAINMENT") {
            Some(raw) => {
                let v = parse_value::<f64>("DEFAULT_TARGET_ATTAINMENT", &raw)?;
                if !(MIN_TARGET_ATTAINMENT..=MAX_TARGET_ATTAINMENT).contains(&v) {
                    return Err(MetricsError::Config {
                        key: "DEFAULT_TARGET_ATTAINMENT".to_string(),
                        details: format!(
                            "{} is outside [{}, {}]",
                            v, MIN_TARGET_ATTAINMENT, MAX_TARGET_ATTAINMENT
                        ),
                    });
                }
                v
            }
            None => defaults.default_target_attainment,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            api_key: get("GEMINI_API_KEY"),
            model: get("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: get("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            request_timeout,
            allowed_origins,
            max_payload_bytes,
            default_target_attainment,
        })
    }

    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        let origin = origin.trim().trim_end_matches('/');
        self.allowed_origins.iter().any(|o| o == origin)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>().map_err(|e| MetricsError::Config {
        key: key.to_string(),
        details: format!("'{}': {}", raw, e),
    })
}
