use crate::location::LocationSettings;
use crate::proximity::ProximitySettings;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// Only needed by commands that talk to the backend.
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub env: Environment,
    pub log_level: String,
    pub gate_degrees: f64,
    pub at_location_meters: f64,
    pub offset_step_degrees: f64,
    pub significant_change_meters: f64,
    pub fetch_span_degrees: f64,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub forward_renderer_logs: bool,
    pub debug_overlay: bool,
}

impl AppConfig {
    /// The backend base URL, for callers that cannot work offline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when `BINFINDER_API_BASE_URL` is unset.
    pub fn require_api_base_url(&self) -> Result<&str, ConfigError> {
        self.api_base_url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("BINFINDER_API_BASE_URL".to_string()))
    }

    #[must_use]
    pub fn proximity_settings(&self) -> ProximitySettings {
        ProximitySettings {
            gate_degrees: self.gate_degrees,
            at_location_meters: self.at_location_meters,
        }
    }

    #[must_use]
    pub fn location_settings(&self) -> LocationSettings {
        LocationSettings {
            offset_step_degrees: self.offset_step_degrees,
            significant_change_meters: self.significant_change_meters,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[redacted]"))
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("gate_degrees", &self.gate_degrees)
            .field("at_location_meters", &self.at_location_meters)
            .field("offset_step_degrees", &self.offset_step_degrees)
            .field("significant_change_meters", &self.significant_change_meters)
            .field("fetch_span_degrees", &self.fetch_span_degrees)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("forward_renderer_logs", &self.forward_renderer_logs)
            .field("debug_overlay", &self.debug_overlay)
            .finish()
    }
}
