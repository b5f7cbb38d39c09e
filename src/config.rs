//! Client configuration

use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const BACKEND_URL_ENV: &str = "LOTVIEW_BACKEND_URL";

/// Tunables for one client process.
///
/// Built with the `with_*` setters:
///
/// ```
/// use lotview::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new()
///     .with_backend_base("http://analysis.local:8000/")
///     .with_finalize_delay(Duration::ZERO);
/// assert_eq!(config.backend_base, "http://analysis.local:8000");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the analysis backend, without trailing slash.
    pub backend_base: String,
    /// Period of the synthetic progress ticker.
    pub tick_interval: Duration,
    /// Upper bound of one random synthetic increment, in percent.
    pub max_tick_step: u8,
    /// Highest value either progress source may show before completion.
    pub progress_cap: u8,
    /// Pause after reaching 100% before the session counts as terminal.
    pub finalize_delay: Duration,
    /// Whole-request timeout. `None` waits as long as the server needs.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_base: DEFAULT_BACKEND_URL.to_string(),
            tick_interval: Duration::from_millis(500),
            max_tick_step: 5,
            progress_cap: 90,
            finalize_delay: Duration::from_millis(500),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults, with the backend taken from `LOTVIEW_BACKEND_URL` when set.
    pub fn from_env() -> Self {
        match std::env::var(BACKEND_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => Self::new().with_backend_base(url),
            _ => Self::new(),
        }
    }

    pub fn with_backend_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into();
        self.backend_base = base.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_max_tick_step(mut self, step: u8) -> Self {
        self.max_tick_step = step.max(1);
        self
    }

    pub fn with_progress_cap(mut self, cap: u8) -> Self {
        self.progress_cap = cap.min(99);
        self
    }

    pub fn with_finalize_delay(mut self, delay: Duration) -> Self {
        self.finalize_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn upload_url(&self) -> String {
        format!("{}/upload-video", self.backend_base)
    }

    /// Resolve a media reference from the backend against the base URL.
    pub fn resolve(&self, media_ref: &str) -> String {
        if media_ref.starts_with("http://") || media_ref.starts_with("https://") {
            media_ref.to_string()
        } else {
            format!("{}{}", self.backend_base, media_ref)
        }
    }
}
