use std::env;

/// Default request timeout when `EXAM_HTTP_TIMEOUT_SECS` is unset.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connection settings for the HTTP gateway.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Base API URL, e.g. `https://host/api/student/`.
    pub base_url: String,
    /// Bearer token for the student's session, if the deployment needs one.
    pub api_token: Option<String>,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Read the configuration from the environment.
    ///
    /// Returns `None` when `EXAM_API_URL` is unset or blank; the token and
    /// timeout fall back to `EXAM_API_TOKEN` and `EXAM_HTTP_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("EXAM_API_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        let api_token = env::var("EXAM_API_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        let timeout_secs = env::var("EXAM_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Some(Self {
            base_url,
            api_token,
            timeout_secs,
        })
    }
}
