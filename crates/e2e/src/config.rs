//! Suite configuration
//!
//! Values come from an optional TOML file, then `PAYFLOW_*` environment
//! variables, then CLI flags. Credentials and the backend URL are never
//! compiled in.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use payflow_common::PollConfig;
use serde::{Deserialize, Serialize};

use crate::api::status;
use crate::error::{E2eError, E2eResult};
use crate::playwright::{Browser, PlaywrightConfig};

pub const ENV_BASE_URL: &str = "PAYFLOW_BASE_URL";
pub const ENV_MERCHANT_ID: &str = "PAYFLOW_MERCHANT_ID";
pub const ENV_MERCHANT_KEY: &str = "PAYFLOW_MERCHANT_KEY";

/// Top-level suite configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Payment API settings
    pub api: ApiConfig,

    /// Merchant credentials used for Basic auth
    pub merchant: Option<MerchantCredentials>,

    /// Status polling budget
    pub polling: PollingConfig,

    /// Browser settings for the confirmation page
    pub browser: BrowserConfig,

    /// Directory for the JSON results file
    pub output_dir: PathBuf,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            merchant: None,
            polling: PollingConfig::default(),
            browser: BrowserConfig::default(),
            output_dir: PathBuf::from("test-results"),
        }
    }
}

/// Payment API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend under test
    pub base_url: String,

    /// Whole-request timeout
    pub request_timeout_secs: u64,

    /// Connection timeout
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

/// Merchant id/key pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantCredentials {
    pub id: String,
    pub key: String,
}

impl MerchantCredentials {
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.key.is_empty()
    }
}

impl fmt::Debug for MerchantCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantCredentials")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// How long to wait for a payment status transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Status queries before giving up
    pub max_attempts: u32,

    /// Pause between two status queries
    pub delay_ms: u64,

    /// States that justify another query
    pub in_progress_states: Vec<String>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            delay_ms: 1000,
            in_progress_states: vec!["processing".to_string()],
        }
    }
}

impl PollingConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Poll configuration waiting for `expected_state`
    pub fn poll_config(&self, expected_state: &str) -> payflow_common::Result<PollConfig> {
        PollConfig::new(
            expected_state,
            self.in_progress_states.iter().cloned(),
            self.max_attempts,
            self.delay(),
        )
    }
}

/// Browser settings for the confirmation page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Timeout for each page interaction
    pub timeout_ms: u64,

    /// Where failure screenshots are stored
    pub artifacts_dir: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            timeout_ms: 10_000,
            artifacts_dir: PathBuf::from("test-results/artifacts"),
        }
    }
}

impl BrowserConfig {
    pub fn playwright_config(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            timeout_ms: self.timeout_ms,
            artifacts_dir: self.artifacts_dir.clone(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file, falling back to defaults when the file
    /// does not exist, then apply environment overrides.
    pub fn load(path: &Path) -> E2eResult<Self> {
        let mut config = Self::from_file_or_default(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read `path` if it exists, otherwise return defaults
    pub fn from_file_or_default(path: &Path) -> E2eResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(url) = get(ENV_BASE_URL) {
            self.api.base_url = url;
        }

        self.override_credentials(get(ENV_MERCHANT_ID), get(ENV_MERCHANT_KEY));
    }

    /// Replace either half of the merchant credentials
    pub fn override_credentials(&mut self, id: Option<String>, key: Option<String>) {
        if id.is_none() && key.is_none() {
            return;
        }
        let current = self
            .merchant
            .take()
            .unwrap_or_else(|| MerchantCredentials::new("", ""));
        self.merchant = Some(MerchantCredentials {
            id: id.unwrap_or(current.id),
            key: key.unwrap_or(current.key),
        });
    }

    /// Credentials, or [`E2eError::MissingCredentials`] if either half is absent
    pub fn credentials(&self) -> E2eResult<&MerchantCredentials> {
        self.merchant
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or(E2eError::MissingCredentials)
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_ok()
    }

    /// Check the values that cannot be caught by deserialization
    pub fn validate(&self) -> E2eResult<()> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            E2eError::Config(format!("invalid base_url '{}': {}", self.api.base_url, e))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(E2eError::Config(format!(
                "base_url must be http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.polling.max_attempts == 0 {
            return Err(E2eError::Config(
                "polling.max_attempts must be greater than zero".to_string(),
            ));
        }

        if self.browser.timeout_ms == 0 {
            return Err(E2eError::Config(
                "browser.timeout_ms must be greater than zero".to_string(),
            ));
        }

        for state in [status::CREATED, status::DONE, status::REJECTED] {
            self.polling
                .poll_config(state)
                .map_err(|e| E2eError::Config(format!("polling: {}", e)))?;
        }

        Ok(())
    }
}
