//! Error types for the payment E2E suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Merchant credentials are not configured (set PAYFLOW_MERCHANT_ID and PAYFLOW_MERCHANT_KEY)")]
    MissingCredentials,

    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedHttpStatus { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Unexpected status '{observed}' while waiting for '{expected}'")]
    UnexpectedState { expected: String, observed: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Polling error: {0}")]
    Poll(#[from] payflow_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Fail with [`E2eError::AssertionFailed`] unless `condition` holds
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}
