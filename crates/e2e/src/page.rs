//! Page object for the hosted confirmation page

use std::collections::BTreeMap;

use tracing::debug;

use crate::api::OPERATION_ID_PARAM;
use crate::error::{ensure, E2eError, E2eResult};
use crate::playwright::{BrowserStep, PlaywrightHandle};

const CODE_INPUT: &str = "#code";
const SUBMIT_BUTTON: &str = "button[type='submit']";
const SUCCESS_BLOCK: &str = ".success-container";
const FAIL_BLOCK: &str = ".fail-container";
const MESSAGE: &str = "p";

pub const ALREADY_PROCESSED: &str = "Operation already processed.";
pub const DOES_NOT_EXIST: &str = "Operation does not exists.";

/// Success message shown for an accepted confirmation
pub fn accepted_message(operation_id: &str) -> String {
    format!("Operation {} was accepted", operation_id)
}

/// Code typed into the confirmation form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationCode {
    /// Moves the payment to `done`
    Accept,
    /// Moves the payment to `rejected`
    Reject,
}

impl ConfirmationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfirmationCode::Accept => "1234",
            ConfirmationCode::Reject => "1231",
        }
    }
}

/// Which block the page showed after submission, with its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    Accepted(String),
    Declined(String),
}

impl ConfirmationResult {
    /// Assert the success block names `operation_id`
    pub fn expect_accepted(&self, operation_id: &str) -> E2eResult<()> {
        match self {
            ConfirmationResult::Accepted(message) => {
                let expected = accepted_message(operation_id);
                ensure(message.contains(&expected), || {
                    format!(
                        "Operation ID in success message is incorrect: expected '{}' in '{}'",
                        expected, message
                    )
                })
            }
            ConfirmationResult::Declined(message) => Err(E2eError::AssertionFailed(format!(
                "Expected success block, page showed failure '{}'",
                message
            ))),
        }
    }

    /// Assert the failure block shows exactly `expected`
    pub fn expect_declined(&self, expected: &str) -> E2eResult<()> {
        match self {
            ConfirmationResult::Declined(message) => ensure(message == expected, || {
                format!(
                    "Expected error message '{}', page showed '{}'",
                    expected, message
                )
            }),
            ConfirmationResult::Accepted(message) => Err(E2eError::AssertionFailed(format!(
                "Expected failure block '{}', page showed success '{}'",
                expected, message
            ))),
        }
    }
}

pub struct ConfirmPaymentPage<'a> {
    driver: &'a PlaywrightHandle,
}

impl<'a> ConfirmPaymentPage<'a> {
    pub fn new(driver: &'a PlaywrightHandle) -> Self {
        Self { driver }
    }

    /// Steps that open the page by posting `parameters` to `uri`, type the
    /// code, submit, and read whichever result block appears
    pub fn steps(
        uri: &str,
        parameters: &BTreeMap<String, String>,
        code: ConfirmationCode,
    ) -> Vec<BrowserStep> {
        vec![
            BrowserStep::SubmitForm {
                action: uri.to_string(),
                method: "post".to_string(),
                fields: parameters
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            BrowserStep::Fill {
                selector: CODE_INPUT.to_string(),
                value: code.as_str().to_string(),
            },
            BrowserStep::Click {
                selector: SUBMIT_BUTTON.to_string(),
            },
            BrowserStep::ReadFirstVisible {
                selectors: vec![SUCCESS_BLOCK.to_string(), FAIL_BLOCK.to_string()],
                child: Some(MESSAGE.to_string()),
            },
        ]
    }

    /// Submit a confirmation in a fresh browser session
    pub async fn confirm(
        &self,
        uri: &str,
        parameters: &BTreeMap<String, String>,
        code: ConfirmationCode,
    ) -> E2eResult<ConfirmationResult> {
        let session = format!(
            "confirm-{}",
            parameters
                .get(OPERATION_ID_PARAM)
                .map(String::as_str)
                .unwrap_or("unknown")
        );
        let captures = self
            .driver
            .run_session(&session, &Self::steps(uri, parameters, code))
            .await?;

        let capture = captures.into_iter().last().ok_or_else(|| {
            E2eError::Playwright(format!("session '{}' captured no result block", session))
        })?;
        debug!("Confirmation page showed {}: {}", capture.selector, capture.text);

        match capture.selector.as_str() {
            SUCCESS_BLOCK => Ok(ConfirmationResult::Accepted(capture.text)),
            FAIL_BLOCK => Ok(ConfirmationResult::Declined(capture.text)),
            other => Err(E2eError::Playwright(format!(
                "unexpected result block '{}'",
                other
            ))),
        }
    }
}
