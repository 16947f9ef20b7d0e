//! HTTP client for the payment API

use std::time::Duration;

use async_trait::async_trait;
use payflow_common::{PollOutcome, StatusPoller, StatusSource};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use crate::api::{
    CreatePaymentRequest, CreatePaymentResponse, StatusResponse, CONFIRM_PATH, CREATE_PATH,
    STATUS_PATH,
};
use crate::auth::basic_auth_header;
use crate::config::{ApiConfig, MerchantCredentials, PollingConfig};
use crate::error::{E2eError, E2eResult};

/// Client for the create and status endpoints
pub struct PaymentClient {
    client: Client,
    base_url: String,
    auth_header: String,
    polling: PollingConfig,
}

impl PaymentClient {
    pub fn new(
        api: &ApiConfig,
        credentials: &MerchantCredentials,
        polling: PollingConfig,
    ) -> E2eResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(api.connect_timeout_secs))
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            auth_header: basic_auth_header(credentials),
            polling,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the hosted confirmation page
    pub fn confirm_url(&self) -> String {
        format!("{}{}", self.base_url, CONFIRM_PATH)
    }

    /// Status URL with `operation_id` encoded as a single path segment
    pub fn status_url(&self, operation_id: &str) -> E2eResult<Url> {
        let invalid = || E2eError::Config(format!("invalid base_url '{}'", self.base_url));
        let mut url = Url::parse(&format!("{}{}", self.base_url, STATUS_PATH)).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .push(operation_id);
        Ok(url)
    }

    /// Create a payment with the merchant's credentials
    pub async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
    ) -> E2eResult<CreatePaymentResponse> {
        self.create_payment_with_auth(request, &self.auth_header).await
    }

    /// Create a payment with an explicit `Authorization` header value.
    /// The API answers 200 for rejected requests as well; anything else is
    /// an error.
    pub async fn create_payment_with_auth(
        &self,
        request: &CreatePaymentRequest,
        auth_header: &str,
    ) -> E2eResult<CreatePaymentResponse> {
        let url = format!("{}{}", self.base_url, CREATE_PATH);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            return Err(E2eError::UnexpectedHttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Query the status endpoint once
    pub async fn fetch_status(&self, operation_id: &str) -> E2eResult<StatusResponse> {
        let url = self.status_url(operation_id)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            return Err(E2eError::UnexpectedHttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Status source bound to one operation
    pub fn status_source<'a>(&'a self, operation_id: &'a str) -> HttpStatusSource<'a> {
        HttpStatusSource {
            client: self,
            operation_id,
        }
    }

    /// Poll the status endpoint until the operation reaches `expected`.
    ///
    /// A state outside the configured in-progress set fails immediately with
    /// [`E2eError::UnexpectedState`]; running out of attempts yields
    /// [`E2eError::Timeout`].
    pub async fn wait_for_status(&self, operation_id: &str, expected: &str) -> E2eResult<String> {
        let poller = StatusPoller::new(self.polling.poll_config(expected)?);
        let source = self.status_source(operation_id);

        match poller.poll(&source).await? {
            PollOutcome::Converged(state) => {
                info!("Operation {} reached '{}'", operation_id, state);
                Ok(state)
            }
            PollOutcome::Failed(observed) => {
                warn!(
                    "Operation {} reported '{}' while waiting for '{}'",
                    operation_id, observed, expected
                );
                Err(E2eError::UnexpectedState {
                    expected: expected.to_string(),
                    observed,
                })
            }
            PollOutcome::TimedOut(last) => Err(E2eError::Timeout(format!(
                "operation {} to reach '{}' after {} attempts (last status '{}')",
                operation_id,
                expected,
                poller.config().max_attempts(),
                last
            ))),
        }
    }
}

/// [`StatusSource`] reading `result.operation.status` of one operation
pub struct HttpStatusSource<'a> {
    client: &'a PaymentClient,
    operation_id: &'a str,
}

#[async_trait]
impl StatusSource for HttpStatusSource<'_> {
    async fn fetch_state(&self) -> payflow_common::Result<String> {
        let response = self
            .client
            .fetch_status(self.operation_id)
            .await
            .map_err(|e| payflow_common::Error::source_unavailable(e.to_string()))?;

        response
            .operation_status()
            .map(String::from)
            .ok_or_else(|| {
                payflow_common::Error::source_unavailable(format!(
                    "status response for {} has no result.operation.status",
                    self.operation_id
                ))
            })
    }
}
