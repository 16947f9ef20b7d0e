//! Payment lifecycle and error scenarios
//!
//! Each scenario is a sequential script over the payment client and the
//! confirmation page. Browser scenarios open their own Playwright handle,
//! which is released when the scenario's context is dropped.

use crate::api::{
    status, ApiError, CreatePaymentRequest, CreatedPayment, OPERATION_ID_PARAM,
};
use crate::client::PaymentClient;
use crate::config::SuiteConfig;
use crate::error::E2eResult;
use crate::page::{
    ConfirmPaymentPage, ConfirmationCode, ConfirmationResult, ALREADY_PROCESSED, DOES_NOT_EXIST,
};
use crate::playwright::PlaywrightHandle;

/// Operation id the backend has never issued
pub const FAKE_OPERATION_ID: &str = "fake";

/// Authorization header the backend must refuse
pub const INVALID_AUTH_HEADER: &str = "Basic INVALID_TOKEN";

pub const TAG_BROWSER: &str = "browser";
pub const TAG_API: &str = "api";
pub const TAG_LIFECYCLE: &str = "lifecycle";
pub const TAG_ERRORS: &str = "errors";
pub const TAG_VALIDATION: &str = "validation";

/// A create request with invalid or missing fields and the errors the API
/// must report for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDataCase {
    pub label: &'static str,
    pub full_name: Option<&'static str>,
    pub phone: Option<&'static str>,
    pub amount: Option<&'static str>,
    pub currency: Option<&'static str>,
    pub expected: Vec<(&'static str, &'static str)>,
}

impl InvalidDataCase {
    pub fn request(&self) -> CreatePaymentRequest {
        CreatePaymentRequest::builder()
            .full_name(self.full_name)
            .phone(self.phone)
            .amount(self.amount)
            .currency(self.currency)
            .build()
    }

    pub fn expected_errors(&self) -> Vec<ApiError> {
        self.expected
            .iter()
            .map(|(parameter, code)| ApiError::new(*parameter, *code))
            .collect()
    }
}

const ILLEGAL_EVERYWHERE: [(&str, &str); 4] = [
    ("endUser.fullName", "IllegalParameter"),
    ("endUser.phone", "IllegalParameter"),
    ("order.amount.currency", "IllegalParameter"),
    ("order.amount.value", "IllegalParameter"),
];

/// The invalid create payloads checked by the suite
pub fn invalid_data_cases() -> Vec<InvalidDataCase> {
    vec![
        InvalidDataCase {
            label: "missing",
            full_name: None,
            phone: None,
            amount: None,
            currency: None,
            expected: vec![
                ("endUser.fullName", "IllegalParameter"),
                ("endUser.phone", "MissingRequiredParameter"),
                ("order.amount.currency", "IllegalParameter"),
                ("order.amount.value", "MissingRequiredParameter"),
            ],
        },
        InvalidDataCase {
            label: "too-small",
            full_name: Some("Joe"),
            phone: Some("98999999"),
            amount: Some("9.99"),
            currency: Some("RUR"),
            expected: ILLEGAL_EVERYWHERE.to_vec(),
        },
        InvalidDataCase {
            label: "too-large",
            full_name: Some("A very long name limit"),
            phone: Some("999999999"),
            amount: Some("1000.01"),
            currency: Some("EUR"),
            expected: ILLEGAL_EVERYWHERE.to_vec(),
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Confirm with the accepting code, expect `done`
    PaymentDone,
    /// Confirm with the rejecting code, expect `rejected`
    PaymentRejected,
    /// Confirm an operation a second time
    AlreadyProcessed,
    /// Confirm an operation id that was never issued
    OperationDoesNotExist,
    InvalidCreateData(InvalidDataCase),
    InvalidAuthorization,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub tags: Vec<&'static str>,
    pub kind: ScenarioKind,
}

impl Scenario {
    fn new(name: impl Into<String>, tags: &[&'static str], kind: ScenarioKind) -> Self {
        Self {
            name: name.into(),
            tags: tags.to_vec(),
            kind,
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| *t == tag)
    }

    pub fn needs_browser(&self) -> bool {
        self.has_tag(TAG_BROWSER)
    }

    /// Run the scenario's script
    pub async fn run(&self, ctx: &mut ScenarioContext<'_>) -> E2eResult<()> {
        match &self.kind {
            ScenarioKind::PaymentDone => {
                confirm_and_settle(ctx, ConfirmationCode::Accept, status::DONE).await
            }
            ScenarioKind::PaymentRejected => {
                confirm_and_settle(ctx, ConfirmationCode::Reject, status::REJECTED).await
            }
            ScenarioKind::AlreadyProcessed => already_processed(ctx).await,
            ScenarioKind::OperationDoesNotExist => operation_does_not_exist(ctx).await,
            ScenarioKind::InvalidCreateData(case) => invalid_create_data(ctx, case).await,
            ScenarioKind::InvalidAuthorization => invalid_authorization(ctx).await,
        }
    }
}

/// Every scenario of the suite, in execution order
pub fn catalogue() -> Vec<Scenario> {
    let mut scenarios = vec![
        Scenario::new(
            "payment-done",
            &[TAG_BROWSER, TAG_LIFECYCLE],
            ScenarioKind::PaymentDone,
        ),
        Scenario::new(
            "payment-rejected",
            &[TAG_BROWSER, TAG_LIFECYCLE],
            ScenarioKind::PaymentRejected,
        ),
        Scenario::new(
            "payment-already-processed",
            &[TAG_BROWSER, TAG_ERRORS],
            ScenarioKind::AlreadyProcessed,
        ),
        Scenario::new(
            "payment-does-not-exist",
            &[TAG_BROWSER, TAG_ERRORS],
            ScenarioKind::OperationDoesNotExist,
        ),
    ];

    for case in invalid_data_cases() {
        scenarios.push(Scenario::new(
            format!("create-invalid-data-{}", case.label),
            &[TAG_API, TAG_VALIDATION],
            ScenarioKind::InvalidCreateData(case),
        ));
    }

    scenarios.push(Scenario::new(
        "create-invalid-authorization",
        &[TAG_API, TAG_VALIDATION],
        ScenarioKind::InvalidAuthorization,
    ));

    scenarios
}

/// Per-scenario state. The browser driver is created on first use and
/// dropped with the context.
pub struct ScenarioContext<'a> {
    client: &'a PaymentClient,
    config: &'a SuiteConfig,
    driver: Option<PlaywrightHandle>,
    operation_id: Option<String>,
}

impl<'a> ScenarioContext<'a> {
    pub fn new(client: &'a PaymentClient, config: &'a SuiteConfig) -> Self {
        Self {
            client,
            config,
            driver: None,
            operation_id: None,
        }
    }

    pub fn client(&self) -> &PaymentClient {
        self.client
    }

    /// Operation created by the scenario, if any
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Create a random valid payment and remember its operation id
    pub async fn create_payment(&mut self) -> E2eResult<CreatedPayment> {
        let response = self
            .client
            .create_payment(&CreatePaymentRequest::random())
            .await?;
        let payment = response.into_created()?;
        self.operation_id = Some(payment.operation_id.clone());
        Ok(payment)
    }

    fn driver(&mut self) -> E2eResult<&PlaywrightHandle> {
        let driver = match self.driver.take() {
            Some(driver) => driver,
            None => PlaywrightHandle::new(self.config.browser.playwright_config())?,
        };
        Ok(self.driver.insert(driver))
    }

    /// Submit `code` on the confirmation page of `payment`
    pub async fn confirm(
        &mut self,
        payment: &CreatedPayment,
        code: ConfirmationCode,
    ) -> E2eResult<ConfirmationResult> {
        let page = ConfirmPaymentPage::new(self.driver()?);
        page.confirm(&payment.uri, &payment.parameters, code).await
    }
}

async fn confirm_and_settle(
    ctx: &mut ScenarioContext<'_>,
    code: ConfirmationCode,
    terminal: &str,
) -> E2eResult<()> {
    let payment = ctx.create_payment().await?;
    let id = payment.operation_id.clone();

    ctx.client().wait_for_status(&id, status::CREATED).await?;

    let result = ctx.confirm(&payment, code).await?;
    result.expect_accepted(&id)?;

    ctx.client().wait_for_status(&id, terminal).await?;
    Ok(())
}

async fn already_processed(ctx: &mut ScenarioContext<'_>) -> E2eResult<()> {
    let payment = ctx.create_payment().await?;
    let id = payment.operation_id.clone();

    ctx.client().wait_for_status(&id, status::CREATED).await?;

    ctx.confirm(&payment, ConfirmationCode::Accept).await?;
    ctx.client().wait_for_status(&id, status::DONE).await?;

    let second = ctx.confirm(&payment, ConfirmationCode::Accept).await?;
    second.expect_declined(ALREADY_PROCESSED)
}

async fn operation_does_not_exist(ctx: &mut ScenarioContext<'_>) -> E2eResult<()> {
    let payment = unknown_operation(ctx.client());
    let result = ctx.confirm(&payment, ConfirmationCode::Accept).await?;
    result.expect_declined(DOES_NOT_EXIST)
}

/// Confirmation target for an operation id the backend never issued
fn unknown_operation(client: &PaymentClient) -> CreatedPayment {
    CreatedPayment {
        uri: client.confirm_url(),
        parameters: [(OPERATION_ID_PARAM.to_string(), FAKE_OPERATION_ID.to_string())]
            .into_iter()
            .collect(),
        operation_id: FAKE_OPERATION_ID.to_string(),
    }
}

async fn invalid_create_data(ctx: &mut ScenarioContext<'_>, case: &InvalidDataCase) -> E2eResult<()> {
    let response = ctx.client().create_payment(&case.request()).await?;
    response.expect_errors(&case.expected_errors())
}

async fn invalid_authorization(ctx: &mut ScenarioContext<'_>) -> E2eResult<()> {
    let response = ctx
        .client()
        .create_payment_with_auth(&CreatePaymentRequest::random(), INVALID_AUTH_HEADER)
        .await?;
    response.expect_errors(&[ApiError::new("Authorization", "IllegalHeader")])
}
