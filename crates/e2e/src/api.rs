//! Typed schema of the payment API
//!
//! Every response field the backend may omit is an `Option` and is checked
//! explicitly before use.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data;
use crate::error::{ensure, E2eError, E2eResult};

pub const CREATE_PATH: &str = "/api/payment/create";
pub const STATUS_PATH: &str = "/api/payment/status";
pub const CONFIRM_PATH: &str = "/operations/confirm";

pub const OPERATION_ID_PARAM: &str = "operationId";
pub const DEFAULT_CURRENCY: &str = "USD";

/// Operation states exposed by the status endpoint
pub mod status {
    pub const CREATED: &str = "created";
    pub const PROCESSING: &str = "processing";
    pub const DONE: &str = "done";
    pub const REJECTED: &str = "rejected";
}

/// Body of `POST /api/payment/create`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub end_user: EndUser,
    pub order: Order,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub amount: Amount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl CreatePaymentRequest {
    /// Valid request with random end-user data
    pub fn random() -> Self {
        PaymentRequestBuilder::random().build()
    }

    pub fn builder() -> PaymentRequestBuilder {
        PaymentRequestBuilder::default()
    }
}

/// Builds create requests field by field; a cleared field is omitted from
/// the JSON body.
#[derive(Debug, Clone, Default)]
pub struct PaymentRequestBuilder {
    full_name: Option<String>,
    phone: Option<String>,
    amount: Option<String>,
    currency: Option<String>,
}

impl PaymentRequestBuilder {
    /// Builder preloaded with random name, phone, amount and `USD`
    pub fn random() -> Self {
        Self {
            full_name: Some(data::random_name()),
            phone: Some(data::random_phone()),
            amount: Some(data::random_amount()),
            currency: Some(DEFAULT_CURRENCY.to_string()),
        }
    }

    pub fn full_name(mut self, full_name: Option<&str>) -> Self {
        self.full_name = full_name.map(String::from);
        self
    }

    pub fn phone(mut self, phone: Option<&str>) -> Self {
        self.phone = phone.map(String::from);
        self
    }

    pub fn amount(mut self, amount: Option<&str>) -> Self {
        self.amount = amount.map(String::from);
        self
    }

    pub fn currency(mut self, currency: Option<&str>) -> Self {
        self.currency = currency.map(String::from);
        self
    }

    pub fn build(self) -> CreatePaymentRequest {
        CreatePaymentRequest {
            end_user: EndUser {
                full_name: self.full_name,
                phone: self.phone,
            },
            order: Order {
                amount: Amount {
                    currency: self.currency,
                    value: self.amount,
                },
            },
        }
    }
}

/// Validation error reported by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub parameter_name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(parameter_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            parameter_name: parameter_name.into(),
            code: code.into(),
            message: None,
        }
    }

    /// Same parameter and code, regardless of message
    pub fn matches(&self, other: &ApiError) -> bool {
        self.parameter_name == other.parameter_name && self.code == other.code
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.parameter_name, self.code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentResult {
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub operation: Option<Operation>,
}

/// Response of `POST /api/payment/create`, accepted or not
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<CreatePaymentResult>,
    #[serde(default)]
    pub errors: Option<Vec<ApiError>>,
}

/// A payment accepted by the API, ready to be confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    /// Confirmation page the form is posted to
    pub uri: String,
    /// Hidden form fields, including `operationId`
    pub parameters: BTreeMap<String, String>,
    pub operation_id: String,
}

impl CreatePaymentResponse {
    /// Validation errors, failing if the response carries none
    pub fn errors(&self) -> E2eResult<&[ApiError]> {
        self.errors.as_deref().ok_or_else(|| {
            E2eError::AssertionFailed(format!(
                "Expected 'errors' to be an array, but was absent (status: {:?})",
                self.status
            ))
        })
    }

    pub fn has_error(&self, expected: &ApiError) -> bool {
        self.errors
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|e| e.matches(expected))
    }

    /// Assert that every expected `(parameterName, code)` pair is reported
    pub fn expect_errors(&self, expected: &[ApiError]) -> E2eResult<()> {
        let errors = self.errors()?;
        for want in expected {
            ensure(errors.iter().any(|e| e.matches(want)), || {
                let seen: Vec<String> = errors.iter().map(ToString::to_string).collect();
                format!(
                    "Expected error with parameter '{}' and code '{}'. Errors: [{}]",
                    want.parameter_name,
                    want.code,
                    seen.join(", ")
                )
            })?;
        }
        Ok(())
    }

    /// Check that the payment was accepted in state `created` and extract
    /// what the confirmation page needs.
    pub fn into_created(self) -> E2eResult<CreatedPayment> {
        let result = self
            .result
            .ok_or_else(|| E2eError::InvalidResponse("missing 'result'".to_string()))?;
        let location = result
            .location
            .ok_or_else(|| E2eError::InvalidResponse("missing 'result.location'".to_string()))?;

        let parameters: BTreeMap<String, String> = location
            .parameters
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect();

        let operation_id = parameters
            .get(OPERATION_ID_PARAM)
            .filter(|id| !id.trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                E2eError::InvalidResponse(format!(
                    "Missing or empty required parameter: {} in response",
                    OPERATION_ID_PARAM
                ))
            })?;

        ensure(self.status.as_deref() == Some("success"), || {
            format!("Expected status to be 'success', got {:?}", self.status)
        })?;

        let operation_status = result.operation.and_then(|op| op.status);
        ensure(operation_status.as_deref() == Some(status::CREATED), || {
            format!(
                "Expected operation status to be 'created', got {:?}",
                operation_status
            )
        })?;

        Ok(CreatedPayment {
            uri: location.uri,
            parameters,
            operation_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    #[serde(default)]
    pub operation: Option<Operation>,
}

/// Response of `GET /api/payment/status/{operationId}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<StatusResult>,
}

impl StatusResponse {
    /// `result.operation.status`, if present
    pub fn operation_status(&self) -> Option<&str> {
        self.result
            .as_ref()?
            .operation
            .as_ref()?
            .status
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accepted() -> serde_json::Value {
        json!({
            "status": "success",
            "result": {
                "location": {
                    "uri": "https://pay.test/operations/confirm",
                    "parameters": [
                        { "name": "operationId", "value": "op-42" },
                        { "name": "signature", "value": "abc" }
                    ]
                },
                "operation": { "status": "created" }
            }
        })
    }

    #[test]
    fn test_request_omits_cleared_fields() {
        let request = CreatePaymentRequest::builder()
            .full_name(Some("Joe"))
            .amount(Some("9.99"))
            .build();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "endUser": { "fullName": "Joe" },
                "order": { "amount": { "value": "9.99" } }
            })
        );
    }

    #[test]
    fn test_random_request_is_complete() {
        let request = CreatePaymentRequest::random();
        assert!(request.end_user.full_name.is_some());
        assert!(request.end_user.phone.is_some());
        assert!(request.order.amount.value.is_some());
        assert_eq!(request.order.amount.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn test_into_created() {
        let response: CreatePaymentResponse = serde_json::from_value(accepted()).unwrap();
        let created = response.into_created().unwrap();

        assert_eq!(created.operation_id, "op-42");
        assert_eq!(created.uri, "https://pay.test/operations/confirm");
        assert_eq!(created.parameters.get("signature").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_into_created_requires_operation_id() {
        let mut body = accepted();
        body["result"]["location"]["parameters"][0]["value"] = json!("  ");
        let response: CreatePaymentResponse = serde_json::from_value(body).unwrap();

        assert!(matches!(
            response.into_created(),
            Err(E2eError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_into_created_requires_created_state() {
        let mut body = accepted();
        body["result"]["operation"]["status"] = json!("processing");
        let response: CreatePaymentResponse = serde_json::from_value(body).unwrap();

        assert!(matches!(
            response.into_created(),
            Err(E2eError::AssertionFailed(_))
        ));
    }

    #[test]
    fn test_expect_errors() {
        let response: CreatePaymentResponse = serde_json::from_value(json!({
            "errors": [
                { "parameterName": "endUser.phone", "code": "MissingRequiredParameter", "message": "required" },
                { "parameterName": "order.amount.value", "code": "IllegalParameter" }
            ]
        }))
        .unwrap();

        assert!(response
            .expect_errors(&[ApiError::new("endUser.phone", "MissingRequiredParameter")])
            .is_ok());

        let err = response
            .expect_errors(&[ApiError::new("endUser.phone", "IllegalParameter")])
            .unwrap_err();
        assert!(err.to_string().contains("endUser.phone:MissingRequiredParameter"));
    }

    #[test]
    fn test_missing_errors_array() {
        let response: CreatePaymentResponse = serde_json::from_value(accepted()).unwrap();
        assert!(response.errors().is_err());
        assert!(!response.has_error(&ApiError::new("Authorization", "IllegalHeader")));
    }

    #[test]
    fn test_operation_status() {
        let response: StatusResponse =
            serde_json::from_value(json!({ "result": { "operation": { "status": "done" } } }))
                .unwrap();
        assert_eq!(response.operation_status(), Some("done"));

        let response: StatusResponse = serde_json::from_value(json!({ "result": {} })).unwrap();
        assert_eq!(response.operation_status(), None);
    }
}
