//! Payment API client and status polling against a fake backend

use payflow_common::{Error as PollError, StatusSource};
use payflow_e2e::api::{ApiError, CreatePaymentRequest};
use payflow_e2e::config::{ApiConfig, MerchantCredentials, PollingConfig, SuiteConfig};
use payflow_e2e::scenarios::{catalogue, TAG_API};
use payflow_e2e::{E2eError, PaymentClient, ScenarioRunner};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// base64("mid:mkey")
const MERCHANT_AUTH: &str = "Basic bWlkOm1rZXk=";

fn polling(max_attempts: u32) -> PollingConfig {
    PollingConfig {
        max_attempts,
        delay_ms: 10,
        ..Default::default()
    }
}

fn client(server: &MockServer, max_attempts: u32) -> PaymentClient {
    let api = ApiConfig {
        base_url: server.uri(),
        ..Default::default()
    };
    PaymentClient::new(
        &api,
        &MerchantCredentials::new("mid", "mkey"),
        polling(max_attempts),
    )
    .unwrap()
}

fn status_body(state: &str) -> serde_json::Value {
    json!({ "status": "success", "result": { "operation": { "status": state } } })
}

async fn mount_status(server: &MockServer, operation_id: &str, state: &str, times: Option<u64>) {
    let mock = Mock::given(method("GET"))
        .and(path(format!("/api/payment/status/{}", operation_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(state)));
    match times {
        Some(n) => mock.up_to_n_times(n).mount(server).await,
        None => mock.mount(server).await,
    }
}

async fn status_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == "GET")
        .count()
}

#[tokio::test]
async fn create_payment_sends_auth_and_body() {
    let server = MockServer::start().await;
    let request = CreatePaymentRequest::builder()
        .full_name(Some("Alice"))
        .phone(Some("99123456"))
        .amount(Some("12.5"))
        .currency(Some("USD"))
        .build();

    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .and(header("Authorization", MERCHANT_AUTH))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "endUser": { "fullName": "Alice", "phone": "99123456" },
            "order": { "amount": { "currency": "USD", "value": "12.5" } }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "result": {
                "location": {
                    "uri": format!("{}/operations/confirm", server.uri()),
                    "parameters": [{ "name": "operationId", "value": "op-1" }]
                },
                "operation": { "status": "created" }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let created = client(&server, 3)
        .create_payment(&request)
        .await
        .unwrap()
        .into_created()
        .unwrap();

    assert_eq!(created.operation_id, "op-1");
    assert_eq!(created.uri, format!("{}/operations/confirm", server.uri()));
}

#[tokio::test]
async fn create_payment_rejects_non_200() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .create_payment(&CreatePaymentRequest::random())
        .await
        .unwrap_err();

    match err {
        E2eError::UnexpectedHttpStatus { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn invalid_authorization_is_reported_as_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .and(header("Authorization", "Basic INVALID_TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "parameterName": "Authorization", "code": "IllegalHeader" }]
        })))
        .mount(&server)
        .await;

    let response = client(&server, 3)
        .create_payment_with_auth(&CreatePaymentRequest::random(), "Basic INVALID_TOKEN")
        .await
        .unwrap();

    assert!(response.has_error(&ApiError::new("Authorization", "IllegalHeader")));
    assert!(response.into_created().is_err());
}

#[tokio::test]
async fn status_source_reads_operation_status() {
    let server = MockServer::start().await;
    mount_status(&server, "op-1", "processing", None).await;

    let client = client(&server, 3);
    let state = client.status_source("op-1").fetch_state().await.unwrap();

    assert_eq!(state, "processing");
}

#[tokio::test]
async fn status_source_unavailable_on_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/payment/status/op-1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client(&server, 3);
    let err = client.status_source("op-1").fetch_state().await.unwrap_err();

    assert!(matches!(err, PollError::SourceUnavailable(_)));
}

#[tokio::test]
async fn status_source_unavailable_on_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/payment/status/op-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/payment/status/op-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": {} })))
        .mount(&server)
        .await;

    let client = client(&server, 3);

    for id in ["op-1", "op-2"] {
        let err = client.status_source(id).fetch_state().await.unwrap_err();
        assert!(matches!(err, PollError::SourceUnavailable(_)), "{}: {}", id, err);
    }
}

#[tokio::test]
async fn wait_for_status_converges_after_processing() {
    let server = MockServer::start().await;
    mount_status(&server, "op-1", "processing", Some(2)).await;
    mount_status(&server, "op-1", "done", None).await;

    let state = client(&server, 5)
        .wait_for_status("op-1", "done")
        .await
        .unwrap();

    assert_eq!(state, "done");
    assert_eq!(status_requests(&server).await, 3);
}

#[tokio::test]
async fn wait_for_status_fails_fast_on_unexpected_state() {
    let server = MockServer::start().await;
    mount_status(&server, "op-1", "rejected", None).await;

    let err = client(&server, 5)
        .wait_for_status("op-1", "done")
        .await
        .unwrap_err();

    match err {
        E2eError::UnexpectedState { expected, observed } => {
            assert_eq!(expected, "done");
            assert_eq!(observed, "rejected");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(status_requests(&server).await, 1);
}

#[tokio::test]
async fn wait_for_status_times_out() {
    let server = MockServer::start().await;
    mount_status(&server, "op-1", "processing", None).await;

    let err = client(&server, 4)
        .wait_for_status("op-1", "done")
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::Timeout(_)), "{}", err);
    assert!(err.to_string().contains("last status 'processing'"));
    assert_eq!(status_requests(&server).await, 4);
}

#[tokio::test]
async fn wait_for_status_does_not_retry_transport_failures() {
    let server = MockServer::start().await;
    mount_status(&server, "op-1", "processing", Some(1)).await;
    Mock::given(method("GET"))
        .and(path("/api/payment/status/op-1"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = client(&server, 10)
        .wait_for_status("op-1", "done")
        .await
        .unwrap_err();

    assert!(matches!(err, E2eError::Poll(PollError::SourceUnavailable(_))), "{}", err);
    assert_eq!(status_requests(&server).await, 2);
}

#[tokio::test]
async fn api_scenarios_pass_against_conforming_backend() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .and(header("Authorization", "Basic INVALID_TOKEN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "parameterName": "Authorization", "code": "IllegalHeader" }]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .and(header("Authorization", MERCHANT_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [
                { "parameterName": "endUser.fullName", "code": "IllegalParameter" },
                { "parameterName": "endUser.phone", "code": "IllegalParameter" },
                { "parameterName": "endUser.phone", "code": "MissingRequiredParameter" },
                { "parameterName": "order.amount.currency", "code": "IllegalParameter" },
                { "parameterName": "order.amount.value", "code": "IllegalParameter" },
                { "parameterName": "order.amount.value", "code": "MissingRequiredParameter" }
            ]
        })))
        .mount(&server)
        .await;

    let config = SuiteConfig {
        api: ApiConfig {
            base_url: server.uri(),
            ..Default::default()
        },
        merchant: Some(MerchantCredentials::new("mid", "mkey")),
        polling: polling(3),
        ..Default::default()
    };
    let scenarios = catalogue().into_iter().filter(|s| s.has_tag(TAG_API)).collect();
    let runner = ScenarioRunner::with_scenarios(config, scenarios).unwrap();

    let suite = runner.run_all().await;

    assert_eq!(suite.total, 4);
    assert!(suite.is_success(), "{:?}", suite.results);
}

#[tokio::test]
async fn api_scenario_failure_is_recorded_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payment/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "errors": [] })))
        .mount(&server)
        .await;

    let config = SuiteConfig {
        api: ApiConfig {
            base_url: server.uri(),
            ..Default::default()
        },
        merchant: Some(MerchantCredentials::new("mid", "mkey")),
        ..Default::default()
    };
    let runner = ScenarioRunner::new(config).unwrap();

    let suite = runner.run_named("create-invalid-authorization").await.unwrap();

    assert_eq!(suite.failed, 1);
    let error = suite.results[0].error.as_deref().unwrap();
    assert!(error.contains("Authorization"), "{}", error);
}
