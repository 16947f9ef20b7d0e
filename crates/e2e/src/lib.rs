//! payflow E2E Test Suite
//!
//! This crate drives the hosted payment confirmation flow end to end:
//! - Creates payments through the REST API with merchant Basic auth
//! - Confirms them on the hosted page through Playwright
//! - Polls the status API until the operation converges on its expected state
//! - Checks the API's validation and authorization errors
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                           │
//! │    ├── run_all() / run_tagged() / run_named()               │
//! │    └── write_results() -> test-results.json                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario (payment-done, payment-rejected, ...)             │
//! │    ├── PaymentClient                                        │
//! │    │     ├── create_payment()  POST /api/payment/create     │
//! │    │     └── wait_for_status() -> StatusPoller              │
//! │    │            └── HttpStatusSource GET /api/payment/status│
//! │    └── ConfirmPaymentPage -> PlaywrightHandle               │
//! │          └── submit form, enter code, read result block     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod data;
pub mod error;
pub mod page;
pub mod playwright;
pub mod runner;
pub mod scenarios;

pub use client::{HttpStatusSource, PaymentClient};
pub use config::SuiteConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{ScenarioRunner, SuiteResult};
