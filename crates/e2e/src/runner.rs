//! Test runner executing scenarios against the backend and recording results

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::client::PaymentClient;
use crate::config::SuiteConfig;
use crate::error::{E2eError, E2eResult};
use crate::scenarios::{catalogue, Scenario, ScenarioContext};

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub operation_id: Option<String>,
    pub error: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs payment scenarios one after another
pub struct ScenarioRunner {
    config: SuiteConfig,
    client: PaymentClient,
    scenarios: Vec<Scenario>,
}

impl ScenarioRunner {
    /// Create a runner over the full scenario catalogue
    pub fn new(config: SuiteConfig) -> E2eResult<Self> {
        Self::with_scenarios(config, catalogue())
    }

    pub fn with_scenarios(config: SuiteConfig, scenarios: Vec<Scenario>) -> E2eResult<Self> {
        config.validate()?;
        let client = PaymentClient::new(&config.api, config.credentials()?, config.polling.clone())?;
        Ok(Self {
            config,
            client,
            scenarios,
        })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Run every scenario
    pub async fn run_all(&self) -> SuiteResult {
        let selected: Vec<&Scenario> = self.scenarios.iter().collect();
        self.run_scenarios(&selected).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let selected: Vec<&Scenario> = self.scenarios.iter().filter(|s| s.has_tag(tag)).collect();
        if selected.is_empty() {
            return Err(E2eError::ScenarioNotFound(format!("no scenario tagged '{}'", tag)));
        }
        Ok(self.run_scenarios(&selected).await)
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        let scenario = self
            .scenarios
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioNotFound(name.to_string()))?;
        Ok(self.run_scenarios(&[scenario]).await)
    }

    /// Run scenarios in order; a failing scenario never stops the others
    pub async fn run_scenarios(&self, scenarios: &[&Scenario]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());

        info!("Running {} scenario(s) against {}", scenarios.len(), self.client.base_url());

        for scenario in scenarios {
            let result = self.run_scenario(scenario).await;
            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = SuiteResult::from_results(results, start.elapsed().as_millis() as u64);

        info!("");
        info!(
            "Scenario Results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );

        suite
    }

    /// Run a single scenario with its own context
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioResult {
        let started_at = Utc::now();
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let mut ctx = ScenarioContext::new(&self.client, &self.config);
        let outcome = scenario.run(&mut ctx).await;
        let operation_id = ctx.operation_id().map(String::from);
        drop(ctx);

        ScenarioResult {
            name: scenario.name.clone(),
            tags: scenario.tags.iter().map(|t| t.to_string()).collect(),
            success: outcome.is_ok(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            operation_id,
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
