//! Status convergence polling
//!
//! Waits for an asynchronous backend transition by querying a [`StatusSource`]
//! until it reports an expected state. Three terminal conditions are kept
//! apart so that a real divergence is never reported as a slow backend:
//!
//! - [`PollOutcome::Converged`]: the expected state was observed
//! - [`PollOutcome::Failed`]: a state that is neither expected nor in progress
//!   was observed; no further attempts are made
//! - [`PollOutcome::TimedOut`]: every permitted attempt observed an
//!   in-progress state
//!
//! A failing source surfaces as [`Error::SourceUnavailable`] and is never
//! retried.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Something that can report the current state of a tracked subject.
///
/// Implementations must be pure reads and return the state exactly as the
/// backend exposes it.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_state(&self) -> Result<String>;
}

#[async_trait]
impl<S: StatusSource + ?Sized> StatusSource for &S {
    async fn fetch_state(&self) -> Result<String> {
        (**self).fetch_state().await
    }
}

/// Adapts an async closure into a [`StatusSource`]
pub struct FnSource<F> {
    query: F,
}

/// Build a [`StatusSource`] from a state-query function
pub fn from_fn<F, Fut>(query: F) -> FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    FnSource { query }
}

#[async_trait]
impl<F, Fut> StatusSource for FnSource<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send + 'static,
{
    async fn fetch_state(&self) -> Result<String> {
        (self.query)().await
    }
}

/// Terminal result of one polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The expected state was observed
    Converged(String),
    /// A state outside the expected and in-progress sets was observed
    Failed(String),
    /// Attempts ran out while the subject was still in progress
    TimedOut(String),
}

impl PollOutcome {
    /// The last state observed by the run
    pub fn state(&self) -> &str {
        match self {
            PollOutcome::Converged(s) | PollOutcome::Failed(s) | PollOutcome::TimedOut(s) => s,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged(_))
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Converged(s) => write!(f, "converged on '{}'", s),
            PollOutcome::Failed(s) => write!(f, "failed on unexpected state '{}'", s),
            PollOutcome::TimedOut(s) => write!(f, "timed out while still '{}'", s),
        }
    }
}

/// Immutable configuration for one polling run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    expected_state: String,
    in_progress_states: BTreeSet<String>,
    max_attempts: u32,
    delay_between_attempts: Duration,
}

impl PollConfig {
    /// Create a configuration, rejecting a zero attempt budget and an
    /// expected state that is also listed as in progress.
    pub fn new<I, S>(
        expected_state: impl Into<String>,
        in_progress_states: I,
        max_attempts: u32,
        delay_between_attempts: Duration,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected_state = expected_state.into();
        let in_progress_states: BTreeSet<String> =
            in_progress_states.into_iter().map(Into::into).collect();

        if max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts must be greater than zero".to_string(),
            ));
        }

        if in_progress_states.contains(&expected_state) {
            return Err(Error::InvalidConfig(format!(
                "expected state '{}' is also listed as in progress",
                expected_state
            )));
        }

        Ok(Self {
            expected_state,
            in_progress_states,
            max_attempts,
            delay_between_attempts,
        })
    }

    pub fn expected_state(&self) -> &str {
        &self.expected_state
    }

    pub fn in_progress_states(&self) -> &BTreeSet<String> {
        &self.in_progress_states
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_between_attempts(&self) -> Duration {
        self.delay_between_attempts
    }

    fn is_in_progress(&self, state: &str) -> bool {
        self.in_progress_states.contains(state)
    }
}

/// Drives a [`StatusSource`] until it converges, diverges or runs out of
/// attempts. Holds nothing but its configuration, so one poller can be
/// reused for any number of runs.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Run one polling cycle against `source`
    pub async fn poll<S>(&self, source: &S) -> Result<PollOutcome>
    where
        S: StatusSource + ?Sized,
    {
        let config = &self.config;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let state = source.fetch_state().await?;

            if state == config.expected_state {
                return Ok(PollOutcome::Converged(state));
            }

            if !config.is_in_progress(&state) {
                return Ok(PollOutcome::Failed(state));
            }

            if attempt >= config.max_attempts {
                return Ok(PollOutcome::TimedOut(state));
            }

            sleep(config.delay_between_attempts).await;
        }
    }
}

/// Run one polling cycle with `config` against `source`
pub async fn poll<S>(source: &S, config: &PollConfig) -> Result<PollOutcome>
where
    S: StatusSource + ?Sized,
{
    StatusPoller::new(config.clone()).poll(source).await
}
