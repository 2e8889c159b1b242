//! Bounded polling of asynchronous array operations.
//!
//! An accepted command resolves through repeated status fetches. The loop
//! is an explicit state machine: every iteration either reaches a terminal
//! state, keeps polling (array still working), or burns one unit of retry
//! budget on an unusable status response.

use crate::error::Result;
use crate::transport::CommandOutcome;
use rand::Rng;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Status fetches tolerated without a usable completion field.
pub const DEFAULT_RETRY_BUDGET: u32 = 30;

// =============================================================================
// Configuration
// =============================================================================

/// Polling knobs. Defaults match the deployed array's event latency;
/// tests shrink the delays.
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    /// Unusable-response budget before giving up
    pub retry_budget: u32,
    /// Fixed delay before refetching after an unusable response
    pub fetch_retry_delay: Duration,
    /// Upper bound of the randomized delay between in-progress polls
    pub progress_jitter_max: Duration,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            retry_budget: DEFAULT_RETRY_BUDGET,
            fetch_retry_delay: Duration::from_secs(3),
            progress_jitter_max: Duration::from_secs(1),
        }
    }
}

// =============================================================================
// Terminal States
// =============================================================================

/// Terminal state of one polling wait.
///
/// Budget exhaustion resolves to `Error`, indistinguishable from an
/// array-reported failure; callers that need the original status body get
/// it from `Available`.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome {
    /// Operation completed; carries the final status body
    Available(Value),
    /// Array reported failure, the fetch itself failed, or the retry
    /// budget ran out
    Error,
    /// The entity vanished mid-wait
    Deleted,
}

// =============================================================================
// Waiter
// =============================================================================

pub struct EventWaiter {
    config: WaiterConfig,
}

impl EventWaiter {
    pub fn new(config: WaiterConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(WaiterConfig::default())
    }

    /// Drive `fetch` until a terminal state.
    ///
    /// `fetch` is the status query for one entity/event pair; in-progress
    /// responses (a `completionStatus` that is neither `Complete` nor
    /// `Error`) never consume budget, responses without the field do.
    /// An `Err` from the fetch is an immediate terminal failure.
    pub async fn wait<F, Fut>(&self, mut fetch: F) -> WaitOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<CommandOutcome>>,
    {
        let mut budget = self.config.retry_budget;
        while budget > 0 {
            let outcome = match fetch().await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "status fetch failed");
                    return WaitOutcome::Error;
                }
            };

            match outcome {
                CommandOutcome::Success(body) => match completion_status(&body) {
                    Some("Complete") => return WaitOutcome::Available(body),
                    Some("Error") => {
                        warn!("array reported event failure");
                        return WaitOutcome::Error;
                    }
                    Some(state) => {
                        debug!(%state, "operation still in progress");
                        tokio::time::sleep(self.progress_delay()).await;
                    }
                    None => {
                        // Status body without a completion field; costs
                        // budget like any other unusable response.
                        budget -= 1;
                        tokio::time::sleep(self.config.fetch_retry_delay).await;
                    }
                },
                CommandOutcome::NoData => return WaitOutcome::Deleted,
                other => {
                    warn!(?other, remaining = budget - 1, "unusable status response");
                    budget -= 1;
                    tokio::time::sleep(self.config.fetch_retry_delay).await;
                }
            }
        }
        warn!("status polling budget exhausted");
        WaitOutcome::Error
    }

    fn progress_delay(&self) -> Duration {
        let max_ms = self.config.progress_jitter_max.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
    }
}

fn completion_status(body: &Value) -> Option<&str> {
    body.get("completionStatus")?.as_str()
}
