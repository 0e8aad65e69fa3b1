//! Operation Poller
//!
//! Waits for a long-running operation to reach a terminal state with a fixed
//! cadence and a bounded number of status queries.

use super::model::OperationHandle;
use super::service::ComplianceApi;
use serde_json::{json, Value};
use std::time::Duration;

/// Time between status queries
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Status queries made before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Terminal state of a poll session
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Done without an error; carries the operation response, if any
    Passed(Option<Value>),
    /// Done with an error, or the status query itself failed
    Failed(Option<String>),
    /// Never observed done within the attempt budget
    Timeout,
}

impl PollOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed(_) => "passed",
            Self::Failed(_) => "failed",
            Self::Timeout => "timeout",
        }
    }

    /// `{"result": "passed"|"failed"|"timeout", "error"?: detail}`
    pub fn to_json(&self) -> Value {
        let mut value = json!({ "result": self.as_str() });
        if let Self::Failed(Some(detail)) = self {
            value["error"] = Value::String(detail.clone());
        }
        value
    }
}

/// Polls operations with a fixed interval and attempt cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPoller {
    interval: Duration,
    max_attempts: u32,
}

impl Default for OperationPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl OperationPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Query `handle` until it is done, a query fails, or the budget runs out.
    ///
    /// Query failures are not retried. No sleep follows the final attempt.
    pub async fn await_completion(
        &self,
        api: &dyn ComplianceApi,
        handle: &OperationHandle,
    ) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            let operation = match api.get_operation(handle).await {
                Ok(operation) => operation,
                Err(e) => {
                    tracing::warn!("Failed to poll operation {}: {:#}", handle, e);
                    return PollOutcome::Failed(Some(format!("{:#}", e)));
                }
            };

            if operation.done {
                return match operation.error {
                    Some(error) => {
                        tracing::warn!("Operation {} failed: {}", handle, error.describe());
                        PollOutcome::Failed(Some(error.describe()))
                    }
                    None => {
                        tracing::info!("Operation {} completed after {} polls", handle, attempt);
                        PollOutcome::Passed(operation.response)
                    }
                };
            }

            tracing::debug!(
                "Operation {} still running (attempt {}/{})",
                handle,
                attempt,
                self.max_attempts
            );

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        tracing::warn!(
            "Operation {} not done after {} polls, giving up",
            handle,
            self.max_attempts
        );
        PollOutcome::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::model::Operation;
    use crate::compliance::names::{Collection, ParentName, ResourceName};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted status responses; repeats the last one when exhausted
    struct ScriptedOperations {
        script: Mutex<VecDeque<Result<Operation, String>>>,
        last: Result<Operation, String>,
        queries: AtomicUsize,
    }

    impl ScriptedOperations {
        fn new(script: Vec<Result<Operation, String>>) -> Self {
            let last = script.last().cloned().unwrap_or_else(|| Ok(running()));
            Self {
                script: Mutex::new(script.into()),
                last,
                queries: AtomicUsize::new(0),
            }
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ComplianceApi for ScriptedOperations {
        async fn list(&self, _: &ParentName, _: Collection, _: u32) -> Result<Vec<Value>> {
            unreachable!("poller only queries operations")
        }

        async fn get(&self, _: &ResourceName) -> Result<Value> {
            unreachable!("poller only queries operations")
        }

        async fn create(&self, _: &ParentName, _: Collection, _: &str, _: &Value) -> Result<Value> {
            unreachable!("poller only queries operations")
        }

        async fn delete(&self, _: &ResourceName) -> Result<Value> {
            unreachable!("poller only queries operations")
        }

        async fn get_operation(&self, _: &OperationHandle) -> Result<Operation> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.last.clone());
            next.map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn running() -> Operation {
        Operation {
            name: "operations/op".to_string(),
            done: false,
            error: None,
            response: None,
        }
    }

    fn finished(error: Option<&str>) -> Operation {
        Operation {
            name: "operations/op".to_string(),
            done: true,
            error: error.map(|message| crate::compliance::model::OperationError {
                code: 13,
                message: message.to_string(),
            }),
            response: Some(json!({"name": "deployments/d"})),
        }
    }

    fn handle() -> OperationHandle {
        OperationHandle::new("operations/op")
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_on_first_attempt_passes() {
        let api = ScriptedOperations::new(vec![Ok(finished(None))]);
        let start = tokio::time::Instant::now();

        let outcome = OperationPoller::default().await_completion(&api, &handle()).await;

        assert_eq!(outcome, PollOutcome::Passed(Some(json!({"name": "deployments/d"}))));
        assert_eq!(outcome.to_json(), json!({"result": "passed"}));
        assert_eq!(api.queries(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_done_times_out_after_budget() {
        let api = ScriptedOperations::new(vec![Ok(running())]);
        let start = tokio::time::Instant::now();

        let outcome = OperationPoller::default().await_completion(&api, &handle()).await;

        assert_eq!(outcome, PollOutcome::Timeout);
        assert_eq!(outcome.to_json(), json!({"result": "timeout"}));
        assert_eq!(api.queries(), 30);
        assert_eq!(start.elapsed(), DEFAULT_POLL_INTERVAL * 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_with_error_fails() {
        let api = ScriptedOperations::new(vec![
            Ok(running()),
            Ok(running()),
            Ok(finished(Some("framework has no controls"))),
        ]);

        let outcome = OperationPoller::default().await_completion(&api, &handle()).await;

        assert_eq!(
            outcome.to_json(),
            json!({"result": "failed", "error": "framework has no controls"})
        );
        assert_eq!(api.queries(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_failure_is_not_retried() {
        let api = ScriptedOperations::new(vec![Ok(running()), Err("connection reset".to_string())]);

        let outcome = OperationPoller::default().await_completion(&api, &handle()).await;

        assert_eq!(outcome, PollOutcome::Failed(Some("connection reset".to_string())));
        assert_eq!(api.queries(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_injected_budget_is_respected() {
        let api = ScriptedOperations::new(vec![Ok(running())]);
        let poller = OperationPoller::new(Duration::from_millis(5), 3);
        let start = tokio::time::Instant::now();

        assert_eq!(poller.await_completion(&api, &handle()).await, PollOutcome::Timeout);
        assert_eq!(api.queries(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_querying() {
        let api = ScriptedOperations::new(vec![Ok(finished(None))]);
        let poller = OperationPoller::new(Duration::ZERO, 0);

        assert_eq!(poller.await_completion(&api, &handle()).await, PollOutcome::Timeout);
        assert_eq!(api.queries(), 0);
    }
}
