//! Batch operations over many objects of one kind
//!
//! Every target is attempted exactly once and independently; one failure
//! never stops the rest. Fan-out is bounded and outcomes come back in input
//! order.

use futures::stream::{self, StreamExt};
use kubegate_common::{BatchTarget, ResourceKind};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tracing::{info, warn};

use super::error::{FailureDetail, K8sError, K8sResult};

/// Default number of targets worked on at once
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Operation the gateway applies to every batch target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BatchOperation {
    Delete,
    Restart,
    Scale { replicas: i32 },
    Cordon,
    Uncordon,
}

impl BatchOperation {
    pub fn name(&self) -> &'static str {
        match self {
            BatchOperation::Delete => "delete",
            BatchOperation::Restart => "restart",
            BatchOperation::Scale { .. } => "scale",
            BatchOperation::Cordon => "cordon",
            BatchOperation::Uncordon => "uncordon",
        }
    }
}

/// Result of one target
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub target: BatchTarget,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureDetail>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Succeeded,
    PartialFailure,
}

/// All outcomes of a batch, in input order
#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub outcomes: Vec<BatchOutcome>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchResult {
    fn from_outcomes(outcomes: Vec<BatchOutcome>) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - succeeded;
        Self {
            outcomes,
            succeeded,
            failed,
        }
    }

    pub fn status(&self) -> BatchStatus {
        if self.failed == 0 {
            BatchStatus::Succeeded
        } else {
            BatchStatus::PartialFailure
        }
    }

    /// `Ok` when every target succeeded, else `PartialBatchFailure`
    pub fn into_result(self) -> K8sResult<BatchResult> {
        match self.status() {
            BatchStatus::Succeeded => Ok(self),
            BatchStatus::PartialFailure => Err(K8sError::PartialBatchFailure(self)),
        }
    }

    /// Targets that failed, with their failure
    pub fn failures(&self) -> impl Iterator<Item = (&BatchTarget, &FailureDetail)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.error.as_ref().map(|e| (&o.target, e)))
    }
}

/// Runs one operation over many targets with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchCoordinator {
    max_concurrency: usize,
}

impl Default for BatchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

impl BatchCoordinator {
    /// `max_concurrency` below 1 is raised to 1
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Apply `op` to every target of `kind`
    ///
    /// Targets that fail validation are recorded without calling `op`.
    pub async fn apply<F, Fut>(
        &self,
        kind: ResourceKind,
        targets: Vec<BatchTarget>,
        op: F,
    ) -> BatchResult
    where
        F: Fn(BatchTarget) -> Fut,
        Fut: Future<Output = K8sResult<()>>,
    {
        let start = Instant::now();
        let count = targets.len();
        let op = &op;

        let outcomes: Vec<BatchOutcome> = stream::iter(targets)
            .map(move |target| async move {
                let result = match target.validate(kind) {
                    Ok(()) => op(target.clone()).await,
                    Err(e) => Err(K8sError::from(e)),
                };

                match result {
                    Ok(()) => BatchOutcome {
                        target,
                        success: true,
                        error: None,
                    },
                    Err(err) => {
                        warn!(kind = %kind, target = %target, error = %err, "Batch target failed");
                        BatchOutcome {
                            target,
                            success: false,
                            error: Some(err.detail()),
                        }
                    }
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let result = BatchResult::from_outcomes(outcomes);

        info!(
            kind = %kind,
            targets = count,
            succeeded = result.succeeded,
            failed = result.failed,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch finished"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::error::ErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn targets(names: &[&str]) -> Vec<BatchTarget> {
        names.iter().map(|n| BatchTarget::new("default", *n)).collect()
    }

    #[tokio::test]
    async fn test_outcomes_keep_input_order() {
        let coordinator = BatchCoordinator::new(4);
        let names = ["slow", "fast", "medium"];

        let result = coordinator
            .apply(ResourceKind::Deployment, targets(&names), |target| async move {
                let delay = match target.name.as_str() {
                    "slow" => 30,
                    "medium" => 15,
                    _ => 1,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(())
            })
            .await;

        let order: Vec<&str> = result.outcomes.iter().map(|o| o.target.name.as_str()).collect();
        assert_eq!(order, names);
        assert_eq!(result.status(), BatchStatus::Succeeded);
        assert!(result.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let coordinator = BatchCoordinator::default();
        let calls = AtomicUsize::new(0);

        let result = coordinator
            .apply(ResourceKind::Pod, targets(&["a", "gone", "b"]), |target| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if target.name == "gone" {
                        Err(K8sError::not_found(ResourceKind::Pod, &target.namespace, &target.name))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!((result.succeeded, result.failed), (2, 1));
        assert_eq!(result.status(), BatchStatus::PartialFailure);

        let failures: Vec<_> = result.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.name, "gone");
        assert_eq!(failures[0].1.kind, ErrorKind::NotFound);

        let err = result.into_result().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PartialBatchFailure);
    }

    #[tokio::test]
    async fn test_invalid_target_is_not_attempted() {
        let coordinator = BatchCoordinator::default();
        let calls = AtomicUsize::new(0);

        let result = coordinator
            .apply(
                ResourceKind::Deployment,
                vec![BatchTarget::new("", "web"), BatchTarget::new("default", "api")],
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(()) }
                },
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let first = &result.outcomes[0];
        assert!(!first.success);
        assert_eq!(first.error.as_ref().unwrap().kind, ErrorKind::Validation);
        assert!(result.outcomes[1].success);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let coordinator = BatchCoordinator::new(2);
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        let names: Vec<String> = (0..8).map(|i| format!("t{}", i)).collect();
        let targets = names.iter().map(|n| BatchTarget::new("ns", n.as_str())).collect();

        let result = coordinator
            .apply(ResourceKind::StatefulSet, targets, move |_| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result.succeeded, 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_zero_concurrency_is_raised() {
        assert_eq!(BatchCoordinator::new(0).max_concurrency(), 1);
    }

    #[test]
    fn test_operation_serde() {
        let op: BatchOperation = serde_json::from_str(r#"{"op":"scale","replicas":3}"#).unwrap();
        assert_eq!(op, BatchOperation::Scale { replicas: 3 });
        assert_eq!(op.name(), "scale");
    }
}
