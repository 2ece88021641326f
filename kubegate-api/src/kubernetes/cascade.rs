//! Multi-step operations without transactions
//!
//! A cascade is a primary step followed by dependent steps. Dependents only
//! run after the primary succeeded, run in declared order, and a failing
//! dependent is recorded against that step alone. Nothing is rolled back.

use futures::future::BoxFuture;
use kubegate_common::{BatchTarget, ResourceKind};
use serde::Serialize;
use std::future::Future;
use tracing::{info, warn};

use super::error::{FailureDetail, K8sError, K8sResult};

/// One step of a cascade; `action` is not polled until the step runs
pub struct CascadeStep<'a> {
    name: String,
    kind: ResourceKind,
    target: BatchTarget,
    action: BoxFuture<'a, K8sResult<()>>,
}

impl<'a> CascadeStep<'a> {
    pub fn new<F>(name: impl Into<String>, kind: ResourceKind, target: BatchTarget, action: F) -> Self
    where
        F: Future<Output = K8sResult<()>> + Send + 'a,
    {
        Self {
            name: name.into(),
            kind,
            target,
            action: Box::pin(action),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepState {
    Succeeded,
    Failed { error: FailureDetail },
    /// Not attempted because the primary step failed
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub kind: ResourceKind,
    pub target: BatchTarget,
    #[serde(flatten)]
    pub state: StepState,
}

impl StepOutcome {
    fn skipped(step: &CascadeStep<'_>) -> Self {
        Self {
            name: step.name.clone(),
            kind: step.kind,
            target: step.target.clone(),
            state: StepState::Skipped,
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.state, StepState::Failed { .. })
    }
}

/// Outcome of every step of a cascade
#[derive(Debug, Serialize)]
pub struct CascadeResult {
    pub primary: StepOutcome,
    pub dependents: Vec<StepOutcome>,
    #[serde(skip)]
    primary_error: Option<Box<K8sError>>,
}

impl CascadeResult {
    pub fn primary_succeeded(&self) -> bool {
        self.primary.state == StepState::Succeeded
    }

    /// Names of the steps that failed, primary first
    pub fn failed_step_names(&self) -> Vec<String> {
        std::iter::once(&self.primary)
            .chain(self.dependents.iter())
            .filter(|s| s.failed())
            .map(|s| s.name.clone())
            .collect()
    }

    /// The primary's own error if it failed, `CascadeStepFailure` if a
    /// dependent failed, else the result itself
    pub fn into_result(mut self) -> K8sResult<CascadeResult> {
        if let Some(err) = self.primary_error.take() {
            return Err(*err);
        }
        if self.dependents.iter().any(StepOutcome::failed) {
            return Err(K8sError::CascadeStepFailure(self));
        }
        Ok(self)
    }
}

pub struct CascadeOrchestrator;

impl CascadeOrchestrator {
    /// Run `primary`, then each dependent in order if the primary succeeded
    pub async fn run(primary: CascadeStep<'_>, dependents: Vec<CascadeStep<'_>>) -> CascadeResult {
        let CascadeStep {
            name,
            kind,
            target,
            action,
        } = primary;

        if let Err(err) = action.await {
            warn!(
                step = %name,
                target = %target,
                error = %err,
                "Primary cascade step failed, skipping dependents"
            );

            return CascadeResult {
                primary: StepOutcome {
                    name,
                    kind,
                    target,
                    state: StepState::Failed { error: err.detail() },
                },
                dependents: dependents
                    .iter()
                    .map(StepOutcome::skipped)
                    .collect(),
                primary_error: Some(Box::new(err)),
            };
        }

        let primary = StepOutcome {
            name,
            kind,
            target,
            state: StepState::Succeeded,
        };
        let mut outcomes = Vec::with_capacity(dependents.len());

        for step in dependents {
            let CascadeStep {
                name,
                kind,
                target,
                action,
            } = step;

            let state = match action.await {
                Ok(()) => StepState::Succeeded,
                Err(err) => {
                    warn!(step = %name, target = %target, error = %err, "Cascade step failed");
                    StepState::Failed { error: err.detail() }
                }
            };

            outcomes.push(StepOutcome {
                name,
                kind,
                target,
                state,
            });
        }

        info!(
            step = %primary.name,
            dependents = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.failed()).count(),
            "Cascade finished"
        );

        CascadeResult {
            primary,
            dependents: outcomes,
            primary_error: None,
        }
    }
}
