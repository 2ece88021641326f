//! Per-request cancellation and deadline
//!
//! Every remote call made on behalf of a caller runs through
//! [`RequestContext::run`], which stops waiting as soon as the caller's
//! cancellation token fires or the deadline passes.

use super::error::{K8sError, K8sResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl RequestContext {
    pub fn new(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self { cancel, timeout }
    }

    /// Context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Child context: cancelled with this one, cancellable on its own
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            timeout: self.timeout,
        }
    }

    /// Drive `fut` to completion unless cancellation or the deadline comes first.
    ///
    /// On either, `fut` is dropped, abandoning the in-flight request.
    pub async fn run<T, F>(&self, fut: F) -> K8sResult<T>
    where
        F: Future<Output = K8sResult<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(K8sError::Cancelled("cancelled by caller".to_string()));
        }

        let guarded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(K8sError::Cancelled(format!(
                        "deadline of {:?} elapsed",
                        limit
                    ))),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                Err(K8sError::Cancelled("cancelled by caller".to_string()))
            }
            result = guarded => result,
        }
    }
}
