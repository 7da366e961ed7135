// Poll Subscription - cancellable repeating status fetch for one job

use super::cancel::{cancel_channel, CancelHandle, CancelToken};
use crate::application::cache::JobCache;
use crate::application::poll_policy::{PollDecision, PollFailurePolicy};
use crate::domain::{Job, JobKey};
use crate::error::{AppError, Result};
use crate::port::JobGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// How a subscription ended without error
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A terminal status was observed; polling stopped on its own
    Terminal(Job),
    /// The subscriber cancelled (or dropped) the subscription
    Cancelled,
}

/// Handle to a running poll task.
///
/// Dropping the handle cancels the subscription.
pub struct PollSubscription {
    key: JobKey,
    cancel: CancelHandle,
    handle: Option<JoinHandle<Result<PollOutcome>>>,
}

impl PollSubscription {
    pub(crate) fn spawn<F>(
        gateway: Arc<dyn JobGateway>,
        cache: Arc<JobCache>,
        key: JobKey,
        interval: Duration,
        policy: PollFailurePolicy,
        on_update: F,
    ) -> Self
    where
        F: FnMut(&Job) + Send + 'static,
    {
        let (cancel, token) = cancel_channel();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            run_poll_loop(gateway, cache, task_key, interval, policy, token, on_update).await
        });

        Self {
            key,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    /// Stop polling. No fetch is issued after this returns; a fetch already in
    /// flight completes but its response is discarded.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the subscription to end
    pub async fn join(mut self) -> Result<PollOutcome> {
        let Some(handle) = self.handle.take() else {
            return Ok(PollOutcome::Cancelled);
        };

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                // on_update panicked (or the runtime shut down); the task is gone either way
                if join_err.is_panic() {
                    error!(job = %self.key, "Poll task panicked: {:?}", join_err);
                }
                Err(AppError::Internal(format!(
                    "poll task for {} ended abnormally: {}",
                    self.key, join_err
                )))
            }
        }
    }
}

impl Drop for PollSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_poll_loop<F>(
    gateway: Arc<dyn JobGateway>,
    cache: Arc<JobCache>,
    key: JobKey,
    interval: Duration,
    mut policy: PollFailurePolicy,
    mut token: CancelToken,
    mut on_update: F,
) -> Result<PollOutcome>
where
    F: FnMut(&Job) + Send + 'static,
{
    debug!(job = %key, interval_ms = interval.as_millis() as u64, "Polling started");

    loop {
        if token.is_cancelled() {
            debug!(job = %key, "Polling cancelled");
            return Ok(PollOutcome::Cancelled);
        }

        // Strictly sequential: the next fetch is only scheduled once this resolves
        let result = gateway.get_job(&key).await;

        if token.is_cancelled() {
            debug!(job = %key, "Discarding response that arrived after cancellation");
            return Ok(PollOutcome::Cancelled);
        }

        match result {
            Ok(job) => {
                policy.record_success();
                cache.store(job.clone());
                on_update(&job);

                if job.is_terminal() {
                    info!(job = %key, status = %job.status, "Job reached terminal state, polling stopped");
                    return Ok(PollOutcome::Terminal(job));
                }
            }
            Err(e) => match policy.record_failure(e) {
                PollDecision::Continue => {}
                PollDecision::Stop(err) => {
                    error!(job = %key, error = %err, "Polling terminated");
                    return Err(err);
                }
            },
        }

        tokio::select! {
            _ = sleep(interval) => {},
            _ = token.cancelled() => {
                debug!(job = %key, "Polling cancelled while idle");
                return Ok(PollOutcome::Cancelled);
            }
        }
    }
}
