use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use pagewise::{
    ConfigError, LoadError, MetricsSink, Policy, RetryAffordance, RetryOptions, RetryState,
    RetryStatus, Sample,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub(crate) type Operation<T> =
    Arc<dyn Fn() -> BoxFuture<'static, Result<T, LoadError>> + Send + Sync>;

pub(crate) type SharedMetrics = Arc<dyn MetricsSink + Send + Sync>;

/// The per-attempt timeout a policy allows.
pub fn load_timeout(policy: &Policy) -> Duration {
    Duration::from_millis(policy.load_timeout_ms)
}

/// How a call to [`RetryableTask::run`] or [`RetryableTask::retry`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Succeeded(T),
    /// The attempt failed; a manual retry is allowed.
    Failed(LoadError),
    /// The last allowed attempt failed. Only [`RetryableTask::reset`] recovers.
    Exhausted(LoadError),
    /// Torn down while an attempt was in flight. The retry state was left untouched.
    Cancelled,
    /// The call was not allowed in the current state and did nothing.
    Skipped,
}

impl<T> TaskOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            Self::Failed(err) | Self::Exhausted(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }
}

/// An async operation run under a [`RetryState`], a per-attempt timeout and a cancellation token.
pub struct RetryableTask<T> {
    operation: Operation<T>,
    state: RetryState<LoadError>,
    timeout: Duration,
    cancel: CancellationToken,
    metrics: Option<SharedMetrics>,
}

impl<T> fmt::Debug for RetryableTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryableTask")
            .field("state", &self.state)
            .field("timeout", &self.timeout)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> RetryableTask<T> {
    pub fn new<F, Fut>(options: RetryOptions, timeout: Duration, operation: F) -> Result<Self, ConfigError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        options.validate()?;
        Ok(Self::from_parts(
            options,
            timeout,
            Arc::new(move || operation().boxed()),
            CancellationToken::new(),
            None,
        ))
    }

    pub(crate) fn from_parts(
        options: RetryOptions,
        timeout: Duration,
        operation: Operation<T>,
        cancel: CancellationToken,
        metrics: Option<SharedMetrics>,
    ) -> Self {
        Self {
            operation,
            state: RetryState::new(options),
            timeout,
            cancel,
            metrics,
        }
    }

    /// Ties this task to an outer session: cancelling `parent` tears the task down.
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink + Send + Sync>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn state(&self) -> &RetryState<LoadError> {
        &self.state
    }

    pub fn status(&self) -> RetryStatus {
        self.state.status()
    }

    pub fn attempt(&self) -> u32 {
        self.state.attempt()
    }

    pub fn last_error(&self) -> Option<&LoadError> {
        self.state.last_error()
    }

    pub fn affordance(&self) -> RetryAffordance {
        self.state.affordance()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Runs the first attempt. Only valid from `Idle`.
    pub async fn run(&mut self) -> TaskOutcome<T> {
        if self.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        if !self.state.start() {
            return TaskOutcome::Skipped;
        }
        self.drive().await
    }

    /// Manual retry. A no-op returning [`TaskOutcome::Skipped`] unless the task is `Failed` with
    /// attempts left.
    pub async fn retry(&mut self) -> TaskOutcome<T> {
        if self.cancel.is_cancelled() {
            return TaskOutcome::Cancelled;
        }
        if !self.state.retry() {
            return TaskOutcome::Skipped;
        }
        self.drive().await
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Cancels any in-flight attempt or backoff wait. The task cannot run again.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn drive(&mut self) -> TaskOutcome<T> {
        loop {
            let err = match self.attempt_once().await {
                None => return TaskOutcome::Cancelled,
                Some(Ok(value)) => {
                    self.state.succeed();
                    return TaskOutcome::Succeeded(value);
                }
                Some(Err(err)) => err,
            };

            if self.state.options().exhaust_terminal && !err.is_retryable() {
                self.state.exhaust(err.clone());
            } else {
                self.state.fail(err.clone());
            }
            if self.state.is_exhausted() {
                pwarn!(attempt = self.state.attempt(), error = %err, "task exhausted");
                return TaskOutcome::Exhausted(err);
            }
            if !self.state.should_auto_retry() {
                return TaskOutcome::Failed(err);
            }

            let delay = self.state.next_delay_ms().unwrap_or(0);
            pdebug!(attempt = self.state.attempt(), delay_ms = delay, "auto retry scheduled");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return TaskOutcome::Cancelled,
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
            }
            self.state.retry();
        }
    }

    async fn attempt_once(&self) -> Option<Result<T, LoadError>> {
        let started = Instant::now();
        let attempt = (self.operation)();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            res = tokio::time::timeout(self.timeout, attempt) => match res {
                Ok(res) => res,
                Err(_) => Err(LoadError::TimedOut {
                    after_ms: millis(self.timeout),
                }),
            },
        };
        if let Some(metrics) = &self.metrics {
            metrics.record(Sample::load(millis(started.elapsed())));
        }
        ptrace!(attempt = self.state.attempt(), ok = result.is_ok(), "attempt finished");
        Some(result)
    }
}

pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
