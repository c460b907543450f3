use std::sync::Arc;
use std::time::Duration;

use pagewise::{
    BatchTicket, BoundaryId, ConfigError, LoadError, LoadMoreAffordance, MetricsSink, Policy,
    RenderPlan, RetryAffordance, RetryOptions, RetryState, RetryStatus, RevealOptions,
    RevealState, Revealer, Sample, Span, Viewport, VisibilityOptions, VisibilityTrigger,
    plan_render,
};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::task::{SharedMetrics, load_timeout, millis};
use crate::{DataSource, PolicySubscriber};

/// Configuration for a [`Feed`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeedOptions {
    /// `initial_count` is ignored: a feed only shows what it has fetched.
    pub reveal: RevealOptions,
    pub visibility: VisibilityOptions,
    pub retry: RetryOptions,
}

impl FeedOptions {
    pub fn with_reveal(mut self, reveal: RevealOptions) -> Self {
        self.reveal = reveal;
        self
    }

    pub fn with_visibility(mut self, visibility: VisibilityOptions) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Self {
        self.retry = retry;
        self
    }
}

/// How a load request on a [`Feed`] ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { delivered: usize },
    /// Dropped: a batch was already in flight, nothing is left, or the boundary did not become
    /// visible.
    Skipped,
    /// The batch failed and can be retried with another load request. With `auto_retry` this is
    /// only returned when a retry could not be scheduled.
    Failed(LoadError),
    /// Retries are used up; [`Feed::reset`] starts over.
    Exhausted,
    Disposed,
    /// The feed was reset while the batch was in flight; its items were discarded.
    Stale,
}

struct FeedInner<T> {
    items: Vec<T>,
    revealer: Revealer,
    trigger: VisibilityTrigger,
    retry: RetryState<LoadError>,
    policy: Policy,
    subscriber: Option<PolicySubscriber>,
    next_boundary: BoundaryId,
}

impl<T> FeedInner<T> {
    // Batch size and timeout follow the latest published policy.
    fn refresh_policy(&mut self) {
        let Some(subscriber) = self.subscriber.as_mut() else {
            return;
        };
        if !subscriber.is_stale() {
            return;
        }
        self.policy = subscriber.current();
        if self.revealer.set_batch_size(self.policy.batch_size).is_err() {
            pwarn!(batch_size = self.policy.batch_size, "ignoring invalid policy batch size");
        }
    }

    fn arm_next_boundary(&mut self) -> BoundaryId {
        let id = self.next_boundary;
        self.next_boundary = self.next_boundary.wrapping_add(1);
        self.trigger.arm(id);
        id
    }
}

/// Progressive reveal over an async [`DataSource`].
///
/// Items are fetched in batches as the trailing sentinel becomes visible (or the "load more"
/// control is pressed). Only one batch is in flight at a time; a second request while loading is
/// dropped. Failures are captured by a bounded retry machine and never propagate to rendering;
/// with `auto_retry` set, a failed batch is retried after the backoff delay within the same call.
pub struct Feed<S: DataSource> {
    source: S,
    inner: Mutex<FeedInner<S::Item>>,
    metrics: Option<SharedMetrics>,
    cancel: CancellationToken,
}

impl<S: DataSource> Feed<S> {
    pub fn new(source: S, options: FeedOptions) -> Result<Self, ConfigError> {
        options.retry.validate()?;
        let reveal = options.reveal.with_initial_count(0);
        let revealer = Revealer::new(source.len(), reveal)?;
        let trigger = VisibilityTrigger::new(options.visibility)?;

        let mut inner = FeedInner {
            items: Vec::new(),
            revealer,
            trigger,
            retry: RetryState::new(options.retry),
            policy: Policy {
                batch_size: reveal.batch_size,
                ..Policy::default()
            },
            subscriber: None,
            next_boundary: 0,
        };
        inner.arm_next_boundary();

        Ok(Self {
            source,
            inner: Mutex::new(inner),
            metrics: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Follows a published policy for batch size, timeout and the virtualization threshold.
    pub fn with_policy(self, mut subscriber: PolicySubscriber) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.policy = subscriber.current();
            let batch_size = inner.policy.batch_size;
            if inner.revealer.set_batch_size(batch_size).is_err() {
                pwarn!(batch_size, "ignoring invalid policy batch size");
            }
            inner.subscriber = Some(subscriber);
        }
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink + Send + Sync>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> RevealState {
        self.inner.lock().revealer.state()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_more(&self) -> bool {
        self.inner.lock().revealer.has_more()
    }

    pub fn policy(&self) -> Policy {
        self.inner.lock().policy
    }

    /// What the "load more" control should show. Once retries are used up it offers a reload
    /// ([`Feed::reset`]) instead of a retry that would do nothing.
    pub fn affordance(&self) -> LoadMoreAffordance {
        let inner = self.inner.lock();
        match inner.revealer.affordance() {
            LoadMoreAffordance::Retry | LoadMoreAffordance::Button if inner.retry.is_exhausted() => {
                LoadMoreAffordance::Reload
            }
            affordance => affordance,
        }
    }

    pub fn retry_status(&self) -> RetryStatus {
        self.inner.lock().retry.status()
    }

    pub fn retry_affordance(&self) -> RetryAffordance {
        self.inner.lock().retry.affordance()
    }

    pub fn last_error(&self) -> Option<LoadError> {
        self.inner.lock().retry.last_error().cloned()
    }

    /// Runs `f` over every revealed item.
    pub fn with_items<R>(&self, f: impl FnOnce(&[S::Item]) -> R) -> R {
        f(self.inner.lock().items.as_slice())
    }

    pub fn render_plan(&self, viewport: Viewport) -> RenderPlan {
        let inner = self.inner.lock();
        plan_render(inner.items.len(), &inner.policy, viewport)
    }

    /// Calls `f` for each item the current render plan includes.
    pub fn render_visible(&self, viewport: Viewport, mut f: impl FnMut(usize, &S::Item)) {
        let inner = self.inner.lock();
        let plan = plan_render(inner.items.len(), &inner.policy, viewport);
        plan.for_each_index(|i| {
            if let Some(item) = inner.items.get(i) {
                f(i, item);
            }
        });
    }

    /// The sentinel currently being observed.
    pub fn sentinel(&self) -> Option<BoundaryId> {
        self.inner.lock().trigger.boundary()
    }

    /// Observes a new sentinel (e.g. after the list re-rendered its trailing element).
    pub fn rearm_sentinel(&self) -> BoundaryId {
        self.inner.lock().arm_next_boundary()
    }

    /// Manual "load more".
    pub async fn load_more(&self) -> LoadOutcome {
        self.load_with(|inner| inner.revealer.begin_load_more()).await
    }

    /// Feeds the sentinel's intersection ratio. Loads only on a `Hidden -> Visible` transition.
    pub async fn on_sentinel(&self, ratio: f32) -> LoadOutcome {
        self.load_with(|inner| {
            let transition = inner.trigger.observe_ratio(ratio)?;
            inner.revealer.on_visibility(transition)
        })
        .await
    }

    /// Geometry variant of [`Feed::on_sentinel`].
    pub async fn on_sentinel_geometry(&self, sentinel: Span, root: Span) -> LoadOutcome {
        self.load_with(|inner| {
            let transition = inner.trigger.observe_geometry(sentinel, root)?;
            inner.revealer.on_visibility(transition)
        })
        .await
    }

    /// Starts a new session against the same source: items, retries and the sentinel are
    /// cleared, and any batch in flight becomes stale.
    pub fn reset(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut inner = self.inner.lock();
        pdebug!(len = ?self.source.len(), "Feed::reset");
        inner.items.clear();
        inner.revealer.reset(self.source.len());
        inner.retry.reset();
        inner.arm_next_boundary();
    }

    /// Tears the feed down. In-flight fetches are abandoned and nothing changes afterwards.
    pub fn dispose(&self) {
        self.cancel.cancel();
        let mut inner = self.inner.lock();
        inner.revealer.dispose();
        inner.trigger.disarm();
        pdebug!("Feed disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn load_with(
        &self,
        begin: impl FnOnce(&mut FeedInner<S::Item>) -> Option<BatchTicket>,
    ) -> LoadOutcome {
        let (mut ticket, mut timeout) = {
            let mut inner = self.inner.lock();
            if self.cancel.is_cancelled() {
                return LoadOutcome::Disposed;
            }
            if inner.retry.is_exhausted() {
                return LoadOutcome::Exhausted;
            }
            inner.refresh_policy();
            let Some(ticket) = begin(&mut *inner) else {
                return LoadOutcome::Skipped;
            };
            // Each batch is its own unit of work; a batch after a failure is its retry.
            if inner.retry.status() == RetryStatus::Failed {
                inner.retry.retry();
            } else {
                inner.retry.reset();
                inner.retry.start();
            }
            (ticket, load_timeout(&inner.policy))
        };

        loop {
            let Some(fetched) = self.fetch(&ticket, timeout).await else {
                return LoadOutcome::Disposed;
            };
            let outcome = self.finish(&ticket, fetched);
            let LoadOutcome::Failed(err) = outcome else {
                return outcome;
            };

            let Some(delay) = self.auto_retry_delay() else {
                return LoadOutcome::Failed(err);
            };
            pdebug!(delay_ms = delay, "Feed auto retry scheduled");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return LoadOutcome::Disposed,
                _ = tokio::time::sleep(Duration::from_millis(delay)) => {}
            }

            (ticket, timeout) = {
                let mut inner = self.inner.lock();
                if self.cancel.is_cancelled() {
                    return LoadOutcome::Disposed;
                }
                // A load request or reset during the wait took over this batch.
                if !inner.retry.can_retry() {
                    return LoadOutcome::Failed(err);
                }
                inner.refresh_policy();
                let Some(next) = inner.revealer.begin_load_more() else {
                    return LoadOutcome::Failed(err);
                };
                inner.retry.retry();
                (next, load_timeout(&inner.policy))
            };
        }
    }

    fn auto_retry_delay(&self) -> Option<u64> {
        let inner = self.inner.lock();
        if !inner.retry.should_auto_retry() {
            return None;
        }
        inner.retry.next_delay_ms()
    }

    async fn fetch(
        &self,
        ticket: &BatchTicket,
        timeout: Duration,
    ) -> Option<Result<Vec<S::Item>, LoadError>> {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            res = tokio::time::timeout(timeout, self.source.fetch(ticket.range().as_range())) => {
                match res {
                    Ok(res) => res,
                    Err(_) => Err(LoadError::TimedOut { after_ms: millis(timeout) }),
                }
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record(Sample::load(millis(started.elapsed())));
        }
        Some(result)
    }

    fn finish(&self, ticket: &BatchTicket, fetched: Result<Vec<S::Item>, LoadError>) -> LoadOutcome {
        let mut inner = self.inner.lock();
        if self.cancel.is_cancelled() {
            return LoadOutcome::Disposed;
        }
        match fetched {
            Ok(mut batch) => {
                batch.truncate(ticket.len());
                let delivered = batch.len();
                if !inner.revealer.complete(ticket, delivered) {
                    return LoadOutcome::Stale;
                }
                // Keep items in step with the revealed count when a known total was reached.
                let room = inner.revealer.revealed_count().saturating_sub(inner.items.len());
                batch.truncate(room);
                let delivered = batch.len();
                inner.items.extend(batch);
                inner.retry.succeed();
                LoadOutcome::Loaded { delivered }
            }
            Err(err) => {
                if !inner.revealer.fail(ticket) {
                    return LoadOutcome::Stale;
                }
                if inner.retry.options().exhaust_terminal && !err.is_retryable() {
                    inner.retry.exhaust(err.clone());
                } else {
                    inner.retry.fail(err.clone());
                }
                if inner.retry.is_exhausted() {
                    pwarn!(error = %err, "Feed exhausted its retries");
                    return LoadOutcome::Exhausted;
                }
                pdebug!(error = %err, "Feed batch failed");
                LoadOutcome::Failed(err)
            }
        }
    }
}

impl<S: DataSource> Drop for Feed<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
