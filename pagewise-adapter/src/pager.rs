use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use pagewise::{
    ConfigError, LoadError, MetricsSink, Page, PageChange, PageCursorOptions, PageState, Policy,
    RetryAffordance, RetryOptions,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::task::{Operation, SharedMetrics, load_timeout};
use crate::{DataSource, PolicySubscriber, RetryableTask, TaskOutcome};

/// Reported by background prefetches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageEvent<T> {
    Prefetched(Page<Vec<T>>),
    /// The page stays marked as prefetched; it is fetched again when it becomes current.
    PrefetchFailed { index: usize, error: LoadError },
}

/// The current page's load, with the task that can retry it.
#[derive(Debug)]
pub struct PageLoad<T> {
    pub index: usize,
    pub outcome: TaskOutcome<Vec<T>>,
    task: RetryableTask<Vec<T>>,
}

impl<T: Send + 'static> PageLoad<T> {
    pub fn items(&self) -> Option<&[T]> {
        match &self.outcome {
            TaskOutcome::Succeeded(items) => Some(items),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        self.outcome.error()
    }

    pub fn affordance(&self) -> RetryAffordance {
        self.task.affordance()
    }

    pub fn task(&self) -> &RetryableTask<Vec<T>> {
        &self.task
    }

    /// Retries a failed load. Returns `false` when no retry was allowed.
    pub async fn retry(&mut self) -> bool {
        let outcome = self.task.retry().await;
        if matches!(outcome, TaskOutcome::Skipped) {
            return false;
        }
        self.outcome = outcome;
        true
    }

    pub fn into_page(self) -> Option<Page<Vec<T>>> {
        let index = self.index;
        self.outcome
            .into_value()
            .map(|items| Page { index, items })
    }
}

/// Page navigation over an async [`DataSource`] with a known length.
///
/// The current page is always loaded in the foreground. Neighbours are prefetched on spawned
/// tasks that never delay it, and report through [`Pager::take_events`]. There is no page cache:
/// prefetching warms whatever cache the source keeps.
///
/// After [`Pager::dispose`] navigation is refused and the page state no longer changes.
pub struct Pager<S: DataSource> {
    source: Arc<S>,
    state: PageState,
    retry: RetryOptions,
    timeout: Duration,
    policy: Option<PolicySubscriber>,
    metrics: Option<SharedMetrics>,
    cancel: CancellationToken,
    session: CancellationToken,
    events: mpsc::UnboundedSender<PageEvent<S::Item>>,
    events_rx: Option<mpsc::UnboundedReceiver<PageEvent<S::Item>>>,
}

impl<S: DataSource + 'static> Pager<S> {
    pub fn new(source: S, options: PageCursorOptions) -> Result<Self, ConfigError> {
        let len = source.len().ok_or(ConfigError::UnboundedSource)?;
        let state = PageState::new(len, options)?;
        let (events, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        Ok(Self {
            source: Arc::new(source),
            state,
            retry: RetryOptions::default(),
            timeout: load_timeout(&Policy::default()),
            policy: None,
            metrics: None,
            session: cancel.child_token(),
            cancel,
            events,
            events_rx: Some(events_rx),
        })
    }

    /// Follows a published policy: every load picks up the latest timeout.
    pub fn with_policy(mut self, mut subscriber: PolicySubscriber) -> Self {
        self.timeout = load_timeout(&subscriber.current());
        self.policy = Some(subscriber);
        self
    }

    pub fn with_retry(mut self, retry: RetryOptions) -> Result<Self, ConfigError> {
        retry.validate()?;
        self.retry = retry;
        Ok(self)
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink + Send + Sync>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The prefetch event stream. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<PageEvent<S::Item>>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page()
    }

    pub fn total_pages(&self) -> usize {
        self.state.total_pages()
    }

    pub fn has_next(&self) -> bool {
        self.state.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.state.has_prev()
    }

    /// The per-attempt timeout the next load will use.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Loads page 0 and prefetches its neighbours. Returns `None` once disposed.
    pub async fn open(&mut self) -> Option<PageLoad<S::Item>> {
        if self.is_disposed() {
            return None;
        }
        let change = self.state.open();
        Some(self.apply(change).await)
    }

    /// Moves to `page` (clamped). Returns `None` without loading when the page did not change or
    /// the pager is disposed.
    pub async fn go_to_page(&mut self, page: i64) -> Option<PageLoad<S::Item>> {
        if self.is_disposed() {
            return None;
        }
        let change = self.state.go_to_page(page)?;
        Some(self.apply(change).await)
    }

    pub async fn next(&mut self) -> Option<PageLoad<S::Item>> {
        if self.is_disposed() {
            return None;
        }
        let change = self.state.next()?;
        Some(self.apply(change).await)
    }

    pub async fn prev(&mut self) -> Option<PageLoad<S::Item>> {
        if self.is_disposed() {
            return None;
        }
        let change = self.state.prev()?;
        Some(self.apply(change).await)
    }

    /// Loads the current page again without prefetching.
    pub async fn reload(&mut self) -> Option<PageLoad<S::Item>> {
        if self.is_disposed() {
            return None;
        }
        self.refresh_policy();
        Some(self.load(self.state.current_page()).await)
    }

    /// Returns `Ok(None)` without touching the page state once disposed.
    pub async fn set_page_size(
        &mut self,
        page_size: usize,
    ) -> Result<Option<PageLoad<S::Item>>, ConfigError> {
        if self.is_disposed() {
            return Ok(None);
        }
        let change = self.state.set_page_size(page_size)?;
        self.renew_session();
        Ok(Some(self.apply(change).await))
    }

    /// Swaps the source (dataset identity change). Outstanding prefetches are cancelled.
    pub async fn reset(&mut self, source: S) -> Result<Option<PageLoad<S::Item>>, ConfigError> {
        let len = source.len().ok_or(ConfigError::UnboundedSource)?;
        if self.is_disposed() {
            return Ok(None);
        }
        self.renew_session();
        self.source = Arc::new(source);
        let change = self.state.reset(len);
        Ok(Some(self.apply(change).await))
    }

    /// Cancels the current load, every prefetch and any retry still waiting.
    pub fn dispose(&self) {
        pdebug!("Pager disposed");
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn renew_session(&mut self) {
        self.session.cancel();
        self.session = self.cancel.child_token();
    }

    fn refresh_policy(&mut self) {
        let Some(subscriber) = self.policy.as_mut() else {
            return;
        };
        if subscriber.is_stale() {
            self.timeout = load_timeout(&subscriber.current());
            pdebug!(timeout = ?self.timeout, "Pager picked up a new policy");
        }
    }

    async fn apply(&mut self, change: PageChange) -> PageLoad<S::Item> {
        pdebug!(from = ?change.from, to = change.to, prefetch = ?change.prefetch, "Pager page change");
        self.refresh_policy();
        for index in change.prefetch {
            self.spawn_prefetch(index);
        }
        self.load(change.to).await
    }

    async fn load(&self, index: usize) -> PageLoad<S::Item> {
        let mut task = self.page_task(index);
        let outcome = task.run().await;
        PageLoad {
            index,
            outcome,
            task,
        }
    }

    fn spawn_prefetch(&self, index: usize) {
        if self.session.is_cancelled() {
            return;
        }
        let mut task = self.page_task(index);
        let events = self.events.clone();
        let session = self.session.clone();
        tokio::spawn(async move {
            let event = match task.run().await {
                TaskOutcome::Succeeded(items) => PageEvent::Prefetched(Page { index, items }),
                TaskOutcome::Failed(error) | TaskOutcome::Exhausted(error) => {
                    pwarn!(index, error = %error, "prefetch failed");
                    PageEvent::PrefetchFailed { index, error }
                }
                TaskOutcome::Cancelled | TaskOutcome::Skipped => return,
            };
            if session.is_cancelled() {
                return;
            }
            // The receiver may be gone; prefetch results are advisory.
            let _ = events.send(event);
        });
    }

    fn page_task(&self, index: usize) -> RetryableTask<Vec<S::Item>> {
        let source = Arc::clone(&self.source);
        let range = self.state.page_range(index).as_range();
        let operation: Operation<Vec<S::Item>> = Arc::new(move || {
            let source = Arc::clone(&source);
            let range = range.clone();
            async move { source.fetch(range).await }.boxed()
        });
        RetryableTask::from_parts(
            self.retry,
            self.timeout,
            operation,
            self.session.child_token(),
            self.metrics.clone(),
        )
    }
}

impl<S: DataSource> Drop for Pager<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
