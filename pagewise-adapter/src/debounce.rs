use std::time::Duration;

use pagewise::Debounced;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A timer-driven [`Debounced`] value.
///
/// A background task owns the pending value and its deadline; settled values are published on a
/// watch channel. Dropping or disposing the handle cancels the task, so nothing settles after
/// teardown.
///
/// Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct DebouncedValue<T> {
    input: mpsc::UnboundedSender<T>,
    settled: watch::Receiver<T>,
    cancel: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> DebouncedValue<T> {
    pub fn new(initial: T, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let (input, raw) = mpsc::unbounded_channel();
        let (output, settled) = watch::channel(initial.clone());
        let cancel = CancellationToken::new();

        tokio::spawn(drive(
            Debounced::new(initial, delay_ms),
            raw,
            output,
            cancel.clone(),
        ));

        Self {
            input,
            settled,
            cancel,
        }
    }

    /// Feeds a raw value, restarting the delay. Returns `false` after disposal.
    pub fn observe(&self, raw: T) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.input.send(raw).is_ok()
    }

    pub fn settled(&self) -> T {
        self.settled.borrow().clone()
    }

    /// A receiver that is notified every time a value settles.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.clone()
    }

    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Drop for DebouncedValue<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive<T: Clone>(
    mut core: Debounced<T>,
    mut raw: mpsc::UnboundedReceiver<T>,
    output: watch::Sender<T>,
    cancel: CancellationToken,
) {
    let origin = Instant::now();
    let now_ms = || u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX);

    loop {
        let deadline = core
            .deadline_ms()
            .map(|ms| origin + Duration::from_millis(ms));

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = raw.recv() => match next {
                Some(value) => {
                    if core.observe(value, now_ms())
                        && !publish(&output, &cancel, core.settled().clone())
                    {
                        break;
                    }
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                if let Some(value) = core.poll(now_ms()) {
                    ptrace!("DebouncedValue settled");
                    if !publish(&output, &cancel, value.clone()) {
                        break;
                    }
                }
            }
        }
    }

    core.dispose();
    pdebug!("DebouncedValue task stopped");
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Publishes a settled value unless the handle was disposed meanwhile.
pub(crate) fn publish<T>(output: &watch::Sender<T>, cancel: &CancellationToken, value: T) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    output.send_replace(value);
    true
}
