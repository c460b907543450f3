/// A value that settles `delay_ms` after the last raw update.
///
/// The caller drives time: call [`Debounced::observe`] when a raw value arrives and
/// [`Debounced::poll`] from a timer or frame tick. Each observe replaces the pending value and
/// restarts the delay. A zero delay settles immediately.
#[derive(Clone, Debug)]
pub struct Debounced<T> {
    delay_ms: u64,
    settled: T,
    pending: Option<(T, u64)>,
    disposed: bool,
}

impl<T> Debounced<T> {
    pub fn new(initial: T, delay_ms: u64) -> Self {
        Self {
            delay_ms,
            settled: initial,
            pending: None,
            disposed: false,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Changes the delay for future observations. A pending value keeps its deadline.
    pub fn set_delay_ms(&mut self, delay_ms: u64) {
        self.delay_ms = delay_ms;
    }

    /// Records a raw value at `now_ms`.
    ///
    /// Returns `true` when the value settled immediately (zero delay).
    pub fn observe(&mut self, raw: T, now_ms: u64) -> bool {
        if self.disposed {
            return false;
        }
        if self.delay_ms == 0 {
            self.pending = None;
            self.settled = raw;
            return true;
        }
        let deadline = now_ms.saturating_add(self.delay_ms);
        ptrace!(now_ms, deadline, "Debounced::observe");
        self.pending = Some((raw, deadline));
        false
    }

    /// Settles the pending value once its deadline has passed.
    ///
    /// Returns the newly settled value, or `None` when nothing settled on this call.
    pub fn poll(&mut self, now_ms: u64) -> Option<&T> {
        if self.disposed {
            return None;
        }
        let (value, _) = self
            .pending
            .take_if(|(_, deadline)| now_ms >= *deadline)?;
        self.settled = value;
        Some(&self.settled)
    }

    pub fn settled(&self) -> &T {
        &self.settled
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref().map(|(v, _)| v)
    }

    pub fn deadline_ms(&self) -> Option<u64> {
        self.pending.as_ref().map(|(_, d)| *d)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops the pending value without settling it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(v, _)| v)
    }

    /// Cancels any pending value and ignores all further input.
    pub fn dispose(&mut self) {
        self.pending = None;
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn into_settled(self) -> T {
        self.settled
    }
}
