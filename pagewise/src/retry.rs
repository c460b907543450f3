use crate::RetryOptions;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    /// Terminal: every allowed attempt failed. Only [`RetryState::reset`] leaves this state.
    Exhausted,
}

/// The recovery control a UI should offer for a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RetryAffordance {
    None,
    /// Retry the failed unit of work.
    Retry,
    /// Give up on retries and reload from scratch.
    Reload,
}

/// Bounded-retry state machine for one fallible unit of work.
///
/// ```text
/// Idle -> Running -> Succeeded
///            |
///            v
///          Failed -> Running (attempt + 1) -> ... -> Exhausted
/// ```
///
/// A failure at `attempt == max_retries` exhausts the task. The last error stays visible while a
/// retry is running and is only replaced or cleared once that attempt resolves.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryState<E> {
    options: RetryOptions,
    attempt: u32,
    status: RetryStatus,
    last_error: Option<E>,
}

impl<E> RetryState<E> {
    pub fn new(options: RetryOptions) -> Self {
        Self {
            options,
            attempt: 0,
            status: RetryStatus::Idle,
            last_error: None,
        }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn max_retries(&self) -> u32 {
        self.options.max_retries
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn status(&self) -> RetryStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&E> {
        self.last_error.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.status == RetryStatus::Running
    }

    pub fn is_exhausted(&self) -> bool {
        self.status == RetryStatus::Exhausted
    }

    /// `Idle -> Running`. Returns `false` (and changes nothing) from any other state.
    pub fn start(&mut self) -> bool {
        if self.status != RetryStatus::Idle {
            return false;
        }
        pdebug!("RetryState: Idle -> Running");
        self.status = RetryStatus::Running;
        true
    }

    /// `Running -> Succeeded`, clearing the last error.
    pub fn succeed(&mut self) -> bool {
        if self.status != RetryStatus::Running {
            return false;
        }
        pdebug!(attempt = self.attempt, "RetryState: Running -> Succeeded");
        self.status = RetryStatus::Succeeded;
        self.last_error = None;
        true
    }

    /// `Running -> Failed`, or `Running -> Exhausted` once `attempt == max_retries`.
    pub fn fail(&mut self, error: E) -> bool {
        if self.status != RetryStatus::Running {
            pwarn!(status = ?self.status, "RetryState::fail outside Running ignored");
            return false;
        }
        self.last_error = Some(error);
        self.status = if self.attempt >= self.options.max_retries {
            RetryStatus::Exhausted
        } else {
            RetryStatus::Failed
        };
        pdebug!(attempt = self.attempt, status = ?self.status, "RetryState: Running -> failure");
        true
    }

    pub fn can_retry(&self) -> bool {
        self.status == RetryStatus::Failed && self.attempt < self.options.max_retries
    }

    /// `Failed -> Running` with `attempt + 1`.
    ///
    /// Anywhere else this is a no-op returning `false`, so retry buttons are safe to click
    /// repeatedly.
    pub fn retry(&mut self) -> bool {
        if !self.can_retry() {
            ptrace!(status = ?self.status, attempt = self.attempt, "RetryState::retry no-op");
            return false;
        }
        self.attempt += 1;
        self.status = RetryStatus::Running;
        pdebug!(attempt = self.attempt, "RetryState: Failed -> Running");
        true
    }

    /// Exhausts a running or failed task immediately, e.g. for errors known to be terminal.
    pub fn exhaust(&mut self, error: E) -> bool {
        if !matches!(self.status, RetryStatus::Running | RetryStatus::Failed) {
            return false;
        }
        pdebug!(attempt = self.attempt, "RetryState: pre-exhausted");
        self.attempt = self.options.max_retries;
        self.last_error = Some(error);
        self.status = RetryStatus::Exhausted;
        true
    }

    /// Full reset back to `Idle` with `attempt = 0`.
    pub fn reset(&mut self) {
        pdebug!(status = ?self.status, "RetryState::reset");
        self.attempt = 0;
        self.status = RetryStatus::Idle;
        self.last_error = None;
    }

    pub fn should_auto_retry(&self) -> bool {
        self.options.auto_retry && self.can_retry()
    }

    /// Delay before the next retry, or `None` when no retry is possible.
    pub fn next_delay_ms(&self) -> Option<u64> {
        if !self.can_retry() {
            return None;
        }
        Some(self.options.backoff.delay_for(self.attempt + 1))
    }

    pub fn affordance(&self) -> RetryAffordance {
        match self.status {
            RetryStatus::Failed => RetryAffordance::Retry,
            RetryStatus::Exhausted => RetryAffordance::Reload,
            _ => RetryAffordance::None,
        }
    }
}

impl<E> Default for RetryState<E> {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}
