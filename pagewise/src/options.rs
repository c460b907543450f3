use crate::ConfigError;

/// Configuration for [`crate::PageCursor`] and [`crate::PageState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageCursorOptions {
    pub page_size: usize,
    /// How many pages on each side of the current page are prefetched.
    pub prefetch_distance: usize,
}

impl PageCursorOptions {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            prefetch_distance: 1,
        }
    }

    pub fn with_prefetch_distance(mut self, prefetch_distance: usize) -> Self {
        self.prefetch_distance = prefetch_distance;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        Ok(())
    }
}

impl Default for PageCursorOptions {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Configuration for [`crate::Revealer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealOptions {
    pub batch_size: usize,
    /// Items revealed before the first batch load (e.g. the first screenful of an in-memory list).
    pub initial_count: usize,
}

impl RevealOptions {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            initial_count: 0,
        }
    }

    pub fn with_initial_count(mut self, initial_count: usize) -> Self {
        self.initial_count = initial_count;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        Ok(())
    }
}

impl Default for RevealOptions {
    fn default() -> Self {
        Self::new(crate::Policy::default().batch_size)
    }
}

/// Delay inserted before a retry attempt.
///
/// Manual retries triggered from a UI button usually run immediately (`None`); automatic retries
/// typically back off.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backoff {
    #[default]
    None,
    Fixed {
        delay_ms: u64,
    },
    Exponential {
        initial_ms: u64,
        factor: f64,
        max_ms: u64,
    },
}

impl Backoff {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> u64 {
        match *self {
            Self::None => 0,
            Self::Fixed { delay_ms } => delay_ms,
            Self::Exponential {
                initial_ms,
                factor,
                max_ms,
            } => {
                let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let delay = initial_ms as f64 * factor.powi(exp);
                if !delay.is_finite() || delay >= max_ms as f64 {
                    return max_ms;
                }
                delay as u64
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Self::Exponential { factor, .. } = *self {
            if !factor.is_finite() || factor < 1.0 {
                return Err(ConfigError::InvalidBackoffFactor(factor));
            }
        }
        Ok(())
    }
}

/// Configuration for [`crate::RetryState`] and the async retry drivers built on it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryOptions {
    pub max_retries: u32,
    pub backoff: Backoff,
    /// Retry failed attempts without waiting for a manual `retry()`.
    pub auto_retry: bool,
    /// Exhaust immediately on errors that report `is_retryable() == false`.
    pub exhaust_terminal: bool,
}

impl RetryOptions {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_auto_retry(mut self, auto_retry: bool) -> Self {
        self.auto_retry = auto_retry;
        self
    }

    pub fn with_exhaust_terminal(mut self, exhaust_terminal: bool) -> Self {
        self.exhaust_terminal = exhaust_terminal;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backoff.validate()
    }
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Backoff::None,
            auto_retry: false,
            exhaust_terminal: false,
        }
    }
}

/// Configuration for [`crate::VisibilityTrigger`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibilityOptions {
    /// Minimum visible fraction of the boundary, in `[0, 1]`.
    pub threshold: f32,
    /// Grows (or, when negative, shrinks) the root region on both ends of the scroll axis.
    pub root_margin: i64,
}

impl VisibilityOptions {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            root_margin: 0,
        }
    }

    pub fn with_root_margin(mut self, root_margin: i64) -> Self {
        self.root_margin = root_margin;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

impl Default for VisibilityOptions {
    fn default() -> Self {
        Self::new(0.0)
    }
}
