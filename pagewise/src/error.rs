use thiserror::Error;

/// Invalid sizes or policy inputs.
///
/// These indicate a programming error at setup time, so constructors return them directly
/// instead of routing them through a [`crate::RetryState`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("page size must be greater than zero")]
    ZeroPageSize,

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("visibility threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f32),

    #[error("policy field `{field}` must be greater than zero")]
    InvalidPolicy { field: &'static str },

    #[error("backoff factor must be finite and at least 1, got {0}")]
    InvalidBackoffFactor(f64),

    #[error("metrics capacity must be greater than zero")]
    ZeroCapacity,

    #[error("paging requires a data source with a known length")]
    UnboundedSource,
}

/// A failed fetch or render step.
///
/// Every variant is captured by the retry machine; none of them propagate through the render
/// path.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadError {
    /// Network hiccups and similar conditions that may succeed on a later attempt.
    #[error("transient load failure: {0}")]
    Transient(String),

    /// A failure that will not improve on retry, e.g. a malformed response.
    #[error("terminal load failure: {0}")]
    Terminal(String),

    #[error("load timed out after {after_ms}ms")]
    TimedOut { after_ms: u64 },

    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::TimedOut { .. })
    }
}
