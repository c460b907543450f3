//! A headless engine for adaptive rendering and progressive data delivery.
//!
//! For async drivers (timers, policy subscriptions, retryable loads), see the `pagewise-adapter`
//! crate.
//!
//! This crate decides *which slice* of a large or unbounded dataset should be fetched, rendered
//! and kept live: fixed-height window math, page cursors with neighbour prefetch, progressive
//! reveal with in-flight de-duplication, bounded retry state machines and device/network-aware
//! sizing policies.
//!
//! It is presentation-agnostic and owns no clock. A DOM, TUI or test harness is expected to
//! provide:
//! - viewport geometry and scroll offsets
//! - boundary visibility (ratios or spans) for "load more" sentinels
//! - the current time in milliseconds for debouncing
//! - the outcome of every load it performs on the engine's behalf
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod dataset;
mod debounce;
mod error;
mod metrics;
mod options;
mod page;
mod policy;
mod retry;
mod reveal;
mod types;
mod visibility;
mod window;

#[cfg(test)]
mod tests;

pub use dataset::Dataset;
pub use debounce::Debounced;
pub use error::{ConfigError, LoadError};
pub use metrics::{MetricSummary, MetricsRecorder, MetricsSink, NoopMetrics, Sample, SampleKind};
pub use options::{Backoff, PageCursorOptions, RetryOptions, RevealOptions, VisibilityOptions};
pub use page::{PageChange, PageCursor, PageState};
pub use policy::{NetworkClass, Policy, PolicyOverrides, PolicySignals, derive as derive_policy};
pub use retry::{RetryAffordance, RetryState, RetryStatus};
pub use reveal::{BatchTicket, LoadMoreAffordance, Revealer};
pub use types::{Page, RevealState, Span, Viewport, WindowRange};
pub use visibility::{
    BoundaryId, Visibility, VisibilityTransition, VisibilityTrigger, intersection_ratio,
};
pub use window::{
    RenderPlan, Window, compute_window, offset_for_start, plan_render, total_extent,
};
