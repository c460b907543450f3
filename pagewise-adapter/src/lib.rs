//! Async drivers for the `pagewise` crate.
//!
//! `pagewise` is headless and owns no clock. This crate runs it on tokio:
//!
//! - [`DebouncedValue`]: a timer-backed debounced value
//! - [`PolicyCell`]: the process-wide adaptive policy, published to any number of readers
//! - [`RetryableTask`]: bounded retries with per-attempt timeouts and cancellation
//! - [`Feed`]: progressive reveal over an async [`DataSource`]
//! - [`Pager`]: page navigation with background neighbour prefetch
//!
//! Every driver tears down through a `CancellationToken`; nothing changes state after disposal.
#![forbid(unsafe_code)]

#[macro_use]
mod macros;

mod debounce;
mod feed;
mod pager;
mod policy;
mod source;
mod task;


pub use debounce::DebouncedValue;
pub use feed::{Feed, FeedOptions, LoadOutcome};
pub use pager::{PageEvent, PageLoad, Pager};
pub use policy::{
    NetworkSignals, PolicyCell, PolicySnapshot, PolicySubscriber, SignalsProvider,
    spawn_signal_listener,
};
pub use source::{DataSource, MemorySource, SourceError};
pub use task::{RetryableTask, TaskOutcome, load_timeout};

pub use pagewise::{ConfigError, LoadError};
