use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{ConfigError, Policy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleKind {
    LoadTime,
    PaintTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub kind: SampleKind,
    pub duration_ms: u64,
}

impl Sample {
    pub fn load(duration_ms: u64) -> Self {
        Self {
            kind: SampleKind::LoadTime,
            duration_ms,
        }
    }

    pub fn paint(duration_ms: u64) -> Self {
        Self {
            kind: SampleKind::PaintTime,
            duration_ms,
        }
    }
}

/// A passive collector of timing samples. Recording never influences control flow.
pub trait MetricsSink {
    fn record(&self, sample: Sample);
}

/// Discards every sample.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record(&self, _sample: Sample) {}
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSummary {
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: u64,
    pub p95_ms: u64,
    pub max_ms: u64,
}

/// Keeps the most recent `capacity` samples in memory.
#[derive(Debug)]
pub struct MetricsRecorder {
    capacity: usize,
    samples: Mutex<VecDeque<Sample>>,
}

impl MetricsRecorder {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn samples(&self) -> Vec<Sample> {
        self.lock().iter().copied().collect()
    }

    pub fn summary(&self, kind: SampleKind) -> Option<MetricSummary> {
        let mut values: Vec<u64> = self
            .lock()
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.duration_ms)
            .collect();
        if values.is_empty() {
            return None;
        }
        values.sort_unstable();
        let count = values.len();
        let sum: u128 = values.iter().map(|&v| v as u128).sum();
        Some(MetricSummary {
            count,
            mean_ms: sum as f64 / count as f64,
            p50_ms: nearest_rank(&values, 50),
            p95_ms: nearest_rank(&values, 95),
            max_ms: values[count - 1],
        })
    }

    /// Whether the p95 load time is beyond what `policy` allows for a single load.
    pub fn exceeds_timeout(&self, policy: &Policy) -> bool {
        self.summary(SampleKind::LoadTime)
            .is_some_and(|s| s.p95_ms > policy.load_timeout_ms)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Sample>> {
        self.samples
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl MetricsSink for MetricsRecorder {
    fn record(&self, sample: Sample) {
        let mut samples = self.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(sample);
    }
}

fn nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    let rank = (percentile * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}
