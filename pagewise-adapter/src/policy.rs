use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use pagewise::{ConfigError, NetworkClass, Policy, PolicyOverrides, PolicySignals, derive_policy};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One published policy value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolicySnapshot {
    /// Bumped on every republish.
    pub version: u64,
    pub policy: Policy,
    /// The policy before signal-driven adjustments.
    pub base: Policy,
    pub signals: PolicySignals,
}

/// The process-wide policy value: a single writer and any number of readers.
///
/// Readers never block the writer and always see a complete snapshot.
#[derive(Debug)]
pub struct PolicyCell {
    tx: watch::Sender<PolicySnapshot>,
}

impl PolicyCell {
    pub fn new(base: Policy) -> Result<Self, ConfigError> {
        Self::with_signals(base, PolicySignals::default())
    }

    pub fn with_signals(base: Policy, signals: PolicySignals) -> Result<Self, ConfigError> {
        base.validate()?;
        let (tx, _) = watch::channel(PolicySnapshot {
            version: 0,
            policy: derive_policy(&signals, &base),
            base,
            signals,
        });
        Ok(Self { tx })
    }

    pub fn current(&self) -> Policy {
        self.tx.borrow().policy
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> PolicySubscriber {
        PolicySubscriber {
            rx: self.tx.subscribe(),
        }
    }

    /// Recomputes the policy for `signals`. Returns whether anything was republished.
    pub fn publish_signals(&self, signals: PolicySignals) -> bool {
        self.republish(None, Some(signals))
    }

    /// Replaces only the network half of the current signals.
    pub fn publish_network(&self, network_class: NetworkClass, downlink_mbps: f64) -> bool {
        let signals = self
            .tx
            .borrow()
            .signals
            .with_network(network_class, downlink_mbps);
        self.republish(None, Some(signals))
    }

    pub fn set_base(&self, base: Policy) -> Result<bool, ConfigError> {
        base.validate()?;
        Ok(self.republish(Some(base), None))
    }

    /// Merges consumer overrides into the base policy.
    pub fn apply_overrides(&self, overrides: &PolicyOverrides) -> Result<bool, ConfigError> {
        let base = self.tx.borrow().base.merge(overrides)?;
        Ok(self.republish(Some(base), None))
    }

    fn republish(&self, base: Option<Policy>, signals: Option<PolicySignals>) -> bool {
        self.tx.send_if_modified(|snap| {
            let base = base.unwrap_or(snap.base);
            let signals = signals.unwrap_or(snap.signals);
            let policy = derive_policy(&signals, &base);
            if base == snap.base && signals == snap.signals && policy == snap.policy {
                return false;
            }
            snap.version += 1;
            snap.base = base;
            snap.signals = signals;
            snap.policy = policy;
            pdebug!(version = snap.version, ?policy, "PolicyCell republished");
            true
        })
    }
}

/// A reader handle on a [`PolicyCell`].
#[derive(Clone, Debug)]
pub struct PolicySubscriber {
    rx: watch::Receiver<PolicySnapshot>,
}

impl PolicySubscriber {
    /// The latest policy. Marks it as seen.
    pub fn current(&mut self) -> Policy {
        self.rx.borrow_and_update().policy
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        *self.rx.borrow()
    }

    pub fn version(&self) -> u64 {
        self.rx.borrow().version
    }

    /// Whether a newer policy was published since this subscriber last read one.
    pub fn is_stale(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Waits for the next republish. Returns `None` once the cell is gone.
    pub async fn changed(&mut self) -> Option<PolicySnapshot> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Network half of [`PolicySignals`], as reported by connection-change events.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkSignals {
    pub network_class: NetworkClass,
    pub downlink_mbps: f64,
}

/// Environment capability reporting.
#[async_trait]
pub trait SignalsProvider: Send + Sync {
    /// Read once when the listener starts.
    async fn device_signals(&self) -> PolicySignals;

    fn network_changes(&self) -> BoxStream<'static, NetworkSignals>;
}

/// Publishes the provider's signals into `cell` and republishes on every network change until
/// `cancel` fires or the change stream ends.
pub fn spawn_signal_listener<P>(
    cell: Arc<PolicyCell>,
    provider: P,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    P: SignalsProvider + 'static,
{
    tokio::spawn(async move {
        let initial = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            signals = provider.device_signals() => signals,
        };
        cell.publish_signals(initial);

        let mut changes = provider.network_changes();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = changes.next() => match next {
                    Some(net) => {
                        ptrace!(network = %net.network_class, downlink = net.downlink_mbps, "network change");
                        cell.publish_network(net.network_class, net.downlink_mbps);
                    }
                    None => break,
                },
            }
        }
        pdebug!("signal listener stopped");
    })
}
