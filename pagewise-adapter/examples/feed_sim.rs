// Example: an infinite feed over a flaky, slow source.
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pagewise::{MetricsRecorder, NetworkClass, Policy, SampleKind, Viewport};
use pagewise_adapter::{DataSource, Feed, FeedOptions, LoadError, LoadOutcome, PolicyCell};

struct FlakyTimeline {
    calls: AtomicUsize,
}

#[async_trait]
impl DataSource for FlakyTimeline {
    type Item = String;

    fn len(&self) -> Option<usize> {
        None
    }

    async fn fetch(&self, range: Range<usize>) -> Result<Vec<String>, LoadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        if call == 2 {
            return Err(LoadError::transient("connection reset"));
        }
        let end = range.end.min(64);
        Ok((range.start.min(end)..end).map(|i| format!("post #{i}")).collect())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cell = PolicyCell::new(Policy::default()).unwrap();
    let metrics = Arc::new(MetricsRecorder::new(64).unwrap());
    let feed = Feed::new(
        FlakyTimeline {
            calls: AtomicUsize::new(0),
        },
        FeedOptions::default(),
    )
    .unwrap()
    .with_policy(cell.subscribe())
    .with_metrics(metrics.clone());

    for step in 0..8 {
        if step == 3 {
            cell.publish_network(NetworkClass::TwoG, 0.3);
            println!("network degraded: {:?}", cell.current());
        }
        // The sentinel scrolls into view and back out.
        let outcome = feed.on_sentinel(1.0).await;
        feed.on_sentinel(0.0).await;
        println!(
            "step {step}: {outcome:?} len={} affordance={:?}",
            feed.len(),
            feed.affordance()
        );
        if outcome == LoadOutcome::Skipped && !feed.has_more() {
            break;
        }
    }

    let mut shown = 0;
    feed.render_visible(Viewport::new(0, 240, 24), |_, _| shown += 1);
    println!("rendering {shown} of {} loaded", feed.len());
    println!("load times: {:?}", metrics.summary(SampleKind::LoadTime));
    feed.dispose();
}
