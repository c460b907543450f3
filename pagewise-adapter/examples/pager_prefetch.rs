// Example: paging through a source with background neighbour prefetch.
use pagewise::PageCursorOptions;
use pagewise_adapter::{MemorySource, PageEvent, Pager};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let source = MemorySource::new((0..57).map(|i| format!("item {i}")).collect::<Vec<_>>());
    let mut pager =
        Pager::new(source, PageCursorOptions::new(10).with_prefetch_distance(1)).unwrap();
    let mut events = pager.take_events().unwrap();

    let first = pager.open().await.unwrap();
    println!("page {} -> {:?}", first.index, first.items());

    for target in [1, 4, 99] {
        if let Some(load) = pager.go_to_page(target).await {
            println!("page {} -> {:?}", load.index, load.items().map(<[String]>::len));
        }
    }

    tokio::task::yield_now().await;
    while let Ok(event) = events.try_recv() {
        match event {
            PageEvent::Prefetched(page) => println!("prefetched page {}", page.index),
            PageEvent::PrefetchFailed { index, error } => println!("prefetch {index} failed: {error}"),
        }
    }
    pager.dispose();
}
