// Example: page navigation with neighbour prefetch over an in-memory dataset.
use pagewise::{PageCursor, PageCursorOptions};

fn main() {
    let items: Vec<u32> = (0..95).collect();
    let mut cursor = PageCursor::new(items.as_slice(), PageCursorOptions::new(10)).unwrap();

    let change = cursor.open();
    println!("open: page={} prefetch={:?}", change.to, change.prefetch);

    for target in [3, 4, -7, 10_000] {
        match cursor.go_to_page(target) {
            Some(change) => println!(
                "go_to_page({target}): {:?} -> {} prefetch={:?} items={:?}",
                change.from,
                change.to,
                change.prefetch,
                cursor.current_items()
            ),
            None => println!("go_to_page({target}): unchanged"),
        }
    }
    println!("total_pages={} has_next={}", cursor.total_pages(), cursor.has_next());
}
