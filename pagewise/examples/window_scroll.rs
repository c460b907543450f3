// Example: fixed-height windowing over a large list.
use pagewise::{Policy, Viewport, Window, plan_render};

fn main() {
    let rows: Vec<String> = (0..1_000_000).map(|i| format!("row {i}")).collect();

    let viewport = Viewport::new(123_456, 480, 24);
    let w = Window::compute(viewport, rows.len());
    println!("total_extent={}", w.total_extent());
    println!("range={:?} offset={}", w.range, w.offset_for_start());

    w.for_each_index(|i| {
        println!("  +{:>4}px {}", w.offset_in_slice(i), rows[i]);
    });

    let plan = plan_render(80, &Policy::default(), viewport);
    println!("80 loaded rows -> {plan:?}");
}
