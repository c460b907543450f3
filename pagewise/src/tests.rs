use crate::*;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }

    fn gen_range_i64(&mut self, start: i64, end_exclusive: i64) -> i64 {
        let span = (end_exclusive - start) as u64;
        start + (self.next_u64() % span) as i64
    }
}

fn slow_low_end_signals() -> PolicySignals {
    PolicySignals {
        device_memory_gib: 1.0,
        cpu_cores: 1,
        network_class: NetworkClass::TwoG,
        downlink_mbps: 0.5,
    }
}

fn fast_signals() -> PolicySignals {
    PolicySignals {
        device_memory_gib: 8.0,
        cpu_cores: 8,
        network_class: NetworkClass::FourG,
        downlink_mbps: 25.0,
    }
}

#[test]
fn window_covers_viewport_plus_trailing_row() {
    let r = compute_window(0, 10, 100, 1000);
    assert_eq!(r, WindowRange { start: 0, end: 11 });

    let r = compute_window(55, 10, 100, 1000);
    // rows 5..=15 intersect [55, 155)
    assert_eq!(r, WindowRange { start: 5, end: 16 });
}

#[test]
fn window_degenerate_inputs_render_nothing() {
    assert_eq!(compute_window(0, 0, 100, 1000), WindowRange::EMPTY);
    assert_eq!(compute_window(500, 10, 100, 0), WindowRange::EMPTY);
    assert!(compute_window(500, 10, 100, 0).is_empty());
}

#[test]
fn window_clamps_to_item_count() {
    let r = compute_window(9_950, 10, 100, 1000);
    assert_eq!(r, WindowRange { start: 995, end: 1000 });

    // Scrolled past the end: start saturates to the last item.
    let r = compute_window(20_000, 10, 100, 1000);
    assert_eq!(r, WindowRange { start: 999, end: 1000 });
}

#[test]
fn window_geometry_helpers() {
    assert_eq!(total_extent(1000, 12), 12_000);
    assert_eq!(offset_for_start(7, 12), 84);

    let w = Window::compute(Viewport::new(120, 48, 12), 1000);
    assert_eq!(w.range, WindowRange { start: 10, end: 15 });
    assert_eq!(w.total_extent(), 12_000);
    assert_eq!(w.offset_for_start(), 120);
    assert_eq!(w.offset_in_slice(12), 24);

    let mut seen = Vec::new();
    w.for_each_index(|i| seen.push(i));
    assert_eq!(seen, vec![10, 11, 12, 13, 14]);
}

#[test]
fn window_randomized_correctness() {
    let mut rng = Lcg::new(0x5eed_1234);
    for _ in 0..2_000 {
        let count = rng.gen_range_usize(1, 500);
        let h = rng.gen_range_u32(1, 50);
        let container = rng.gen_range_u32(1, 1_000);
        let extent = count as u64 * h as u64;
        let offset = rng.gen_range_u64(0, extent + 1);

        let r = compute_window(offset, h, container, count);
        assert!(r.start <= r.end, "{r:?}");
        assert!(r.end <= count, "{r:?} count={count}");

        // Every row intersecting [offset, offset + container) must be in range.
        let view_end = offset + container as u64;
        for i in 0..count {
            let top = i as u64 * h as u64;
            let bottom = top + h as u64;
            if top < view_end && bottom > offset {
                assert!(
                    r.contains(i),
                    "row {i} visible but not in {r:?} (offset={offset}, h={h}, container={container})"
                );
            }
        }
    }
}

#[test]
fn render_plan_switches_to_window_above_threshold() {
    let policy = Policy::default();
    let viewport = Viewport::new(0, 100, 10);

    let plan = plan_render(80, &policy, viewport);
    assert_eq!(plan, RenderPlan::Full { len: 80 });
    assert_eq!(plan.range(), WindowRange { start: 0, end: 80 });
    assert!(!plan.is_windowed());

    let plan = plan_render(500, &policy, viewport);
    assert!(plan.is_windowed());
    assert_eq!(plan.range(), WindowRange { start: 0, end: 11 });

    // A low-end policy windows much smaller sets.
    let low = derive_policy(&slow_low_end_signals(), &policy);
    assert!(plan_render(80, &low, viewport).is_windowed());
}

#[test]
fn debounce_settles_only_last_of_rapid_inputs() {
    let mut d = Debounced::new(String::new(), 300);
    let mut settled = Vec::new();

    for (t, raw) in [(0u64, "a"), (10, "ab"), (20, "abc")] {
        d.observe(raw.to_string(), t);
        for now in [t, t + 5] {
            if let Some(v) = d.poll(now) {
                settled.push(v.clone());
            }
        }
    }
    for now in (30..=400).step_by(10) {
        if let Some(v) = d.poll(now) {
            settled.push(v.clone());
        }
    }

    assert_eq!(settled, vec!["abc".to_string()]);
    assert_eq!(d.settled(), "abc");
    assert!(!d.is_pending());
}

#[test]
fn debounce_restarts_timer_on_each_input() {
    let mut d = Debounced::new(0u32, 100);
    d.observe(1, 0);
    assert_eq!(d.deadline_ms(), Some(100));
    d.observe(2, 90);
    assert_eq!(d.deadline_ms(), Some(190));
    assert_eq!(d.poll(150), None);
    assert_eq!(d.poll(190), Some(&2));
    assert_eq!(d.poll(500), None);
}

#[test]
fn debounce_zero_delay_passes_through() {
    let mut d = Debounced::new("", 0);
    assert!(d.observe("x", 5));
    assert_eq!(*d.settled(), "x");
    assert!(!d.is_pending());
}

#[test]
fn debounce_dispose_cancels_pending_value() {
    let mut d = Debounced::new(1u8, 50);
    d.observe(2, 0);
    d.dispose();
    assert!(d.is_disposed());
    assert_eq!(d.poll(1_000), None);
    assert!(!d.observe(3, 1_000));
    assert_eq!(*d.settled(), 1);

    let mut d = Debounced::new(1u8, 50);
    d.observe(2, 0);
    assert_eq!(d.cancel(), Some(2));
    assert_eq!(d.poll(1_000), None);
}

#[test]
fn visibility_is_edge_triggered() {
    let mut t = VisibilityTrigger::new(VisibilityOptions::default()).unwrap();
    t.arm(7);

    let first = t.observe_ratio(0.4).unwrap();
    assert_eq!(first.boundary, 7);
    assert!(first.became_visible());

    // Same state again: nothing emitted.
    assert_eq!(t.observe_ratio(0.9), None);
    assert_eq!(t.observe_ratio(1.0), None);

    let hidden = t.observe_ratio(0.0).unwrap();
    assert_eq!(hidden.to, Visibility::Hidden);
    assert_eq!(t.observe_ratio(0.0), None);
}

#[test]
fn visibility_threshold_gates_transition() {
    let mut t = VisibilityTrigger::new(VisibilityOptions::new(0.5)).unwrap();
    t.arm(1);
    assert_eq!(t.observe_ratio(0.25), None);
    assert_eq!(t.state(), Visibility::Hidden);
    assert!(t.observe_ratio(0.5).unwrap().became_visible());
}

#[test]
fn visibility_rejects_out_of_range_threshold() {
    let err = VisibilityTrigger::new(VisibilityOptions::new(1.5)).unwrap_err();
    assert_eq!(err, ConfigError::InvalidThreshold(1.5));
    assert!(VisibilityOptions::new(-0.1).validate().is_err());
}

#[test]
fn visibility_disarm_and_rearm_on_new_boundary() {
    let mut t = VisibilityTrigger::new(VisibilityOptions::default()).unwrap();

    // Not armed yet.
    assert_eq!(t.observe_ratio(1.0), None);

    t.arm(1);
    assert!(t.observe_ratio(1.0).is_some());
    t.disarm();
    assert!(!t.is_armed());
    assert_eq!(t.observe_ratio(1.0), None);

    // The list replaced its sentinel.
    t.arm(2);
    let tr = t.observe_ratio(1.0).unwrap();
    assert_eq!(tr.boundary, 2);
    assert_eq!(tr.to, Visibility::Visible);
}

#[test]
fn visibility_geometry_honours_root_margin() {
    let root = Span::new(0, 100);
    let sentinel = Span::new(150, 151);

    let mut t = VisibilityTrigger::new(VisibilityOptions::default()).unwrap();
    t.arm(1);
    assert_eq!(t.observe_geometry(sentinel, root), None);

    let mut t = VisibilityTrigger::new(VisibilityOptions::default().with_root_margin(60)).unwrap();
    t.arm(1);
    assert!(t.observe_geometry(sentinel, root).unwrap().became_visible());

    // Negative margins shrink the root.
    let mut t = VisibilityTrigger::new(VisibilityOptions::default().with_root_margin(-20)).unwrap();
    t.arm(1);
    assert_eq!(t.observe_geometry(Span::new(85, 95), root), None);
}

#[test]
fn intersection_ratio_partial_overlap() {
    assert_eq!(intersection_ratio(Span::new(50, 150), Span::new(0, 100)), Some(0.5));
    assert_eq!(intersection_ratio(Span::new(200, 300), Span::new(0, 100)), None);
    assert_eq!(intersection_ratio(Span::new(40, 40), Span::new(0, 100)), Some(1.0));
    assert_eq!(intersection_ratio(Span::new(100, 100), Span::new(0, 100)), Some(1.0));
}

#[test]
fn edge_adjacent_boundary_is_not_visible() {
    let root = Span::new(0, 100);
    assert_eq!(intersection_ratio(Span::new(100, 110), root), None);
    assert_eq!(intersection_ratio(Span::new(-10, 0), root), None);

    let mut t = VisibilityTrigger::new(VisibilityOptions::new(0.0)).unwrap();
    t.arm(1);
    assert_eq!(t.observe_geometry(Span::new(100, 110), root), None);
    assert_eq!(t.observe_ratio(0.0), None);
    assert!(t.observe_geometry(Span::new(99, 110), root).unwrap().became_visible());
}

#[test]
fn page_cursor_clamps_out_of_range_requests() {
    let data: Vec<u32> = (0..25).collect();
    let mut c = PageCursor::new(&data, PageCursorOptions::new(10)).unwrap();
    assert_eq!(c.total_pages(), 3);

    // Already on page 0.
    assert_eq!(c.go_to_page(-5), None);
    assert_eq!(c.current_page(), 0);

    let change = c.go_to_page(10_000).unwrap();
    assert_eq!(change.to, 2);
    assert_eq!(c.current_page(), 2);
    assert_eq!(c.current_items(), &[20, 21, 22, 23, 24]);

    c.go_to_page(-5).unwrap();
    assert_eq!(c.current_page(), 0);
    assert_eq!(c.current_items().len(), 10);
}

#[test]
fn page_cursor_randomized_clamping() {
    let mut rng = Lcg::new(42);
    for _ in 0..500 {
        let len = rng.gen_range_usize(0, 200);
        let size = rng.gen_range_usize(1, 30);
        let data: Vec<usize> = (0..len).collect();
        let mut c = PageCursor::new(data.as_slice(), PageCursorOptions::new(size)).unwrap();
        for _ in 0..10 {
            let target = rng.gen_range_i64(-1_000, 1_000);
            c.go_to_page(target);
            assert!(c.current_page() < c.total_pages());
            assert!(c.current_items().len() <= size);
        }
    }
}

#[test]
fn empty_dataset_has_one_empty_page() {
    let data: Vec<u8> = Vec::new();
    let mut c = PageCursor::new(data, PageCursorOptions::new(10)).unwrap();
    assert_eq!(c.total_pages(), 1);
    assert!(c.current_items().is_empty());
    assert!(!c.has_next());
    assert!(!c.has_prev());
    assert_eq!(c.next(), None);
    assert_eq!(c.open().prefetch, Vec::<usize>::new());
}

#[test]
fn page_cursor_rejects_zero_page_size() {
    let data = [1, 2, 3];
    let err = PageCursor::new(&data[..], PageCursorOptions::new(0)).unwrap_err();
    assert_eq!(err, ConfigError::ZeroPageSize);
}

#[test]
fn prefetch_marks_pages_on_scheduling() {
    let data: Vec<u32> = (0..100).collect();
    let mut c = PageCursor::new(&data, PageCursorOptions::new(10)).unwrap();

    let open = c.open();
    assert_eq!(open.from, None);
    assert_eq!(open.prefetch, vec![1]);

    let change = c.go_to_page(5).unwrap();
    assert_eq!(change.from, Some(0));
    assert_eq!(change.prefetch, vec![4, 6]);

    // Page 5 itself was materialized as the current page.
    let change = c.go_to_page(4).unwrap();
    assert_eq!(change.prefetch, vec![3]);

    // Going back schedules nothing new.
    let change = c.go_to_page(5).unwrap();
    assert!(change.prefetch.is_empty());
    assert!(c.state().is_prefetched(6));
}

#[test]
fn prefetch_distance_respects_bounds() {
    let data: Vec<u32> = (0..50).collect();
    let opts = PageCursorOptions::new(10).with_prefetch_distance(2);
    let mut c = PageCursor::new(&data, opts).unwrap();
    assert_eq!(c.open().prefetch, vec![1, 2]);
    let change = c.go_to_page(4).unwrap();
    assert_eq!(change.prefetch, vec![3]);
}

#[test]
fn next_prev_and_flags() {
    let data: Vec<u32> = (0..30).collect();
    let mut c = PageCursor::new(&data, PageCursorOptions::new(10)).unwrap();
    assert!(c.has_next());
    assert!(!c.has_prev());
    c.next().unwrap();
    c.next().unwrap();
    assert_eq!(c.current_page(), 2);
    assert!(!c.has_next());
    assert_eq!(c.next(), None);
    c.prev().unwrap();
    assert_eq!(c.current_page(), 1);
    assert_eq!(c.page(1).unwrap().items, &[10, 11, 12, 13, 14, 15, 16, 17, 18, 19]);
    assert!(c.page(3).is_none());
}

#[test]
fn reset_starts_a_new_session() {
    let a: Vec<u32> = (0..100).collect();
    let b: Vec<u32> = (0..15).collect();
    let mut c = PageCursor::new(a.as_slice(), PageCursorOptions::new(10)).unwrap();
    c.open();
    c.go_to_page(7);

    let change = c.reset(b.as_slice());
    assert_eq!(change.from, None);
    assert_eq!(change.to, 0);
    assert_eq!(change.prefetch, vec![1]);
    assert_eq!(c.total_pages(), 2);
    assert!(!c.state().is_prefetched(7));
}

#[test]
fn set_page_size_keeps_first_item_in_view() {
    let data: Vec<u32> = (0..100).collect();
    let mut c = PageCursor::new(&data, PageCursorOptions::new(10)).unwrap();
    c.go_to_page(5);
    assert_eq!(c.current_items()[0], 50);

    c.set_page_size(20).unwrap();
    assert_eq!(c.current_page(), 2);
    assert!(c.current_items().contains(&50));
    assert_eq!(c.set_page_size(0).unwrap_err(), ConfigError::ZeroPageSize);
}

#[test]
fn load_more_is_idempotent_while_in_flight() {
    let mut r = Revealer::new(Some(100), RevealOptions::new(10)).unwrap();
    let ticket = r.begin_load_more().unwrap();
    assert_eq!(ticket.range(), WindowRange { start: 0, end: 10 });
    assert!(r.is_loading_more());

    // A second trigger before the first resolves is dropped.
    assert_eq!(r.begin_load_more(), None);

    assert!(r.complete(&ticket, 10));
    assert_eq!(
        r.state(),
        RevealState {
            revealed_count: 10,
            is_loading_more: false
        }
    );
}

#[test]
fn reveal_stops_at_dataset_length() {
    let data: Vec<u32> = (0..25).collect();
    let mut r = Revealer::new(Some(data.len()), RevealOptions::new(10)).unwrap();
    for _ in 0..3 {
        let t = r.begin_load_more().unwrap();
        r.complete(&t, t.len());
    }
    assert_eq!(r.revealed_count(), 25);
    assert!(!r.has_more());
    assert_eq!(r.begin_load_more(), None);
    assert_eq!(r.visible_items(&data).len(), 25);
    assert_eq!(r.affordance(), LoadMoreAffordance::Hidden);
}

#[test]
fn reveal_failure_keeps_count_for_retry() {
    let mut r = Revealer::new(Some(50), RevealOptions::new(10).with_initial_count(10)).unwrap();
    assert_eq!(r.revealed_count(), 10);

    let t = r.begin_load_more().unwrap();
    assert_eq!(r.affordance(), LoadMoreAffordance::Loading);
    assert!(r.fail(&t));
    assert_eq!(r.revealed_count(), 10);
    assert!(!r.is_loading_more());
    assert_eq!(r.affordance(), LoadMoreAffordance::Retry);

    let t = r.begin_load_more().unwrap();
    assert_eq!(t.range(), WindowRange { start: 10, end: 20 });
    r.complete(&t, 10);
    assert_eq!(r.affordance(), LoadMoreAffordance::Button);
}

#[test]
fn reveal_randomized_monotonic() {
    let mut rng = Lcg::new(7);
    for _ in 0..200 {
        let total = rng.gen_range_usize(0, 300);
        let batch = rng.gen_range_usize(1, 40);
        let mut r = Revealer::new(Some(total), RevealOptions::new(batch)).unwrap();
        let mut ticket = None;
        let mut last = r.revealed_count();
        for _ in 0..100 {
            match rng.gen_range_u32(0, 5) {
                0 | 1 => {
                    if let Some(t) = r.begin_load_more() {
                        ticket = Some(t);
                    }
                }
                2 => {
                    if let Some(t) = ticket.take() {
                        let delivered = rng.gen_range_usize(0, t.len() + 5);
                        r.complete(&t, delivered);
                    }
                }
                3 => {
                    if let Some(t) = ticket.take() {
                        r.fail(&t);
                    }
                }
                _ => {
                    let _ = r.set_batch_size(rng.gen_range_usize(1, 40));
                }
            }
            assert!(r.revealed_count() >= last);
            assert!(r.revealed_count() <= total);
            last = r.revealed_count();
        }
    }
}

#[test]
fn stale_tickets_are_ignored_after_reset() {
    let mut r = Revealer::new(Some(100), RevealOptions::new(10)).unwrap();
    let t = r.begin_load_more().unwrap();
    r.reset(Some(40));
    assert!(!r.complete(&t, 10));
    assert_eq!(r.revealed_count(), 0);
    assert!(!r.is_loading_more());

    let t = r.begin_load_more().unwrap();
    r.dispose();
    assert!(!r.complete(&t, 10));
    assert!(!r.fail(&t));
    assert_eq!(r.begin_load_more(), None);
    assert_eq!(r.affordance(), LoadMoreAffordance::Hidden);
}

#[test]
fn streamed_reveal_ends_on_short_batch() {
    let mut r = Revealer::new(None, RevealOptions::new(10)).unwrap();
    let t = r.begin_load_more().unwrap();
    r.complete(&t, 10);
    assert!(r.has_more());

    let t = r.begin_load_more().unwrap();
    assert_eq!(t.range(), WindowRange { start: 10, end: 20 });
    r.complete(&t, 4);
    assert_eq!(r.revealed_count(), 14);
    assert!(!r.has_more());
    assert_eq!(r.begin_load_more(), None);
}

#[test]
fn set_total_never_drops_below_revealed() {
    let mut r = Revealer::new(None, RevealOptions::new(10)).unwrap();
    let t = r.begin_load_more().unwrap();
    r.complete(&t, 10);
    r.set_total(Some(5));
    assert_eq!(r.total(), Some(10));
    assert!(!r.has_more());
}

#[test]
fn reveal_loads_once_per_visibility_transition() {
    let mut trigger = VisibilityTrigger::new(VisibilityOptions::default()).unwrap();
    trigger.arm(1);
    let mut r = Revealer::new(Some(100), RevealOptions::new(10)).unwrap();

    let mut batches = 0;
    for ratio in [0.2, 0.5, 0.8, 1.0] {
        if let Some(tr) = trigger.observe_ratio(ratio) {
            if let Some(t) = r.on_visibility(tr) {
                batches += 1;
                r.complete(&t, t.len());
            }
        }
    }
    assert_eq!(batches, 1);

    let hidden = trigger.observe_ratio(0.0).unwrap();
    assert_eq!(r.on_visibility(hidden), None);
    let visible = trigger.observe_ratio(1.0).unwrap();
    assert!(r.on_visibility(visible).is_some());
}

#[test]
fn reveal_rejects_zero_batch() {
    assert_eq!(
        Revealer::new(Some(10), RevealOptions::new(0)).unwrap_err(),
        ConfigError::ZeroBatchSize
    );
}

#[test]
fn retry_exhausts_after_max_retries() {
    let mut s: RetryState<LoadError> = RetryState::new(RetryOptions::new(3));
    assert_eq!(s.status(), RetryStatus::Idle);
    assert!(s.start());

    let mut failed = 0;
    loop {
        assert_eq!(s.status(), RetryStatus::Running);
        s.fail(LoadError::transient("offline"));
        if s.status() == RetryStatus::Exhausted {
            break;
        }
        assert_eq!(s.status(), RetryStatus::Failed);
        failed += 1;
        assert!(s.retry());
    }
    assert_eq!(failed, 3);
    assert_eq!(s.attempt(), 3);
    assert_eq!(s.affordance(), RetryAffordance::Reload);

    // No further automatic or manual retry.
    assert!(!s.retry());
    assert!(!s.start());
    assert_eq!(s.status(), RetryStatus::Exhausted);

    s.reset();
    assert_eq!(s.status(), RetryStatus::Idle);
    assert_eq!(s.attempt(), 0);
    assert!(s.last_error().is_none());
}

#[test]
fn retry_is_noop_outside_failed() {
    let mut s: RetryState<&str> = RetryState::default();
    assert_eq!(s.max_retries(), 3);
    assert!(!s.retry());
    s.start();
    assert!(!s.retry());
    s.succeed();
    assert!(!s.retry());
    assert_eq!(s.status(), RetryStatus::Succeeded);
    assert_eq!(s.affordance(), RetryAffordance::None);
}

#[test]
fn retry_keeps_error_until_attempt_resolves() {
    let mut s = RetryState::new(RetryOptions::new(2));
    s.start();
    s.fail("boom");
    assert_eq!(s.affordance(), RetryAffordance::Retry);

    assert!(s.retry());
    assert_eq!(s.last_error(), Some(&"boom"));

    s.fail("bang");
    assert_eq!(s.last_error(), Some(&"bang"));

    s.retry();
    s.succeed();
    assert_eq!(s.last_error(), None);
}

#[test]
fn retry_pre_exhaust_for_terminal_errors() {
    let mut s = RetryState::new(RetryOptions::default());
    s.start();
    assert!(s.exhaust(LoadError::terminal("malformed")));
    assert!(s.is_exhausted());
    assert_eq!(s.attempt(), 3);
    assert!(!s.retry());
}

#[test]
fn zero_max_retries_exhausts_on_first_failure() {
    let mut s = RetryState::new(RetryOptions::new(0));
    s.start();
    s.fail(());
    assert!(s.is_exhausted());
}

#[test]
fn backoff_delays() {
    let b = Backoff::Exponential {
        initial_ms: 100,
        factor: 2.0,
        max_ms: 1_000,
    };
    let delays: Vec<u64> = (1..=5).map(|a| b.delay_for(a)).collect();
    assert_eq!(delays, vec![100, 200, 400, 800, 1_000]);
    assert_eq!(Backoff::None.delay_for(3), 0);
    assert_eq!(Backoff::Fixed { delay_ms: 250 }.delay_for(9), 250);

    let bad = Backoff::Exponential {
        initial_ms: 1,
        factor: 0.5,
        max_ms: 1,
    };
    assert_eq!(bad.validate(), Err(ConfigError::InvalidBackoffFactor(0.5)));

    let mut s: RetryState<()> =
        RetryState::new(RetryOptions::new(3).with_backoff(b).with_auto_retry(true));
    assert_eq!(s.next_delay_ms(), None);
    s.start();
    s.fail(());
    assert!(s.should_auto_retry());
    assert_eq!(s.next_delay_ms(), Some(100));
    s.retry();
    s.fail(());
    assert_eq!(s.next_delay_ms(), Some(200));
}

#[test]
fn policy_composes_slow_network_and_low_end_device() {
    let base = Policy {
        batch_size: 25,
        virtualization_threshold: 100,
        load_timeout_ms: 30_000,
        preload_critical_routes: true,
    };
    let derived = derive_policy(&slow_low_end_signals(), &base);
    assert_eq!(
        derived,
        Policy {
            batch_size: 10,
            virtualization_threshold: 50,
            load_timeout_ms: 60_000,
            preload_critical_routes: false,
        }
    );
}

#[test]
fn policy_unchanged_on_capable_device() {
    let base = Policy::default();
    assert_eq!(base.derive(&fast_signals()), base);
    assert_eq!(base.derive(&PolicySignals::default()), base);
}

#[test]
fn policy_slow_network_only() {
    let base = Policy::default();
    let signals = fast_signals().with_network(NetworkClass::FourG, 0.5);
    let p = base.derive(&signals);
    assert_eq!(p.batch_size, 10);
    assert_eq!(p.load_timeout_ms, 60_000);
    assert!(!p.preload_critical_routes);
    assert_eq!(p.virtualization_threshold, base.virtualization_threshold);

    let long = Policy {
        load_timeout_ms: 90_000,
        ..base
    };
    assert_eq!(long.derive(&signals).load_timeout_ms, 90_000);
}

#[test]
fn policy_low_end_device_only() {
    let base = Policy::default();
    let signals = PolicySignals {
        device_memory_gib: 2.0,
        ..fast_signals()
    };
    let p = base.derive(&signals);
    assert_eq!(p.virtualization_threshold, 50);
    assert_eq!(p.batch_size, 15);
    assert_eq!(p.load_timeout_ms, base.load_timeout_ms);
    assert!(p.preload_critical_routes);
}

#[test]
fn policy_overrides_merge_and_validate() {
    let base = Policy::default();
    let merged = base
        .merge(&PolicyOverrides {
            batch_size: Some(40),
            ..PolicyOverrides::default()
        })
        .unwrap();
    assert_eq!(merged.batch_size, 40);
    assert_eq!(merged.load_timeout_ms, base.load_timeout_ms);

    let err = base
        .merge(&PolicyOverrides {
            load_timeout_ms: Some(0),
            ..PolicyOverrides::default()
        })
        .unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidPolicy {
            field: "load_timeout_ms"
        }
    );
}

#[test]
fn network_class_labels() {
    assert_eq!(NetworkClass::parse("slow-2g"), NetworkClass::Slow2g);
    assert_eq!(NetworkClass::parse(" 2G "), NetworkClass::TwoG);
    assert_eq!(NetworkClass::parse("5g"), NetworkClass::Unknown);
    assert_eq!(NetworkClass::ThreeG.to_string(), "3g");
    assert!(NetworkClass::Slow2g.is_slow());
    assert!(!NetworkClass::ThreeG.is_slow());
}

#[test]
fn metrics_recorder_keeps_latest_samples() {
    let m = MetricsRecorder::new(3).unwrap();
    for d in [10, 20, 30, 40] {
        m.record(Sample::load(d));
    }
    m.record(Sample::paint(5));
    assert_eq!(m.len(), 3);

    let s = m.summary(SampleKind::LoadTime).unwrap();
    assert_eq!(s.count, 2);
    assert_eq!(s.max_ms, 40);
    assert_eq!(m.summary(SampleKind::PaintTime).unwrap().p95_ms, 5);
}

#[test]
fn metrics_summary_percentiles() {
    let m = MetricsRecorder::new(16).unwrap();
    for d in [20, 30, 40] {
        m.record(Sample::load(d));
    }
    let s = m.summary(SampleKind::LoadTime).unwrap();
    assert_eq!(s.count, 3);
    assert_eq!(s.mean_ms, 30.0);
    assert_eq!(s.p50_ms, 30);
    assert_eq!(s.p95_ms, 40);

    let tight = Policy {
        load_timeout_ms: 35,
        ..Policy::default()
    };
    assert!(m.exceeds_timeout(&tight));
    assert!(!m.exceeds_timeout(&Policy::default()));

    m.clear();
    assert!(m.summary(SampleKind::LoadTime).is_none());
    assert_eq!(MetricsRecorder::new(0).unwrap_err(), ConfigError::ZeroCapacity);
}

#[test]
fn load_error_retryability() {
    assert!(LoadError::transient("x").is_retryable());
    assert!(LoadError::TimedOut { after_ms: 10 }.is_retryable());
    assert!(!LoadError::terminal("bad json").is_retryable());
    assert!(!LoadError::Cancelled.is_retryable());
    assert_eq!(
        LoadError::TimedOut { after_ms: 500 }.to_string(),
        "load timed out after 500ms"
    );
}

#[cfg(feature = "serde")]
#[test]
fn signals_use_effective_type_labels() {
    let json = serde_json::to_string(&slow_low_end_signals()).unwrap();
    assert!(json.contains("\"network_class\":\"2g\""), "{json}");
    let back: PolicySignals = serde_json::from_str(&json).unwrap();
    assert_eq!(back, slow_low_end_signals());
}
