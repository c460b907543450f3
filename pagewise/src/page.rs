use std::collections::BTreeSet;

use crate::{ConfigError, Dataset, Page, PageCursorOptions, WindowRange};

/// The result of a page change: where the cursor moved and which neighbours to prefetch.
///
/// Pages listed in `prefetch` are already marked as prefetched; the caller hands them to its
/// loader without waiting on them.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageChange {
    /// `None` when the cursor was just opened or reset.
    pub from: Option<usize>,
    pub to: usize,
    pub prefetch: Vec<usize>,
}

/// Page navigation over a dataset of known length, without holding the data itself.
///
/// Async pagers use this directly; [`PageCursor`] pairs it with an in-memory [`Dataset`].
#[derive(Clone, Debug)]
pub struct PageState {
    options: PageCursorOptions,
    len: usize,
    current_page: usize,
    prefetched: BTreeSet<usize>,
}

impl PageState {
    pub fn new(len: usize, options: PageCursorOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        pdebug!(
            len,
            page_size = options.page_size,
            prefetch_distance = options.prefetch_distance,
            "PageState::new"
        );
        Ok(Self {
            options,
            len,
            current_page: 0,
            prefetched: BTreeSet::new(),
        })
    }

    pub fn options(&self) -> &PageCursorOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_size(&self) -> usize {
        self.options.page_size
    }

    /// Always at least 1: an empty dataset has a single empty page 0.
    pub fn total_pages(&self) -> usize {
        self.len.div_ceil(self.options.page_size).max(1)
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn has_next(&self) -> bool {
        self.current_page + 1 < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.current_page > 0
    }

    /// Index range covered by page `index` (empty past the end).
    pub fn page_range(&self, index: usize) -> WindowRange {
        let start = index.saturating_mul(self.options.page_size).min(self.len);
        let end = start.saturating_add(self.options.page_size).min(self.len);
        WindowRange::new(start, end)
    }

    pub fn current_range(&self) -> WindowRange {
        self.page_range(self.current_page)
    }

    pub fn clamp_page(&self, page: i64) -> usize {
        let last = self.total_pages() - 1;
        usize::try_from(page.max(0)).unwrap_or(usize::MAX).min(last)
    }

    pub fn is_prefetched(&self, page: usize) -> bool {
        self.prefetched.contains(&page)
    }

    pub fn prefetched(&self) -> impl Iterator<Item = usize> + '_ {
        self.prefetched.iter().copied()
    }

    /// Materializes the current page and schedules its neighbours.
    ///
    /// Call once after construction or reset; page moves schedule on their own.
    pub fn open(&mut self) -> PageChange {
        let prefetch = self.schedule_around_current();
        PageChange {
            from: None,
            to: self.current_page,
            prefetch,
        }
    }

    /// Moves to `page`, saturating into `[0, total_pages - 1]`.
    ///
    /// Returns `None` when the clamped page equals the current page.
    pub fn go_to_page(&mut self, page: i64) -> Option<PageChange> {
        let to = self.clamp_page(page);
        if to == self.current_page {
            ptrace!(requested = page, to, "go_to_page: unchanged");
            return None;
        }
        let from = self.current_page;
        self.current_page = to;
        let prefetch = self.schedule_around_current();
        pdebug!(from, to, ?prefetch, "go_to_page");
        Some(PageChange {
            from: Some(from),
            to,
            prefetch,
        })
    }

    pub fn next(&mut self) -> Option<PageChange> {
        let next = (self.current_page as i64).saturating_add(1);
        self.go_to_page(next)
    }

    pub fn prev(&mut self) -> Option<PageChange> {
        let prev = (self.current_page as i64).saturating_sub(1);
        self.go_to_page(prev)
    }

    /// Starts a new list session over a dataset of `len` items.
    pub fn reset(&mut self, len: usize) -> PageChange {
        pdebug!(len, "PageState::reset");
        self.len = len;
        self.current_page = 0;
        self.prefetched.clear();
        self.open()
    }

    /// Changes the page size, keeping the first item of the current page on screen.
    ///
    /// Prefetch bookkeeping is cleared since page indexes change meaning.
    pub fn set_page_size(&mut self, page_size: usize) -> Result<PageChange, ConfigError> {
        let next = PageCursorOptions {
            page_size,
            ..self.options
        };
        next.validate()?;
        let first_item = self.current_range().start;
        self.options = next;
        self.current_page = self.clamp_page((first_item / page_size) as i64);
        self.prefetched.clear();
        Ok(self.open())
    }

    pub fn set_prefetch_distance(&mut self, prefetch_distance: usize) {
        self.options.prefetch_distance = prefetch_distance;
    }

    // The current page counts as materialized so stepping back to it never re-prefetches.
    fn schedule_around_current(&mut self) -> Vec<usize> {
        let current = self.current_page;
        self.prefetched.insert(current);

        let distance = self.options.prefetch_distance;
        let first = current.saturating_sub(distance);
        let last = current
            .saturating_add(distance)
            .min(self.total_pages() - 1);

        let mut scheduled = Vec::new();
        for page in first..=last {
            if self.prefetched.insert(page) {
                scheduled.push(page);
            }
        }
        scheduled
    }
}

/// Page navigation over an in-memory [`Dataset`].
#[derive(Clone, Debug)]
pub struct PageCursor<D> {
    dataset: D,
    state: PageState,
}

impl<D: Dataset> PageCursor<D> {
    pub fn new(dataset: D, options: PageCursorOptions) -> Result<Self, ConfigError> {
        let state = PageState::new(dataset.len(), options)?;
        Ok(Self { dataset, state })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn total_pages(&self) -> usize {
        self.state.total_pages()
    }

    pub fn current_page(&self) -> usize {
        self.state.current_page()
    }

    pub fn has_next(&self) -> bool {
        self.state.has_next()
    }

    pub fn has_prev(&self) -> bool {
        self.state.has_prev()
    }

    pub fn current_items(&self) -> &[D::Item] {
        self.dataset.slice(self.state.current_range().as_range())
    }

    pub fn page(&self, index: usize) -> Option<Page<&[D::Item]>> {
        if index >= self.total_pages() {
            return None;
        }
        Some(Page {
            index,
            items: self.dataset.slice(self.state.page_range(index).as_range()),
        })
    }

    pub fn current(&self) -> Page<&[D::Item]> {
        Page {
            index: self.current_page(),
            items: self.current_items(),
        }
    }

    pub fn open(&mut self) -> PageChange {
        self.state.open()
    }

    pub fn go_to_page(&mut self, page: i64) -> Option<PageChange> {
        self.state.go_to_page(page)
    }

    pub fn next(&mut self) -> Option<PageChange> {
        self.state.next()
    }

    pub fn prev(&mut self) -> Option<PageChange> {
        self.state.prev()
    }

    pub fn set_page_size(&mut self, page_size: usize) -> Result<PageChange, ConfigError> {
        self.state.set_page_size(page_size)
    }

    /// Swaps in a new dataset (identity change) and starts over at page 0.
    pub fn reset(&mut self, dataset: D) -> PageChange {
        let len = dataset.len();
        self.dataset = dataset;
        self.state.reset(len)
    }

    pub fn into_dataset(self) -> D {
        self.dataset
    }
}
