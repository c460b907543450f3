use crate::{Policy, Viewport, WindowRange};

/// Maps a scroll position over fixed-height rows to the range of rows that must be rendered.
///
/// - `start = floor(scroll_offset / item_height)`, clamped to `[0, item_count)`
/// - `end = min(item_count, start + ceil(container_height / item_height) + 1)`
///
/// The extra row covers a partially visible trailing row. A zero `item_height` or an empty
/// dataset yields an empty range instead of an error.
pub fn compute_window(
    scroll_offset: u64,
    item_height: u32,
    container_height: u32,
    item_count: usize,
) -> WindowRange {
    if item_height == 0 || item_count == 0 {
        return WindowRange::EMPTY;
    }
    let h = item_height as u64;
    let start = usize::try_from(scroll_offset / h)
        .unwrap_or(usize::MAX)
        .min(item_count - 1);
    let rows = (container_height as u64).div_ceil(h).saturating_add(1);
    let rows = usize::try_from(rows).unwrap_or(usize::MAX);
    let end = start.saturating_add(rows).min(item_count);
    ptrace!(scroll_offset, item_height, container_height, item_count, start, end, "compute_window");
    WindowRange { start, end }
}

/// Height of the scroll spacer that stands in for every row.
pub fn total_extent(item_count: usize, item_height: u32) -> u64 {
    (item_count as u64).saturating_mul(item_height as u64)
}

/// Offset at which the first rendered row must be positioned.
pub fn offset_for_start(start: usize, item_height: u32) -> u64 {
    (start as u64).saturating_mul(item_height as u64)
}

/// One scroll tick's worth of window geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window {
    pub range: WindowRange,
    pub item_height: u32,
    pub item_count: usize,
}

impl Window {
    pub fn compute(viewport: Viewport, item_count: usize) -> Self {
        Self {
            range: compute_window(
                viewport.scroll_offset,
                viewport.item_height,
                viewport.container_height,
                item_count,
            ),
            item_height: viewport.item_height,
            item_count,
        }
    }

    pub fn total_extent(&self) -> u64 {
        total_extent(self.item_count, self.item_height)
    }

    pub fn offset_for_start(&self) -> u64 {
        offset_for_start(self.range.start, self.item_height)
    }

    /// Offset of `index` relative to the top of the rendered slice.
    pub fn offset_in_slice(&self, index: usize) -> u64 {
        offset_for_start(index.saturating_sub(self.range.start), self.item_height)
    }

    pub fn for_each_index(&self, f: impl FnMut(usize)) {
        self.range.as_range().for_each(f);
    }
}

/// How a loaded set should be rendered on this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RenderPlan {
    /// Small enough to render every loaded item.
    Full { len: usize },
    /// Above the virtualization threshold: render only the window.
    Windowed(Window),
}

impl RenderPlan {
    pub fn range(&self) -> WindowRange {
        match self {
            Self::Full { len } => WindowRange::new(0, *len),
            Self::Windowed(w) => w.range,
        }
    }

    pub fn is_windowed(&self) -> bool {
        matches!(self, Self::Windowed(_))
    }

    pub fn for_each_index(&self, f: impl FnMut(usize)) {
        self.range().as_range().for_each(f);
    }
}

/// Decides between full and windowed rendering for `loaded_len` materialized items.
///
/// Windowing kicks in once the loaded set exceeds `policy.virtualization_threshold`.
pub fn plan_render(loaded_len: usize, policy: &Policy, viewport: Viewport) -> RenderPlan {
    if loaded_len <= policy.virtualization_threshold {
        return RenderPlan::Full { len: loaded_len };
    }
    RenderPlan::Windowed(Window::compute(viewport, loaded_len))
}
