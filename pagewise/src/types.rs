use std::ops::Range;

/// A half-open index range of a dataset that is eligible for rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowRange {
    pub start: usize,
    pub end: usize, // exclusive
}

impl WindowRange {
    pub const EMPTY: Self = Self { start: 0, end: 0 };

    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl From<WindowRange> for Range<usize> {
    fn from(r: WindowRange) -> Self {
        r.as_range()
    }
}

/// A page of items. The core hands out borrowed slices; async drivers hand out owned `Vec`s.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<Items> {
    pub index: usize,
    pub items: Items,
}

/// The observable state of a progressive reveal session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevealState {
    pub revealed_count: usize,
    pub is_loading_more: bool,
}

/// A one-dimensional extent on the scroll axis, used for visibility geometry.
///
/// Coordinates are signed so boundaries above the root (negative offsets) can be expressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    pub start: i64,
    pub end: i64, // exclusive
}

impl Span {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn len(&self) -> u64 {
        self.end.abs_diff(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Grows the span by `margin` on both sides. A negative margin shrinks it, never past empty.
    pub fn expand(&self, margin: i64) -> Self {
        let start = self.start.saturating_sub(margin);
        let end = self.end.saturating_add(margin);
        if end < start {
            let mid = self.start.saturating_add(self.end) / 2;
            return Self {
                start: mid,
                end: mid,
            };
        }
        Self { start, end }
    }
}

/// Viewport geometry reported by the host for fixed-height rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub scroll_offset: u64,
    pub container_height: u32,
    pub item_height: u32,
}

impl Viewport {
    pub fn new(scroll_offset: u64, container_height: u32, item_height: u32) -> Self {
        Self {
            scroll_offset,
            container_height,
            item_height,
        }
    }
}
