use std::ops::Range;
use std::sync::Arc;

/// An ordered, bounded, in-memory collection the engine derives views from.
///
/// The engine never mutates a dataset. Out-of-bounds ranges are clamped.
pub trait Dataset {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slice(&self, range: Range<usize>) -> &[Self::Item];
}

fn clamp_slice<T>(items: &[T], range: Range<usize>) -> &[T] {
    let end = range.end.min(items.len());
    let start = range.start.min(end);
    &items[start..end]
}

impl<T> Dataset for [T] {
    type Item = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn slice(&self, range: Range<usize>) -> &[T] {
        clamp_slice(self, range)
    }
}

impl<T> Dataset for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn slice(&self, range: Range<usize>) -> &[T] {
        clamp_slice(self.as_slice(), range)
    }
}

impl<T> Dataset for Arc<[T]> {
    type Item = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn slice(&self, range: Range<usize>) -> &[T] {
        let items: &[T] = self;
        clamp_slice(items, range)
    }
}

impl<D: Dataset + ?Sized> Dataset for &D {
    type Item = D::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn slice(&self, range: Range<usize>) -> &[Self::Item] {
        (**self).slice(range)
    }
}
