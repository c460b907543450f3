use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use pagewise::{Dataset, LoadError};

/// Errors reported by a [`DataSource`].
pub type SourceError = LoadError;

/// An async, index-addressed source of items (a paginated endpoint, a streamed query, ...).
///
/// `fetch` may return fewer items than requested; for sources without a known length a short
/// batch marks the end of the data.
#[async_trait]
pub trait DataSource: Send + Sync {
    type Item: Send + 'static;

    /// Total item count, or `None` for streamed sources.
    fn len(&self) -> Option<usize>;

    async fn fetch(&self, range: Range<usize>) -> Result<Vec<Self::Item>, SourceError>;

    async fn fetch_page(
        &self,
        index: usize,
        page_size: usize,
    ) -> Result<Vec<Self::Item>, SourceError> {
        let start = index.saturating_mul(page_size);
        self.fetch(start..start.saturating_add(page_size)).await
    }
}

#[async_trait]
impl<S: DataSource + ?Sized> DataSource for Arc<S> {
    type Item = S::Item;

    fn len(&self) -> Option<usize> {
        (**self).len()
    }

    async fn fetch(&self, range: Range<usize>) -> Result<Vec<Self::Item>, SourceError> {
        (**self).fetch(range).await
    }
}

/// A bounded source over items already in memory. Fetches never fail.
#[derive(Clone, Debug)]
pub struct MemorySource<T> {
    items: Arc<[T]>,
}

impl<T> MemorySource<T> {
    pub fn new(items: impl Into<Arc<[T]>>) -> Self {
        Self {
            items: items.into(),
        }
    }

    pub fn items(&self) -> &Arc<[T]> {
        &self.items
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> DataSource for MemorySource<T> {
    type Item = T;

    fn len(&self) -> Option<usize> {
        Some(Dataset::len(&self.items))
    }

    async fn fetch(&self, range: Range<usize>) -> Result<Vec<T>, SourceError> {
        Ok(self.items.slice(range).to_vec())
    }
}
