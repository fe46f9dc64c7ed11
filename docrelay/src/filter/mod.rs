//! Predicates deciding which decoded documents continue through the pipeline.
//!
//! Filtered out documents are intentionally excluded, they are neither errors nor tracked.

use std::collections::HashSet;
use std::sync::Arc;

/// A pure predicate over documents of type `T`.
pub trait Filter<T>: Send + Sync {
    /// Returns `true` if the document must be kept.
    fn keep(&self, document: &T) -> bool;
}

impl<T, F> Filter<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn keep(&self, document: &T) -> bool {
        self(document)
    }
}

/// Keeps every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl<T> Filter<T> for KeepAll {
    fn keep(&self, _document: &T) -> bool {
        true
    }
}

/// Keeps a document only if every inner filter keeps it.
pub struct AllOf<T> {
    filters: Vec<Arc<dyn Filter<T>>>,
}

impl<T> AllOf<T> {
    pub fn new(filters: Vec<Arc<dyn Filter<T>>>) -> Self {
        Self { filters }
    }
}

impl<T> Filter<T> for AllOf<T> {
    fn keep(&self, document: &T) -> bool {
        self.filters.iter().all(|filter| filter.keep(document))
    }
}

/// Drops documents whose identity, as returned by `identity`, belongs to `excluded`.
///
/// Used to keep internal test identities out of downstream systems.
pub fn exclude_identities<T, F>(excluded: HashSet<String>, identity: F) -> impl Filter<T>
where
    F: Fn(&T) -> &str + Send + Sync,
{
    move |document: &T| !excluded.contains(identity(document))
}

/// Applies `filter` to `documents`, returning the kept documents and the number dropped.
pub fn filter_batch<T, F>(filter: &F, documents: Vec<T>) -> (Vec<T>, usize)
where
    F: Filter<T> + ?Sized,
{
    let total = documents.len();
    let kept: Vec<T> = documents
        .into_iter()
        .filter(|document| filter.keep(document))
        .collect();
    let dropped = total - kept.len();

    (kept, dropped)
}
