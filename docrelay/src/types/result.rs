use tracing::warn;

use crate::error::RelayError;

/// Outcome of a single document in a batch stage.
///
/// Failures keep the document so that later stages can still route it, a failed item
/// never aborts the processing of its siblings.
#[derive(Debug, Clone)]
pub enum ItemResult<T> {
    Success(T),
    Failure { document: T, error: RelayError },
}

impl<T> ItemResult<T> {
    pub fn failure(document: T, error: RelayError) -> Self {
        ItemResult::Failure { document, error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemResult::Success(_))
    }

    pub fn document(&self) -> &T {
        match self {
            ItemResult::Success(document) | ItemResult::Failure { document, .. } => document,
        }
    }

    pub fn into_document(self) -> T {
        match self {
            ItemResult::Success(document) | ItemResult::Failure { document, .. } => document,
        }
    }

    pub fn error(&self) -> Option<&RelayError> {
        match self {
            ItemResult::Success(_) => None,
            ItemResult::Failure { error, .. } => Some(error),
        }
    }

    /// Converts into a [`Result`] which keeps the document on the error side.
    pub fn into_result(self) -> Result<T, (T, RelayError)> {
        match self {
            ItemResult::Success(document) => Ok(document),
            ItemResult::Failure { document, error } => Err((document, error)),
        }
    }
}

impl<T> From<Result<T, (T, RelayError)>> for ItemResult<T> {
    fn from(result: Result<T, (T, RelayError)>) -> Self {
        match result {
            Ok(document) => ItemResult::Success(document),
            Err((document, error)) => ItemResult::Failure { document, error },
        }
    }
}

/// Splits results into successful documents and failed documents with their errors,
/// preserving the relative order inside each side.
pub fn partition_results<T>(results: Vec<ItemResult<T>>) -> (Vec<T>, Vec<(T, RelayError)>) {
    let mut successes = Vec::with_capacity(results.len());
    let mut failures = Vec::new();

    for result in results {
        match result {
            ItemResult::Success(document) => successes.push(document),
            ItemResult::Failure { document, error } => failures.push((document, error)),
        }
    }

    (successes, failures)
}

/// Lines `results` up with the `documents` a stage was handed, one result per document.
///
/// Documents the stage returned no result for are failed with `missing()` rather than
/// dropped, results beyond the number of documents are discarded.
pub fn align_results<T>(
    documents: Vec<T>,
    results: Vec<ItemResult<T>>,
    missing: impl Fn() -> RelayError,
) -> Vec<ItemResult<T>> {
    if results.len() != documents.len() {
        warn!(
            documents = documents.len(),
            results = results.len(),
            "stage returned a result count different from the documents it was handed"
        );
    }

    let mut results = results.into_iter();
    documents
        .into_iter()
        .map(|document| {
            results
                .next()
                .unwrap_or_else(|| ItemResult::failure(document, missing()))
        })
        .collect()
}
