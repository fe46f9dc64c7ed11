use std::collections::VecDeque;
use std::future::Future;

use crate::error::RelayResult;
use crate::types::RawDocument;

/// Paged scan of a source of raw documents.
pub trait PagedSource: Send {
    /// Returns the next page, or `None` once the scan is exhausted.
    fn next_page(&mut self) -> impl Future<Output = RelayResult<Option<Vec<RawDocument>>>> + Send;
}

/// [`PagedSource`] serving pages held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecPagedSource {
    pages: VecDeque<Vec<RawDocument>>,
}

impl VecPagedSource {
    pub fn new(pages: Vec<Vec<RawDocument>>) -> Self {
        Self {
            pages: pages.into(),
        }
    }

    /// Splits `documents` into pages of `page_size` documents.
    pub fn paginated(documents: Vec<RawDocument>, page_size: usize) -> Self {
        let pages = documents
            .chunks(page_size.max(1))
            .map(<[RawDocument]>::to_vec)
            .collect();

        Self { pages }
    }
}

impl PagedSource for VecPagedSource {
    async fn next_page(&mut self) -> RelayResult<Option<Vec<RawDocument>>> {
        Ok(self.pages.pop_front())
    }
}
