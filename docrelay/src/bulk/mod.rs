//! Full-scan replication of a source with a global ordering requirement.

mod importer;
mod source;

pub use importer::{ImportSummary, OrderedBulkImporter};
pub use source::{PagedSource, VecPagedSource};
