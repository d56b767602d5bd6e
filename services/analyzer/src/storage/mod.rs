//! Persistence interfaces for correlation and merge
//!
//! The analyzer core owns no durable storage. Everything it needs from the
//! host system fits behind two narrow traits: template definitions come from
//! [`TemplateRepository`], and lab-result rows are found, loaded, and saved
//! through [`LabResultRepository`]. The host keeps its outpatient and
//! inpatient results in separate tables, which is why every row handle
//! carries a [`ResultSource`].
//!
//! Correlation is on the ingest hot path. Implementations MUST back
//! `find_pending_by_sample_id` with an index on the document's `sample_no`
//! (spanning both tables); a row-by-row scan of the result tables does not
//! survive production volume.

use async_trait::async_trait;
use labwire_types::{TemplateData, TemplateStructure};

mod memory;
pub use memory::MemoryLabStore;

/// Storage backend errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("lab result {0:?} not found")]
    NotFound(LabResultRef),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Which lab-result table a row lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultSource {
    Outpatient,
    Inpatient,
}

/// Opaque handle to one lab-result row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LabResultRef {
    pub id: u64,
    pub source: ResultSource,
}

/// A lab-result row as the analyzer core sees it.
#[derive(Debug, Clone)]
pub struct StoredLabResult {
    pub template_id: u64,
    pub template_data: TemplateData,
}

/// Read access to result-template definitions.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn get(&self, template_id: u64) -> Option<TemplateStructure>;
}

/// The lab-result rows this core correlates against and writes into.
#[async_trait]
pub trait LabResultRepository: Send + Sync {
    /// Find the pending lab result whose document carries this sample
    /// number. Comparison is on the trimmed value, case-sensitive, with the
    /// outpatient table consulted before the inpatient one.
    async fn find_pending_by_sample_id(&self, sample_id: &str) -> Option<LabResultRef>;

    /// Load a row's template binding and current document.
    async fn load(&self, result_ref: &LabResultRef) -> Option<StoredLabResult>;

    /// Persist a merged document. On error the write must leave the stored
    /// row unchanged.
    async fn save(&self, result_ref: &LabResultRef, data: TemplateData) -> Result<(), StorageError>;
}
