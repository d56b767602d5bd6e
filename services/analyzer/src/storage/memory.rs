//! In-memory lab-result store
//!
//! Backs the integration tests and the standalone binary. Rows hold their
//! document as serialized JSON, the same shape the host system's JSON
//! columns hold, so the repository traits are exercised end to end including
//! the serialization boundary. A `sample_no` index spans both tables.

use super::{
    LabResultRef, LabResultRepository, ResultSource, StorageError, StoredLabResult,
    TemplateRepository,
};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use dashmap::DashMap;
use labwire_types::{format_sample_no, sample_no_sequence, TemplateData, TemplateStructure};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

struct StoredRow {
    template_id: u64,
    /// Serialized `TemplateData`; `None` until a sample number is issued.
    document: Option<String>,
}

/// In-process implementation of both repository traits.
#[derive(Default)]
pub struct MemoryLabStore {
    templates: DashMap<u64, TemplateStructure>,
    outpatient: DashMap<u64, StoredRow>,
    inpatient: DashMap<u64, StoredRow>,
    /// Trimmed sample_no -> row handle, spanning both tables.
    sample_index: DashMap<String, LabResultRef>,
    next_id: AtomicU64,
}

impl MemoryLabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template definition, returning its id.
    pub fn add_template(&self, structure: TemplateStructure) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.templates.insert(id, structure);
        id
    }

    /// Create a lab-result row with no document yet, as order entry does.
    pub fn create_pending(&self, source: ResultSource, template_id: u64) -> LabResultRef {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.table(source).insert(
            id,
            StoredRow {
                template_id,
                document: None,
            },
        );
        LabResultRef { id, source }
    }

    /// Issue the next sequential sample number for the current month and
    /// stamp it into the row's document.
    ///
    /// The sequence spans both tables: if the outpatient table holds
    /// `251100001`, the next inpatient issuance gets `251100002`, so a
    /// number can never be issued twice regardless of source.
    pub fn issue_sample_no(&self, result_ref: &LabResultRef) -> Result<String, StorageError> {
        let now = Utc::now();
        let prefix = format!("{:02}{:02}", now.year() % 100, now.month());

        let max_seq = self
            .sample_index
            .iter()
            .filter_map(|entry| sample_no_sequence(entry.key(), &prefix))
            .max()
            .unwrap_or(0);
        let sample_no = format_sample_no(&prefix, max_seq + 1);

        let table = self.table(result_ref.source);
        let mut row = table
            .get_mut(&result_ref.id)
            .ok_or_else(|| StorageError::NotFound(result_ref.clone()))?;

        let mut data = match &row.document {
            Some(json) => serde_json::from_str::<TemplateData>(json)
                .map_err(|e| StorageError::Backend(e.to_string()))?,
            None => TemplateData::default(),
        };
        data.sample_no = sample_no.clone();
        row.document =
            Some(serde_json::to_string(&data).map_err(|e| StorageError::Backend(e.to_string()))?);
        drop(row);

        self.sample_index
            .insert(sample_no.clone(), result_ref.clone());
        debug!(%sample_no, ?result_ref, "issued sample number");
        Ok(sample_no)
    }

    fn table(&self, source: ResultSource) -> &DashMap<u64, StoredRow> {
        match source {
            ResultSource::Outpatient => &self.outpatient,
            ResultSource::Inpatient => &self.inpatient,
        }
    }
}

#[async_trait]
impl TemplateRepository for MemoryLabStore {
    async fn get(&self, template_id: u64) -> Option<TemplateStructure> {
        self.templates
            .get(&template_id)
            .map(|entry| entry.value().clone())
    }
}

#[async_trait]
impl LabResultRepository for MemoryLabStore {
    async fn find_pending_by_sample_id(&self, sample_id: &str) -> Option<LabResultRef> {
        self.sample_index
            .get(sample_id.trim())
            .map(|entry| entry.value().clone())
    }

    async fn load(&self, result_ref: &LabResultRef) -> Option<StoredLabResult> {
        let table = self.table(result_ref.source);
        let row = table.get(&result_ref.id)?;
        let template_data = match &row.document {
            Some(json) => serde_json::from_str(json).ok()?,
            None => TemplateData::default(),
        };
        Some(StoredLabResult {
            template_id: row.template_id,
            template_data,
        })
    }

    async fn save(
        &self,
        result_ref: &LabResultRef,
        data: TemplateData,
    ) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(&data).map_err(|e| StorageError::Backend(e.to_string()))?;
        let table = self.table(result_ref.source);
        let mut row = table
            .get_mut(&result_ref.id)
            .ok_or_else(|| StorageError::NotFound(result_ref.clone()))?;
        row.document = Some(json);
        drop(row);

        let sample_no = data.sample_no.trim();
        if !sample_no.is_empty() {
            self.sample_index
                .insert(sample_no.to_string(), result_ref.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sample_sequence_spans_both_tables() {
        let store = MemoryLabStore::new();
        let template_id = store.add_template(TemplateStructure::default());

        let opd = store.create_pending(ResultSource::Outpatient, template_id);
        let ipd = store.create_pending(ResultSource::Inpatient, template_id);

        let first = store.issue_sample_no(&opd).unwrap();
        let second = store.issue_sample_no(&ipd).unwrap();

        let prefix = &first[..4];
        assert_eq!(sample_no_sequence(&first, prefix), Some(1));
        assert_eq!(sample_no_sequence(&second, prefix), Some(2));
    }

    #[tokio::test]
    async fn correlation_is_exact_on_the_trimmed_value() {
        let store = MemoryLabStore::new();
        let template_id = store.add_template(TemplateStructure::default());
        let pending = store.create_pending(ResultSource::Outpatient, template_id);
        let sample_no = store.issue_sample_no(&pending).unwrap();

        let found = store
            .find_pending_by_sample_id(&format!(" {sample_no} "))
            .await;
        assert_eq!(found, Some(pending));

        assert_eq!(store.find_pending_by_sample_id("999999999").await, None);
    }

    #[tokio::test]
    async fn save_then_load_round_trips_the_document() {
        let store = MemoryLabStore::new();
        let template_id = store.add_template(TemplateStructure::default());
        let pending = store.create_pending(ResultSource::Inpatient, template_id);
        let sample_no = store.issue_sample_no(&pending).unwrap();

        let mut data = store.load(&pending).await.unwrap().template_data;
        data.field_values
            .insert("WBC".to_string(), labwire_types::FieldValue::Number(4.79));
        store.save(&pending, data).await.unwrap();

        let loaded = store.load(&pending).await.unwrap().template_data;
        assert_eq!(
            loaded.field_values["WBC"],
            labwire_types::FieldValue::Number(4.79)
        );
        assert_eq!(loaded.sample_no, sample_no);
    }

    #[tokio::test]
    async fn save_against_a_missing_row_fails() {
        let store = MemoryLabStore::new();
        let bogus = LabResultRef {
            id: 42,
            source: ResultSource::Outpatient,
        };
        let err = store.save(&bogus, TemplateData::default()).await;
        assert!(matches!(err, Err(StorageError::NotFound(_))));
    }
}
