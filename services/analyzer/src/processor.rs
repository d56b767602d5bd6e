//! Transmission processing pipeline
//!
//! Drives parse → extract → map → correlate → merge → save for each decoded
//! frame. This is the only place the gateway touches durable storage.

use crate::mapper::map_to_template;
use crate::storage::{LabResultRepository, TemplateRepository};
use crate::{AnalyzerError, AnalyzerResult};
use dashmap::DashMap;
use labwire_codec::{extract_results, parse_frame};
use labwire_types::ExtractedResult;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Processes decoded frames against the lab-result store.
pub struct ResultProcessor {
    templates: Arc<dyn TemplateRepository>,
    results: Arc<dyn LabResultRepository>,
    /// One async lock per sample ID. The store only guarantees
    /// last-commit-wins, so two near-simultaneous transmissions for the same
    /// sample must not interleave their load and save; distinct samples
    /// proceed in parallel. Entries live for the process lifetime.
    sample_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ResultProcessor {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        results: Arc<dyn LabResultRepository>,
    ) -> Self {
        Self {
            templates,
            results,
            sample_locks: DashMap::new(),
        }
    }

    /// Process one decoded frame.
    ///
    /// Returns `Ok(true)` when a lab-result document was updated and
    /// `Ok(false)` when the transmission was discarded (nothing parsed, or
    /// no sample ID; both are normal traffic, not errors). Correlation and
    /// persistence failures are errors: the caller must not acknowledge the
    /// frame.
    pub async fn process_frame(&self, frame: &[u8]) -> AnalyzerResult<bool> {
        let records = parse_frame(frame);
        if records.is_empty() {
            warn!(bytes = frame.len(), "no records parsed from frame");
            return Ok(false);
        }
        debug!(records = records.len(), "parsed transmission");

        let extracted = extract_results(&records);
        if !extracted.has_sample_id() {
            warn!("transmission carries no sample ID, discarding");
            return Ok(false);
        }

        let sample_id = extracted.sample_id.trim().to_string();
        self.apply(&sample_id, &extracted).await?;
        Ok(true)
    }

    /// Correlate and merge one transmission under its per-sample lock.
    async fn apply(&self, sample_id: &str, extracted: &ExtractedResult) -> AnalyzerResult<()> {
        let lock = self
            .sample_locks
            .entry(sample_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let result_ref = self
            .results
            .find_pending_by_sample_id(sample_id)
            .await
            .ok_or_else(|| AnalyzerError::Correlation(sample_id.to_string()))?;
        info!(sample_id, source = ?result_ref.source, row = result_ref.id, "correlated transmission");

        let stored = self
            .results
            .load(&result_ref)
            .await
            .ok_or_else(|| AnalyzerError::Correlation(sample_id.to_string()))?;

        let Some(template) = self.templates.get(stored.template_id).await else {
            warn!(
                template_id = stored.template_id,
                sample_id, "lab result references a missing template"
            );
            return Err(AnalyzerError::Correlation(sample_id.to_string()));
        };

        let mapped = map_to_template(extracted, &template);
        let mut document = stored.template_data;
        document.merge_from(mapped);
        self.results.save(&result_ref, document).await?;

        info!(sample_id, "lab result updated with analyzer data");
        Ok(())
    }
}
