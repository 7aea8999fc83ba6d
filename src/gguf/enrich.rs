//! GGUF enrichment of scraped models
//!
//! A model qualifies when its repository lists at least one `.gguf` file.
//! One representative file is parsed and its metadata merged into the
//! model's record. Extraction failures still mark the model as GGUF.

use super::metadata::ModelMetadataRecord;
use super::parser::ExtractionClient;
use crate::hub::{Hub, HubBackend};
use crate::models::ModelRecord;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const GGUF_EXTENSION: &str = ".gguf";

/// Quantization tiers tried in order when choosing a file to parse
pub const QUANT_PREFERENCE: &[&str] = &["q4_k_m", "q4_k_s", "q5_k_m", "q5_k_s", "q4_0", "q5_0"];

/// Result of enriching one candidate model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// No `.gguf` files in the listing
    NotGguf,
    /// Metadata extracted and merged
    Enriched,
    /// GGUF files present but extraction failed
    DetectedUnparsed,
}

impl EnrichmentOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotGguf => "not_gguf",
            Self::Enriched => "enriched",
            Self::DetectedUnparsed => "detected_unparsed",
        }
    }
}

/// Case-insensitive `.gguf` extension check
pub fn is_gguf_file(filename: &str) -> bool {
    filename.to_lowercase().ends_with(GGUF_EXTENSION)
}

/// The `.gguf` files of a listing, in listing order
pub fn gguf_files(files: &[String]) -> Vec<String> {
    files.iter().filter(|f| is_gguf_file(f)).cloned().collect()
}

/// Choose the file to parse from a list of quantization variants
///
/// Tiers are scanned in preference order, files in listing order within a
/// tier. Without any tier match the first file wins.
pub fn pick_representative_file(files: &[String]) -> Option<&str> {
    for tier in QUANT_PREFERENCE {
        if let Some(file) = files.iter().find(|f| f.to_lowercase().contains(tier)) {
            return Some(file);
        }
    }
    files.first().map(String::as_str)
}

/// Merge an extraction result into a record
pub fn merge_metadata(
    record: &mut ModelRecord,
    gguf_file: &str,
    metadata: Option<&ModelMetadataRecord>,
) -> EnrichmentOutcome {
    record.is_gguf = true;
    record.gguf_file = Some(gguf_file.to_string());

    let Some(metadata) = metadata else {
        return EnrichmentOutcome::DetectedUnparsed;
    };

    record.quantization = metadata.quantization.clone();
    record.gguf_architecture = metadata.architecture.clone();
    record.context_length = metadata.context_length;
    record.parameter_count = metadata.parameters;
    record.vram_required_gb = metadata.vram_required_gb;
    record.bits_per_weight = metadata.bits_per_weight;

    EnrichmentOutcome::Enriched
}

/// Enrichment pipeline around an [`ExtractionClient`]
pub struct Enricher {
    client: Arc<ExtractionClient>,
}

impl Enricher {
    pub fn new(client: Arc<ExtractionClient>) -> Self {
        Self { client }
    }

    /// Fetch the repository listing from `hub`, then enrich
    ///
    /// A failed listing counts as an empty one.
    pub async fn enrich(
        &self,
        record: &mut ModelRecord,
        hub: &dyn Hub,
        repo_id: &str,
    ) -> EnrichmentOutcome {
        let files = match hub.list_files(repo_id).await {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(
                    source = %hub.backend(),
                    repo = %repo_id,
                    error = %e,
                    "Failed to list repository files"
                );
                Vec::new()
            }
        };

        self.enrich_with_files(record, hub.backend(), repo_id, &files)
            .await
    }

    /// Enrich a record given its repository's filenames
    pub async fn enrich_with_files(
        &self,
        record: &mut ModelRecord,
        backend: HubBackend,
        repo_id: &str,
        files: &[String],
    ) -> EnrichmentOutcome {
        let candidates = gguf_files(files);
        let Some(gguf_file) = pick_representative_file(&candidates) else {
            tracing::debug!(source = %backend, repo = %repo_id, "No GGUF files in listing");
            return self.finish(EnrichmentOutcome::NotGguf);
        };

        tracing::info!(
            source = %backend,
            repo = %repo_id,
            file = %gguf_file,
            candidates = candidates.len(),
            "Parsing GGUF metadata"
        );

        let metadata = self
            .client
            .extract_from_remote(backend, repo_id, gguf_file, self.client.max_attempts())
            .await;

        let outcome = merge_metadata(record, gguf_file, metadata.as_ref());
        if outcome == EnrichmentOutcome::DetectedUnparsed {
            tracing::warn!(
                source = %backend,
                repo = %repo_id,
                file = %gguf_file,
                "GGUF metadata unavailable, keeping model without details"
            );
        }

        self.finish(outcome)
    }

    fn finish(&self, outcome: EnrichmentOutcome) -> EnrichmentOutcome {
        crate::metrics::record_enrichment(outcome.as_str());
        outcome
    }
}
