//! GGUF metadata normalization
//!
//! Turns the JSON document printed by `gguf-parser --json` into a
//! [`ModelMetadataRecord`]. Only a handful of paths are read; everything else
//! in the tool's output is ignored.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Normalized metadata for one GGUF file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelMetadataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,

    /// Detailed file type label (e.g. "Q4_K_M")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<u64>,

    /// Human readable parameter count ("6.7B", "500M", "999")
    pub parameters_display: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_length: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size_gb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits_per_weight: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vram_required_gb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_required_gb: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    pub flash_attention: bool,
    pub fully_offloadable: bool,
}

/// Raw gguf-parser output (partial)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawToolOutput {
    metadata: Option<RawMetadata>,
    architecture: Option<RawArchitecture>,
    estimate: Option<RawEstimate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawMetadata {
    architecture: Option<String>,
    file_type_detail: Option<String>,
    parameters: Option<u64>,
    file_size: Option<u64>,
    bits_per_weight: Option<f64>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawArchitecture {
    architecture: Option<String>,
    maximum_context_length: Option<u64>,
    embedding_length: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEstimate {
    flash_attention: Option<bool>,
    items: Option<Vec<RawEstimateItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawEstimateItem {
    full_offloaded: Option<bool>,
    vrams: Option<Vec<RawMemory>>,
    ram: Option<RawMemory>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMemory {
    nonuma: Option<u64>,
}

/// Parse gguf-parser stdout into a normalized record
///
/// Invalid JSON, or JSON whose known paths carry unexpected types, is
/// reported as [`ExtractError::MalformedOutput`].
pub fn parse_tool_output(stdout: &str) -> Result<ModelMetadataRecord, ExtractError> {
    let raw: RawToolOutput =
        serde_json::from_str(stdout).map_err(|e| ExtractError::MalformedOutput {
            reason: e.to_string(),
        })?;

    Ok(normalize(raw))
}

fn normalize(raw: RawToolOutput) -> ModelMetadataRecord {
    let metadata = raw.metadata.unwrap_or_default();
    let architecture = raw.architecture.unwrap_or_default();
    let estimate = raw.estimate.unwrap_or_default();

    let first_item = estimate.items.and_then(|items| items.into_iter().next());
    let (vram_bytes, ram_bytes, fully_offloadable) = match first_item {
        Some(item) => (
            item.vrams
                .and_then(|vrams| vrams.into_iter().next())
                .and_then(|m| m.nonuma),
            item.ram.and_then(|m| m.nonuma),
            item.full_offloaded.unwrap_or(false),
        ),
        None => (None, None, false),
    };

    // Empty strings fall through to the architecture block
    let arch = non_empty(metadata.architecture).or_else(|| non_empty(architecture.architecture));

    ModelMetadataRecord {
        architecture: arch,
        quantization: metadata.file_type_detail,
        parameters: metadata.parameters,
        parameters_display: format_parameters(metadata.parameters.unwrap_or(0)),
        context_length: architecture.maximum_context_length,
        embedding_length: architecture.embedding_length,
        file_size_bytes: metadata.file_size,
        file_size_gb: bytes_to_gb(metadata.file_size),
        bits_per_weight: metadata
            .bits_per_weight
            .filter(|bpw| bpw.is_finite() && *bpw > 0.0)
            .map(round2),
        vram_required_gb: bytes_to_gb(vram_bytes),
        ram_required_gb: bytes_to_gb(ram_bytes),
        model_name: metadata.name,
        flash_attention: estimate.flash_attention.unwrap_or(false),
        fully_offloadable,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a byte count to GiB rounded to two decimals
///
/// Zero and missing counts yield `None` rather than `0.0`.
pub fn bytes_to_gb(bytes: Option<u64>) -> Option<f64> {
    bytes
        .filter(|b| *b > 0)
        .map(|b| round2(b as f64 / BYTES_PER_GB))
}

/// Format a parameter count, e.g. 6738415616 -> "6.7B"
pub fn format_parameters(params: u64) -> String {
    if params >= 1_000_000_000 {
        format!("{:.1}B", params as f64 / 1_000_000_000.0)
    } else if params >= 1_000_000 {
        format!("{:.0}M", params as f64 / 1_000_000.0)
    } else {
        params.to_string()
    }
}
