//! GGUF metadata extraction and enrichment

pub mod enrich;
pub mod metadata;
pub mod parser;

pub use enrich::{EnrichmentOutcome, Enricher, pick_representative_file};
pub use metadata::{ModelMetadataRecord, bytes_to_gb, format_parameters, parse_tool_output};
pub use parser::{ExtractionClient, Locator, SystemToolRunner, ToolOutput, ToolRunner};
