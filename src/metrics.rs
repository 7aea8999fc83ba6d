//! Prometheus metrics

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Setup Prometheus metrics exporter
/// Returns a handle that can be used to retrieve metrics
pub fn setup_metrics() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!("Prometheus metrics exporter installed");

    Ok(handle)
}

/// Record one gguf-parser invocation by outcome
pub fn record_extraction_attempt(outcome: &'static str) {
    metrics::counter!("model_tracker_extraction_attempts_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the enrichment outcome of a candidate model
pub fn record_enrichment(outcome: &'static str) {
    metrics::counter!("model_tracker_enrichments_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record models collected from a hub in one pass
pub fn record_scraped_models(source: &str, count: usize) {
    metrics::counter!("model_tracker_scraped_models_total",
        "source" => source.to_string()
    )
    .increment(count as u64);
}

/// Record a finished scrape run
pub fn record_scrape_run(success: bool) {
    metrics::counter!("model_tracker_scrape_runs_total",
        "result" => if success { "success" } else { "error" }
    )
    .increment(1);
}

/// Update total catalog size gauge
pub fn update_catalog_size(count: usize) {
    metrics::gauge!("model_tracker_catalog_models").set(count as f64);
}
