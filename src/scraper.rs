//! One scrape pass over the configured hubs
//!
//! Listings are classified into [`ModelRecord`]s, GGUF candidates are
//! enriched, and the result is upserted into the catalog.

use crate::config::TrackerConfig;
use crate::gguf::{EnrichmentOutcome, Enricher};
use crate::hub::{Hub, HubBackend, ListingQuery, ListingSort};
use crate::models::{ModelRecord, classify, mentions_gguf, sample_models};
use crate::store::CatalogStore;
use anyhow::Result;
use futures::{StreamExt, stream};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

/// Summary of a finished scrape pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeReport {
    /// Unique models kept per hub
    pub per_source: BTreeMap<String, usize>,
    pub skipped_chinese: usize,
    pub samples_added: usize,
    pub enriched: usize,
    pub detected_unparsed: usize,
    pub not_gguf: usize,
    pub total_models: usize,
    pub inserted: usize,
    pub updated: usize,
}

impl ScrapeReport {
    fn record_outcome(&mut self, outcome: EnrichmentOutcome) {
        match outcome {
            EnrichmentOutcome::Enriched => self.enriched += 1,
            EnrichmentOutcome::DetectedUnparsed => self.detected_unparsed += 1,
            EnrichmentOutcome::NotGguf => self.not_gguf += 1,
        }
    }
}

pub struct Scraper {
    config: TrackerConfig,
    hubs: Vec<Arc<dyn Hub>>,
    enricher: Arc<Enricher>,
    store: Arc<CatalogStore>,
}

impl Scraper {
    pub fn new(
        config: TrackerConfig,
        hubs: Vec<Arc<dyn Hub>>,
        enricher: Arc<Enricher>,
        store: Arc<CatalogStore>,
    ) -> Self {
        Self {
            config,
            hubs,
            enricher,
            store,
        }
    }

    pub fn store(&self) -> &Arc<CatalogStore> {
        &self.store
    }

    /// Run a full pass and persist the result
    ///
    /// Hub failures are logged and skipped. Only a failure to persist the
    /// catalog is returned as an error.
    pub async fn run(&self) -> Result<ScrapeReport> {
        let started = Instant::now();
        let mut report = ScrapeReport::default();
        let mut seen = HashSet::new();
        let mut collected = Vec::new();

        for hub in &self.hubs {
            let backend = hub.backend();
            if !self.config.sources.is_enabled(backend) {
                tracing::debug!(source = %backend, "Source disabled, skipping");
                continue;
            }

            let mut kept = 0;
            for record in self.collect(hub.as_ref()).await {
                if record.is_chinese && !self.config.include_chinese {
                    report.skipped_chinese += 1;
                    continue;
                }
                if seen.insert(record.url.clone()) {
                    collected.push(record);
                    kept += 1;
                }
            }

            tracing::info!(source = %backend, models = kept, "Source scraped");
            crate::metrics::record_scraped_models(&backend.to_string(), kept);
            report.per_source.insert(backend.to_string(), kept);
        }

        let mut models = self.enrich_all(collected, &mut report).await;

        if models.len() < self.config.min_models_before_samples {
            tracing::info!(
                collected = models.len(),
                threshold = self.config.min_models_before_samples,
                "Too few models scraped, adding curated samples"
            );
            for sample in sample_models() {
                if seen.insert(sample.url.clone()) {
                    models.push(sample);
                    report.samples_added += 1;
                }
            }
        }

        report.total_models = models.len();
        let summary = self.store.upsert(models).await?;
        report.inserted = summary.inserted;
        report.updated = summary.updated;

        tracing::info!(
            total = report.total_models,
            inserted = report.inserted,
            updated = report.updated,
            enriched = report.enriched,
            detected_unparsed = report.detected_unparsed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scrape pass complete"
        );

        Ok(report)
    }

    /// Listing requests issued against one hub
    fn queries(&self, backend: HubBackend) -> Vec<(&'static str, ListingQuery)> {
        match backend {
            HubBackend::HuggingFace => {
                let per_pass = self.config.max_models_per_source / 2;
                vec![
                    ("popular", ListingQuery::new(ListingSort::Likes, per_pass)),
                    ("recent", ListingQuery::new(ListingSort::LastModified, per_pass)),
                    (
                        "gguf",
                        ListingQuery::new(ListingSort::Likes, per_pass).with_search("gguf"),
                    ),
                ]
            }
            HubBackend::ModelScope => vec![(
                "latest",
                ListingQuery::new(ListingSort::LastModified, self.config.modelscope_limit),
            )],
        }
    }

    async fn collect(&self, hub: &dyn Hub) -> Vec<ModelRecord> {
        let backend = hub.backend();
        let size_limit = self.config.vram_limit_gb * 2.0;
        let mut records = Vec::new();

        for (pass, query) in self.queries(backend) {
            let models = match hub.list_models(&query).await {
                Ok(models) => models,
                Err(e) => {
                    tracing::warn!(source = %backend, pass, error = %e, "Model listing failed");
                    continue;
                }
            };

            let before = records.len();
            for model in &models {
                let record = classify(backend, model);
                if backend == HubBackend::HuggingFace
                    && let Some(size) = record.size_gb
                    && size > size_limit
                {
                    tracing::debug!(model = %model.id, size_gb = size, "Model too large, skipping");
                    continue;
                }
                records.push(record);
            }

            tracing::debug!(
                source = %backend,
                pass,
                listed = models.len(),
                kept = records.len() - before,
                "Listing pass done"
            );
        }

        records
    }

    /// Enrich GGUF candidates, at most `enrich_concurrency` at a time
    async fn enrich_all(
        &self,
        records: Vec<ModelRecord>,
        report: &mut ScrapeReport,
    ) -> Vec<ModelRecord> {
        let results: Vec<(ModelRecord, Option<EnrichmentOutcome>)> = stream::iter(records)
            .map(|mut record| async move {
                let outcome = match self.enrichment_target(&record) {
                    Some((hub, repo_id)) => Some(
                        self.enricher
                            .enrich(&mut record, hub.as_ref(), &repo_id)
                            .await,
                    ),
                    None => None,
                };
                (record, outcome)
            })
            .buffered(self.config.enrich_concurrency.max(1))
            .collect()
            .await;

        results
            .into_iter()
            .map(|(record, outcome)| {
                if let Some(outcome) = outcome {
                    report.record_outcome(outcome);
                }
                record
            })
            .collect()
    }

    fn enrichment_target(&self, record: &ModelRecord) -> Option<(&Arc<dyn Hub>, String)> {
        let repo_id = record.repo_id()?;
        if !mentions_gguf(&repo_id, &record.tags) {
            return None;
        }
        let hub = self.hubs.iter().find(|h| h.backend() == record.source)?;
        Some((hub, repo_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::gguf::ExtractionClient;
    use crate::gguf::parser::tests::{ScriptedRunner, failure, success};
    use crate::hub::{HubModel, RepoFile};
    use crate::store::mocks::MockStorage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    const OUTPUT: &str = r#"{
        "metadata": {"architecture": "llama", "fileTypeDetail": "Q4_K_M", "parameters": 8030261248},
        "architecture": {"maximumContextLength": 8192}
    }"#;

    struct MockHub {
        backend: HubBackend,
        listings: HashMap<(&'static str, Option<String>), Vec<HubModel>>,
        files: HashMap<String, Vec<String>>,
        fail_listing: bool,
        queries: Mutex<Vec<ListingQuery>>,
    }

    impl MockHub {
        fn new(backend: HubBackend) -> Self {
            Self {
                backend,
                listings: HashMap::new(),
                files: HashMap::new(),
                fail_listing: false,
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing(backend: HubBackend) -> Self {
            Self {
                fail_listing: true,
                ..Self::new(backend)
            }
        }

        fn listing(mut self, sort: ListingSort, search: Option<&str>, models: Vec<HubModel>) -> Self {
            self.listings
                .insert((sort.as_str(), search.map(String::from)), models);
            self
        }

        fn repo(mut self, repo_id: &str, files: &[&str]) -> Self {
            self.files.insert(
                repo_id.to_string(),
                files.iter().map(|f| f.to_string()).collect(),
            );
            self
        }

        fn queries(&self) -> Vec<ListingQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Hub for MockHub {
        fn backend(&self) -> HubBackend {
            self.backend
        }

        async fn list_models(&self, query: &ListingQuery) -> Result<Vec<HubModel>> {
            self.queries.lock().unwrap().push(query.clone());
            if self.fail_listing {
                anyhow::bail!("connection refused");
            }
            Ok(self
                .listings
                .get(&(query.sort.as_str(), query.search.clone()))
                .cloned()
                .unwrap_or_default())
        }

        async fn list_files(&self, repo_id: &str) -> Result<Vec<String>> {
            Ok(self.files.get(repo_id).cloned().unwrap_or_default())
        }
    }

    fn model(id: &str) -> HubModel {
        HubModel {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            max_models_per_source: 10,
            modelscope_limit: 4,
            min_models_before_samples: 0,
            parser: ParserConfig {
                initial_backoff_secs: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn scraper(
        config: TrackerConfig,
        hubs: Vec<Arc<dyn Hub>>,
        runner: Arc<ScriptedRunner>,
    ) -> Scraper {
        let client = ExtractionClient::with_runner(config.parser.clone(), runner);
        let store = CatalogStore::new_with_storage(
            PathBuf::from("/test/models.json"),
            Arc::new(MockStorage::new()),
        );
        Scraper::new(
            config,
            hubs,
            Arc::new(Enricher::new(Arc::new(client))),
            Arc::new(store),
        )
    }

    #[tokio::test]
    async fn test_huggingface_passes_dedup_and_enrich() {
        let oversized = HubModel {
            files: vec![RepoFile {
                name: "model.safetensors".to_string(),
                size: Some(200 * 1024 * 1024 * 1024),
            }],
            ..model("big/model")
        };
        let hub = Arc::new(
            MockHub::new(HubBackend::HuggingFace)
                .listing(
                    ListingSort::Likes,
                    None,
                    vec![model("meta-llama/Llama-3-8B"), oversized],
                )
                .listing(
                    ListingSort::LastModified,
                    None,
                    vec![model("meta-llama/Llama-3-8B"), model("org/tiny-1b")],
                )
                .listing(
                    ListingSort::Likes,
                    Some("gguf"),
                    vec![model("bartowski/Llama-3-8B-GGUF")],
                )
                .repo(
                    "bartowski/Llama-3-8B-GGUF",
                    &["Llama-3-8B-Q8_0.gguf", "Llama-3-8B-Q4_K_M.gguf"],
                ),
        );
        let runner = ScriptedRunner::new(vec![success(OUTPUT)]);
        let scraper = scraper(config(), vec![hub.clone()], runner.clone());

        let report = scraper.run().await.unwrap();

        assert_eq!(report.per_source.get("huggingface"), Some(&3));
        assert_eq!(report.enriched, 1);
        assert_eq!(report.total_models, 3);
        assert_eq!(report.inserted, 3);
        assert_eq!(runner.calls().len(), 1);

        let queries = hub.queries();
        assert_eq!(queries.len(), 3);
        assert!(queries.iter().all(|q| q.limit == 5));
        assert_eq!(queries[1].sort, ListingSort::LastModified);
        assert_eq!(queries[2].search.as_deref(), Some("gguf"));

        let stored = scraper
            .store()
            .get("https://huggingface.co/bartowski/Llama-3-8B-GGUF")
            .await
            .unwrap();
        assert!(stored.record.is_gguf);
        assert_eq!(
            stored.record.gguf_file.as_deref(),
            Some("Llama-3-8B-Q4_K_M.gguf")
        );
        assert_eq!(stored.record.context_length, Some(8192));
        assert!(scraper.store().get("https://huggingface.co/big/model").await.is_none());
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let hf = Arc::new(MockHub::failing(HubBackend::HuggingFace));
        let ms = Arc::new(
            MockHub::new(HubBackend::ModelScope)
                .listing(
                    ListingSort::LastModified,
                    None,
                    vec![model("Qwen/Qwen2-7B-Instruct-GGUF"), model("ZhipuAI/glm-4-9b")],
                )
                .repo("Qwen/Qwen2-7B-Instruct-GGUF", &["qwen2-7b-instruct-q4_k_m.gguf"]),
        );
        let runner = ScriptedRunner::new(vec![failure("HTTP 404 Not Found")]);
        let scraper = scraper(config(), vec![hf.clone(), ms.clone()], runner.clone());

        let report = scraper.run().await.unwrap();

        assert_eq!(hf.queries().len(), 3);
        assert_eq!(ms.queries()[0].limit, 4);
        assert_eq!(report.per_source.get("huggingface"), Some(&0));
        assert_eq!(report.per_source.get("modelscope"), Some(&2));
        assert_eq!(report.detected_unparsed, 1);
        assert_eq!(runner.calls()[0][0], "--ms-repo");

        let stored = scraper
            .store()
            .get("https://modelscope.cn/models/Qwen/Qwen2-7B-Instruct-GGUF")
            .await
            .unwrap();
        assert!(stored.record.is_gguf);
        assert_eq!(stored.record.gguf_architecture, None);
    }

    #[tokio::test]
    async fn test_exclude_chinese_models() {
        let hub = Arc::new(MockHub::new(HubBackend::HuggingFace).listing(
            ListingSort::Likes,
            None,
            vec![model("Qwen/Qwen2-7B"), model("mistralai/Mistral-7B-v0.1")],
        ));
        let config = TrackerConfig {
            include_chinese: false,
            ..config()
        };
        let scraper = scraper(config, vec![hub], ScriptedRunner::new(vec![]));

        let report = scraper.run().await.unwrap();

        assert_eq!(report.skipped_chinese, 1);
        assert_eq!(report.total_models, 1);
        assert_eq!(scraper.store().list().await[0].record.name, "Mistral-7B-v0.1");
    }

    #[tokio::test]
    async fn test_samples_added_below_threshold() {
        let hub = Arc::new(MockHub::failing(HubBackend::HuggingFace));
        let config = TrackerConfig {
            min_models_before_samples: 5,
            ..config()
        };
        let scraper = scraper(config, vec![hub], ScriptedRunner::new(vec![]));

        let report = scraper.run().await.unwrap();

        assert_eq!(report.samples_added, sample_models().len());
        assert_eq!(scraper.store().count().await, sample_models().len());
    }

    #[tokio::test]
    async fn test_disabled_source_not_queried() {
        let hub = Arc::new(MockHub::new(HubBackend::ModelScope));
        let mut config = config();
        config.sources.modelscope = false;
        let scraper = scraper(config, vec![hub.clone()], ScriptedRunner::new(vec![]));

        let report = scraper.run().await.unwrap();

        assert!(hub.queries().is_empty());
        assert!(report.per_source.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_enrichment_preserves_order() {
        let ids = ["a/one-GGUF", "b/two-GGUF", "c/three-GGUF"];
        let mut hub = MockHub::new(HubBackend::HuggingFace).listing(
            ListingSort::Likes,
            Some("gguf"),
            ids.iter().map(|id| model(id)).collect(),
        );
        for id in ids {
            hub = hub.repo(id, &["m.Q4_K_M.gguf"]);
        }
        let config = TrackerConfig {
            enrich_concurrency: 3,
            ..config()
        };
        let runner = ScriptedRunner::new(vec![success(OUTPUT), success(OUTPUT), success(OUTPUT)]);
        let scraper = scraper(config, vec![Arc::new(hub)], runner.clone());

        let report = scraper.run().await.unwrap();

        assert_eq!(report.enriched, 3);
        assert_eq!(runner.calls().len(), 3);
    }
}
