//! Catalog persistence for scraped models

use crate::models::ModelRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

// ============================================================================
// Trait Definitions
// ============================================================================

/// Trait for storage backend operations
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Save content to a file path atomically
    async fn save(&self, path: &Path, content: &str) -> Result<()>;

    /// Load content from a file path
    /// Returns None if file doesn't exist
    async fn load(&self, path: &Path) -> Result<Option<String>>;
}

// ============================================================================
// Production Implementation
// ============================================================================

/// Production storage backend using tokio::fs
#[derive(Default)]
pub struct FileSystemStorage;

#[async_trait]
impl StorageBackend for FileSystemStorage {
    async fn save(&self, path: &Path, content: &str) -> Result<()> {
        // Atomic write: write to temp file, then rename
        let temp_file = path.with_extension("tmp");

        let mut file = fs::File::create(&temp_file)
            .await
            .context("Failed to create temp catalog file")?;
        file.write_all(content.as_bytes())
            .await
            .context("Failed to write catalog file")?;
        file.sync_all()
            .await
            .context("Failed to sync catalog file")?;

        fs::rename(&temp_file, path)
            .await
            .context("Failed to rename temp catalog file")?;

        Ok(())
    }

    async fn load(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog file: {:?}", path))?;

        Ok(Some(content))
    }
}

// ============================================================================
// Catalog Store
// ============================================================================

/// A record as persisted, with bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredModel {
    #[serde(flatten)]
    pub record: ModelRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredModel {
    /// Apply the fields a re-scrape is allowed to change
    fn refresh_from(&mut self, record: ModelRecord, now: DateTime<Utc>) {
        let current = &mut self.record;
        current.downloads = record.downloads;
        current.likes = record.likes;
        current.is_gguf = record.is_gguf;
        current.quantization = record.quantization;
        current.gguf_architecture = record.gguf_architecture;
        current.context_length = record.context_length;
        current.parameter_count = record.parameter_count;
        current.vram_required_gb = record.vram_required_gb;
        current.bits_per_weight = record.bits_per_weight;
        current.gguf_file = record.gguf_file;
        self.updated_at = now;
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SavedCatalog {
    pub last_updated: Option<DateTime<Utc>>,
    pub models: Vec<StoredModel>,
}

/// Counts returned by [`CatalogStore::upsert`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Catalog of scraped models keyed by URL
pub struct CatalogStore {
    catalog_file: PathBuf,
    storage: Arc<dyn StorageBackend>,
    models: RwLock<HashMap<String, StoredModel>>,
}

impl CatalogStore {
    /// Create a new store with custom storage backend
    pub fn new_with_storage(catalog_file: PathBuf, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            catalog_file,
            storage,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new store with default filesystem storage
    pub fn new(catalog_file: PathBuf) -> Self {
        Self::new_with_storage(catalog_file, Arc::new(FileSystemStorage))
    }

    /// Load the catalog from disk, replacing anything held in memory
    /// FAILS HARD if the file is corrupted
    pub async fn load(&self) -> Result<usize> {
        let Some(content) = self.storage.load(&self.catalog_file).await? else {
            tracing::info!(path = ?self.catalog_file, "No catalog file found, starting empty");
            return Ok(0);
        };

        let saved: SavedCatalog = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse catalog file: {:?}. Delete it to start over.",
                self.catalog_file
            )
        })?;

        let count = saved.models.len();
        let mut models = self.models.write().await;
        *models = saved
            .models
            .into_iter()
            .map(|m| (m.record.url.clone(), m))
            .collect();

        tracing::info!(
            models = models.len(),
            last_updated = ?saved.last_updated,
            "Catalog loaded from disk"
        );
        crate::metrics::update_catalog_size(models.len());

        Ok(count)
    }

    /// Insert new models and refresh known ones, then persist
    ///
    /// The in-memory catalog only changes once the write succeeds.
    pub async fn upsert(&self, records: Vec<ModelRecord>) -> Result<UpsertSummary> {
        let now = Utc::now();
        let mut summary = UpsertSummary::default();

        let mut models = self.models.write().await;
        let mut next = models.clone();
        for record in records {
            match next.get_mut(&record.url) {
                Some(existing) => {
                    existing.refresh_from(record, now);
                    summary.updated += 1;
                }
                None => {
                    next.insert(
                        record.url.clone(),
                        StoredModel {
                            record,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                    summary.inserted += 1;
                }
            }
        }

        self.persist(&next).await?;
        *models = next;
        crate::metrics::update_catalog_size(models.len());

        tracing::info!(
            inserted = summary.inserted,
            updated = summary.updated,
            "Catalog updated"
        );

        Ok(summary)
    }

    /// Save the current catalog to disk atomically
    pub async fn save(&self) -> Result<()> {
        let models = self.models.read().await;
        self.persist(&models).await
    }

    /// All models, newest release first
    pub async fn list(&self) -> Vec<StoredModel> {
        sorted(&*self.models.read().await)
    }

    pub async fn get(&self, url: &str) -> Option<StoredModel> {
        self.models.read().await.get(url).cloned()
    }

    pub async fn count(&self) -> usize {
        self.models.read().await.len()
    }

    async fn persist(&self, models: &HashMap<String, StoredModel>) -> Result<()> {
        let catalog = SavedCatalog {
            last_updated: Some(Utc::now()),
            models: sorted(models),
        };

        let json =
            serde_json::to_string_pretty(&catalog).context("Failed to serialize catalog")?;
        self.storage.save(&self.catalog_file, &json).await?;

        tracing::debug!(
            path = ?self.catalog_file,
            models = catalog.models.len(),
            "Catalog saved"
        );

        Ok(())
    }
}

fn sorted(models: &HashMap<String, StoredModel>) -> Vec<StoredModel> {
    let mut entries: Vec<_> = models.values().cloned().collect();
    entries.sort_by(|a, b| {
        b.record
            .release_date
            .cmp(&a.record.release_date)
            .then_with(|| a.record.url.cmp(&b.record.url))
    });
    entries
}

// ============================================================================
// Mock Implementation for Testing
// ============================================================================
