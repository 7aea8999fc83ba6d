//! Background refresh of the catalog
//!
//! [`RefreshController`] guarantees at most one scrape runs at a time and
//! keeps the outcome of the last one for the status endpoint.
//! [`RefreshScheduler`] triggers it on a fixed interval.

use crate::scraper::{ScrapeReport, Scraper};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval_at};

/// Work performed by one refresh
#[async_trait]
pub trait ScrapeJob: Send + Sync {
    async fn scrape(&self) -> Result<ScrapeReport>;
}

#[async_trait]
impl ScrapeJob for Scraper {
    async fn scrape(&self) -> Result<ScrapeReport> {
        self.run().await
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RefreshError {
    #[error("Scraping already in progress")]
    AlreadyRunning,
}

/// Outcome of the most recent refresh
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeStatus {
    pub in_progress: bool,
    /// When the last refresh was started
    pub last_update: Option<DateTime<Utc>>,
    pub last_result: Option<RefreshResult>,
}

#[derive(Default)]
struct RefreshState {
    last_update: Option<DateTime<Utc>>,
    last_result: Option<RefreshResult>,
}

/// RAII guard clearing the in-progress flag on drop
struct RunningGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

pub struct RefreshController {
    job: Arc<dyn ScrapeJob>,
    in_progress: Arc<AtomicBool>,
    state: RwLock<RefreshState>,
}

impl RefreshController {
    pub fn new(job: Arc<dyn ScrapeJob>) -> Self {
        Self {
            job,
            in_progress: Arc::new(AtomicBool::new(false)),
            state: RwLock::new(RefreshState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Start a refresh in the background
    pub async fn trigger(self: &Arc<Self>) -> Result<JoinHandle<()>, RefreshError> {
        let guard = self.acquire()?;
        self.mark_started().await;
        let this = Arc::clone(self);

        Ok(tokio::spawn(async move {
            // Outcome is kept in the status, errors are logged in execute
            let _ = this.execute(guard).await;
        }))
    }

    /// Run a refresh on the current task
    pub async fn run_now(&self) -> Result<ScrapeReport> {
        let guard = self.acquire()?;
        self.mark_started().await;
        self.execute(guard).await
    }

    pub async fn status(&self) -> ScrapeStatus {
        let state = self.state.read().await;
        ScrapeStatus {
            in_progress: self.is_running(),
            last_update: state.last_update,
            last_result: state.last_result.clone(),
        }
    }

    pub async fn last_update(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_update
    }

    fn acquire(&self) -> Result<RunningGuard, RefreshError> {
        self.in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| RefreshError::AlreadyRunning)?;

        Ok(RunningGuard {
            flag: self.in_progress.clone(),
        })
    }

    async fn mark_started(&self) {
        self.state.write().await.last_update = Some(Utc::now());
    }

    async fn execute(&self, _guard: RunningGuard) -> Result<ScrapeReport> {
        tracing::info!("Refresh started");

        let outcome = self.job.scrape().await;

        let result = match &outcome {
            Ok(report) => {
                tracing::info!(models = report.total_models, "Refresh finished");
                RefreshResult {
                    success: true,
                    timestamp: Utc::now(),
                    models_count: Some(report.total_models),
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Refresh failed");
                RefreshResult {
                    success: false,
                    timestamp: Utc::now(),
                    models_count: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        };
        crate::metrics::record_scrape_run(result.success);
        self.state.write().await.last_result = Some(result);

        outcome
    }
}

/// Periodic refresh trigger
pub struct RefreshScheduler {
    controller: Arc<RefreshController>,
    period: Duration,
}

impl RefreshScheduler {
    /// Returns None when `interval_hours` is 0
    pub fn new(controller: Arc<RefreshController>, interval_hours: u64) -> Option<Self> {
        (interval_hours > 0).then(|| {
            Self::with_period(controller, Duration::from_secs(interval_hours.saturating_mul(3600)))
        })
    }

    pub fn with_period(controller: Arc<RefreshController>, period: Duration) -> Self {
        Self { controller, period }
    }

    /// Trigger a refresh every period, starting one period from now
    pub async fn run(self) {
        let start = tokio::time::Instant::now() + self.period;
        let mut ticker = interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.period.as_secs(),
            "Refresh scheduler started"
        );

        loop {
            ticker.tick().await;
            match self.controller.trigger().await {
                Ok(_) => tracing::info!("Scheduled refresh triggered"),
                Err(RefreshError::AlreadyRunning) => {
                    tracing::info!("Refresh already running, skipping scheduled tick")
                }
            }
        }
    }
}
