use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use pollen_common::{Catalog, PollenType, Region};

use super::api_client::{HttpPollenSource, PollenSource};
use super::normalizer::normalize;
use super::store::PollenStore;
use super::types::RawPayload;
use crate::config::PollenConfig;
use crate::error::{ClientError, EntitySkipped, FetchError};

/// How often a refresh retries a transient fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total fetch attempts per refresh, at least 1
    pub max_attempts: u32,
    /// Base delay; attempt n waits `delay * n`
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait after failed attempt `attempt`, saturating at [`Duration::MAX`]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.delay.checked_mul(attempt).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Result of a successful refresh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub updated: usize,
    pub skipped: Vec<EntitySkipped>,
    pub untracked: usize,
    /// Fetch attempts it took
    pub attempts: u32,
}

/// Refresh bookkeeping, kept apart from the entity graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

/// Pollen client: owns the store and refreshes it from a [`PollenSource`]
pub struct PollenClient {
    source: Arc<dyn PollenSource>,
    store: PollenStore,
    region_ids: BTreeSet<u32>,
    pollen_ids: BTreeSet<u32>,
    retry: RetryPolicy,
    /// Serializes refreshes
    update_lock: Mutex<()>,
    status: RwLock<UpdateStatus>,
}

impl PollenClient {
    /// Create a client tracking every `pollen_ids` entry in every `region_ids`
    /// region. All ids must be known to `catalog`.
    pub fn new(
        catalog: &Catalog,
        region_ids: &[u32],
        pollen_ids: &[u32],
        source: Arc<dyn PollenSource>,
    ) -> Result<Self, ClientError> {
        let region_ids: BTreeSet<u32> = region_ids.iter().copied().collect();
        let pollen_ids: BTreeSet<u32> = pollen_ids.iter().copied().collect();

        let mut regions = Vec::with_capacity(region_ids.len());
        for &region_id in &region_ids {
            let region_name = catalog
                .region_name(region_id)
                .ok_or(ClientError::UnknownRegion(region_id))?;

            let pollen_types = pollen_ids
                .iter()
                .map(|&pollen_id| {
                    catalog
                        .pollen_name(pollen_id)
                        .map(|name| PollenType::new(pollen_id, name))
                        .ok_or(ClientError::UnknownPollen(pollen_id))
                })
                .collect::<Result<Vec<_>, _>>()?;

            regions.push(Region::new(region_id, region_name, pollen_types));
        }

        debug!(
            "Created pollen client for regions {:?}, pollen {:?}",
            region_ids, pollen_ids
        );

        Ok(Self {
            source,
            store: PollenStore::new(regions),
            region_ids,
            pollen_ids,
            retry: RetryPolicy::default(),
            update_lock: Mutex::new(()),
            status: RwLock::new(UpdateStatus::default()),
        })
    }

    /// Client for the Danish feed as described by `config`
    pub fn from_config(config: &PollenConfig) -> Result<Self, ClientError> {
        let source = HttpPollenSource::new(
            config.feed_url.clone(),
            Duration::from_secs(config.request_timeout_seconds),
        )?;

        Ok(Self::new(
            &Catalog::danish(),
            &config.regions,
            &config.pollen_types,
            Arc::new(source),
        )?
        .with_retry_policy(RetryPolicy::new(
            config.retry_attempts,
            Duration::from_secs(config.retry_delay_seconds),
        )))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Refresh the store from the source.
    ///
    /// On a fetch failure the store is left untouched and the classified
    /// error is returned. Concurrent calls run one after another. Dropping
    /// the future before the fetch completes leaves the store untouched.
    pub async fn update(&self) -> Result<UpdateReport, FetchError> {
        let _guard = self.update_lock.lock().await;

        let (payload, attempts) = match self.fetch_with_retry().await {
            Ok(fetched) => fetched,
            Err(e) => {
                let mut status = self.status.write().await;
                status.last_error = Some(e.to_string());
                status.consecutive_failures += 1;
                return Err(e);
            }
        };

        let normalized = normalize(&payload, &self.store).await;

        {
            let mut status = self.status.write().await;
            status.last_success = Some(Utc::now());
            status.last_error = None;
            status.consecutive_failures = 0;
        }

        info!(
            "Pollen update completed: {} updated, {} skipped",
            normalized.updated,
            normalized.skipped.len()
        );

        Ok(UpdateReport {
            updated: normalized.updated,
            skipped: normalized.skipped,
            untracked: normalized.untracked,
            attempts,
        })
    }

    async fn fetch_with_retry(&self) -> Result<(RawPayload, u32), FetchError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 1;

        loop {
            match self.source.fetch_raw(&self.region_ids, &self.pollen_ids).await {
                Ok(payload) => return Ok((payload, attempt)),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Pollen fetch failed after {} attempt(s) ({}): {}",
                        attempt,
                        e.kind(),
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    pub fn region_ids(&self) -> &BTreeSet<u32> {
        &self.region_ids
    }

    pub fn pollen_ids(&self) -> &BTreeSet<u32> {
        &self.pollen_ids
    }

    pub fn store(&self) -> &PollenStore {
        &self.store
    }

    pub async fn get_regions(&self) -> Vec<Region> {
        self.store.get_regions().await
    }

    pub async fn get_region_by_id(&self, region_id: u32) -> Option<Region> {
        self.store.get_region_by_id(region_id).await
    }

    pub async fn get_pollen_type(&self, region_id: u32, pollen_id: u32) -> Option<PollenType> {
        self.store.get_pollen_type(region_id, pollen_id).await
    }

    pub async fn status(&self) -> UpdateStatus {
        self.status.read().await.clone()
    }

    /// Whether the most recent refresh succeeded
    pub async fn is_available(&self) -> bool {
        let status = self.status.read().await;
        status.last_success.is_some() && status.consecutive_failures == 0
    }
}
