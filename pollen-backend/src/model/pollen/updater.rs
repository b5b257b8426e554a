use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::manager::PollenClient;
use super::sensor::sensor_views;

pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Periodic refresh task
pub struct PollenUpdater {
    client: Arc<PollenClient>,
    update_interval: Duration,
}

impl PollenUpdater {
    pub fn new(client: Arc<PollenClient>, update_interval_minutes: u64) -> Self {
        Self::with_interval(
            client,
            Duration::from_secs(update_interval_minutes.saturating_mul(60)),
        )
    }

    /// Intervals below [`MIN_INTERVAL`] are raised to it
    pub fn with_interval(client: Arc<PollenClient>, update_interval: Duration) -> Self {
        if update_interval < MIN_INTERVAL {
            warn!(
                "Update interval {:?} too short, using {:?}",
                update_interval, MIN_INTERVAL
            );
        }
        Self {
            client,
            update_interval: update_interval.max(MIN_INTERVAL),
        }
    }

    /// Start the background task. The first refresh runs immediately.
    ///
    /// Aborting the returned handle cancels any in-flight refresh without
    /// touching the store.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        info!(
            "Starting pollen updater (interval: {:?})",
            self.update_interval
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.update_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }

    /// One refresh cycle. Failures are logged and left for the next tick.
    pub async fn run_once(&self) -> bool {
        debug!("Triggering scheduled pollen update");

        match self.client.update().await {
            Ok(report) => {
                info!(
                    "Scheduled update completed: {} updated, {} skipped, {} attempt(s)",
                    report.updated,
                    report.skipped.len(),
                    report.attempts
                );
                for view in sensor_views(&self.client).await {
                    match serde_json::to_string(&view) {
                        Ok(json) => debug!("{}", json),
                        Err(e) => debug!("Failed to serialize sensor {}: {}", view.unique_id, e),
                    }
                }
                true
            }
            Err(e) => {
                error!("Scheduled pollen update failed ({}): {}", e.kind(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::model::pollen::api_client::PollenSource;
    use crate::model::pollen::manager::RetryPolicy;
    use crate::model::pollen::types::RawPayload;
    use async_trait::async_trait;
    use pollen_common::Catalog;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl PollenSource for CountingSource {
        async fn fetch_raw(
            &self,
            _region_ids: &BTreeSet<u32>,
            _pollen_ids: &BTreeSet<u32>,
        ) -> Result<RawPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(FetchError::Network("connection refused".to_string()))
            } else {
                Ok(RawPayload::default())
            }
        }
    }

    fn client(source: Arc<CountingSource>) -> Arc<PollenClient> {
        Arc::new(
            PollenClient::new(&Catalog::danish(), &[48], &[7], source)
                .unwrap()
                .with_retry_policy(RetryPolicy::none()),
        )
    }

    #[test]
    fn test_updater_creation() {
        let source = Arc::new(CountingSource { calls: AtomicU32::new(0), fail: false });
        let updater = PollenUpdater::new(client(source), 60);
        assert_eq!(updater.update_interval, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let source = Arc::new(CountingSource { calls: AtomicU32::new(0), fail: false });
        let updater = PollenUpdater::new(client(source.clone()), 0);
        assert_eq!(updater.update_interval, MIN_INTERVAL);

        let handle = updater.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!handle.is_finished());
        handle.abort();

        // t = 0, 1s
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        let huge = PollenUpdater::new(client(source), u64::MAX);
        assert_eq!(huge.update_interval, Duration::from_secs(u64::MAX));
    }

    #[tokio::test]
    async fn test_run_once_reports_outcome() {
        let ok = Arc::new(CountingSource { calls: AtomicU32::new(0), fail: false });
        assert!(PollenUpdater::new(client(ok), 60).run_once().await);

        let failing = Arc::new(CountingSource { calls: AtomicU32::new(0), fail: true });
        let client = client(failing.clone());
        assert!(!PollenUpdater::new(client.clone(), 60).run_once().await);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert!(!client.is_available().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_refreshes_on_interval() {
        let source = Arc::new(CountingSource { calls: AtomicU32::new(0), fail: false });
        let handle = PollenUpdater::with_interval(client(source.clone()), Duration::from_secs(60)).start();

        tokio::time::sleep(Duration::from_secs(150)).await;
        handle.abort();

        // t = 0, 60, 120
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }
}
