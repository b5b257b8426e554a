use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

use pollen_common::{PollenReading, PollenType, Region};

/// In-memory entity graph: regions and their pollen types, keyed by id.
///
/// Readers get cloned snapshots. All writes go through [`PollenStore::apply`],
/// which publishes a whole batch under one write lock.
#[derive(Debug, Default)]
pub struct PollenStore {
    regions: RwLock<BTreeMap<u32, Region>>,
}

impl PollenStore {
    pub fn new(regions: Vec<Region>) -> Self {
        Self {
            regions: RwLock::new(regions.into_iter().map(|r| (r.id(), r)).collect()),
        }
    }

    /// All regions, ordered by id
    pub async fn get_regions(&self) -> Vec<Region> {
        self.regions.read().await.values().cloned().collect()
    }

    pub async fn get_region_by_id(&self, region_id: u32) -> Option<Region> {
        self.regions.read().await.get(&region_id).cloned()
    }

    pub async fn get_pollen_type(&self, region_id: u32, pollen_id: u32) -> Option<PollenType> {
        self.regions
            .read()
            .await
            .get(&region_id)
            .and_then(|r| r.get_pollen_type_by_id(pollen_id))
            .cloned()
    }

    /// (region count, pollen type count)
    pub async fn count(&self) -> (usize, usize) {
        let regions = self.regions.read().await;
        let pollen = regions.values().map(Region::pollen_count).sum();
        (regions.len(), pollen)
    }

    /// Replace the fields of existing pollen types. Entities that are not
    /// tracked are ignored; nothing is ever inserted or removed.
    ///
    /// Returns how many readings were applied.
    pub async fn apply(&self, readings: Vec<((u32, u32), PollenReading)>) -> usize {
        let mut regions = self.regions.write().await;
        let mut applied = 0;

        for ((region_id, pollen_id), reading) in readings {
            match regions
                .get_mut(&region_id)
                .and_then(|r| r.get_pollen_type_mut(pollen_id))
            {
                Some(pollen) => {
                    pollen.apply(reading);
                    applied += 1;
                }
                None => debug!("Ignoring reading for untracked pollen {} in region {}", pollen_id, region_id),
            }
        }

        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollen_common::Level;

    fn store() -> PollenStore {
        PollenStore::new(vec![
            Region::new(1, "West", vec![PollenType::new(10, "Birch"), PollenType::new(11, "Grass")]),
            Region::new(2, "East", vec![PollenType::new(10, "Birch")]),
        ])
    }

    fn reading(level: u32) -> PollenReading {
        PollenReading {
            level: Level::Value(level),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lookups() {
        let store = store();
        assert_eq!(store.count().await, (2, 3));
        assert_eq!(store.get_region_by_id(2).await.map(|r| r.name().to_string()), Some("East".to_string()));
        assert!(store.get_region_by_id(3).await.is_none());
        assert!(store.get_pollen_type(2, 11).await.is_none());
        assert!(store.get_pollen_type(9, 10).await.is_none());

        let ids: Vec<u32> = store.get_regions().await.iter().map(Region::id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_apply_ignores_untracked() {
        let store = store();
        let applied = store
            .apply(vec![((1, 10), reading(2)), ((2, 11), reading(5)), ((3, 10), reading(1))])
            .await;

        assert_eq!(applied, 1);
        assert_eq!(store.get_pollen_type(1, 10).await.unwrap().level(), Level::Value(2));
        assert_eq!(store.count().await, (2, 3));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let store = store();
        let before = store.get_region_by_id(1).await.unwrap();
        store.apply(vec![((1, 10), reading(3))]).await;

        assert_eq!(before.get_pollen_type_by_id(10).unwrap().level(), Level::NoData);
        assert_eq!(store.get_pollen_type(1, 10).await.unwrap().level(), Level::Value(3));
    }
}
