//! Read-only sensor views for a rendering layer
//!
//! One view per (region, pollen type) pair, carrying the display name,
//! state and attribute set a dashboard shows for that pollen type.

use chrono::NaiveDate;
use serde::Serialize;

use pollen_common::{Level, PollenType, Region};

use super::manager::PollenClient;

pub const NAME_PREFIX: &str = "Pollen";
pub const SENSOR_ICON: &str = "mdi:flower-pollen";
pub const ATTRIBUTION: &str = "Data provided by Astma-Allergi Danmark";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionAttribute {
    pub date: NaiveDate,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAttributes {
    pub last_update: Option<NaiveDate>,
    pub in_season: Option<bool>,
    pub predictions: Vec<PredictionAttribute>,
    pub attribution: &'static str,
}

impl SensorAttributes {
    fn from_pollen(pollen: &PollenType) -> Self {
        Self {
            last_update: pollen.date(),
            in_season: Some(pollen.in_season()),
            predictions: pollen
                .predictions()
                .iter()
                .map(|p| PredictionAttribute {
                    date: p.date(),
                    level: p.level(),
                })
                .collect(),
            attribution: ATTRIBUTION,
        }
    }

    fn unavailable() -> Self {
        Self {
            last_update: None,
            in_season: None,
            predictions: Vec::new(),
            attribution: ATTRIBUTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorView {
    pub unique_id: String,
    pub name: String,
    pub icon: &'static str,
    /// Current level, `None` when there is no data
    pub state: Option<u32>,
    pub attributes: SensorAttributes,
}

impl SensorView {
    /// `region_count` decides whether the region goes into the name
    pub fn new(region: &Region, pollen: &PollenType, region_count: usize) -> Self {
        Self {
            unique_id: unique_id(region.id(), pollen.id()),
            name: sensor_name(region, pollen.name(), region_count),
            icon: SENSOR_ICON,
            state: pollen.level().value(),
            attributes: SensorAttributes::from_pollen(pollen),
        }
    }

    /// View for an id pair the store does not (yet) know
    pub fn unavailable(region_id: u32, pollen_id: u32) -> Self {
        Self {
            unique_id: unique_id(region_id, pollen_id),
            name: format!("{} {}", NAME_PREFIX, pollen_id),
            icon: SENSOR_ICON,
            state: None,
            attributes: SensorAttributes::unavailable(),
        }
    }
}

pub fn unique_id(region_id: u32, pollen_id: u32) -> String {
    format!("pollen_dk_{}_{}", region_id, pollen_id)
}

fn sensor_name(region: &Region, pollen_name: &str, region_count: usize) -> String {
    if region_count > 1 {
        format!("{} {} {}", NAME_PREFIX, pollen_name, region.short_name())
    } else {
        format!("{} {}", NAME_PREFIX, pollen_name)
    }
}

/// Views for every tracked pollen type, region by region
pub async fn sensor_views(client: &PollenClient) -> Vec<SensorView> {
    let regions = client.get_regions().await;
    let region_count = regions.len();

    regions
        .iter()
        .flat_map(|region| {
            region
                .pollen_types()
                .map(move |pollen| SensorView::new(region, pollen, region_count))
        })
        .collect()
}

/// View for one id pair; never fails
pub async fn sensor_view(client: &PollenClient, region_id: u32, pollen_id: u32) -> SensorView {
    let region_count = client.region_ids().len();
    match client.get_region_by_id(region_id).await {
        Some(region) => match region.get_pollen_type_by_id(pollen_id) {
            Some(pollen) => SensorView::new(&region, pollen, region_count),
            None => SensorView::unavailable(region_id, pollen_id),
        },
        None => SensorView::unavailable(region_id, pollen_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pollen::api_client::PollenSource;
    use crate::model::pollen::types::RawPayload;
    use crate::error::FetchError;
    use async_trait::async_trait;
    use pollen_common::{Catalog, PollenReading, Prediction};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    struct EmptySource;

    #[async_trait]
    impl PollenSource for EmptySource {
        async fn fetch_raw(
            &self,
            _region_ids: &BTreeSet<u32>,
            _pollen_ids: &BTreeSet<u32>,
        ) -> Result<RawPayload, FetchError> {
            Ok(RawPayload::default())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    #[tokio::test]
    async fn test_names_include_region_when_several() {
        let client = PollenClient::new(&Catalog::danish(), &[48, 49], &[7], Arc::new(EmptySource)).unwrap();
        let names: Vec<String> = sensor_views(&client).await.into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Pollen Birk Øst", "Pollen Birk Vest"]);

        let client = PollenClient::new(&Catalog::danish(), &[49], &[7, 28], Arc::new(EmptySource)).unwrap();
        let names: Vec<String> = sensor_views(&client).await.into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["Pollen Birk", "Pollen Græs"]);
    }

    #[tokio::test]
    async fn test_view_state_and_attributes() {
        let client = PollenClient::new(&Catalog::danish(), &[48], &[7], Arc::new(EmptySource)).unwrap();
        client
            .store()
            .apply(vec![(
                (48, 7),
                PollenReading {
                    level: Level::Value(42),
                    date: Some(date(20)),
                    in_season: true,
                    predictions: vec![Prediction::new(date(21), Level::Value(3))],
                },
            )])
            .await;

        let view = sensor_view(&client, 48, 7).await;
        assert_eq!(view.unique_id, "pollen_dk_48_7");
        assert_eq!(view.icon, SENSOR_ICON);
        assert_eq!(view.state, Some(42));
        assert_eq!(view.attributes.last_update, Some(date(20)));
        assert_eq!(view.attributes.in_season, Some(true));
        assert_eq!(
            view.attributes.predictions,
            vec![PredictionAttribute { date: date(21), level: Level::Value(3) }]
        );

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["attributes"]["predictions"][0]["date"], "2026-04-21");
        assert_eq!(json["attributes"]["attribution"], ATTRIBUTION);
    }

    #[tokio::test]
    async fn test_unknown_ids_give_unavailable_view() {
        let client = PollenClient::new(&Catalog::danish(), &[48], &[7], Arc::new(EmptySource)).unwrap();

        let view = sensor_view(&client, 49, 7).await;
        assert_eq!(view.state, None);
        assert_eq!(view.attributes, SensorAttributes::unavailable());

        let view = sensor_view(&client, 48, 2).await;
        assert_eq!(view.unique_id, "pollen_dk_48_2");
        assert!(view.attributes.predictions.is_empty());
    }
}
