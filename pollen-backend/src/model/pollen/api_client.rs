//! Astma-Allergi Danmark pollen feed client
//!
//! Downloads the feed document and extracts the requested regions and
//! pollen types into a [`RawPayload`]. The feed is a Firestore-style typed
//! document, served wrapped in a JSON string.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::time::Duration;

use super::types::{RawPayload, RawPollen, RawPrediction, RawRegion};
use crate::error::{ClientError, FetchError};

pub const POLLEN_FEED_URL: &str = "https://www.astma-allergi.dk/umbraco/Api/PollenApi/GetPollenFeed";
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
const USER_AGENT: &str = concat!("pollen-backend/", env!("CARGO_PKG_VERSION"));

/// Where raw pollen data comes from
#[async_trait]
pub trait PollenSource: Send + Sync {
    /// Fetch the raw data for the given scope. Either the whole payload is
    /// returned or a classified error; never a partial result.
    async fn fetch_raw(
        &self,
        region_ids: &BTreeSet<u32>,
        pollen_ids: &BTreeSet<u32>,
    ) -> Result<RawPayload, FetchError>;
}

/// HTTP implementation of [`PollenSource`]
pub struct HttpPollenSource {
    client: Client,
    url: String,
}

impl HttpPollenSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PollenSource for HttpPollenSource {
    async fn fetch_raw(
        &self,
        region_ids: &BTreeSet<u32>,
        pollen_ids: &BTreeSet<u32>,
    ) -> Result<RawPayload, FetchError> {
        tracing::debug!("Fetching pollen feed from {}", self.url);

        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("HTTP error {} from {}", status, self.url)));
        }

        let body = response.text().await?;
        let payload = parse_feed(&body, region_ids, pollen_ids)?;

        tracing::debug!(
            "Fetched {} regions, {} pollen entries",
            payload.regions.len(),
            payload.pollen_count()
        );
        Ok(payload)
    }
}

/// Parse a feed body into the raw payload for the requested scope.
pub fn parse_feed(
    body: &str,
    region_ids: &BTreeSet<u32>,
    pollen_ids: &BTreeSet<u32>,
) -> Result<RawPayload, FetchError> {
    let mut document: Value = serde_json::from_str(body)?;

    // The endpoint serves the document as a JSON string
    if let Value::String(inner) = &document {
        document = serde_json::from_str(inner)?;
    }

    let regions = document
        .get("fields")
        .and_then(Value::as_object)
        .ok_or_else(|| FetchError::Schema("missing top-level \"fields\" object".to_string()))?;

    let mut payload = RawPayload::default();

    for &region_id in region_ids {
        let Some(region) = regions.get(&region_id.to_string()).and_then(map_fields) else {
            tracing::debug!("Region {} not present in feed", region_id);
            continue;
        };

        let Some(data) = region.get("data").and_then(map_fields) else {
            tracing::debug!("Region {} has no pollen data", region_id);
            continue;
        };

        let mut raw_region = RawRegion {
            date: region.get("date").map(scalar),
            ..Default::default()
        };

        for &pollen_id in pollen_ids {
            match data.get(&pollen_id.to_string()) {
                Some(entry) => match map_fields(entry) {
                    Some(fields) => {
                        raw_region.pollen.insert(pollen_id, raw_pollen(fields));
                    }
                    None => tracing::warn!(
                        "Pollen {} in region {} is not a map, ignoring",
                        pollen_id,
                        region_id
                    ),
                },
                None => tracing::debug!("Pollen {} not present in region {}", pollen_id, region_id),
            }
        }

        payload.regions.insert(region_id, raw_region);
    }

    Ok(payload)
}

fn raw_pollen(fields: &Map<String, Value>) -> RawPollen {
    let predictions = fields
        .get("predictions")
        .and_then(map_fields)
        .map(|days| {
            days.iter()
                .map(|(date, day)| RawPrediction {
                    date: date.clone(),
                    level: match day.get("mapValue") {
                        Some(_) => map_fields(day).and_then(|f| f.get("prediction")).map(scalar),
                        None => Some(scalar(day)),
                    },
                })
                .collect()
        })
        .unwrap_or_default();

    RawPollen {
        level: fields.get("level").map(scalar),
        date: fields.get("date").map(scalar),
        in_season: fields.get("inSeason").map(scalar),
        predictions,
    }
}

/// Fields of a `{"mapValue": {"fields": {...}}}` node. An empty map may omit
/// `fields`; a plain JSON object is accepted as-is.
fn map_fields(value: &Value) -> Option<&Map<String, Value>> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();

    let object = value.as_object()?;
    match object.get("mapValue") {
        Some(map_value) => match map_value.get("fields") {
            Some(fields) => fields.as_object(),
            None if map_value.is_object() => Some(EMPTY.get_or_init(Map::new)),
            None => None,
        },
        None => Some(object),
    }
}

/// Unwrap a typed value such as `{"integerValue": "3"}` to its scalar.
/// Anything that is not a single-key typed wrapper is returned unchanged.
fn scalar(value: &Value) -> Value {
    match value.as_object() {
        Some(object) if object.len() == 1 => match object.iter().next() {
            Some((key, inner)) if key.ends_with("Value") => inner.clone(),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}
