use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Feed content for the requested scope, still uninterpreted.
///
/// Scalars are kept as the JSON values found in the feed so the normalizer
/// can decide per entity what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPayload {
    /// Region id -> region data. Requested regions missing upstream are absent.
    pub regions: BTreeMap<u32, RawRegion>,
}

impl RawPayload {
    pub fn pollen_count(&self) -> usize {
        self.regions.values().map(|r| r.pollen.len()).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRegion {
    /// Region-wide measurement date
    pub date: Option<Value>,
    /// Pollen id -> pollen data. Requested pollen missing upstream are absent.
    pub pollen: BTreeMap<u32, RawPollen>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPollen {
    pub level: Option<Value>,
    /// Overrides the region date when present
    pub date: Option<Value>,
    pub in_season: Option<Value>,
    /// In feed order
    pub predictions: Vec<RawPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub date: String,
    pub level: Option<Value>,
}
