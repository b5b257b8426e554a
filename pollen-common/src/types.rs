use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Highest level accepted from the feed. Current values are grain counts
/// per m³, predictions are small category numbers.
pub const MAX_LEVEL: u32 = 9999;

/// Pollen level as reported upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum Level {
    /// Upstream had no measurement or forecast
    #[default]
    NoData,
    Value(u32),
}

impl Level {
    pub fn value(&self) -> Option<u32> {
        match self {
            Level::NoData => None,
            Level::Value(v) => Some(*v),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Level::NoData)
    }
}

impl From<Option<u32>> for Level {
    fn from(value: Option<u32>) -> Self {
        value.map_or(Level::NoData, Level::Value)
    }
}

impl From<Level> for Option<u32> {
    fn from(level: Level) -> Self {
        level.value()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::NoData => write!(f, "no data"),
            Level::Value(v) => write!(f, "{}", v),
        }
    }
}

/// One forecast entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub date: NaiveDate,
    pub level: Level,
}

impl Prediction {
    pub fn new(date: NaiveDate, level: Level) -> Self {
        Self { date, level }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

/// Everything a refresh knows about one pollen type. Applied to a
/// [`PollenType`] as a whole so the fields never drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollenReading {
    pub level: Level,
    pub date: Option<NaiveDate>,
    pub in_season: bool,
    /// Chronological
    pub predictions: Vec<Prediction>,
}

/// A tracked pollen type within one region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollenType {
    id: u32,
    name: String,
    level: Level,
    date: Option<NaiveDate>,
    in_season: bool,
    predictions: Vec<Prediction>,
}

impl PollenType {
    /// A pollen type with nothing known yet
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            level: Level::NoData,
            date: None,
            in_season: false,
            predictions: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn in_season(&self) -> bool {
        self.in_season
    }

    pub fn predictions(&self) -> &[Prediction] {
        &self.predictions
    }

    /// Replace every refreshable field at once
    pub fn apply(&mut self, reading: PollenReading) {
        self.level = reading.level;
        self.date = reading.date;
        self.in_season = reading.in_season;
        self.predictions = reading.predictions;
    }
}

/// A tracked geographic region and its pollen types, keyed by pollen id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    id: u32,
    name: String,
    pollen_types: BTreeMap<u32, PollenType>,
}

impl Region {
    pub fn new(id: u32, name: impl Into<String>, pollen_types: Vec<PollenType>) -> Self {
        Self {
            id,
            name: name.into(),
            pollen_types: pollen_types.into_iter().map(|p| (p.id(), p)).collect(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// First word of the display name, e.g. "Vest" for "Vest for Storebælt"
    pub fn short_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }

    /// Pollen types ordered by id
    pub fn pollen_types(&self) -> impl Iterator<Item = &PollenType> {
        self.pollen_types.values()
    }

    pub fn pollen_count(&self) -> usize {
        self.pollen_types.len()
    }

    pub fn get_pollen_type_by_id(&self, id: u32) -> Option<&PollenType> {
        self.pollen_types.get(&id)
    }

    pub fn get_pollen_type_mut(&mut self, id: u32) -> Option<&mut PollenType> {
        self.pollen_types.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_level_serializes_as_nullable_integer() {
        assert_eq!(serde_json::to_string(&Level::Value(3)).unwrap(), "3");
        assert_eq!(serde_json::to_string(&Level::NoData).unwrap(), "null");
        let level: Level = serde_json::from_str("null").unwrap();
        assert!(level.is_no_data());
    }

    #[test]
    fn test_new_pollen_type_is_empty() {
        let pollen = PollenType::new(7, "Birk");
        assert_eq!(pollen.level(), Level::NoData);
        assert_eq!(pollen.date(), None);
        assert!(!pollen.in_season());
        assert!(pollen.predictions().is_empty());
    }

    #[test]
    fn test_apply_replaces_all_fields() {
        let mut pollen = PollenType::new(7, "Birk");
        pollen.apply(PollenReading {
            level: Level::Value(42),
            date: Some(date(2026, 4, 20)),
            in_season: true,
            predictions: vec![Prediction::new(date(2026, 4, 21), Level::Value(3))],
        });
        assert_eq!(pollen.level(), Level::Value(42));
        assert!(pollen.in_season());
        assert_eq!(pollen.predictions().len(), 1);

        pollen.apply(PollenReading::default());
        assert_eq!(pollen.level(), Level::NoData);
        assert!(pollen.predictions().is_empty());
        assert_eq!(pollen.name(), "Birk");
    }

    #[test]
    fn test_region_lookup() {
        let region = Region::new(
            49,
            "Vest for Storebælt",
            vec![PollenType::new(28, "Græs"), PollenType::new(7, "Birk")],
        );
        assert_eq!(region.short_name(), "Vest");
        assert_eq!(region.pollen_count(), 2);
        assert_eq!(region.get_pollen_type_by_id(7).map(|p| p.name()), Some("Birk"));
        assert!(region.get_pollen_type_by_id(1).is_none());

        let ids: Vec<u32> = region.pollen_types().map(|p| p.id()).collect();
        assert_eq!(ids, vec![7, 28]);
    }
}
