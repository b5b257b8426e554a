//! Feed normalization
//!
//! Turns a [`RawPayload`] into [`PollenReading`]s and publishes them into the
//! store. Problems with one entity skip that entity only; entities missing
//! from the payload keep their previous state.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use pollen_common::{Level, MAX_LEVEL, PollenReading, Prediction};

use super::store::PollenStore;
use super::types::{RawPayload, RawPollen};
use crate::error::{EntitySkipped, SkipReason};

/// Upstream marker for "no measurement"
const NO_DATA_SENTINEL: i64 = -1;

/// Outcome of one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Pollen types whose fields were replaced
    pub updated: usize,
    /// Pollen types in the payload that could not be interpreted
    pub skipped: Vec<EntitySkipped>,
    /// Entries in the payload for pollen types the store does not track
    pub untracked: usize,
}

/// Normalize `raw` and publish the result into `store` in one step.
pub async fn normalize(raw: &RawPayload, store: &PollenStore) -> NormalizeReport {
    let mut readings = Vec::with_capacity(raw.pollen_count());
    let mut skipped = Vec::new();

    for (&region_id, region) in &raw.regions {
        for (&pollen_id, pollen) in &region.pollen {
            match normalize_pollen(pollen, region.date.as_ref()) {
                Ok(reading) => readings.push(((region_id, pollen_id), reading)),
                Err(reason) => {
                    let entity = EntitySkipped { region_id, pollen_id, reason };
                    warn!("{}", entity);
                    skipped.push(entity);
                }
            }
        }
    }

    let parsed = readings.len();
    let updated = store.apply(readings).await;

    let report = NormalizeReport {
        updated,
        skipped,
        untracked: parsed - updated,
    };
    debug!(
        "Normalized payload: {} updated, {} skipped, {} untracked",
        report.updated,
        report.skipped.len(),
        report.untracked
    );
    report
}

/// Interpret one raw pollen entry. `region_date` is used when the entry has
/// no date of its own.
pub fn normalize_pollen(
    raw: &RawPollen,
    region_date: Option<&Value>,
) -> Result<PollenReading, SkipReason> {
    let level = match &raw.level {
        Some(value) => parse_level(value).ok_or_else(|| SkipReason::InvalidLevel(value.to_string()))?,
        // Absent is not the same as an explicit "no data"
        None => return Err(SkipReason::MissingLevel),
    };

    let date = match raw.date.as_ref().or(region_date) {
        Some(Value::Null) | None => None,
        Some(value) => Some(
            value
                .as_str()
                .and_then(parse_date)
                .ok_or_else(|| SkipReason::InvalidDate(value.to_string()))?,
        ),
    };

    let in_season = match &raw.in_season {
        Some(Value::Bool(b)) => *b,
        Some(Value::Null) | None => false,
        Some(other) => return Err(SkipReason::InvalidSeason(other.to_string())),
    };

    // Keyed by date: chronological, later duplicates win
    let mut predictions = BTreeMap::new();
    for prediction in &raw.predictions {
        let Some(day) = parse_date(&prediction.date) else {
            warn!("Dropping prediction with invalid date {:?}", prediction.date);
            continue;
        };
        let level = match &prediction.level {
            Some(value) => match parse_level(value) {
                Some(level) => level,
                None => {
                    warn!("Dropping prediction for {} with invalid level {}", day, value);
                    continue;
                }
            },
            None => Level::NoData,
        };
        predictions.insert(day, level);
    }

    Ok(PollenReading {
        level,
        date,
        in_season,
        predictions: predictions
            .into_iter()
            .map(|(date, level)| Prediction::new(date, level))
            .collect(),
    })
}

/// Parse a level from a JSON number or numeric string.
///
/// `null`, an empty string and the `-1` sentinel mean no data. Returns `None`
/// for anything else outside `0..=MAX_LEVEL`.
pub fn parse_level(value: &Value) -> Option<Level> {
    let number = match value {
        Value::Null => return Some(Level::NoData),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => integral(n.as_f64()?)?,
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(Level::NoData);
            }
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => integral(s.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };

    if number == NO_DATA_SENTINEL {
        return Some(Level::NoData);
    }
    u32::try_from(number)
        .ok()
        .filter(|&n| n <= MAX_LEVEL)
        .map(Level::Value)
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

/// Accepts `YYYY-MM-DD`, `DD-MM-YYYY` and RFC 3339 timestamps.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%d-%m-%Y"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}
