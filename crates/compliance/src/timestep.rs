//! Timestep regularity analysis with a content-keyed memo.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use mlcast_common::{decode_time_variable, AttributesExt, TimeDecodeError, TimeResult, Variable};
use tracing::debug;

/// Result of analysing consecutive time differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestepAnalysis {
    /// More than one distinct interval between consecutive timesteps.
    pub is_variable: bool,
    /// Number of distinct intervals (0 with fewer than two timesteps).
    pub unique_intervals: usize,
}

/// Analyses time coordinates, memoising by content.
///
/// Two variables with the same dtype, units, calendar and values share a
/// cache entry whatever dataset they come from. Decoding errors are not
/// cached.
#[derive(Debug, Default)]
pub struct TimestepAnalyzer {
    cache: Mutex<HashMap<u64, TimestepAnalysis>>,
}

impl TimestepAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, time: &Variable) -> TimeResult<TimestepAnalysis> {
        let values = time.values.as_ref().ok_or(TimeDecodeError::ValuesUnavailable)?;
        let key = content_key(time, values);

        if let Some(hit) = self.lock().get(&key).copied() {
            return Ok(hit);
        }

        let analysis = compute(time)?;
        debug!(
            coord = %time.name,
            variable = analysis.is_variable,
            intervals = analysis.unique_intervals,
            "Analysed timesteps"
        );
        self.lock().insert(key, analysis);
        Ok(analysis)
    }

    pub fn cached_entries(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, TimestepAnalysis>> {
        // Entries are pure functions of their keys, a poisoned map is still valid.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn content_key(time: &Variable, values: &[f64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    time.dtype.hash(&mut hasher);
    time.attrs.text("units").hash(&mut hasher);
    time.attrs.text("calendar").hash(&mut hasher);
    values.len().hash(&mut hasher);
    for v in values {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

fn compute(time: &Variable) -> TimeResult<TimestepAnalysis> {
    let times = decode_time_variable(time)?;
    if times.len() < 2 {
        return Ok(TimestepAnalysis {
            is_variable: false,
            unique_intervals: 0,
        });
    }
    let intervals: BTreeSet<i64> = times
        .windows(2)
        .map(|w| (w[1] - w[0]).num_milliseconds())
        .collect();
    Ok(TimestepAnalysis {
        is_variable: intervals.len() > 1,
        unique_intervals: intervals.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mlcast_common::VariableRole;
    use serde_json::json;

    fn time(values: &[f64]) -> Variable {
        let mut v = Variable::new("time", VariableRole::Coordinate);
        v.dims = vec!["time".into()];
        v.shape = vec![values.len() as u64];
        v.dtype = "int64".into();
        v.attrs.insert("units".into(), json!("minutes since 2020-01-01"));
        v.values = Some(values.to_vec());
        v
    }

    #[test]
    fn test_regular_and_variable() {
        let analyzer = TimestepAnalyzer::new();
        let regular = analyzer.analyze(&time(&[0.0, 5.0, 10.0, 15.0])).unwrap();
        assert_eq!(regular, TimestepAnalysis { is_variable: false, unique_intervals: 1 });

        let variable = analyzer.analyze(&time(&[0.0, 5.0, 10.0, 20.0, 30.0])).unwrap();
        assert_eq!(variable, TimestepAnalysis { is_variable: true, unique_intervals: 2 });
    }

    #[test]
    fn test_single_timestep() {
        let analysis = TimestepAnalyzer::new().analyze(&time(&[0.0])).unwrap();
        assert_eq!(analysis.unique_intervals, 0);
        assert!(!analysis.is_variable);
    }

    #[test]
    fn test_cache_is_keyed_on_content() {
        let analyzer = TimestepAnalyzer::new();
        let a = time(&[0.0, 5.0, 10.0]);
        let mut b = a.clone();
        b.name = "valid_time".into();

        assert_eq!(analyzer.analyze(&a).unwrap(), analyzer.analyze(&b).unwrap());
        assert_eq!(analyzer.cached_entries(), 1);

        let c = time(&[0.0, 5.0, 15.0]);
        assert!(analyzer.analyze(&c).unwrap().is_variable);
        assert_eq!(analyzer.cached_entries(), 2);
    }

    #[test]
    fn test_units_are_part_of_the_key() {
        let analyzer = TimestepAnalyzer::new();
        let minutes = time(&[0.0, 1.0]);
        let mut hours = minutes.clone();
        hours.attrs.insert("units".into(), json!("hours since 2020-01-01"));
        analyzer.analyze(&minutes).unwrap();
        analyzer.analyze(&hours).unwrap();
        assert_eq!(analyzer.cached_entries(), 2);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let analyzer = TimestepAnalyzer::new();
        let mut bad = time(&[0.0, 1.0]);
        bad.attrs.remove("units");
        assert_eq!(analyzer.analyze(&bad), Err(TimeDecodeError::MissingUnits));
        assert_eq!(analyzer.cached_entries(), 0);

        let mut missing = time(&[]);
        missing.values = None;
        assert_eq!(analyzer.analyze(&missing), Err(TimeDecodeError::ValuesUnavailable));
    }
}
