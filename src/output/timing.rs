//! Response latency report
//!
//! Collected for every written pair and saved once per run. The report holds
//! nothing but values derived from the logs, so re-running over unchanged
//! logs reproduces it byte for byte.

use super::writer::WriteError;
use crate::pairing::RequestResponsePair;
use crate::prompt::PromptType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub const TIMING_REPORT_FILE: &str = "response_timing_data.json";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingEntry {
    pub id: String,
    pub prompt_type: PromptType,
    pub request_timestamp: String,
    pub response_timestamp: String,
    pub response_time: Option<f64>,
}

/// Latency statistics for one prompt type, in seconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeTiming {
    pub count: usize,
    pub average: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation; 0 with a single measurement
    pub std_dev: f64,
}

impl TypeTiming {
    fn from_times(times: &[f64]) -> Option<Self> {
        if times.is_empty() {
            return None;
        }

        let mut sorted = times.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let average = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };
        let std_dev = if count > 1 {
            let variance = sorted.iter().map(|t| (t - average).powi(2)).sum::<f64>()
                / (count - 1) as f64;
            variance.sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            average,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            std_dev,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingReport {
    pub total_responses: usize,
    pub responses_with_timing: usize,
    pub average_response_time: Option<f64>,
    pub min_response_time: Option<f64>,
    pub max_response_time: Option<f64>,
    pub by_prompt_type: BTreeMap<PromptType, TypeTiming>,
    pub responses: Vec<TimingEntry>,
}

#[derive(Debug, Default)]
pub struct TimingCollector {
    entries: Vec<TimingEntry>,
}

impl TimingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, pair: &RequestResponsePair) {
        self.entries.push(TimingEntry {
            id: pair.id().to_string(),
            prompt_type: pair.prompt_type(),
            request_timestamp: pair.request.record.timestamp.clone(),
            response_timestamp: pair.response.timestamp.clone(),
            response_time: pair.response_time(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn report(&self) -> TimingReport {
        let timed: Vec<f64> = self.entries.iter().filter_map(|e| e.response_time).collect();
        let overall = TypeTiming::from_times(&timed);

        let mut per_type: BTreeMap<PromptType, Vec<f64>> = BTreeMap::new();
        for entry in &self.entries {
            if let Some(time) = entry.response_time {
                per_type.entry(entry.prompt_type).or_default().push(time);
            }
        }

        TimingReport {
            total_responses: self.entries.len(),
            responses_with_timing: timed.len(),
            average_response_time: overall.as_ref().map(|t| t.average),
            min_response_time: overall.as_ref().map(|t| t.min),
            max_response_time: overall.as_ref().map(|t| t.max),
            by_prompt_type: per_type
                .into_iter()
                .filter_map(|(prompt_type, times)| {
                    TypeTiming::from_times(&times).map(|stats| (prompt_type, stats))
                })
                .collect(),
            responses: self.entries.clone(),
        }
    }

    /// Writes the report to `<root>/response_timing_data.json`.
    pub fn write(&self, root: &Path) -> Result<PathBuf, WriteError> {
        let path = root.join(TIMING_REPORT_FILE);
        let report = self.report();

        let mut json =
            serde_json::to_string_pretty(&report).map_err(|source| WriteError::Serialize {
                path: path.clone(),
                source,
            })?;
        json.push('\n');

        std::fs::write(&path, json).map_err(|source| WriteError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            responses = report.total_responses,
            timed = report.responses_with_timing,
            "Saved timing report"
        );
        Ok(path)
    }
}
