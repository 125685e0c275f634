use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Cloud;
use crate::output::OutputRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloudSummary {
    pub total: usize,
    pub supported: usize,
    pub not_supported: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_lag_supported: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileSummary {
    pub total: usize,
    pub supported: usize,
    pub not_supported: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_lag_supported: Option<u32>,
    pub per_cloud: BTreeMap<Cloud, CloudSummary>,
}

/// Compute summary statistics over a record set.
pub fn summarize(records: &[OutputRecord]) -> ReconcileSummary {
    let mut per_cloud: BTreeMap<Cloud, CloudSummary> = BTreeMap::new();
    let mut lags: BTreeMap<Cloud, Vec<u32>> = BTreeMap::new();

    for r in records {
        let entry = per_cloud.entry(r.cloud).or_default();
        entry.total += 1;
        if r.is_supported() {
            entry.supported += 1;
            lags.entry(r.cloud).or_default().push(r.lag);
        } else {
            entry.not_supported += 1;
        }
    }

    let mut all_lags = Vec::new();
    for (cloud, mut cloud_lags) in lags {
        all_lags.extend_from_slice(&cloud_lags);
        if let Some(entry) = per_cloud.get_mut(&cloud) {
            entry.median_lag_supported = median(&mut cloud_lags);
        }
    }

    ReconcileSummary {
        total: records.len(),
        supported: per_cloud.values().map(|c| c.supported).sum(),
        not_supported: per_cloud.values().map(|c| c.not_supported).sum(),
        median_lag_supported: median(&mut all_lags),
        per_cloud,
    }
}

/// Lower median; `None` for an empty slice.
fn median(values: &mut [u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    Some(values[(values.len() - 1) / 2])
}
