//! Aggregation over the result list: classification counts, per-panel and
//! per-rack coverage, category census.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{Classification, CrosscheckInput, MatchResult, TagCategory};

/// Found-in-PLC coverage for one panel or rack, over active rows only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Coverage {
    pub total: usize,
    pub matched: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrosscheckSummary {
    pub total_results: usize,
    pub devices_total: usize,
    pub devices_active: usize,
    pub devices_spare: usize,
    pub plc_records: usize,
    pub by_classification: BTreeMap<String, usize>,
    /// PLC record counts per classified category.
    pub category_census: BTreeMap<String, usize>,
    pub panel_coverage: BTreeMap<String, Coverage>,
    pub rack_coverage: BTreeMap<String, Coverage>,
}

/// BTreeMap keys keep every serialization and report ordering stable.
pub fn compute_summary(
    results: &[MatchResult],
    input: &CrosscheckInput,
    categories: &[Option<TagCategory>],
    spare: &[bool],
) -> CrosscheckSummary {
    let mut by_classification: BTreeMap<String, usize> = BTreeMap::new();
    let mut panel_coverage: BTreeMap<String, Coverage> = BTreeMap::new();
    let mut rack_coverage: BTreeMap<String, Coverage> = BTreeMap::new();

    for result in results {
        *by_classification
            .entry(result.classification.to_string())
            .or_insert(0) += 1;

        let Some(device_id) = result.device else {
            continue;
        };
        if result.classification == Classification::Spare {
            continue;
        }
        let device = &input.devices[device_id.0 as usize];
        let found = matches!(
            result.classification,
            Classification::Both | Classification::BothRackOnly
        );
        let conflict = result.classification == Classification::Conflict;

        for (key, map) in [
            (&device.panel, &mut panel_coverage),
            (&device.rack, &mut rack_coverage),
        ] {
            let label = non_empty(key);
            let cov = map.entry(label).or_default();
            cov.total += 1;
            if found {
                cov.matched += 1;
            }
            if conflict {
                cov.conflicts += 1;
            }
        }
    }

    let mut category_census: BTreeMap<String, usize> = BTreeMap::new();
    for category in categories.iter().flatten() {
        *category_census.entry(category.label().to_string()).or_insert(0) += 1;
    }

    let devices_spare = spare.iter().filter(|s| **s).count();

    CrosscheckSummary {
        total_results: results.len(),
        devices_total: input.devices.len(),
        devices_active: input.devices.len() - devices_spare,
        devices_spare,
        plc_records: input.tags.len(),
        by_classification,
        category_census,
        panel_coverage,
        rack_coverage,
    }
}

fn non_empty(cell: &str) -> String {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        "(unspecified)".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Confidence, DeviceId, IoDevice};

    fn result(classification: Classification, device: Option<u32>) -> MatchResult {
        MatchResult {
            classification,
            strategy: None,
            confidence: Confidence::None,
            device: device.map(DeviceId),
            plc_refs: Vec::new(),
            conflict: None,
            audit: Vec::new(),
        }
    }

    #[test]
    fn coverage_counts_active_rows_per_panel() {
        let input = CrosscheckInput {
            tags: Vec::new(),
            devices: vec![
                IoDevice { panel: "CP-1".into(), rack: "0".into(), ..Default::default() },
                IoDevice { panel: "CP-1".into(), rack: "0".into(), ..Default::default() },
                IoDevice { panel: "CP-2".into(), rack: "1".into(), ..Default::default() },
            ],
            layout: Vec::new(),
        };
        let results = vec![
            result(Classification::Both, Some(0)),
            result(Classification::IoListOnly, Some(1)),
            result(Classification::Conflict, Some(2)),
        ];
        let summary = compute_summary(&results, &input, &[], &[false, false, false]);

        assert_eq!(summary.devices_active, 3);
        assert_eq!(summary.by_classification["Both"], 1);
        let cp1 = &summary.panel_coverage["CP-1"];
        assert_eq!(cp1.total, 2);
        assert_eq!(cp1.matched, 1);
        let cp2 = &summary.panel_coverage["CP-2"];
        assert_eq!(cp2.conflicts, 1);
        assert_eq!(summary.rack_coverage["1"].total, 1);
    }

    #[test]
    fn spare_rows_excluded_from_coverage() {
        let input = CrosscheckInput {
            tags: Vec::new(),
            devices: vec![IoDevice { panel: "CP-1".into(), ..Default::default() }],
            layout: Vec::new(),
        };
        let results = vec![result(Classification::Spare, Some(0))];
        let summary = compute_summary(&results, &input, &[], &[true]);
        assert_eq!(summary.devices_spare, 1);
        assert_eq!(summary.devices_active, 0);
        assert!(summary.panel_coverage.is_empty());
    }
}
