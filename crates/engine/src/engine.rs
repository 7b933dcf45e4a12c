//! Run orchestration: classify → index → cascade → PLC-only sweep →
//! summary, then an invariant verification pass over the output.

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use crate::audit::AuditTrail;
use crate::cascade::{Cascade, DeviceCtx};
use crate::classify::{Classifier, ClassifyOutcome};
use crate::config::CrosscheckConfig;
use crate::error::CrosscheckError;
use crate::index::TagIndex;
use crate::model::{
    AuditOutcome, Classification, Confidence, CrosscheckInput, CrosscheckResult, DeviceId,
    Diagnostic, MatchResult, TagCategory, TagId,
};
use crate::normalize::{Normalizer, RackKey};
use crate::summary::compute_summary;

/// Run the crosscheck. Input order is preserved everywhere: device results
/// come out in row order, PLC-only results in record order, so two runs over
/// identical input serialize identically.
pub fn run(
    config: &CrosscheckConfig,
    input: &CrosscheckInput,
) -> Result<CrosscheckResult, CrosscheckError> {
    config.validate()?;

    let normalizer = Normalizer::new(config);
    let classifier = Classifier::new(config);

    // Intake: classify every PLC record, collecting per-record diagnostics.
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut categories: Vec<Option<TagCategory>> = Vec::with_capacity(input.tags.len());
    for tag in &input.tags {
        match classifier.classify(tag, &normalizer) {
            ClassifyOutcome::Category(category) => categories.push(Some(category)),
            ClassifyOutcome::CategoryWithNote(category, note) => {
                diagnostics.push(Diagnostic {
                    source_line: tag.source_line,
                    message: note,
                });
                categories.push(Some(category));
            }
            ClassifyOutcome::Skip(reason) => {
                diagnostics.push(Diagnostic {
                    source_line: tag.source_line,
                    message: format!("record skipped: {reason}"),
                });
                categories.push(None);
            }
        }
    }

    let index = TagIndex::build(&input.tags, &categories, &input.layout, &normalizer);
    let cascade = Cascade::new(&input.tags);

    let spare: Vec<bool> = input.devices.iter().map(|d| classifier.is_spare(d)).collect();

    let mut claimed: BTreeSet<TagId> = BTreeSet::new();
    let mut rack_evidence: FxHashSet<RackKey> = FxHashSet::default();
    let mut results: Vec<MatchResult> = Vec::with_capacity(input.devices.len());

    for (i, device) in input.devices.iter().enumerate() {
        let device_id = DeviceId(i as u32);

        if spare[i] {
            let mut trail = AuditTrail::new();
            trail.engine(
                AuditOutcome::Skipped,
                "",
                None,
                "spare row; cascade not evaluated",
            );
            results.push(MatchResult {
                classification: Classification::Spare,
                strategy: None,
                confidence: Confidence::None,
                device: Some(device_id),
                plc_refs: Vec::new(),
                conflict: None,
                audit: trail.into_entries(),
            });
            continue;
        }

        let ctx = DeviceCtx::new(device_id, device, &normalizer);
        let outcome = cascade.evaluate(&ctx, &index);

        claimed.extend(outcome.claims.iter().copied());
        if let Some(rack) = outcome.rack_evidence {
            rack_evidence.insert(rack);
        }

        results.push(MatchResult {
            classification: outcome.classification,
            strategy: outcome.strategy,
            confidence: outcome.confidence,
            device: Some(device_id),
            plc_refs: outcome.plc_refs,
            conflict: outcome.conflict,
            audit: outcome.audit,
        });
    }

    sweep_plc_only(input, &categories, &claimed, &rack_evidence, &mut results);

    let conflicts: Vec<usize> = results
        .iter()
        .enumerate()
        .filter(|(_, r)| r.classification == Classification::Conflict)
        .map(|(i, _)| i)
        .collect();

    let summary = compute_summary(&results, input, &categories, &spare);

    verify_invariants(&results, input, &categories, &spare, &claimed)?;

    Ok(CrosscheckResult {
        summary,
        results,
        conflicts,
        diagnostics,
    })
}

// ---------------------------------------------------------------------------
// PLC-only sweep
// ---------------------------------------------------------------------------

fn sweep_plc_only(
    input: &CrosscheckInput,
    categories: &[Option<TagCategory>],
    claimed: &BTreeSet<TagId>,
    rack_evidence: &FxHashSet<RackKey>,
    results: &mut Vec<MatchResult>,
) {
    for (i, tag) in input.tags.iter().enumerate() {
        let id = TagId(i as u32);
        let Some(category) = &categories[i] else {
            continue;
        };
        if !category.is_io_relevant() || claimed.contains(&id) {
            continue;
        }

        let (key, note) = match category {
            TagCategory::RackIo(rack) => {
                if rack_evidence.contains(rack) {
                    // The rack tag was the (shared) evidence for its devices;
                    // it is consumed, not PLC-only.
                    continue;
                }
                (rack.to_string(), "rack TAG with no IO List evidence for its rack")
            }
            TagCategory::EnetDevice { device } => {
                (device.clone(), "expected PLC-only (overload/VFD)")
            }
            TagCategory::BitComment(addr) => (
                addr.to_string(),
                "bit-level COMMENT unclaimed by any IO List row",
            ),
            TagCategory::IoModule => (
                tag.name.trim().to_string(),
                "IO module TAG unclaimed by any IO List row",
            ),
            TagCategory::Alias | TagCategory::Program => unreachable!("not IO-relevant"),
        };

        let mut trail = AuditTrail::new();
        trail.engine(AuditOutcome::Matched, &key, Some(id), note);
        results.push(MatchResult {
            classification: Classification::PlcOnly,
            strategy: None,
            confidence: Confidence::None,
            device: None,
            plc_refs: vec![id],
            conflict: None,
            audit: trail.into_entries(),
        });
    }
}

// ---------------------------------------------------------------------------
// Invariant verification
// ---------------------------------------------------------------------------

/// Structural checks over the finished result list. A failure here is a bug
/// in the engine, never in the input, and aborts the run.
fn verify_invariants(
    results: &[MatchResult],
    input: &CrosscheckInput,
    categories: &[Option<TagCategory>],
    spare: &[bool],
    claimed: &BTreeSet<TagId>,
) -> Result<(), CrosscheckError> {
    let invariant = |msg: String| Err(CrosscheckError::InternalInvariant(msg));

    // Exactly one result per IO row, spare rows classified Spare.
    let mut device_seen = vec![0usize; input.devices.len()];
    for result in results {
        if let Some(device_id) = result.device {
            device_seen[device_id.0 as usize] += 1;
            let is_spare_row = spare[device_id.0 as usize];
            match result.classification {
                Classification::Spare if !is_spare_row => {
                    return invariant(format!("row {} classified Spare but not spare", device_id.0));
                }
                Classification::PlcOnly => {
                    return invariant(format!("row {} classified PlcOnly", device_id.0));
                }
                _ if is_spare_row && result.classification != Classification::Spare => {
                    return invariant(format!("spare row {} classified {}", device_id.0, result.classification));
                }
                _ => {}
            }
        }
    }
    if let Some(missing) = device_seen.iter().position(|n| *n != 1) {
        return invariant(format!(
            "row {missing} referenced by {} results, expected 1",
            device_seen[missing]
        ));
    }

    let mut plc_only_seen: FxHashSet<TagId> = FxHashSet::default();
    for result in results {
        // Matches carry evidence.
        match result.classification {
            Classification::Both | Classification::BothRackOnly => {
                if result.plc_refs.is_empty() {
                    return invariant(format!("{} result without PLC references", result.classification));
                }
            }
            Classification::Conflict => {
                if result.plc_refs.is_empty() || result.conflict.is_none() {
                    return invariant("Conflict result missing references or detail".into());
                }
            }
            _ => {}
        }

        // Confidence provenance.
        let strategy_number = result.strategy.map(|s| s.number());
        match result.confidence {
            Confidence::Exact => {
                if !matches!(strategy_number, Some(1) | Some(2) | Some(4)) {
                    return invariant("Exact confidence without an Exact-class strategy".into());
                }
            }
            Confidence::High => {
                if strategy_number != Some(5) {
                    return invariant("High confidence outside strategy 5".into());
                }
            }
            _ => {}
        }
        if result.classification == Classification::BothRackOnly && strategy_number != Some(3) {
            return invariant("BothRackOnly outside strategy 3".into());
        }

        // References stay inside the input and off Program records.
        for id in &result.plc_refs {
            let Some(category) = categories.get(id.0 as usize).and_then(|c| c.as_ref()) else {
                return invariant(format!("reference to skipped record {}", id.0));
            };
            if *category == TagCategory::Program {
                return invariant(format!("Program record {} referenced by a result", id.0));
            }
        }

        if result.classification == Classification::PlcOnly {
            for id in &result.plc_refs {
                if claimed.contains(id) {
                    return invariant(format!("claimed record {} surfaced as PlcOnly", id.0));
                }
                if !plc_only_seen.insert(*id) {
                    return invariant(format!("record {} in two PlcOnly results", id.0));
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IoDevice, PlcTag, RecordBody};

    fn tag(name: &str, datatype: &str) -> PlcTag {
        PlcTag {
            scope: String::new(),
            name: name.into(),
            base_name: name.split(':').next().unwrap_or(name).into(),
            description: String::new(),
            source_line: 1,
            body: RecordBody::Tag {
                datatype: datatype.into(),
            },
        }
    }

    fn comment(specifier: &str, description: &str) -> PlcTag {
        PlcTag {
            scope: String::new(),
            name: "Rack0:I".into(),
            base_name: "Rack0".into(),
            description: description.into(),
            source_line: 2,
            body: RecordBody::Comment {
                specifier: specifier.into(),
            },
        }
    }

    fn device(address: &str, io_tag: &str, device_tag: &str) -> IoDevice {
        IoDevice {
            plc_address: address.into(),
            io_tag: io_tag.into(),
            device_tag: device_tag.into(),
            ..Default::default()
        }
    }

    #[test]
    fn spare_rows_short_circuit() {
        let input = CrosscheckInput {
            tags: Vec::new(),
            devices: vec![device("Rack0_Group0_Slot0_IO.READ[14]", "Spare", "")],
            layout: Vec::new(),
        };
        let result = run(&CrosscheckConfig::default(), &input).unwrap();
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].classification, Classification::Spare);
        assert_eq!(result.results[0].strategy, None);
        assert!(result.results[0].plc_refs.is_empty());
    }

    #[test]
    fn unclaimed_enet_tag_sweeps_to_plc_only() {
        let input = CrosscheckInput {
            tags: vec![tag("E300_P9203:I", "AB_E300:I:0")],
            devices: Vec::new(),
            layout: Vec::new(),
        };
        let result = run(&CrosscheckConfig::default(), &input).unwrap();
        assert_eq!(result.results.len(), 1);
        let r = &result.results[0];
        assert_eq!(r.classification, Classification::PlcOnly);
        assert!(r.audit[0].note.contains("expected PLC-only (overload/VFD)"));
        assert_eq!(r.plc_refs, vec![TagId(0)]);
    }

    #[test]
    fn rack_tag_consumed_by_rack_only_evidence() {
        let input = CrosscheckInput {
            tags: vec![tag("Rack0:I", "AB:1756_IB32:I:0")],
            devices: vec![device("Rack0:I.Data[6].0", "AS611_AUX", "AS611_AUX")],
            layout: Vec::new(),
        };
        let result = run(&CrosscheckConfig::default(), &input).unwrap();
        // BothRackOnly for the row; the rack tag does not also show PLC-only.
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].classification, Classification::BothRackOnly);
    }

    #[test]
    fn rack_tag_with_no_evidence_is_plc_only() {
        let input = CrosscheckInput {
            tags: vec![tag("Rack7:O", "AB:1756_OB32:O:0")],
            devices: Vec::new(),
            layout: Vec::new(),
        };
        let result = run(&CrosscheckConfig::default(), &input).unwrap();
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].classification, Classification::PlcOnly);
    }

    #[test]
    fn comment_without_specifier_becomes_diagnostic() {
        let input = CrosscheckInput {
            tags: vec![comment("", "orphan")],
            devices: Vec::new(),
            layout: Vec::new(),
        };
        let result = run(&CrosscheckConfig::default(), &input).unwrap();
        assert!(result.results.is_empty());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("skipped"));
    }

    #[test]
    fn reruns_are_identical() {
        let input = CrosscheckInput {
            tags: vec![
                comment("Rack0:I.DATA[5].7", "HLSTL5A"),
                tag("E300_P621:I", "AB_E300:I:0"),
                tag("E300_P9203:I", "AB_E300:I:0"),
            ],
            devices: vec![
                device("Rack0:I.Data[5].7", "HLSTL5A", "HLSTL5A"),
                device("", "P621", "P621"),
            ],
            layout: Vec::new(),
        };
        let config = CrosscheckConfig::default();
        let a = run(&config, &input).unwrap();
        let b = run(&config, &input).unwrap();
        let a_json = serde_json::to_string(&a.results).unwrap();
        let b_json = serde_json::to_string(&b.results).unwrap();
        assert_eq!(a_json, b_json);
    }
}
