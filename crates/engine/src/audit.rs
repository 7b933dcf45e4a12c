//! Per-result audit accumulation and name-conflict detection.
//!
//! Every strategy consideration lands in the trail, in priority order, so a
//! reviewer can replay exactly why a row classified the way it did.

use crate::model::{AuditEntry, AuditOutcome, ConflictDetail, StrategyId, TagId};

/// Ordered accumulator for one result's audit trail. Entries are append-only
/// and frozen when the trail is taken.
#[derive(Debug, Default)]
pub struct AuditTrail {
    entries: Vec<AuditEntry>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matched(&mut self, strategy: StrategyId, key: &str, evidence: Option<TagId>, note: &str) {
        self.push(Some(strategy), AuditOutcome::Matched, key, evidence, note);
    }

    pub fn failed(&mut self, strategy: StrategyId, key: &str, note: &str) {
        self.push(Some(strategy), AuditOutcome::Failed, key, None, note);
    }

    pub fn skipped(&mut self, strategy: StrategyId, note: &str) {
        self.push(Some(strategy), AuditOutcome::Skipped, "", None, note);
    }

    /// Engine-level entry with no strategy attached (spare short-circuit,
    /// PLC-only sweep).
    pub fn engine(&mut self, outcome: AuditOutcome, key: &str, evidence: Option<TagId>, note: &str) {
        self.push(None, outcome, key, evidence, note);
    }

    /// Rack-layout supporting annotation (strategy 6).
    pub fn annotation(&mut self, outcome: AuditOutcome, key: &str, note: &str) {
        self.push(Some(StrategyId::RackLayout), outcome, key, None, note);
    }

    fn push(
        &mut self,
        strategy: Option<StrategyId>,
        outcome: AuditOutcome,
        key: &str,
        evidence: Option<TagId>,
        note: &str,
    ) {
        self.entries.push(AuditEntry {
            strategy,
            outcome,
            key: key.to_string(),
            evidence,
            note: note.to_string(),
        });
    }

    pub fn into_entries(self) -> Vec<AuditEntry> {
        self.entries
    }
}

// ---------------------------------------------------------------------------
// Conflict detection
// ---------------------------------------------------------------------------

/// True when a COMMENT description (trimmed, upper-cased) agrees with either
/// of the row's canonical names. Full-string equality only.
pub fn description_agrees(desc_upper: &str, io_key: &str, device_key: &str) -> bool {
    (!io_key.is_empty() && desc_upper == io_key)
        || (!device_key.is_empty() && desc_upper == device_key)
}

/// Build the detail attached to a Conflict result: both sides of the
/// disagreement plus the canonical address they share.
pub fn name_conflict(address: &str, io_name: &str, plc_names: Vec<String>) -> ConflictDetail {
    ConflictDetail {
        address: address.to_string(),
        io_name: io_name.to_string(),
        plc_names,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agreement_requires_full_string_equality() {
        assert!(description_agrees("HLSTL5A", "HLSTL5A", ""));
        assert!(description_agrees("TSV22", "", "TSV22"));
        // Substring is never enough
        assert!(!description_agrees("LT611", "LT6110", ""));
        assert!(!description_agrees("LT6110", "LT611", ""));
        // Empty keys never agree
        assert!(!description_agrees("", "", ""));
    }

    #[test]
    fn trail_preserves_order() {
        let mut trail = AuditTrail::new();
        trail.failed(StrategyId::DirectClxAddress, "RACK0:I.DATA[5].7", "no COMMENT at address");
        trail.skipped(StrategyId::Plc5RackAddress, "address format is not PLC5");
        trail.matched(StrategyId::EnetModule, "P621", Some(TagId(3)), "ENet module tag");
        let entries = trail.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].strategy, Some(StrategyId::DirectClxAddress));
        assert_eq!(entries[2].evidence, Some(TagId(3)));
    }
}
