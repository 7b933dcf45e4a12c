//! Priority-ordered rule cascade.
//!
//! Strategies 1–5 are a closed, fixed array; the first non-None outcome
//! fixes the classification and later strategies are recorded as skipped.
//! Strategy 6 (rack layout) is a supporting annotation and never decides.

use crate::audit::{description_agrees, name_conflict, AuditTrail};
use crate::index::{layout_key, TagIndex};
use crate::model::{
    AddressFormat, AuditEntry, AuditOutcome, Classification, Confidence, ConflictDetail, DeviceId,
    IoDevice, PlcTag, StrategyId, TagId,
};
use crate::normalize::{ClxAddress, Normalizer, Plc5Address, RackKey};

pub const CASCADE: [StrategyId; 5] = [
    StrategyId::DirectClxAddress,
    StrategyId::Plc5RackAddress,
    StrategyId::RackLevelTag,
    StrategyId::EnetModule,
    StrategyId::TagNameNormalization,
];

// ---------------------------------------------------------------------------
// Per-device context
// ---------------------------------------------------------------------------

/// Everything a strategy needs about one IO row, canonicalized once.
pub struct DeviceCtx<'a> {
    pub id: DeviceId,
    pub device: &'a IoDevice,
    pub format: AddressFormat,
    pub clx: Option<ClxAddress>,
    pub plc5: Option<Plc5Address>,
    /// Canonical io-tag; empty when the cell is empty.
    pub io_key: String,
    /// Canonical device-tag; empty when the cell is empty.
    pub device_key: String,
}

impl<'a> DeviceCtx<'a> {
    pub fn new(id: DeviceId, device: &'a IoDevice, normalizer: &Normalizer) -> Self {
        let clx = normalizer.parse_clx(&device.plc_address);
        let plc5 = normalizer.parse_plc5(&device.plc_address);
        let format = if clx.is_some() {
            AddressFormat::Clx
        } else if plc5.is_some() {
            AddressFormat::Plc5
        } else {
            AddressFormat::Unknown
        };
        Self {
            id,
            device,
            format,
            clx,
            plc5,
            io_key: canon_cell(&device.io_tag, normalizer),
            device_key: canon_cell(&device.device_tag, normalizer),
        }
    }

    /// The row's display name for conflict details: device tag, falling back
    /// to io tag.
    fn display_name(&self) -> &str {
        let dev = self.device.device_tag.trim();
        if !dev.is_empty() {
            dev
        } else {
            self.device.io_tag.trim()
        }
    }
}

fn canon_cell(cell: &str, normalizer: &Normalizer) -> String {
    if cell.trim().is_empty() {
        String::new()
    } else {
        normalizer.canon_tag(cell)
    }
}

// ---------------------------------------------------------------------------
// Strategy outcomes
// ---------------------------------------------------------------------------

enum StrategyOutcome {
    Matched(Matched),
    NoMatch { key: String, note: String },
    NotApplicable { note: String },
}

struct Matched {
    classification: Classification,
    confidence: Confidence,
    plc_refs: Vec<TagId>,
    conflict: Option<ConflictDetail>,
    key: String,
    note: String,
    /// Strategy 3 leaves its rack parents unclaimed; everything else
    /// consumes its references.
    claims: bool,
}

/// What the cascade decided for one IO row.
pub struct CascadeOutcome {
    pub classification: Classification,
    pub strategy: Option<StrategyId>,
    pub confidence: Confidence,
    pub plc_refs: Vec<TagId>,
    pub conflict: Option<ConflictDetail>,
    pub audit: Vec<AuditEntry>,
    /// References to mark consumed when the winning strategy claims.
    pub claims: Vec<TagId>,
    /// Rack parent that gained IO List evidence from this row, if any.
    pub rack_evidence: Option<RackKey>,
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

pub struct Cascade<'a> {
    tags: &'a [PlcTag],
}

impl<'a> Cascade<'a> {
    pub fn new(tags: &'a [PlcTag]) -> Self {
        Self { tags }
    }

    pub fn evaluate(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> CascadeOutcome {
        let mut trail = AuditTrail::new();
        let mut winner: Option<(StrategyId, Matched)> = None;

        for strategy in CASCADE {
            if winner.is_some() {
                trail.skipped(strategy, "skipped: earlier success");
                continue;
            }
            match self.run_strategy(strategy, ctx, index) {
                StrategyOutcome::Matched(m) => {
                    trail.matched(strategy, &m.key, m.plc_refs.first().copied(), &m.note);
                    winner = Some((strategy, m));
                }
                StrategyOutcome::NoMatch { key, note } => trail.failed(strategy, &key, &note),
                StrategyOutcome::NotApplicable { note } => trail.skipped(strategy, &note),
            }
        }

        self.annotate_layout(ctx, index, &mut trail);

        let rack_evidence = match &winner {
            Some((StrategyId::DirectClxAddress | StrategyId::RackLevelTag, _)) => {
                ctx.clx.map(|a| a.rack_key())
            }
            _ => None,
        };

        match winner {
            Some((strategy, m)) => CascadeOutcome {
                classification: m.classification,
                strategy: Some(strategy),
                confidence: m.confidence,
                claims: if m.claims { m.plc_refs.clone() } else { Vec::new() },
                plc_refs: m.plc_refs,
                conflict: m.conflict,
                audit: trail.into_entries(),
                rack_evidence,
            },
            None => CascadeOutcome {
                classification: Classification::IoListOnly,
                strategy: None,
                confidence: Confidence::None,
                plc_refs: Vec::new(),
                conflict: None,
                audit: trail.into_entries(),
                claims: Vec::new(),
                rack_evidence: None,
            },
        }
    }

    fn run_strategy(
        &self,
        strategy: StrategyId,
        ctx: &DeviceCtx<'_>,
        index: &TagIndex,
    ) -> StrategyOutcome {
        match strategy {
            StrategyId::DirectClxAddress => self.direct_clx(ctx, index),
            StrategyId::Plc5RackAddress => self.plc5_rack(ctx, index),
            StrategyId::RackLevelTag => self.rack_level(ctx, index),
            StrategyId::EnetModule => self.enet_module(ctx, index),
            StrategyId::TagNameNormalization => self.tag_name(ctx, index),
            // Not part of the cascade array; handled by annotate_layout.
            StrategyId::RackLayout => unreachable!("strategy 6 never runs in the cascade"),
        }
    }

    // -- Strategy 1 --------------------------------------------------------

    fn direct_clx(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> StrategyOutcome {
        let (AddressFormat::Clx, Some(addr)) = (ctx.format, ctx.clx) else {
            return StrategyOutcome::NotApplicable {
                note: "address format is not CLX".into(),
            };
        };
        let key = addr.to_string();

        let hits = match index.by_clx_address.get(&addr) {
            Some(hits) if !hits.is_empty() => hits,
            _ => {
                return StrategyOutcome::NoMatch {
                    key,
                    note: "no COMMENT record at address".into(),
                }
            }
        };

        if hits.len() > 1 {
            // Duplicate comment records at one address always need review.
            let names: Vec<String> = hits
                .iter()
                .map(|id| self.tags[id.0 as usize].description.trim().to_string())
                .collect();
            return StrategyOutcome::Matched(Matched {
                classification: Classification::Conflict,
                confidence: Confidence::Exact,
                plc_refs: hits.clone(),
                conflict: Some(name_conflict(&key, ctx.display_name(), names)),
                key,
                note: format!("{} COMMENT records share this address", hits.len()),
                claims: true,
            });
        }

        let id = hits[0];
        let description = self.tags[id.0 as usize].description.trim();
        let desc_upper = description.to_ascii_uppercase();

        if desc_upper.is_empty() {
            return StrategyOutcome::Matched(Matched {
                classification: Classification::Both,
                confidence: Confidence::Partial,
                plc_refs: vec![id],
                conflict: None,
                key,
                note: "description-absent".into(),
                claims: true,
            });
        }

        if ctx.io_key.is_empty() && ctx.device_key.is_empty() {
            return StrategyOutcome::Matched(Matched {
                classification: Classification::Both,
                confidence: Confidence::Partial,
                plc_refs: vec![id],
                conflict: None,
                key,
                note: "address matched; row carries no names to compare".into(),
                claims: true,
            });
        }

        if description_agrees(&desc_upper, &ctx.io_key, &ctx.device_key) {
            StrategyOutcome::Matched(Matched {
                classification: Classification::Both,
                confidence: Confidence::Exact,
                plc_refs: vec![id],
                conflict: None,
                key,
                note: format!("COMMENT description '{description}' agrees"),
                claims: true,
            })
        } else {
            StrategyOutcome::Matched(Matched {
                classification: Classification::Conflict,
                confidence: Confidence::Exact,
                plc_refs: vec![id],
                conflict: Some(name_conflict(
                    &key,
                    ctx.display_name(),
                    vec![description.to_string()],
                )),
                key,
                note: format!("names disagree at matched address: PLC '{description}'"),
                claims: true,
            })
        }
    }

    // -- Strategy 2 --------------------------------------------------------

    fn plc5_rack(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> StrategyOutcome {
        let (AddressFormat::Plc5, Some(addr)) = (ctx.format, ctx.plc5) else {
            return StrategyOutcome::NotApplicable {
                note: "address format is not PLC5".into(),
            };
        };
        let key = addr.to_string();

        if let Some(hits) = index.by_plc5_tuple.get(&addr) {
            if !hits.is_empty() {
                return StrategyOutcome::Matched(Matched {
                    classification: Classification::Both,
                    confidence: Confidence::Exact,
                    plc_refs: hits.clone(),
                    conflict: None,
                    key,
                    note: "TAG name canonicalizes to address".into(),
                    claims: true,
                });
            }
        }

        let base = addr.base();
        if let Some(hits) = index.by_plc5_base.get(&base) {
            if !hits.is_empty() {
                return StrategyOutcome::Matched(Matched {
                    classification: Classification::Both,
                    confidence: Confidence::Exact,
                    plc_refs: hits.clone(),
                    conflict: None,
                    key: base.to_string(),
                    note: "bare rack TAG name matches address base".into(),
                    claims: true,
                });
            }
        }

        StrategyOutcome::NoMatch {
            key,
            note: "no TAG name canonicalizes to address or its base".into(),
        }
    }

    // -- Strategy 3 --------------------------------------------------------

    fn rack_level(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> StrategyOutcome {
        let (AddressFormat::Clx, Some(addr)) = (ctx.format, ctx.clx) else {
            return StrategyOutcome::NotApplicable {
                note: "address format is not CLX".into(),
            };
        };
        let rack = addr.rack_key();
        let key = rack.to_string();

        match index.by_rack_tag.get(&rack) {
            Some(hits) if !hits.is_empty() => StrategyOutcome::Matched(Matched {
                classification: Classification::BothRackOnly,
                confidence: Confidence::Partial,
                plc_refs: hits.clone(),
                conflict: None,
                key,
                note: "rack parent TAG present; no bit-level record".into(),
                // One rack tag covers many devices; the sweep decides whether
                // it is consumed.
                claims: false,
            }),
            _ => StrategyOutcome::NoMatch {
                key,
                note: "no rack parent TAG".into(),
            },
        }
    }

    // -- Strategy 4 --------------------------------------------------------

    fn enet_module(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> StrategyOutcome {
        let key = if !ctx.device_key.is_empty() {
            ctx.device_key.clone()
        } else if !ctx.io_key.is_empty() {
            ctx.io_key.clone()
        } else {
            return StrategyOutcome::NotApplicable {
                note: "row carries no device or io tag".into(),
            };
        };

        match index.by_enet_device.get(&key) {
            Some(hits) if !hits.is_empty() => StrategyOutcome::Matched(Matched {
                classification: Classification::Both,
                confidence: Confidence::Exact,
                plc_refs: hits.clone(),
                conflict: None,
                key,
                note: "ENet module tag carries this device id".into(),
                claims: true,
            }),
            _ => StrategyOutcome::NoMatch {
                key,
                note: "no ENet module tag for device".into(),
            },
        }
    }

    // -- Strategy 5 --------------------------------------------------------

    fn tag_name(&self, ctx: &DeviceCtx<'_>, index: &TagIndex) -> StrategyOutcome {
        let mut keys: Vec<&str> = Vec::new();
        if !ctx.io_key.is_empty() {
            keys.push(&ctx.io_key);
        }
        if !ctx.device_key.is_empty() && ctx.device_key != ctx.io_key {
            keys.push(&ctx.device_key);
        }
        if keys.is_empty() {
            return StrategyOutcome::NotApplicable {
                note: "row carries no device or io tag".into(),
            };
        }

        for key in &keys {
            let Some(entry) = index.by_canonical_name.get(*key) else {
                continue;
            };
            if !entry.tags.is_empty() {
                return StrategyOutcome::Matched(Matched {
                    classification: Classification::Both,
                    confidence: Confidence::High,
                    plc_refs: entry.tags.clone(),
                    conflict: None,
                    key: key.to_string(),
                    note: "canonical TAG name match".into(),
                    claims: true,
                });
            }
            if !entry.comments.is_empty() {
                return StrategyOutcome::Matched(Matched {
                    classification: Classification::Both,
                    confidence: Confidence::High,
                    plc_refs: entry.comments.clone(),
                    conflict: None,
                    key: key.to_string(),
                    note: "matched COMMENT description only".into(),
                    claims: true,
                });
            }
        }

        StrategyOutcome::NoMatch {
            key: keys.join("/"),
            note: "no canonical name match".into(),
        }
    }

    // -- Strategy 6: supporting annotation only ----------------------------

    fn annotate_layout(&self, ctx: &DeviceCtx<'_>, index: &TagIndex, trail: &mut AuditTrail) {
        if index.layout.is_empty() {
            return;
        }
        let d = ctx.device;
        let key = layout_key(&d.panel, &d.rack, &d.slot, &d.channel);
        match index.layout.get(&key) {
            Some(listed) => {
                let listed_upper = listed.trim().to_ascii_uppercase();
                if description_agrees(&listed_upper, &ctx.io_key, &ctx.device_key) {
                    trail.annotation(
                        AuditOutcome::Matched,
                        listed,
                        "rack layout places this device at its position (supporting)",
                    );
                } else {
                    trail.annotation(
                        AuditOutcome::Failed,
                        listed,
                        "rack layout lists a different device at this position (supporting)",
                    );
                }
            }
            None => trail.annotation(
                AuditOutcome::Failed,
                "",
                "position absent from rack layout (supporting)",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Classifier, ClassifyOutcome};
    use crate::config::CrosscheckConfig;
    use crate::model::{RecordBody, TagCategory};

    struct Fixture {
        tags: Vec<PlcTag>,
        index_input: Vec<Option<TagCategory>>,
        normalizer: Normalizer,
    }

    fn fixture(tags: Vec<PlcTag>) -> Fixture {
        let config = CrosscheckConfig::default();
        let normalizer = Normalizer::new(&config);
        let classifier = Classifier::new(&config);
        let index_input = tags
            .iter()
            .map(|t| match classifier.classify(t, &normalizer) {
                ClassifyOutcome::Category(c) | ClassifyOutcome::CategoryWithNote(c, _) => Some(c),
                ClassifyOutcome::Skip(_) => None,
            })
            .collect();
        Fixture {
            tags,
            index_input,
            normalizer,
        }
    }

    impl Fixture {
        fn evaluate(&self, device: &IoDevice) -> CascadeOutcome {
            let index = TagIndex::build(&self.tags, &self.index_input, &[], &self.normalizer);
            let ctx = DeviceCtx::new(DeviceId(0), device, &self.normalizer);
            Cascade::new(&self.tags).evaluate(&ctx, &index)
        }
    }

    fn comment(specifier: &str, description: &str) -> PlcTag {
        PlcTag {
            scope: String::new(),
            name: "Rack0:I".into(),
            base_name: "Rack0".into(),
            description: description.into(),
            source_line: 10,
            body: RecordBody::Comment {
                specifier: specifier.into(),
            },
        }
    }

    fn tag(name: &str, datatype: &str) -> PlcTag {
        PlcTag {
            scope: String::new(),
            name: name.into(),
            base_name: name.split(':').next().unwrap_or(name).into(),
            description: String::new(),
            source_line: 11,
            body: RecordBody::Tag {
                datatype: datatype.into(),
            },
        }
    }

    fn device(address: &str, io_tag: &str, device_tag: &str) -> IoDevice {
        IoDevice {
            plc_address: address.into(),
            io_tag: io_tag.into(),
            device_tag: device_tag.into(),
            source_row: 2,
            ..Default::default()
        }
    }

    #[test]
    fn strategy1_exact_match() {
        let f = fixture(vec![comment("Rack0:I.DATA[5].7", "HLSTL5A")]);
        let out = f.evaluate(&device("Rack0:I.Data[5].7", "HLSTL5A", "HLSTL5A"));
        assert_eq!(out.classification, Classification::Both);
        assert_eq!(out.strategy, Some(StrategyId::DirectClxAddress));
        assert_eq!(out.confidence, Confidence::Exact);
        assert_eq!(out.plc_refs, vec![TagId(0)]);
        assert_eq!(out.claims, vec![TagId(0)]);
    }

    #[test]
    fn strategy1_conflict_on_name_disagreement() {
        let f = fixture(vec![comment("Rack0:I.DATA[5].6", "HLSTL5C")]);
        let out = f.evaluate(&device("Rack0:I.Data[5].6", "FT656B_Pulse", "FT656B_Pulse"));
        assert_eq!(out.classification, Classification::Conflict);
        assert_eq!(out.confidence, Confidence::Exact);
        let conflict = out.conflict.unwrap();
        assert_eq!(conflict.io_name, "FT656B_Pulse");
        assert_eq!(conflict.plc_names, vec!["HLSTL5C"]);
        assert_eq!(conflict.address, "RACK0:I.DATA[5].6");
    }

    #[test]
    fn strategy1_duplicate_comments_conflict() {
        let f = fixture(vec![
            comment("Rack0:I.DATA[5].7", "HLSTL5A"),
            comment("Rack0:I.Data[5].7", "HLSTL5A"),
        ]);
        let out = f.evaluate(&device("Rack0:I.Data[5].7", "HLSTL5A", "HLSTL5A"));
        assert_eq!(out.classification, Classification::Conflict);
        assert_eq!(out.plc_refs.len(), 2);
    }

    #[test]
    fn strategy1_empty_description_is_partial() {
        let f = fixture(vec![comment("Rack0:I.DATA[5].7", "")]);
        let out = f.evaluate(&device("Rack0:I.Data[5].7", "HLSTL5A", "HLSTL5A"));
        assert_eq!(out.classification, Classification::Both);
        assert_eq!(out.confidence, Confidence::Partial);
        assert!(out.audit.iter().any(|e| e.note.contains("description-absent")));
    }

    #[test]
    fn strategy2_plc5_base_match() {
        let f = fixture(vec![tag("Rack16_Group0_Slot0_IO", "AB:1771_IO:I:0")]);
        let out = f.evaluate(&device("Rack16_Group0_Slot0_IO.READ[18]", "PSL123", "PSL123"));
        assert_eq!(out.classification, Classification::Both);
        assert_eq!(out.strategy, Some(StrategyId::Plc5RackAddress));
        assert_eq!(out.confidence, Confidence::Exact);
    }

    #[test]
    fn strategy3_rack_only_never_claims() {
        let f = fixture(vec![tag("Rack0:I", "AB:1756_IB32:I:0")]);
        let out = f.evaluate(&device("Rack0:I.Data[6].0", "AS611_AUX", "AS611_AUX"));
        assert_eq!(out.classification, Classification::BothRackOnly);
        assert_eq!(out.strategy, Some(StrategyId::RackLevelTag));
        assert_eq!(out.confidence, Confidence::Partial);
        assert_eq!(out.plc_refs, vec![TagId(0)]);
        assert!(out.claims.is_empty());
        assert!(out.rack_evidence.is_some());
    }

    #[test]
    fn strategy4_enet_extraction() {
        let f = fixture(vec![tag("E300_P621:I", "AB_E300:I:0")]);
        let out = f.evaluate(&device("", "P621", "P621"));
        assert_eq!(out.classification, Classification::Both);
        assert_eq!(out.strategy, Some(StrategyId::EnetModule));
        assert_eq!(out.confidence, Confidence::Exact);
    }

    #[test]
    fn strategy5_comment_description_hit_after_address_miss() {
        // Comment lives at a different address than the row's.
        let f = fixture(vec![comment("Rack3:O.DATA[1].2", "TSV22")]);
        let out = f.evaluate(&device("Rack0:I.Data[9].9", "TSV22_EV", "TSV22"));
        assert_eq!(out.classification, Classification::Both);
        assert_eq!(out.strategy, Some(StrategyId::TagNameNormalization));
        assert_eq!(out.confidence, Confidence::High);
        let hit = out
            .audit
            .iter()
            .find(|e| e.outcome == AuditOutcome::Matched)
            .unwrap();
        assert_eq!(hit.key, "TSV22");
    }

    #[test]
    fn substring_names_never_match() {
        let f = fixture(vec![tag("LT6110_Monitor", "BOOL")]);
        let out = f.evaluate(&device("", "LT611", "LT611"));
        assert_eq!(out.classification, Classification::IoListOnly);
        assert_eq!(out.strategy, None);
        assert_eq!(out.confidence, Confidence::None);
        // All five strategies were considered and recorded.
        assert_eq!(out.audit.len(), 5);
    }

    #[test]
    fn unknown_format_skips_address_strategies() {
        let f = fixture(vec![tag("E300_P621:I", "AB_E300:I:0")]);
        let out = f.evaluate(&device("N7:0/3", "P621", "P621"));
        assert_eq!(out.strategy, Some(StrategyId::EnetModule));
        let skipped: Vec<_> = out
            .audit
            .iter()
            .filter(|e| e.outcome == AuditOutcome::Skipped)
            .collect();
        // Strategies 1-3 skipped as not applicable, 5 skipped after success.
        assert_eq!(skipped.len(), 4);
    }

    #[test]
    fn later_strategies_logged_as_skipped_after_success() {
        let f = fixture(vec![comment("Rack0:I.DATA[5].7", "HLSTL5A")]);
        let out = f.evaluate(&device("Rack0:I.Data[5].7", "HLSTL5A", "HLSTL5A"));
        let skipped_after = out
            .audit
            .iter()
            .filter(|e| e.note == "skipped: earlier success")
            .count();
        assert_eq!(skipped_after, 4);
    }
}
