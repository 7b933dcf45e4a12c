//! PLC record categorization and IO List spare detection.
//!
//! Rule order is load-bearing: record-kind checks come first, then
//! name-shape, then datatype. First match wins.

use regex::Regex;
use rustc_hash::FxHashSet;

use crate::config::CrosscheckConfig;
use crate::model::{IoDevice, PlcTag, RecordBody, TagCategory};
use crate::normalize::Normalizer;

/// What the classifier decided for one PLC record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyOutcome {
    Category(TagCategory),
    /// Category assigned through the fallback rule; the note goes to the
    /// diagnostics stream.
    CategoryWithNote(TagCategory, String),
    /// Malformed beyond recovery; the record is skipped entirely.
    Skip(String),
}

pub struct Classifier {
    /// Upper-cased atomic datatypes that mark program logic.
    program_datatypes: FxHashSet<String>,
    udt_re: Regex,
}

impl Classifier {
    pub fn new(config: &CrosscheckConfig) -> Self {
        Self {
            program_datatypes: config
                .classify
                .program_datatypes
                .iter()
                .map(|s| s.trim().to_ascii_uppercase())
                .collect(),
            udt_re: Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap(),
        }
    }

    pub fn classify(&self, tag: &PlcTag, normalizer: &Normalizer) -> ClassifyOutcome {
        match &tag.body {
            RecordBody::Alias { .. } => ClassifyOutcome::Category(TagCategory::Alias),

            RecordBody::Comment { specifier } => {
                if specifier.trim().is_empty() {
                    return ClassifyOutcome::Skip("COMMENT record has no specifier".into());
                }
                match normalizer.parse_clx(specifier) {
                    Some(addr) => ClassifyOutcome::Category(TagCategory::BitComment(addr)),
                    // Word- or module-level comment path; inert for matching,
                    // but the fallback is surfaced like any other.
                    None => ClassifyOutcome::CategoryWithNote(
                        TagCategory::Program,
                        format!(
                            "COMMENT specifier '{}' is not a bit address",
                            specifier.trim()
                        ),
                    ),
                }
            }

            RecordBody::Tag { datatype } => {
                if let Some(rack) = normalizer.parse_rack_tag(&tag.name) {
                    return ClassifyOutcome::Category(TagCategory::RackIo(rack));
                }

                let dt = datatype.trim().to_ascii_uppercase();
                if dt.starts_with("AB:") || dt.starts_with("EH:") {
                    return ClassifyOutcome::Category(TagCategory::IoModule);
                }

                let base = if tag.base_name.is_empty() {
                    tag.name.as_str()
                } else {
                    tag.base_name.as_str()
                };
                if let Some(device) = normalizer.enet_device(base) {
                    return ClassifyOutcome::Category(TagCategory::EnetDevice { device });
                }

                if self.program_datatypes.contains(&dt) {
                    return ClassifyOutcome::Category(TagCategory::Program);
                }
                // A plain identifier is taken as a named UDT.
                if !dt.is_empty() && self.udt_re.is_match(&dt) {
                    return ClassifyOutcome::Category(TagCategory::Program);
                }

                ClassifyOutcome::CategoryWithNote(
                    TagCategory::Program,
                    format!("unknown datatype '{}'", datatype.trim()),
                )
            }

            // Program documentation; inert, with no per-rung diagnostic.
            RecordBody::RungComment => ClassifyOutcome::Category(TagCategory::Program),
        }
    }

    /// Spare rule: io-tag or device-tag spells SPARE, or both are empty on a
    /// row whose channel cell is populated.
    pub fn is_spare(&self, device: &IoDevice) -> bool {
        let io = device.io_tag.trim();
        let dev = device.device_tag.trim();
        if io.eq_ignore_ascii_case("SPARE") || dev.eq_ignore_ascii_case("SPARE") {
            return true;
        }
        io.is_empty() && dev.is_empty() && !device.channel.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordBody;
    use crate::normalize::Direction;

    fn fixture() -> (Classifier, Normalizer) {
        let config = CrosscheckConfig::default();
        (Classifier::new(&config), Normalizer::new(&config))
    }

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
            source_line: 1,
            body: RecordBody::Comment {
                specifier: specifier.into(),
            },
        }
    }

    #[test]
    fn alias_wins_over_everything() {
        let (c, n) = fixture();
        let t = PlcTag {
            scope: String::new(),
            name: "E300_P621".into(),
            base_name: "E300_P621".into(),
            description: String::new(),
            source_line: 1,
            body: RecordBody::Alias {
                alias_for: "Rack0:I.Data[1].2".into(),
            },
        };
        assert_eq!(c.classify(&t, &n), ClassifyOutcome::Category(TagCategory::Alias));
    }

    #[test]
    fn bit_comment_requires_clx_specifier() {
        let (c, n) = fixture();
        match c.classify(&comment("Rack0:I.DATA[5].7", "HLSTL5A"), &n) {
            ClassifyOutcome::Category(TagCategory::BitComment(addr)) => {
                assert_eq!(addr.to_string(), "RACK0:I.DATA[5].7");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        // Word-level path is inert but noted, not an error
        match c.classify(&comment("Rack0:I.Data[5]", "x"), &n) {
            ClassifyOutcome::CategoryWithNote(TagCategory::Program, note) => {
                assert!(note.contains("not a bit address"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn rung_comments_are_inert_program_records() {
        let (c, n) = fixture();
        let t = PlcTag {
            scope: "MainProgram".into(),
            name: "MainRoutine".into(),
            base_name: "MainRoutine".into(),
            description: "rung note".into(),
            source_line: 4,
            body: RecordBody::RungComment,
        };
        assert_eq!(
            c.classify(&t, &n),
            ClassifyOutcome::Category(TagCategory::Program)
        );
    }

    #[test]
    fn comment_without_specifier_is_skipped() {
        let (c, n) = fixture();
        match c.classify(&comment("", "orphan"), &n) {
            ClassifyOutcome::Skip(msg) => assert!(msg.contains("specifier")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn rack_io_beats_module_datatype() {
        let (c, n) = fixture();
        match c.classify(&tag("Rack0:I", "AB:1756_IB32:I:0"), &n) {
            ClassifyOutcome::Category(TagCategory::RackIo(key)) => {
                assert_eq!(key.rack, 0);
                assert_eq!(key.direction, Direction::Input);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn module_datatype_prefixes() {
        let (c, n) = fixture();
        assert_eq!(
            c.classify(&tag("Rack11", "AB:1756_IB32:I:0"), &n),
            ClassifyOutcome::Category(TagCategory::IoModule)
        );
        assert_eq!(
            c.classify(&tag("FlowMeter3", "EH:Promag400:I:0"), &n),
            ClassifyOutcome::Category(TagCategory::IoModule)
        );
    }

    #[test]
    fn enet_device_carries_extracted_id() {
        let (c, n) = fixture();
        match c.classify(&tag("E300_P621:I", "AB_E300:I:0"), &n) {
            ClassifyOutcome::Category(TagCategory::EnetDevice { device }) => {
                assert_eq!(device, "P621");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn atomic_and_udt_datatypes_are_program() {
        let (c, n) = fixture();
        assert_eq!(
            c.classify(&tag("LT6110_Monitor", "BOOL"), &n),
            ClassifyOutcome::Category(TagCategory::Program)
        );
        assert_eq!(
            c.classify(&tag("Tanks", "TankControl"), &n),
            ClassifyOutcome::Category(TagCategory::Program)
        );
    }

    #[test]
    fn fallback_notes_unknown_datatype() {
        let (c, n) = fixture();
        match c.classify(&tag("Weird", "???"), &n) {
            ClassifyOutcome::CategoryWithNote(TagCategory::Program, note) => {
                assert!(note.contains("unknown datatype"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn spare_detection() {
        let (c, _) = fixture();
        let mut d = IoDevice {
            io_tag: "Spare".into(),
            ..Default::default()
        };
        assert!(c.is_spare(&d));

        d.io_tag = "  SPARE  ".into();
        assert!(c.is_spare(&d));

        d.io_tag.clear();
        d.device_tag = "spare".into();
        assert!(c.is_spare(&d));

        // Both empty + populated channel = wired but unassigned
        d.device_tag.clear();
        d.channel = "14".into();
        assert!(c.is_spare(&d));

        // Both empty, no channel: not spare (row carries nothing to match,
        // but the cascade decides that, not the spare rule)
        d.channel.clear();
        assert!(!c.is_spare(&d));

        d.io_tag = "TSV22".into();
        assert!(!c.is_spare(&d));
    }
}
