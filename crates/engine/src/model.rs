use serde::Serialize;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// Stable handle for a PLC record, assigned in input order at intake.
/// Results and index lists hold handles, never copies of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TagId(pub u32);

/// Stable handle for an IO List row, assigned in input order at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub u32);

// ---------------------------------------------------------------------------
// Input: PLC records
// ---------------------------------------------------------------------------

/// One record from the tag-export stream. Shared metadata lives on the
/// struct; kind-specific payload lives in [`RecordBody`].
#[derive(Debug, Clone)]
pub struct PlcTag {
    /// Controller scope or program name; empty for controller-scoped tags.
    pub scope: String,
    /// Raw identifier, possibly carrying a `:I` / `:O` / `:C` / `:S` suffix.
    pub name: String,
    /// Name with the trailing colon-suffix stripped (parser-supplied).
    pub base_name: String,
    pub description: String,
    pub source_line: u32,
    pub body: RecordBody,
}

/// Kind-specific payload for a PLC record.
#[derive(Debug, Clone)]
pub enum RecordBody {
    Tag {
        datatype: String,
    },
    Comment {
        /// Bit/word/channel path such as `Rack11:I.DATA[3].13`.
        specifier: String,
    },
    Alias {
        /// The address or tag the alias points at.
        alias_for: String,
    },
    /// Rung comment; carries no tag data.
    RungComment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Tag,
    Comment,
    Alias,
    RComment,
}

impl PlcTag {
    pub fn kind(&self) -> RecordKind {
        match self.body {
            RecordBody::Tag { .. } => RecordKind::Tag,
            RecordBody::Comment { .. } => RecordKind::Comment,
            RecordBody::Alias { .. } => RecordKind::Alias,
            RecordBody::RungComment => RecordKind::RComment,
        }
    }

    pub fn datatype(&self) -> &str {
        match &self.body {
            RecordBody::Tag { datatype } => datatype,
            _ => "",
        }
    }

    pub fn specifier(&self) -> &str {
        match &self.body {
            RecordBody::Comment { specifier } => specifier,
            _ => "",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag => write!(f, "TAG"),
            Self::Comment => write!(f, "COMMENT"),
            Self::Alias => write!(f, "ALIAS"),
            Self::RComment => write!(f, "RCOMMENT"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classified categories
// ---------------------------------------------------------------------------

use crate::normalize::{ClxAddress, RackKey};

/// Category assigned by the classifier. Variants carry the canonical payload
/// parsed during classification so cascade code never re-parses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCategory {
    IoModule,
    RackIo(RackKey),
    EnetDevice {
        /// Device identifier extracted from the base name, upper-cased.
        device: String,
    },
    Alias,
    Program,
    BitComment(ClxAddress),
}

impl TagCategory {
    /// Categories swept into PLC-Only results when unclaimed.
    pub fn is_io_relevant(&self) -> bool {
        matches!(
            self,
            Self::IoModule | Self::RackIo(_) | Self::EnetDevice { .. } | Self::BitComment(_)
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::IoModule => "IO_Module",
            Self::RackIo(_) => "Rack_IO",
            Self::EnetDevice { .. } => "ENet_Device",
            Self::Alias => "Alias",
            Self::Program => "Program",
            Self::BitComment(_) => "Bit_Comment",
        }
    }
}

// ---------------------------------------------------------------------------
// Input: IO List rows
// ---------------------------------------------------------------------------

/// One row of the IO List. Empty cells arrive as empty strings.
#[derive(Debug, Clone, Default)]
pub struct IoDevice {
    pub panel: String,
    pub rack: String,
    pub group: String,
    pub slot: String,
    pub channel: String,
    pub plc_address: String,
    pub io_tag: String,
    pub device_tag: String,
    pub module_type: String,
    pub module: String,
    pub range_low: String,
    pub range_high: String,
    pub units: String,
    pub source_row: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    Plc5,
    Clx,
    Unknown,
}

// ---------------------------------------------------------------------------
// Input: rack layout (strategy 6, supporting annotation only)
// ---------------------------------------------------------------------------

/// Physical slot-to-device cross-reference row.
#[derive(Debug, Clone)]
pub struct RackLayoutRow {
    pub panel: String,
    pub rack: String,
    pub slot: String,
    pub channel: String,
    pub device_tag: String,
}

/// Pre-loaded input streams. Read once, never mutated.
#[derive(Debug, Default)]
pub struct CrosscheckInput {
    pub tags: Vec<PlcTag>,
    pub devices: Vec<IoDevice>,
    /// Empty when no layout sheet was provided.
    pub layout: Vec<RackLayoutRow>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// The six terminal classifications; exhaustive and disjoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Both,
    BothRackOnly,
    IoListOnly,
    PlcOnly,
    Conflict,
    Spare,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Both => write!(f, "Both"),
            Self::BothRackOnly => write!(f, "Both (Rack Only)"),
            Self::IoListOnly => write!(f, "IO List Only"),
            Self::PlcOnly => write!(f, "PLC Only"),
            Self::Conflict => write!(f, "Conflict"),
            Self::Spare => write!(f, "Spare"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Exact,
    High,
    Partial,
    Supporting,
    None,
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "Exact"),
            Self::High => write!(f, "High"),
            Self::Partial => write!(f, "Partial"),
            Self::Supporting => write!(f, "Supporting"),
            Self::None => write!(f, "None"),
        }
    }
}

/// The matching strategies, in cascade priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    DirectClxAddress,
    Plc5RackAddress,
    RackLevelTag,
    EnetModule,
    TagNameNormalization,
    /// Supporting annotation only; never decides a classification.
    RackLayout,
}

impl StrategyId {
    pub fn number(&self) -> u8 {
        match self {
            Self::DirectClxAddress => 1,
            Self::Plc5RackAddress => 2,
            Self::RackLevelTag => 3,
            Self::EnetModule => 4,
            Self::TagNameNormalization => 5,
            Self::RackLayout => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectClxAddress => "Direct CLX Address Match",
            Self::Plc5RackAddress => "PLC5 Rack Address Match",
            Self::RackLevelTag => "Rack-Level TAG Existence",
            Self::EnetModule => "ENet Module Extraction",
            Self::TagNameNormalization => "Tag Name Normalization",
            Self::RackLayout => "Rack Layout",
        }
    }
}

impl std::fmt::Display for StrategyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.number(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Matched,
    Skipped,
    Failed,
}

/// One step of a result's audit trail. `strategy` is `None` for entries the
/// engine itself appends (spare short-circuit, PLC-only sweep).
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyId>,
    pub outcome: AuditOutcome,
    /// The canonical string that was compared, empty when none applies.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// Source PLC record consulted, when one was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<TagId>,
    pub note: String,
}

/// Disagreeing names at a shared canonical address.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictDetail {
    pub address: String,
    pub io_name: String,
    pub plc_names: Vec<String>,
}

/// The atomic output unit: one per IO List row plus one per unclaimed
/// IO-relevant PLC record.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyId>,
    pub confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceId>,
    pub plc_refs: Vec<TagId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictDetail>,
    pub audit: Vec<AuditEntry>,
}

/// Per-record intake problem. Never aborts the run; the offending record is
/// skipped and the reason surfaces here with its source location.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub source_line: u32,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

use crate::summary::CrosscheckSummary;

#[derive(Debug, Serialize)]
pub struct CrosscheckResult {
    pub summary: CrosscheckSummary,
    pub results: Vec<MatchResult>,
    /// Indices into `results` with classification Conflict.
    pub conflicts: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}
