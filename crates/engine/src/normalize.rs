//! Pure name and address canonicalization. No I/O, no lookups.
//!
//! Every comparison the cascade makes goes through a canonical form produced
//! here, so two spellings compare equal exactly when these functions say so.
//! Substring equality is never used anywhere downstream.

use regex::Regex;

use crate::config::CrosscheckConfig;
use crate::model::AddressFormat;

// ---------------------------------------------------------------------------
// Canonical address types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "I"),
            Self::Output => write!(f, "O"),
        }
    }
}

/// Rack parent of a CLX address: `RACK<N>:<D>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RackKey {
    pub rack: u32,
    pub direction: Direction,
}

impl std::fmt::Display for RackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RACK{}:{}", self.rack, self.direction)
    }
}

/// Canonical ControlLogix bit address: `RACK<N>:<D>.DATA[<W>].<B>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClxAddress {
    pub rack: u32,
    pub direction: Direction,
    pub word: u32,
    pub bit: u32,
}

impl ClxAddress {
    pub fn rack_key(&self) -> RackKey {
        RackKey {
            rack: self.rack,
            direction: self.direction,
        }
    }
}

impl std::fmt::Display for ClxAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RACK{}:{}.DATA[{}].{}",
            self.rack, self.direction, self.word, self.bit
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Plc5Op {
    Read,
    Write,
}

impl std::fmt::Display for Plc5Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read => write!(f, "READ"),
            Self::Write => write!(f, "WRITE"),
        }
    }
}

/// Canonical PLC5 channel address: `RACK<N>_GROUP<G>_SLOT<S>_IO.<RW>[<C>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Plc5Address {
    pub rack: u32,
    pub group: u32,
    pub slot: u32,
    pub op: Plc5Op,
    pub channel: u32,
}

impl Plc5Address {
    pub fn base(&self) -> Plc5Base {
        Plc5Base {
            rack: self.rack,
            group: self.group,
            slot: self.slot,
        }
    }
}

impl std::fmt::Display for Plc5Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RACK{}_GROUP{}_SLOT{}_IO.{}[{}]",
            self.rack, self.group, self.slot, self.op, self.channel
        )
    }
}

/// PLC5 address minus the operation/channel member: the shape bare rack TAG
/// names take in the export (`Rack16_Group0_Slot0_IO`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Plc5Base {
    pub rack: u32,
    pub group: u32,
    pub slot: u32,
}

impl std::fmt::Display for Plc5Base {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RACK{}_GROUP{}_SLOT{}_IO", self.rack, self.group, self.slot)
    }
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

/// Config-driven canonicalizer. Built once per run; immutable after.
pub struct Normalizer {
    /// Upper-cased, matched longest-first.
    colon_suffixes: Vec<String>,
    strip_suffixes: Vec<String>,
    enet_prefixes: Vec<String>,
    clx_re: Regex,
    plc5_re: Regex,
    plc5_base_re: Regex,
    rack_tag_re: Regex,
}

impl Normalizer {
    pub fn new(config: &CrosscheckConfig) -> Self {
        let upper = |v: &[String]| -> Vec<String> {
            v.iter().map(|s| s.to_ascii_uppercase()).collect()
        };
        Self {
            colon_suffixes: upper(&config.normalize.colon_suffixes),
            strip_suffixes: upper(&config.normalize.strip_suffixes),
            enet_prefixes: upper(&config.normalize.enet_prefixes),
            clx_re: Regex::new(r"(?i)^rack(\d+):([io])\.data\[(\d+)\]\.(\d+)$").unwrap(),
            plc5_re: Regex::new(r"(?i)^rack(\d+)_group(\d+)_slot(\d+)_io\.(read|write)\[(\d+)\]$")
                .unwrap(),
            plc5_base_re: Regex::new(r"(?i)^rack(\d+)_group(\d+)_slot(\d+)_io$").unwrap(),
            rack_tag_re: Regex::new(r"(?i)^rack(\d+):([io])$").unwrap(),
        }
    }

    /// Canonical base string for a tag name: trim, strip one colon-suffix,
    /// strip at most one IO-type suffix (longest match wins), upper-case.
    pub fn canon_tag(&self, raw: &str) -> String {
        let mut s = raw.trim();
        if let Some(len) = longest_suffix(s, &self.colon_suffixes) {
            s = &s[..s.len() - len];
        }
        if let Some(len) = longest_suffix(s, &self.strip_suffixes) {
            s = &s[..s.len() - len];
        }
        s.to_ascii_uppercase()
    }

    /// Device identifier embedded in an ENet module tag base name,
    /// upper-cased: `E300_P621` → `P621`. None when no prefix applies.
    pub fn enet_device(&self, base_name: &str) -> Option<String> {
        let mut s = base_name.trim();
        if let Some(len) = longest_suffix(s, &self.colon_suffixes) {
            s = &s[..s.len() - len];
        }
        let upper = s.to_ascii_uppercase();
        for prefix in &self.enet_prefixes {
            if upper.starts_with(prefix.as_str()) && upper.len() > prefix.len() {
                return Some(upper[prefix.len()..].to_string());
            }
        }
        None
    }

    /// Parse a CLX bit address. Unparseable input yields None; the engine
    /// never guesses.
    pub fn parse_clx(&self, address: &str) -> Option<ClxAddress> {
        let caps = self.clx_re.captures(address.trim())?;
        Some(ClxAddress {
            rack: caps[1].parse().ok()?,
            direction: parse_direction(&caps[2])?,
            word: caps[3].parse().ok()?,
            bit: caps[4].parse().ok()?,
        })
    }

    /// Parse a full PLC5 channel address.
    pub fn parse_plc5(&self, address: &str) -> Option<Plc5Address> {
        let caps = self.plc5_re.captures(address.trim())?;
        let op = if caps[4].eq_ignore_ascii_case("read") {
            Plc5Op::Read
        } else {
            Plc5Op::Write
        };
        Some(Plc5Address {
            rack: caps[1].parse().ok()?,
            group: caps[2].parse().ok()?,
            slot: caps[3].parse().ok()?,
            op,
            channel: caps[5].parse().ok()?,
        })
    }

    /// Parse a bare PLC5 rack TAG name (no member path).
    pub fn parse_plc5_base(&self, name: &str) -> Option<Plc5Base> {
        let caps = self.plc5_base_re.captures(name.trim())?;
        Some(Plc5Base {
            rack: caps[1].parse().ok()?,
            group: caps[2].parse().ok()?,
            slot: caps[3].parse().ok()?,
        })
    }

    /// Parse a rack IO TAG name of the form `Rack<N>:I` / `Rack<N>:O`.
    pub fn parse_rack_tag(&self, name: &str) -> Option<RackKey> {
        let caps = self.rack_tag_re.captures(name.trim())?;
        Some(RackKey {
            rack: caps[1].parse().ok()?,
            direction: parse_direction(&caps[2])?,
        })
    }

    pub fn detect_format(&self, address: &str) -> AddressFormat {
        if self.parse_clx(address).is_some() {
            AddressFormat::Clx
        } else if self.parse_plc5(address).is_some() {
            AddressFormat::Plc5
        } else {
            AddressFormat::Unknown
        }
    }
}

fn parse_direction(s: &str) -> Option<Direction> {
    match s {
        "I" | "i" => Some(Direction::Input),
        "O" | "o" => Some(Direction::Output),
        _ => None,
    }
}

/// Byte length of the longest suffix (upper-cased list) matching `s`
/// case-insensitively, or None. Suffix lists are ASCII.
fn longest_suffix(s: &str, suffixes: &[String]) -> Option<usize> {
    let upper = s.to_ascii_uppercase();
    suffixes
        .iter()
        .filter(|sfx| upper.ends_with(sfx.as_str()) && upper.len() > sfx.len())
        .map(|sfx| sfx.len())
        .max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
