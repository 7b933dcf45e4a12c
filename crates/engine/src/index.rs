//! In-memory multi-way lookup over the classified PLC stream.
//!
//! Built once, read-only afterwards. Lists hold [`TagId`] handles in input
//! order; the index never duplicates record payloads.

use rustc_hash::FxHashMap;

use crate::model::{PlcTag, RackLayoutRow, RecordBody, TagCategory, TagId};
use crate::normalize::{ClxAddress, Normalizer, Plc5Address, Plc5Base, RackKey};

/// Records sharing one canonical name, split by evidence kind: the cascade
/// treats a TAG-name hit differently from a COMMENT-description hit.
#[derive(Debug, Default)]
pub struct NameEntry {
    pub tags: Vec<TagId>,
    pub comments: Vec<TagId>,
}

/// Position key for the optional rack layout stream, upper-cased.
pub type LayoutKey = (String, String, String, String);

pub struct TagIndex {
    pub by_clx_address: FxHashMap<ClxAddress, Vec<TagId>>,
    pub by_rack_tag: FxHashMap<RackKey, Vec<TagId>>,
    pub by_plc5_tuple: FxHashMap<Plc5Address, Vec<TagId>>,
    /// Bare rack TAG names (`Rack16_Group0_Slot0_IO`), the shape the export
    /// actually uses for legacy racks.
    pub by_plc5_base: FxHashMap<Plc5Base, Vec<TagId>>,
    pub by_canonical_name: FxHashMap<String, NameEntry>,
    pub by_enet_device: FxHashMap<String, Vec<TagId>>,
    /// panel/rack/slot/channel → device tag; empty when no layout provided.
    pub layout: FxHashMap<LayoutKey, String>,
}

impl TagIndex {
    /// `categories[i]` is the classifier outcome for `tags[i]`; `None` marks
    /// a skipped record, which never enters the index.
    pub fn build(
        tags: &[PlcTag],
        categories: &[Option<TagCategory>],
        layout: &[RackLayoutRow],
        normalizer: &Normalizer,
    ) -> Self {
        let mut index = Self {
            by_clx_address: FxHashMap::default(),
            by_rack_tag: FxHashMap::default(),
            by_plc5_tuple: FxHashMap::default(),
            by_plc5_base: FxHashMap::default(),
            by_canonical_name: FxHashMap::default(),
            by_enet_device: FxHashMap::default(),
            layout: FxHashMap::default(),
        };

        for (i, tag) in tags.iter().enumerate() {
            let id = TagId(i as u32);
            let Some(category) = &categories[i] else {
                continue;
            };

            match category {
                TagCategory::BitComment(addr) => {
                    index.by_clx_address.entry(*addr).or_default().push(id);
                    let desc_key = normalizer.canon_tag(&tag.description);
                    if !desc_key.is_empty() {
                        index
                            .by_canonical_name
                            .entry(desc_key)
                            .or_default()
                            .comments
                            .push(id);
                    }
                }

                TagCategory::RackIo(key) => {
                    index.by_rack_tag.entry(*key).or_default().push(id);
                    index.push_name(tag, id, normalizer);
                }

                TagCategory::IoModule => {
                    index.push_name(tag, id, normalizer);
                    index.push_plc5(tag, id, normalizer);
                }

                TagCategory::EnetDevice { device } => {
                    index
                        .by_enet_device
                        .entry(device.clone())
                        .or_default()
                        .push(id);
                    index.push_name(tag, id, normalizer);
                }

                TagCategory::Alias => {
                    index.push_name(tag, id, normalizer);
                }

                // Program records carry no IO evidence and must never be
                // referenced by a result.
                TagCategory::Program => {}
            }
        }

        for row in layout {
            let device = row.device_tag.trim();
            if device.is_empty() {
                continue;
            }
            index
                .layout
                .insert(layout_key(&row.panel, &row.rack, &row.slot, &row.channel), device.to_string());
        }

        index
    }

    fn push_name(&mut self, tag: &PlcTag, id: TagId, normalizer: &Normalizer) {
        let base = if tag.base_name.is_empty() {
            tag.name.as_str()
        } else {
            tag.base_name.as_str()
        };
        let key = normalizer.canon_tag(base);
        if !key.is_empty() {
            self.by_canonical_name.entry(key).or_default().tags.push(id);
        }
    }

    fn push_plc5(&mut self, tag: &PlcTag, id: TagId, normalizer: &Normalizer) {
        if !matches!(tag.body, RecordBody::Tag { .. }) {
            return;
        }
        if let Some(addr) = normalizer.parse_plc5(&tag.name) {
            self.by_plc5_tuple.entry(addr).or_default().push(id);
        } else if let Some(base) = normalizer.parse_plc5_base(&tag.name) {
            self.by_plc5_base.entry(base).or_default().push(id);
        }
    }
}

pub fn layout_key(panel: &str, rack: &str, slot: &str, channel: &str) -> LayoutKey {
    (
        panel.trim().to_ascii_uppercase(),
        rack.trim().to_ascii_uppercase(),
        slot.trim().to_ascii_uppercase(),
        channel.trim().to_ascii_uppercase(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
