//! Rack layout CSV parser: physical slot-to-device cross-reference used only
//! for the supporting audit annotation.

use iocross_engine::model::RackLayoutRow;

use crate::CliError;

pub fn parse_rack_layout(text: &str) -> Result<Vec<RackLayoutRow>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Columns> = None;
    let mut rows: Vec<RackLayoutRow> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| CliError::parse(format!("rack layout: {e}")))?;

        let Some(columns) = &header else {
            header = Some(Columns::from_header(&record));
            continue;
        };

        let device_tag = columns.get(&record, columns.device_tag);
        if device_tag.is_empty() {
            continue;
        }
        rows.push(RackLayoutRow {
            panel: columns.get(&record, columns.panel),
            rack: columns.get(&record, columns.rack),
            slot: columns.get(&record, columns.slot),
            channel: columns.get(&record, columns.channel),
            device_tag,
        });
    }

    if header.is_none() {
        return Err(CliError::parse("rack layout: empty file"));
    }

    Ok(rows)
}

struct Columns {
    panel: Option<usize>,
    rack: Option<usize>,
    slot: Option<usize>,
    channel: Option<usize>,
    device_tag: Option<usize>,
}

impl Columns {
    fn from_header(record: &csv::StringRecord) -> Self {
        let find = |wanted: &str| {
            record
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(wanted))
        };
        Self {
            panel: find("panel"),
            rack: find("rack"),
            slot: find("slot"),
            channel: find("channel"),
            device_tag: find("device tag"),
        }
    }

    fn get(&self, record: &csv::StringRecord, index: Option<usize>) -> String {
        index
            .and_then(|i| record.get(i))
            .unwrap_or("")
            .trim()
            .to_string()
    }
}
