//! IO List CSV parser.
//!
//! The sheet carries banner rows above the real header, so the header row is
//! detected by a cell containing `panel`. Rows with no device tag, IO tag,
//! and PLC address are skipped as decoration.

use iocross_engine::model::IoDevice;

use crate::CliError;

pub fn parse_io_list(text: &str) -> Result<Vec<IoDevice>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Columns> = None;
    let mut devices: Vec<IoDevice> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| CliError::parse(format!("IO List: {e}")))?;
        let line = record.position().map(|p| p.line() as u32).unwrap_or(0);

        let Some(columns) = &header else {
            if record
                .iter()
                .any(|c| c.trim().to_ascii_lowercase().contains("panel"))
            {
                header = Some(Columns::from_header(&record));
            }
            continue;
        };

        let device_tag = columns.get(&record, columns.device_tag);
        let io_tag = columns.get(&record, columns.io_tag);
        let plc_address = columns.get(&record, columns.plc_address);
        if device_tag.is_empty() && io_tag.is_empty() && plc_address.is_empty() {
            continue;
        }

        devices.push(IoDevice {
            panel: columns.get(&record, columns.panel),
            rack: columns.get(&record, columns.rack),
            group: columns.get(&record, columns.group),
            slot: columns.get(&record, columns.slot),
            channel: columns.get(&record, columns.channel),
            plc_address,
            io_tag,
            device_tag,
            module_type: columns.get(&record, columns.module_type),
            module: columns.get(&record, columns.module),
            range_low: columns.get(&record, columns.range_low),
            range_high: columns.get(&record, columns.range_high),
            units: columns.get(&record, columns.units),
            source_row: line,
        });
    }

    if header.is_none() {
        return Err(CliError::parse("IO List: no header row containing 'panel'"));
    }

    Ok(devices)
}

struct Columns {
    panel: Option<usize>,
    rack: Option<usize>,
    group: Option<usize>,
    slot: Option<usize>,
    channel: Option<usize>,
    plc_address: Option<usize>,
    io_tag: Option<usize>,
    device_tag: Option<usize>,
    module_type: Option<usize>,
    module: Option<usize>,
    range_low: Option<usize>,
    range_high: Option<usize>,
    units: Option<usize>,
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
            group: find("group"),
            slot: find("slot"),
            channel: find("channel"),
            plc_address: find("plc io address"),
            io_tag: find("io tag"),
            device_tag: find("device tag"),
            module_type: find("module type"),
            module: find("module"),
            range_low: find("range low"),
            range_high: find("range high"),
            units: find("units"),
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

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
