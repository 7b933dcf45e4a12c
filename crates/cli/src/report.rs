//! Report rendering: JSON projection, XLSX workbook, stderr summary.

use std::path::Path;

use rust_xlsxwriter::{Color, Format, Workbook};
use serde::Serialize;

use iocross_engine::model::{
    AuditEntry, AuditOutcome, Classification, ConflictDetail, CrosscheckInput, CrosscheckResult,
    Diagnostic, MatchResult,
};
use iocross_engine::summary::CrosscheckSummary;

use crate::CliError;

// ---------------------------------------------------------------------------
// JSON projection
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Report {
    pub meta: ReportMeta,
    pub summary: CrosscheckSummary,
    pub rows: Vec<ReportRow>,
    /// Indices into `rows` with classification Conflict.
    pub conflicts: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
pub struct ReportMeta {
    pub tool_version: String,
    pub generated_at: String,
}

/// One result row with handles resolved back to source fields, ready for
/// rendering without further lookups.
#[derive(Debug, Serialize)]
pub struct ReportRow {
    pub classification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub confidence: String,
    pub device_tag: String,
    pub io_tag: String,
    pub panel: String,
    pub rack: String,
    pub slot: String,
    pub channel: String,
    pub plc_address: String,
    pub module_type: String,
    pub source_row: Option<u32>,
    pub plc_tag_name: String,
    pub plc_description: String,
    pub plc_source_lines: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<ConflictDetail>,
    pub audit: Vec<String>,
}

pub fn build_report(input: &CrosscheckInput, result: &CrosscheckResult) -> Report {
    let rows: Vec<ReportRow> = result
        .results
        .iter()
        .map(|r| build_row(input, r))
        .collect();

    Report {
        meta: ReportMeta {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
        },
        summary: result.summary.clone(),
        rows,
        conflicts: result.conflicts.clone(),
        diagnostics: result.diagnostics.clone(),
    }
}

fn build_row(input: &CrosscheckInput, result: &MatchResult) -> ReportRow {
    let blank = iocross_engine::model::IoDevice::default();
    let device = result
        .device
        .map(|id| &input.devices[id.0 as usize])
        .unwrap_or(&blank);
    let first_ref = result.plc_refs.first().map(|id| &input.tags[id.0 as usize]);

    ReportRow {
        classification: result.classification.to_string(),
        strategy: result.strategy.map(|s| s.to_string()),
        confidence: result.confidence.to_string(),
        device_tag: device.device_tag.clone(),
        io_tag: device.io_tag.clone(),
        panel: device.panel.clone(),
        rack: device.rack.clone(),
        slot: device.slot.clone(),
        channel: device.channel.clone(),
        plc_address: device.plc_address.clone(),
        module_type: device.module_type.clone(),
        source_row: result.device.map(|_| device.source_row),
        plc_tag_name: first_ref.map(|t| t.name.clone()).unwrap_or_default(),
        plc_description: first_ref.map(|t| t.description.clone()).unwrap_or_default(),
        plc_source_lines: result
            .plc_refs
            .iter()
            .map(|id| input.tags[id.0 as usize].source_line)
            .collect(),
        conflict: result.conflict.clone(),
        audit: result.audit.iter().map(render_audit_entry).collect(),
    }
}

fn render_audit_entry(entry: &AuditEntry) -> String {
    let actor = entry
        .strategy
        .map(|s| s.to_string())
        .unwrap_or_else(|| "engine".to_string());
    let outcome = match entry.outcome {
        AuditOutcome::Matched => "matched",
        AuditOutcome::Skipped => "skipped",
        AuditOutcome::Failed => "failed",
    };
    if entry.key.is_empty() {
        format!("{actor} [{outcome}] {}", entry.note)
    } else {
        format!("{actor} [{outcome}] key='{}' {}", entry.key, entry.note)
    }
}

// ---------------------------------------------------------------------------
// XLSX
// ---------------------------------------------------------------------------

const DETAIL_HEADERS: [&str; 15] = [
    "Device Tag",
    "IO Tag",
    "Panel",
    "Rack",
    "Slot",
    "Channel",
    "PLC Address",
    "Module Type",
    "Classification",
    "Strategy",
    "Confidence",
    "PLC Tag Name",
    "PLC Description",
    "Conflict",
    "Audit Trail",
];

fn classification_color(label: &str) -> Option<Color> {
    match label {
        "Both" => Some(Color::RGB(0x92D050)),
        "Both (Rack Only)" => Some(Color::RGB(0xFFFF00)),
        "IO List Only" => Some(Color::RGB(0xFF0000)),
        "PLC Only" => Some(Color::RGB(0x5B9BD5)),
        "Conflict" => Some(Color::RGB(0xFFC000)),
        "Spare" => Some(Color::RGB(0xD9D9D9)),
        _ => None,
    }
}

pub fn write_xlsx(report: &Report, path: &Path) -> Result<(), CliError> {
    write_xlsx_inner(report, path)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

fn write_xlsx_inner(report: &Report, path: &Path) -> Result<(), rust_xlsxwriter::XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x4472C4));

    let detail = workbook.add_worksheet();
    detail.set_name("Verification Detail")?;
    for (col, header) in DETAIL_HEADERS.iter().enumerate() {
        detail.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (i, row) in report.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        detail.write_string(r, 0, &row.device_tag)?;
        detail.write_string(r, 1, &row.io_tag)?;
        detail.write_string(r, 2, &row.panel)?;
        detail.write_string(r, 3, &row.rack)?;
        detail.write_string(r, 4, &row.slot)?;
        detail.write_string(r, 5, &row.channel)?;
        detail.write_string(r, 6, &row.plc_address)?;
        detail.write_string(r, 7, &row.module_type)?;
        match classification_color(&row.classification) {
            Some(color) => {
                let fill = Format::new().set_bold().set_background_color(color);
                detail.write_string_with_format(r, 8, &row.classification, &fill)?;
            }
            None => {
                detail.write_string(r, 8, &row.classification)?;
            }
        }
        detail.write_string(r, 9, row.strategy.as_deref().unwrap_or(""))?;
        detail.write_string(r, 10, &row.confidence)?;
        detail.write_string(r, 11, &row.plc_tag_name)?;
        detail.write_string(r, 12, &row.plc_description)?;
        detail.write_string(r, 13, if row.conflict.is_some() { "YES" } else { "" })?;
        detail.write_string(r, 14, &row.audit.join(" | "))?;
    }

    let bold = Format::new().set_bold();
    let summary = workbook.add_worksheet();
    summary.set_name("Summary")?;
    summary.write_string_with_format(0, 0, "IO Crosscheck — Summary", &bold)?;

    let mut r: u32 = 2;
    summary.write_string_with_format(r, 0, "Classification", &bold)?;
    summary.write_string_with_format(r, 1, "Count", &bold)?;
    r += 1;
    for (label, count) in &report.summary.by_classification {
        summary.write_string(r, 0, label)?;
        summary.write_number(r, 1, *count as f64)?;
        r += 1;
    }

    r += 1;
    summary.write_string_with_format(r, 0, "Panel", &bold)?;
    summary.write_string_with_format(r, 1, "Active", &bold)?;
    summary.write_string_with_format(r, 2, "Matched", &bold)?;
    summary.write_string_with_format(r, 3, "Conflicts", &bold)?;
    r += 1;
    for (panel, coverage) in &report.summary.panel_coverage {
        summary.write_string(r, 0, panel)?;
        summary.write_number(r, 1, coverage.total as f64)?;
        summary.write_number(r, 2, coverage.matched as f64)?;
        summary.write_number(r, 3, coverage.conflicts as f64)?;
        r += 1;
    }

    workbook.save(path)
}

// ---------------------------------------------------------------------------
// Stderr summary
// ---------------------------------------------------------------------------

pub fn print_summary(result: &CrosscheckResult) {
    let s = &result.summary;
    eprintln!(
        "crosscheck: {} IO rows ({} active, {} spare) against {} PLC records",
        s.devices_total, s.devices_active, s.devices_spare, s.plc_records,
    );
    for (category, count) in &s.category_census {
        eprintln!("  {category}: {count}");
    }
    for (label, count) in &s.by_classification {
        eprintln!("  {label}: {count}");
    }
    for (panel, coverage) in &s.panel_coverage {
        eprintln!(
            "  panel {panel}: {}/{} matched, {} conflicts",
            coverage.matched, coverage.total, coverage.conflicts,
        );
    }
    if !result.diagnostics.is_empty() {
        eprintln!("  {} input record(s) skipped or noted; see report", result.diagnostics.len());
    }
    let conflict_count = result
        .results
        .iter()
        .filter(|r| r.classification == Classification::Conflict)
        .count();
    if conflict_count > 0 {
        eprintln!("  {} CONFLICT(S) requiring human review", conflict_count);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
