//! RSLogix 5000 CSV tag export parser.
//!
//! The export is non-standard CSV: remark/version lines precede a header row
//! whose first cell is `TYPE`, record kinds are mixed in one table, and
//! descriptions may span lines inside quotes. Columns are mapped by header
//! position, never by fixed index.

use encoding_rs::Encoding;

use iocross_engine::model::{PlcTag, RecordBody};

use crate::CliError;

pub fn parse_plc_export(bytes: &[u8], encoding_label: &str) -> Result<Vec<PlcTag>, CliError> {
    // WHATWG labels spell it "latin1"; accept the hyphenated form too.
    let encoding = Encoding::for_label(encoding_label.as_bytes())
        .or_else(|| Encoding::for_label(encoding_label.replace('-', "").as_bytes()))
        .ok_or_else(|| CliError::parse(format!("unknown encoding '{encoding_label}'")))?;
    let (text, _, _) = encoding.decode(bytes);
    parse_plc_export_text(&text)
}

pub fn parse_plc_export_text(text: &str) -> Result<Vec<PlcTag>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Columns> = None;
    let mut tags: Vec<PlcTag> = Vec::new();

    for record in reader.records() {
        let record = record.map_err(|e| CliError::parse(format!("tag export: {e}")))?;
        if record.is_empty() {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as u32)
            .unwrap_or(0);

        let Some(columns) = &header else {
            if record
                .get(0)
                .map(|c| c.trim().eq_ignore_ascii_case("TYPE"))
                .unwrap_or(false)
            {
                header = Some(Columns::from_header(&record));
            }
            continue;
        };

        let kind = record.get(0).unwrap_or("").trim().to_ascii_uppercase();
        let name = columns.get(&record, columns.name);
        let body = match kind.as_str() {
            "TAG" => RecordBody::Tag {
                datatype: columns.get(&record, columns.datatype),
            },
            "COMMENT" => RecordBody::Comment {
                specifier: columns.get(&record, columns.specifier),
            },
            "ALIAS" => RecordBody::Alias {
                alias_for: columns.get(&record, columns.specifier),
            },
            "RCOMMENT" => RecordBody::RungComment,
            _ => continue,
        };

        tags.push(PlcTag {
            scope: columns.get(&record, columns.scope),
            base_name: strip_colon_member(&name).to_string(),
            name,
            description: columns.get(&record, columns.description),
            source_line: line,
            body,
        });
    }

    if header.is_none() {
        return Err(CliError::parse(
            "tag export: no header row with a leading TYPE cell",
        ));
    }

    Ok(tags)
}

struct Columns {
    scope: Option<usize>,
    name: Option<usize>,
    description: Option<usize>,
    datatype: Option<usize>,
    specifier: Option<usize>,
}

impl Columns {
    fn from_header(record: &csv::StringRecord) -> Self {
        let find = |wanted: &str| {
            record
                .iter()
                .position(|c| c.trim().eq_ignore_ascii_case(wanted))
        };
        Self {
            scope: find("SCOPE"),
            name: find("NAME"),
            description: find("DESCRIPTION"),
            datatype: find("DATATYPE"),
            specifier: find("SPECIFIER"),
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

/// Base-name candidate: the name with a trailing `:I` / `:O` / `:C` / `:S`
/// member (optionally digit-suffixed, as in `:I1`) removed.
fn strip_colon_member(name: &str) -> &str {
    let name = name.trim();
    let Some(pos) = name.rfind(':') else {
        return name;
    };
    let member = &name[pos + 1..];
    let mut chars = member.chars();
    let head_is_io = chars
        .next()
        .map(|c| matches!(c.to_ascii_uppercase(), 'I' | 'O' | 'C' | 'S'))
        .unwrap_or(false);
    if head_is_io && chars.all(|c| c.is_ascii_digit()) {
        &name[..pos]
    } else {
        name
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use iocross_engine::model::RecordKind;

    const EXPORT: &str = "\
remark,\"CSV-Import-Export\"
remark,\"Date = Wed Jan 07 2026\"
0.3
TYPE,SCOPE,NAME,DESCRIPTION,DATATYPE,SPECIFIER
TAG,,Rack0:I,\"\",AB:1756_IB32:I:0,
TAG,,E300_P621:I,\"P621 overload\",AB_E300:I:0,
COMMENT,,Rack0:I,\"HLSTL5A\",,Rack0:I.DATA[5].7
ALIAS,,TSV22_EV,\"Deod steam valve\",,Rack0:O.Data[2].4
RCOMMENT,MainProgram,MainRoutine,\"rung note\",,4
TAG,,LT6110_Monitor,\"\",BOOL,
";

    #[test]
    fn parses_mixed_record_kinds() {
        let tags = parse_plc_export_text(EXPORT).unwrap();
        assert_eq!(tags.len(), 6);
        assert_eq!(tags[0].kind(), RecordKind::Tag);
        assert_eq!(tags[0].name, "Rack0:I");
        assert_eq!(tags[0].base_name, "Rack0");
        assert_eq!(tags[0].datatype(), "AB:1756_IB32:I:0");

        assert_eq!(tags[2].kind(), RecordKind::Comment);
        assert_eq!(tags[2].specifier(), "Rack0:I.DATA[5].7");
        assert_eq!(tags[2].description, "HLSTL5A");

        assert_eq!(tags[3].kind(), RecordKind::Alias);
        match &tags[3].body {
            RecordBody::Alias { alias_for } => assert_eq!(alias_for, "Rack0:O.Data[2].4"),
            other => panic!("unexpected body: {other:?}"),
        }

        assert_eq!(tags[4].kind(), RecordKind::RComment);
        assert_eq!(tags[4].scope, "MainProgram");
        assert_eq!(tags[4].description, "rung note");
    }

    #[test]
    fn base_name_strips_io_members_only() {
        assert_eq!(strip_colon_member("Rack0:I"), "Rack0");
        assert_eq!(strip_colon_member("E300_P621:I1"), "E300_P621");
        assert_eq!(strip_colon_member("Pump:C"), "Pump");
        // Not an IO member path
        assert_eq!(strip_colon_member("Motor:Run"), "Motor:Run");
        assert_eq!(strip_colon_member("LT611"), "LT611");
    }

    #[test]
    fn source_lines_point_into_the_file() {
        let tags = parse_plc_export_text(EXPORT).unwrap();
        // First TAG sits on line 5 of the export.
        assert_eq!(tags[0].source_line, 5);
    }

    #[test]
    fn missing_header_is_a_parse_error() {
        let err = parse_plc_export_text("a,b,c\n1,2,3\n").unwrap_err();
        assert!(err.message.contains("TYPE"));
    }

    #[test]
    fn latin1_bytes_decode() {
        let bytes = b"TYPE,SCOPE,NAME,DESCRIPTION,DATATYPE,SPECIFIER\nTAG,,Pump1,\"temp \xb0C\",DINT,\n";
        let tags = parse_plc_export(bytes, "latin-1").unwrap();
        assert_eq!(tags.len(), 1);
        assert!(tags[0].description.contains('°'));
    }
}
