//! Tabular export and import of price line items.
//!
//! Rows travel as delimited text (comma for files, tab for the clipboard)
//! through the `csv` crate. The first record of a file is the header row;
//! columns are matched by name, not position.

use std::io::{Read, Write};
use std::str::FromStr;

use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ErrorCode;
use crate::model::{Field, PriceItem, RowId, parse_cell};
use crate::sheet::{CommitOutcome, EditError, PriceSheet};

pub const ID_COLUMN: &str = "id";
pub const HEADER_COLUMN: &str = "headerId";

/// Header row plus string cells, independent of the delimiter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TabularRows {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("input has no header row")]
    EmptyInput,

    #[error("parse error at record {row}: {reason}")]
    Parse { row: u64, reason: String },

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl ExchangeError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownColumn(_) | Self::DuplicateColumn(_) => ErrorCode::ImportColumnUnknown,
            Self::EmptyInput | Self::Parse { .. } | Self::Io(_) => ErrorCode::ImportParseFailed,
            Self::Edit(err) => err.code(),
        }
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> ExchangeError {
    let reason = err.to_string();
    let pos = err.position().cloned();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => ExchangeError::Io(e),
        _ => ExchangeError::Parse {
            row: pos
                .map(|p| p.record())
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row),
            reason,
        },
    }
}

/// Column names in export order.
#[must_use]
pub fn export_header() -> Vec<String> {
    [ID_COLUMN, HEADER_COLUMN]
        .into_iter()
        .chain(Field::ALL.iter().map(|f| f.as_str()))
        .map(str::to_string)
        .collect()
}

/// Lay out `items` as rows under [`export_header`].
pub fn export_items<'a>(items: impl IntoIterator<Item = &'a PriceItem>) -> TabularRows {
    let rows = items
        .into_iter()
        .map(|item| {
            let mut row = Vec::with_capacity(Field::ALL.len() + 2);
            row.push(item.id.to_string());
            row.push(item.header_id.clone());
            row.extend(Field::ALL.iter().map(|&f| item.get(f).display()));
            row
        })
        .collect();
    TabularRows {
        header: export_header(),
        rows,
    }
}

/// Write the header row and every data row.
///
/// # Errors
///
/// Returns [`ExchangeError::Io`] when the writer fails.
pub fn write_rows<W: Write>(writer: W, rows: &TabularRows, delimiter: u8) -> Result<(), ExchangeError> {
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(writer);
    out.write_record(&rows.header)
        .map_err(|e| map_csv_error(e, 1))?;
    for (idx, row) in rows.rows.iter().enumerate() {
        out.write_record(row)
            .map_err(|e| map_csv_error(e, idx as u64 + 2))?;
    }
    out.flush()?;
    Ok(())
}

/// Read a header row followed by data rows.
///
/// # Errors
///
/// Returns [`ExchangeError::EmptyInput`] when there is no header row and
/// [`ExchangeError::Parse`] for malformed records.
pub fn read_rows<R: Read>(reader: R, delimiter: u8) -> Result<TabularRows, ExchangeError> {
    let mut records = read_records(reader, delimiter)?.into_iter();
    let header = records.next().ok_or(ExchangeError::EmptyInput)?;
    Ok(TabularRows {
        header: header.into_iter().map(|h| h.trim().to_string()).collect(),
        rows: records.collect(),
    })
}

fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<Vec<String>>, ExchangeError> {
    let mut input = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut record = StringRecord::new();
    let mut out = Vec::new();
    loop {
        let more = input
            .read_record(&mut record)
            .map_err(|e| map_csv_error(e, out.len() as u64 + 1))?;
        if !more {
            break;
        }
        out.push(record.iter().map(str::to_string).collect());
    }
    Ok(out)
}

/// Render a block of cells as clipboard text: tab-separated, one line per row.
#[must_use]
pub fn encode_clipboard(cells: &[Vec<String>]) -> String {
    let mut out = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in cells {
        if out.write_record(row).is_err() {
            break;
        }
    }
    let bytes = out.into_inner().unwrap_or_default();
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

/// Split clipboard text into rows of cells. Malformed quoting falls back to
/// a plain split on tabs and newlines.
#[must_use]
pub fn decode_clipboard(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let text = text.strip_suffix('\r').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    read_records(text.as_bytes(), b'\t').unwrap_or_else(|_| {
        text.lines()
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect()
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Id,
    Header,
    Field(Field),
    Ignored,
}

fn map_columns(header: &[String]) -> Result<Vec<Column>, ExchangeError> {
    let mut seen = Vec::new();
    header
        .iter()
        .map(|name| {
            let column = if name.is_empty() {
                Column::Ignored
            } else if name.eq_ignore_ascii_case(ID_COLUMN) {
                Column::Id
            } else if name.eq_ignore_ascii_case(HEADER_COLUMN)
                || name.eq_ignore_ascii_case("header_id")
                || name.eq_ignore_ascii_case("header")
            {
                Column::Header
            } else {
                Field::from_str(name)
                    .map(Column::Field)
                    .map_err(|_| ExchangeError::UnknownColumn(name.clone()))?
            };
            if column != Column::Ignored {
                if seen.contains(&column) {
                    return Err(ExchangeError::DuplicateColumn(name.clone()));
                }
                seen.push(column);
            }
            Ok(column)
        })
        .collect()
}

/// One data row that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportFailure {
    /// 1-based record number in the input, header included.
    pub line: usize,
    pub id: Option<RowId>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: Vec<RowId>,
    pub updated: Vec<RowId>,
    pub unchanged: usize,
    pub failures: Vec<ImportFailure>,
}

/// Apply imported rows to a sheet in edit mode.
///
/// Rows whose id names an existing row become cell commits. Other rows are
/// inserted as new rows under their `headerId` column, else `header_id`,
/// else the sheet's header. Failures are collected per row.
///
/// # Errors
///
/// Returns [`ExchangeError::UnknownColumn`] or
/// [`ExchangeError::DuplicateColumn`] for a bad header row, and
/// [`ExchangeError::Edit`] when the sheet is not editing.
pub fn import_rows(
    sheet: &mut PriceSheet,
    header_id: Option<&str>,
    rows: &TabularRows,
) -> Result<ImportReport, ExchangeError> {
    if !sheet.is_editing() {
        return Err(EditError::NotEditing.into());
    }
    let columns = map_columns(&rows.header)?;
    let mut report = ImportReport::default();

    for (idx, row) in rows.rows.iter().enumerate() {
        let line = idx + 2;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let cell = |wanted: Column| {
            columns
                .iter()
                .position(|&c| c == wanted)
                .and_then(|pos| row.get(pos))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
        };
        let id = cell(Column::Id).map(RowId::new);
        let fields: Vec<(Field, &str)> = columns
            .iter()
            .zip(row.iter())
            .filter_map(|(column, raw)| match column {
                Column::Field(field) => Some((*field, raw.as_str())),
                _ => None,
            })
            .collect();

        let result = match id.as_ref().filter(|id| sheet.row(id).is_some()) {
            Some(existing) => update_row(sheet, existing, &fields).map(|changed| {
                if changed {
                    report.updated.push(existing.clone());
                } else {
                    report.unchanged += 1;
                }
            }),
            None => {
                let header = cell(Column::Header)
                    .or(header_id)
                    .or(sheet.scope())
                    .unwrap_or_default()
                    .to_string();
                create_row(sheet, header, &fields).map(|created| report.created.push(created))
            }
        };
        if let Err(reason) = result {
            warn!(line, %reason, "import row rejected");
            report.failures.push(ImportFailure { line, id, reason });
        }
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        failed = report.failures.len(),
        "import applied"
    );
    Ok(report)
}

fn update_row(sheet: &mut PriceSheet, id: &RowId, fields: &[(Field, &str)]) -> Result<bool, String> {
    let mut changed = false;
    let mut errors = Vec::new();
    for &(field, raw) in fields {
        match sheet.commit_cell(id, field, raw) {
            Ok(CommitOutcome::Unchanged) => {}
            Ok(_) => changed = true,
            Err(err) => errors.push(err.to_string()),
        }
    }
    debug!(row = %id, changed, "import row merged");
    if errors.is_empty() {
        Ok(changed)
    } else {
        Err(errors.join("; "))
    }
}

fn create_row(sheet: &mut PriceSheet, header: String, fields: &[(Field, &str)]) -> Result<RowId, String> {
    let mut item = PriceItem::blank(RowId::new(""), header);
    for &(field, raw) in fields {
        let value = parse_cell(field, raw).map_err(|e| format!("{field}: {e}"))?;
        item.set(field, value).map_err(|e| e.to_string())?;
    }
    sheet.insert_new_row(item).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::test_support::editing_sheet;

    #[test]
    fn export_header_lists_id_then_fields() {
        let header = export_header();
        assert_eq!(header[0], "id");
        assert_eq!(header[1], "headerId");
        assert_eq!(header[2], "productCode");
        assert_eq!(header.len(), Field::ALL.len() + 2);
    }

    #[test]
    fn written_csv_reads_back() {
        let (book, _sheet) = editing_sheet();
        let exported = export_items(&book.items);
        let mut buf = Vec::new();
        write_rows(&mut buf, &exported, b',').unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("id,headerId,productCode,productName"));
        assert!(text.contains("PI-000001,PH-0001,,Bleach 5%,12.00"));

        let back = read_rows(buf.as_slice(), b',').unwrap();
        assert_eq!(back, exported);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = read_rows("".as_bytes(), b',').unwrap_err();
        assert!(matches!(err, ExchangeError::EmptyInput));
        assert_eq!(err.code(), ErrorCode::ImportParseFailed);
    }

    #[test]
    fn unknown_column_is_an_error() {
        let (_book, mut sheet) = editing_sheet();
        let rows = TabularRows {
            header: vec!["id".into(), "colour".into()],
            rows: vec![],
        };
        let err = import_rows(&mut sheet, None, &rows).unwrap_err();
        assert!(matches!(err, ExchangeError::UnknownColumn(ref c) if c == "colour"));
        assert_eq!(err.code(), ErrorCode::ImportColumnUnknown);
    }

    #[test]
    fn import_updates_known_ids_and_creates_the_rest() {
        let (_book, mut sheet) = editing_sheet();
        let input = "id,Product Name,unit price,UOM\n\
                     PI-000001,Bleach 5%,12.50,CS\n\
                     PI-000002,Hand Soap,8.50,\n\
                     ,Dust Mop,15,EA\n\
                     new-7,,0,EA\n";
        let rows = read_rows(input.as_bytes(), b',').unwrap();
        let report = import_rows(&mut sheet, None, &rows).unwrap();

        assert_eq!(report.updated, vec![RowId::persisted(1)]);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 5);

        let id = RowId::persisted(1);
        assert!(sheet.tracker().is_field_dirty(&id, Field::UnitPrice));
        assert!(sheet.tracker().is_field_dirty(&id, Field::Uom));
        assert!(sheet.tracker().is_new(&report.created[0]));
    }

    #[test]
    fn import_requires_edit_mode() {
        let (book, _) = editing_sheet();
        let mut viewing = PriceSheet::open(&book, None).unwrap();
        let rows = TabularRows {
            header: vec!["id".into()],
            rows: vec![],
        };
        assert!(matches!(
            import_rows(&mut viewing, None, &rows),
            Err(ExchangeError::Edit(EditError::NotEditing))
        ));
    }

    #[test]
    fn clipboard_text_splits_on_tabs_and_lines() {
        let cells = decode_clipboard("a\tb\nc\td\n");
        assert_eq!(cells, vec![vec!["a", "b"], vec!["c", "d"]]);
        assert!(decode_clipboard("").is_empty());

        let encoded = encode_clipboard(&[
            vec!["Bleach".to_string(), "12.00".to_string()],
            vec!["Soap".to_string(), String::new()],
        ]);
        assert_eq!(encoded, "Bleach\t12.00\nSoap\t");
    }
}
