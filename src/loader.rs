use std::path::Path;

use encoding_rs::Encoding;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{Row, Table, Value};

pub const DELIMITER: u8 = b';';

fn load_error(path: &Path, reason: impl Into<String>) -> AppError {
    AppError::Load {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Decode raw bytes with the given WHATWG encoding label. Malformed
/// sequences are dropped rather than failing the load.
pub fn decode(bytes: &[u8], label: &str) -> Option<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())?;
    // `decode` sniffs and strips a BOM, which may override `encoding`.
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(encoding = used.name(), "dropping undecodable bytes");
        return Some(text.chars().filter(|&c| c != char::REPLACEMENT_CHARACTER).collect());
    }
    Some(text.into_owned())
}

/// Type a raw cell: integer, then decimal (either `.` or `,` separator),
/// otherwise text. Blank cells are null.
pub fn parse_cell(raw: &str) -> Value {
    let s = raw.trim();
    if s.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    let looks_numeric = s
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || c == '.' || c == ',' || (i == 0 && c == '-'));
    if looks_numeric {
        let normalized = if s.contains('.') { s.to_string() } else { s.replacen(',', ".", 1) };
        if let Ok(f) = normalized.parse::<f64>() {
            if f.is_finite() {
                return Value::Float(f);
            }
        }
    }
    Value::Text(s.to_string())
}

/// Load a semicolon-delimited table with a header row.
pub fn load_table(path: &Path, encoding: &str) -> Result<Table> {
    if !path.exists() {
        return Err(load_error(path, "file does not exist"));
    }
    let bytes = std::fs::read(path)?;
    let text = decode(&bytes, encoding)
        .ok_or_else(|| load_error(path, format!("unknown encoding {encoding:?}")))?;
    if text.trim().is_empty() {
        return Err(load_error(path, "file is empty"));
    }

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| load_error(path, format!("unreadable header: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(load_error(path, "missing header row"));
    }

    let mut rows: Vec<Row> = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| load_error(path, e.to_string()))?;
        // Line 1 is the header.
        let line = i + 2;
        if record.len() != columns.len() {
            return Err(load_error(
                path,
                format!(
                    "line {line} has {} fields, header has {}",
                    record.len(),
                    columns.len()
                ),
            ));
        }
        rows.push(record.iter().map(parse_cell).collect());
    }

    info!(path = %path.display(), rows = rows.len(), columns = columns.len(), "loaded table");
    Table::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("2017"), Value::Int(2017));
        assert_eq!(parse_cell(" 12,5 "), Value::Float(12.5));
        assert_eq!(parse_cell("-3.25"), Value::Float(-3.25));
        assert_eq!(parse_cell("styczeń"), Value::Text("styczeń".into()));
        assert_eq!(parse_cell("1,2,3"), Value::Text("1,2,3".into()));
        assert!(parse_cell("   ").is_null());
    }

    #[test]
    fn test_load_table_types_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.csv",
            "Kod;Nazwa;Płeć;Rok;Miesiące;Wartosc\n\
             0000000;POLSKA;mężczyźni;2017;styczeń;100\n\
             0200000;DOLNOŚLĄSKIE;kobiety;2017;luty;25,5\n"
                .as_bytes(),
        );
        let table = load_table(&path, "utf-8").unwrap();
        assert_eq!(table.columns().len(), 6);
        assert_eq!(table.len(), 2);
        let row = &table.rows()[1];
        assert_eq!(row[1], Value::Text("DOLNOŚLĄSKIE".into()));
        assert_eq!(row[3], Value::Int(2017));
        assert_eq!(row[5], Value::Float(25.5));
    }

    #[test]
    fn test_load_table_skips_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = b"Nazwa;Wartosc\nPOL".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"SKA;1\n");
        let path = write(dir.path(), "bad.csv", &bytes);
        let table = load_table(&path, "utf-8").unwrap();
        assert_eq!(table.rows()[0][0], Value::Text("POLSKA".into()));
    }

    #[test]
    fn test_load_table_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"Rok;Wartosc\n2017;1\n");
        let path = write(dir.path(), "bom.csv", &bytes);
        let table = load_table(&path, "utf-8").unwrap();
        assert!(table.has_column("Rok"));
    }

    #[test]
    fn test_load_table_windows_1250() {
        let dir = tempfile::tempdir().unwrap();
        // "Płeć" in CP-1250: P, 0xB3 (ł), e, 0xE6 (ć)
        let bytes = b"P\xB3e\xE6;Wartosc\nkobiety;7\n";
        let path = write(dir.path(), "cp.csv", bytes);
        let table = load_table(&path, "windows-1250").unwrap();
        assert!(table.has_column("Płeć"));
    }

    #[test]
    fn test_load_table_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        assert!(matches!(load_table(&missing, "utf-8"), Err(AppError::Load { .. })));

        let empty = write(dir.path(), "empty.csv", b"");
        assert!(matches!(load_table(&empty, "utf-8"), Err(AppError::Load { .. })));

        let ragged = write(dir.path(), "ragged.csv", b"a;b\n1;2\n3\n");
        let err = load_table(&ragged, "utf-8").unwrap_err();
        assert!(err.to_string().contains("line 3"), "got: {err}");

        let ok = write(dir.path(), "ok.csv", b"a;b\n1;2\n");
        assert!(matches!(load_table(&ok, "klingon"), Err(AppError::Load { .. })));
    }
}
