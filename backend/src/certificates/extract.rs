//! Recipient list extraction.
//!
//! The spreadsheet layout is the one the upload step asks for: a header in the first row
//! and one recipient name per row in column A. Only text cells count as names; anything
//! else (numbers, dates, booleans, blanks) is silently skipped, duplicates are kept and
//! row order is preserved.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::path::Path;

use super::error::CertificateError;

/// Delimiters considered when sniffing a CSV header line.
const CSV_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Container formats accepted by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    /// Any workbook the spreadsheet reader detects on its own (xlsx, xlsm, xlsb, xls, ods).
    Workbook,
    /// Delimited text with a header line.
    Csv,
}

impl SpreadsheetFormat {
    /// Picks the format from an uploaded file name, `None` for unsupported extensions.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SpreadsheetFormat::Workbook),
            "csv" => Some(SpreadsheetFormat::Csv),
            _ => None,
        }
    }
}

/// Reads recipient names from a workbook.
///
/// `Ok(vec![])` means the sheet was read and simply holds no names; an unreadable
/// document is an `Extraction` error.
pub fn extract(bytes: &[u8]) -> Result<Vec<String>, CertificateError> {
    extract_with_format(bytes, SpreadsheetFormat::Workbook)
}

pub fn extract_with_format(
    bytes: &[u8],
    format: SpreadsheetFormat,
) -> Result<Vec<String>, CertificateError> {
    let names = match format {
        SpreadsheetFormat::Workbook => extract_workbook(bytes)?,
        SpreadsheetFormat::Csv => extract_csv(bytes)?,
    };
    log::debug!("extracted {} recipient names", names.len());
    Ok(names)
}

fn extract_workbook(bytes: &[u8]) -> Result<Vec<String>, CertificateError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| CertificateError::Extraction(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| CertificateError::Extraction("workbook has no sheets".to_string()))?
        .map_err(|e| CertificateError::Extraction(e.to_string()))?;

    // The used range starts at its first non-empty cell. If that is right of column A
    // there is no name column at all.
    match range.start() {
        Some((_, 0)) => {}
        _ => return Ok(Vec::new()),
    }

    let names = range
        .rows()
        .skip(1)
        .filter_map(|row| match row.first() {
            Some(Data::String(value)) => normalize_name(value),
            _ => None,
        })
        .collect();
    Ok(names)
}

fn extract_csv(bytes: &[u8]) -> Result<Vec<String>, CertificateError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let header_end = bytes.iter().position(|&b| b == b'\n').unwrap_or(bytes.len());
    let delimiter = detect_delimiter(&bytes[..header_end]);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(bytes);

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CertificateError::Extraction(e.to_string()))?;
        if let Some(name) = record.get(0).and_then(normalize_name) {
            names.push(name);
        }
    }
    Ok(names)
}

/// The delimiter that occurs most often in the header line, `,` when none does.
fn detect_delimiter(header_line: &[u8]) -> u8 {
    CSV_DELIMITERS
        .iter()
        .map(|&d| (d, header_line.iter().filter(|&&b| b == d).count()))
        .filter(|&(_, count)| count > 0)
        .max_by_key(|&(_, count)| count)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

fn normalize_name(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
