//! Manages the recipient spreadsheet of a session (wizard step 3).
//!
//! The provided routes are:
//! - `POST /api/data_sources/spreadsheet/{session_id}/upload`: multipart upload with a `file`
//!   field. The file is stored as-is and parsed right away so the response already tells the
//!   user how many recipients were found.
//!
//! - `GET /api/data_sources/spreadsheet/{session_id}/recipients`: re-reads the stored file and
//!   returns the recipient names with a `state` of `ready`, `no_recipients`, `unreadable` or
//!   `missing`.

use actix_web::web::{get, post, scope};
use actix_web::Scope;
use common::model::recipients::RecipientsResponse;

use crate::certificates::{extract, extract_with_format, CertificateError, SpreadsheetFormat};
use crate::session::StoredSpreadsheet;

mod recipients;
mod upload;

const API_PATH: &str = "/api/data_sources/spreadsheet";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{session_id}/upload", post().to(upload::process))
        .route("/{session_id}/recipients", get().to(recipients::process))
}

/// Recipient names of a stored spreadsheet, in sheet order.
pub(crate) fn read_recipients(sheet: &StoredSpreadsheet) -> Result<Vec<String>, CertificateError> {
    match SpreadsheetFormat::from_filename(&sheet.filename) {
        Some(SpreadsheetFormat::Csv) => extract_with_format(&sheet.bytes, SpreadsheetFormat::Csv),
        _ => extract(&sheet.bytes),
    }
}

pub(crate) fn recipients_response(sheet: &StoredSpreadsheet) -> RecipientsResponse {
    match read_recipients(sheet) {
        Ok(names) => RecipientsResponse::from_names(names),
        Err(err) => RecipientsResponse::unreadable(err.to_string()),
    }
}
