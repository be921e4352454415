use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::recipients::SpreadsheetUploadResponse;

use super::recipients_response;
use crate::certificates::SpreadsheetFormat;
use crate::config::Config;
use crate::services::multipart::read_file_field;
use crate::services::session_error_response;
use crate::session::{SessionStore, StoredSpreadsheet};

/// HTTP handler for the spreadsheet upload.
///
/// - `200 OK` with a `SpreadsheetUploadResponse`, even when no names were found.
/// - `400 Bad Request` when the file extension is not a supported spreadsheet.
/// - `413 Payload Too Large` above `max_spreadsheet_bytes`.
pub(crate) async fn process(
    store: web::Data<SessionStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    payload: Multipart,
) -> impl Responder {
    let session_id = path.into_inner();
    let file = match read_file_field(payload, config.max_spreadsheet_bytes).await {
        Ok(file) => file,
        Err(err) => return err.response(),
    };

    let filename = file.filename.unwrap_or_default();
    if SpreadsheetFormat::from_filename(&filename).is_none() {
        log::warn!("session {}: rejected spreadsheet '{}'", session_id, filename);
        return HttpResponse::BadRequest()
            .body("The file must be a spreadsheet (.xlsx, .xls, .xlsm, .xlsb, .ods or .csv)");
    }

    let unchanged = match store.save_spreadsheet(&session_id, &filename, &file.bytes) {
        Ok(unchanged) => unchanged,
        Err(err) => return session_error_response(&err),
    };

    let sheet = StoredSpreadsheet {
        filename: filename.clone(),
        bytes: file.bytes,
    };
    let recipients = match web::block(move || recipients_response(&sheet)).await {
        Ok(recipients) => recipients,
        Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
    };
    log::info!(
        "session {}: spreadsheet '{}' stored, {} recipients",
        session_id,
        filename,
        recipients.count
    );
    HttpResponse::Ok().json(SpreadsheetUploadResponse {
        unchanged,
        recipients,
    })
}
