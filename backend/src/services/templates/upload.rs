//! # Template Upload Service
//!
//! `POST /api/templates/{session_id}/upload` takes a multipart form with a `file` part.
//!
//! The MIME type comes from the part itself, or is guessed from the file name when the
//! client sent none. Images (`image/*`) are decoded once, on the blocking pool, so that a
//! corrupt file is refused here instead of failing the whole batch later. PDFs are stored
//! as they are.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::certificate::{TemplateType, TemplateUploadResponse, TextStyle};

use crate::certificates::render::decode_template;
use crate::certificates::CertificateSettings;
use crate::config::Config;
use crate::services::multipart::{read_file_field, UploadedFile};
use crate::services::session_error_response;
use crate::session::SessionStore;

const PDF_MIME: &str = "application/pdf";

pub(crate) async fn process(
    store: web::Data<SessionStore>,
    config: web::Data<Config>,
    path: web::Path<String>,
    payload: Multipart,
) -> impl Responder {
    let session_id = path.into_inner();
    let file = match read_file_field(payload, config.max_template_bytes).await {
        Ok(file) => file,
        Err(err) => return err.response(),
    };

    let mime = template_mime(&file);
    let template_type = match classify(&mime) {
        Some(template_type) => template_type,
        None => {
            log::warn!("session {}: rejected template of type '{}'", session_id, mime);
            return HttpResponse::BadRequest()
                .body(format!("unsupported template type '{}'", mime));
        }
    };

    let bytes = if template_type == TemplateType::Image {
        let decoded = web::block(move || {
            let candidate = CertificateSettings::new(file.bytes, template_type, TextStyle::default());
            decode_template(&candidate).map(|_| candidate.template)
        })
        .await;
        match decoded {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(err)) => {
                log::warn!("session {}: {}", session_id, err);
                return HttpResponse::BadRequest().body(err.to_string());
            }
            Err(err) => return HttpResponse::InternalServerError().body(err.to_string()),
        }
    } else {
        file.bytes
    };

    let extension = extension_for(&mime);
    match store.save_template(&session_id, &bytes, template_type, extension) {
        Ok(unchanged) => {
            log::info!(
                "session {}: template stored ({}, {} bytes)",
                session_id,
                mime,
                bytes.len()
            );
            HttpResponse::Ok().json(TemplateUploadResponse {
                template_type,
                extension: extension.to_string(),
                unchanged,
            })
        }
        Err(err) => session_error_response(&err),
    }
}

fn template_mime(file: &UploadedFile) -> String {
    file.content_type
        .clone()
        .filter(|m| m != "application/octet-stream")
        .or_else(|| {
            file.filename.as_deref().and_then(|name| {
                mime_guess::from_path(name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
        })
        .unwrap_or_default()
}

fn classify(mime: &str) -> Option<TemplateType> {
    if mime.starts_with("image/") {
        Some(TemplateType::Image)
    } else if mime == PDF_MIME {
        Some(TemplateType::Pdf)
    } else {
        None
    }
}

fn extension_for(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        PDF_MIME => "pdf",
        _ => "unknown",
    }
}
