//! `GET /api/templates/{session_id}/preview?name=` renders one certificate with the
//! session's current settings and returns it as PNG. Without `name` the placeholder
//! recipient is used.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;

use crate::certificates::CertificateRenderer;
use crate::services::session_error_response;
use crate::session::SessionStore;

#[derive(Deserialize)]
pub(crate) struct PreviewQuery {
    name: Option<String>,
}

pub(crate) async fn process(
    store: web::Data<SessionStore>,
    renderer: web::Data<CertificateRenderer>,
    path: web::Path<String>,
    query: web::Query<PreviewQuery>,
) -> impl Responder {
    let session_id = path.into_inner();
    let settings = match store.load_settings(&session_id) {
        Ok(settings) => settings,
        Err(err) => return session_error_response(&err),
    };

    let name = query.into_inner().name;
    let rendered =
        web::block(move || renderer.render_preview(&settings, name.as_deref())).await;

    match rendered {
        Ok(Ok(png)) => HttpResponse::Ok().content_type("image/png").body(png),
        Ok(Err(err)) => {
            log::error!("session {}: preview failed: {}", session_id, err);
            HttpResponse::UnprocessableEntity().body(err.to_string())
        }
        Err(err) => HttpResponse::InternalServerError().body(err.to_string()),
    }
}
