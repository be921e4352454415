//! # Session Service
//!
//! Every wizard run starts by creating a session; its id scopes all later uploads.
//!
//! - `POST /api/sessions` returns `{ "session_id": ... }`.
//! - `DELETE /api/sessions/{id}` forgets everything stored for the session, including its
//!   merge jobs and any archive not yet downloaded.

use actix_web::web::{delete, post, scope};
use actix_web::{web, HttpResponse, Responder, Scope};

use crate::job_controller::state::JobsState;
use crate::services::session_error_response;
use crate::session::SessionStore;

const API_PATH: &str = "/api/sessions";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create))
        .route("/{session_id}", delete().to(remove))
}

async fn create(store: web::Data<SessionStore>) -> impl Responder {
    match store.create_session() {
        Ok(session_id) => {
            log::info!("session {} created", session_id);
            HttpResponse::Ok().json(serde_json::json!({ "session_id": session_id }))
        }
        Err(err) => session_error_response(&err),
    }
}

async fn remove(
    store: web::Data<SessionStore>,
    jobs: web::Data<JobsState>,
    path: web::Path<String>,
) -> impl Responder {
    let session_id = path.into_inner();
    match store.delete_session(&session_id) {
        Ok(()) => {
            let dropped = jobs.discard_session(&session_id).await;
            log::info!("session {} deleted with {} jobs", session_id, dropped);
            HttpResponse::NoContent().finish()
        }
        Err(err) => session_error_response(&err),
    }
}
