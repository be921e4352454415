use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;

use crate::job_controller::state::JobsState;

const ARCHIVE_NAME: &str = "certificates.zip";

/// `GET /api/merge/download/{job_id}`.
///
/// The archive is removed from memory as it is handed out; a second request for the same
/// job gets `410 Gone`.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    path: web::Path<String>,
) -> impl Responder {
    let job_id = path.into_inner();
    if let Some(archive) = state.take_archive(&job_id).await {
        log::info!("job {}: archive downloaded ({} bytes)", job_id, archive.len());
        return HttpResponse::Ok()
            .content_type("application/zip")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(ARCHIVE_NAME.to_string())],
            })
            .body(archive);
    }

    match state.status(&job_id).await {
        Some(JobStatus::Completed(_)) => HttpResponse::Gone()
            .body(format!("The archive of job {} was already downloaded", job_id)),
        Some(_) => {
            HttpResponse::Conflict().body(format!("Job {} has no archive to download", job_id))
        }
        None => HttpResponse::NotFound().body(format!("Job {} not found", job_id)),
    }
}
