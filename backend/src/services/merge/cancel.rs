use actix_web::{web, HttpResponse, Responder};

use crate::job_controller::state::JobsState;

/// `POST /api/merge/cancel/{job_id}`.
///
/// The flag is only checked between recipients, so the job reports `Cancelled` shortly
/// after this returns `202 Accepted`. Finished jobs answer `409 Conflict`.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    path: web::Path<String>,
) -> impl Responder {
    let job_id = path.into_inner();
    if state.cancel(&job_id).await {
        log::info!("cancellation requested for job {}", job_id);
        return HttpResponse::Accepted().json(serde_json::json!({ "job_id": job_id }));
    }
    match state.status(&job_id).await {
        Some(_) => HttpResponse::Conflict().body(format!("Job {} has already finished", job_id)),
        None => HttpResponse::NotFound().body(format!("Job {} not found", job_id)),
    }
}
