use actix_web::{web, HttpResponse, Responder};

use crate::job_controller::state::JobsState;

/// `GET /api/merge/status/{job_id}`: the current `JobStatus`, or `404` for unknown ids.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    path: web::Path<String>,
) -> impl Responder {
    let job_id = path.into_inner();
    match state.status(&job_id).await {
        Some(status) => HttpResponse::Ok().json(status),
        None => HttpResponse::NotFound().body(format!("Job {} not found", job_id)),
    }
}
