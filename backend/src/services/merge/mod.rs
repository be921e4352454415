//! # Merge Service
//!
//! Wizard step 4: turns the session's template, style and recipients into a ZIP archive of
//! certificates in the background.
//!
//! - `POST /start` schedules the job and returns its id.
//! - `GET /status/{job_id}` is polled for progress.
//! - `POST /cancel/{job_id}` stops a running job between recipients.
//! - `GET /download/{job_id}` hands the finished archive out once.

mod cancel;
mod download;
mod start;
mod status;

use actix_web::web;

const API_PATH: &str = "/api/merge";

/// Configures and returns the Actix `Scope` for all merge-related routes.
pub fn configure_routes() -> actix_web::Scope {
    web::scope(API_PATH)
        .route("/start", web::post().to(start::process))
        .route("/status/{job_id}", web::get().to(status::process))
        .route("/cancel/{job_id}", web::post().to(cancel::process))
        .route("/download/{job_id}", web::get().to(download::process))
}
