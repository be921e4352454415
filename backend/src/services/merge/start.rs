//! # Merge Job Start Service
//!
//! `POST /api/merge/start` with `{ "session_id": ... }`.
//!
//! ## Workflow:
//!
//! 1.  **Pre-flight**: the handler takes a snapshot of the session settings and reads the
//!     recipients. A missing template or spreadsheet answers `409 Conflict`; a spreadsheet
//!     without names (or one that cannot be read) answers `422 Unprocessable Entity`, and no
//!     job is created.
//!
//! 2.  **Job Scheduling**: `schedule_merge_job` registers the job as `Pending` together with
//!     its cancellation flag, returns the `job_id` right away and spawns a Tokio task that
//!     owns the job's lifecycle.
//!
//! 3.  **Background Processing**: the batch runs in `tokio::task::spawn_blocking`, where the
//!     `BatchArchiver` renders certificates on its own worker pool.
//!
//! 4.  **Progress Reporting**: after every certificate the worker sends a `MergeUpdate`
//!     through a per-job channel. A listener task turns it into a percentage and forwards
//!     it to the central `job_controller`. The terminal status is sent only after the
//!     listener has drained, so it always comes last.

use crate::certificates::{
    progress_percent, BatchArchiver, BatchOptions, CancellationFlag, CertificateError,
    CertificateRenderer, CertificateSettings,
};
use crate::config::Config;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::data_sources::spreadsheet::read_recipients;
use crate::services::session_error_response;
use crate::session::{SessionError, SessionStore};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::{FailureReason, JobStatus};
use common::requests::StartMergeRequest;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Represents a status update for a merge job or one of its certificates.
///
/// Sent from the synchronous worker (`merge_blocking`) back to the asynchronous task that
/// manages the job, so the worker never has to `await` anything.
#[derive(Debug)]
pub enum MergeUpdate {
    /// Updates the overall status of the job.
    Job(JobStatus),
    /// One more certificate has been written to the archive.
    Task { completed: usize, total: usize },
}

/// Why a merge could not be started.
#[derive(thiserror::Error, Debug)]
enum StartError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Unreadable(CertificateError),
    #[error("no recipients")]
    NoRecipients,
}

impl StartError {
    fn response(&self) -> HttpResponse {
        match self {
            StartError::Session(err) => session_error_response(err),
            StartError::Unreadable(_) | StartError::NoRecipients => {
                HttpResponse::UnprocessableEntity().body(self.to_string())
            }
        }
    }
}

/// The Actix web handler for `POST /api/merge/start`.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    store: web::Data<SessionStore>,
    renderer: web::Data<CertificateRenderer>,
    config: web::Data<Config>,
    payload: web::Json<StartMergeRequest>,
) -> impl Responder {
    let session_id = payload.into_inner().session_id;
    let (settings, names) = match load_batch(&store, &session_id) {
        Ok(batch) => batch,
        Err(err) => {
            log::warn!("session {}: merge not started: {}", session_id, err);
            return err.response();
        }
    };

    let job_id =
        schedule_merge_job(state, renderer, &session_id, settings, names, config.workers).await;
    log::info!("session {}: merge job {} scheduled", session_id, job_id);
    HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id }))
}

fn load_batch(
    store: &SessionStore,
    session_id: &str,
) -> Result<(CertificateSettings, Vec<String>), StartError> {
    let settings = store.load_settings(session_id)?;
    let sheet = store.load_spreadsheet(session_id)?;
    let names = read_recipients(&sheet).map_err(StartError::Unreadable)?;
    if names.is_empty() {
        return Err(StartError::NoRecipients);
    }
    Ok((settings, names))
}

/// Registers the job and spawns the task that runs it; returns the new `job_id`.
async fn schedule_merge_job(
    state: web::Data<JobsState>,
    renderer: web::Data<CertificateRenderer>,
    session_id: &str,
    settings: CertificateSettings,
    names: Vec<String>,
    workers: usize,
) -> String {
    let job_id = Uuid::new_v4().to_string();
    let cancel = CancellationFlag::new();
    state.register(&job_id, session_id, cancel.clone()).await;

    let jobs = state.get_ref().clone();
    let job_id_clone = job_id.clone();

    tokio::spawn(async move {
        let (merge_tx, mut merge_rx) = mpsc::channel::<MergeUpdate>(100);

        let job_updater_tx = jobs.tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        let listener = tokio::spawn(async move {
            while let Some(update) = merge_rx.recv().await {
                let status = match update {
                    MergeUpdate::Job(job_status) => job_status,
                    MergeUpdate::Task { completed, total } => {
                        JobStatus::InProgress(progress_percent(completed, total))
                    }
                };
                let _ = job_updater_tx
                    .send(JobUpdate {
                        job_id: job_id_for_updater.clone(),
                        status,
                    })
                    .await;
            }
        });

        let total = names.len();
        let options = BatchOptions { workers, cancel };
        let handle = tokio::task::spawn_blocking(move || {
            merge_blocking(merge_tx, &renderer, &settings, &names, options)
        });

        let status = match handle.await {
            Ok(Ok(archive)) => {
                jobs.store_archive(&job_id_clone, archive).await;
                JobStatus::Completed(format!("{} certificates generated", total))
            }
            Ok(Err(CertificateError::Cancelled { completed })) => {
                log::info!("job {} cancelled after {} certificates", job_id_clone, completed);
                JobStatus::Cancelled(completed as u32)
            }
            Ok(Err(e)) => {
                log::error!("job {} failed: {}", job_id_clone, e);
                JobStatus::failed(e.reason(), e.to_string())
            }
            Err(e) => {
                log::error!("job {} lost its worker: {}", job_id_clone, e);
                JobStatus::failed(FailureReason::Internal, format!("Task join error: {}", e))
            }
        };

        let _ = listener.await;
        let _ = jobs
            .tx
            .send(JobUpdate {
                job_id: job_id_clone,
                status,
            })
            .await;
    });

    job_id
}

/// Runs the batch on the current (blocking) thread and returns the archive bytes.
fn merge_blocking(
    tx: mpsc::Sender<MergeUpdate>,
    renderer: &CertificateRenderer,
    settings: &CertificateSettings,
    names: &[String],
    options: BatchOptions,
) -> Result<Vec<u8>, CertificateError> {
    let _ = tx.blocking_send(MergeUpdate::Job(JobStatus::InProgress(0)));

    BatchArchiver::new(renderer, options).run(names, settings, |completed, total| {
        let _ = tx.blocking_send(MergeUpdate::Task { completed, total });
    })
}
