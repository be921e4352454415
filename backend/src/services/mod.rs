//! HTTP surface of the certificate wizard.
//!
//! One sub-module per concern, each exposing `configure_routes() -> Scope`:
//! - `sessions`: creating and dropping wizard sessions.
//! - `templates`: template upload, text style and the live preview (steps 1 and 2).
//! - `data_sources::spreadsheet`: the recipient spreadsheet (step 3).
//! - `merge`: the background batch job and the archive download (step 4).

pub mod data_sources;
pub mod merge;
pub mod sessions;
pub mod templates;

mod multipart;

use actix_web::{web, HttpResponse};

use crate::session::SessionError;

/// Registers every API scope on an application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(sessions::configure_routes())
        .service(templates::configure_routes())
        .service(data_sources::spreadsheet::configure_routes())
        .service(merge::configure_routes());
}

/// Maps a session store failure onto the response the wizard expects.
pub(crate) fn session_error_response(err: &SessionError) -> HttpResponse {
    match err {
        SessionError::NotFound => HttpResponse::NotFound().body(err.to_string()),
        SessionError::MissingTemplate | SessionError::MissingSpreadsheet => {
            HttpResponse::Conflict().body(err.to_string())
        }
        SessionError::Database(_) | SessionError::Poisoned => {
            log::error!("session store failure: {}", err);
            HttpResponse::InternalServerError().body(err.to_string())
        }
    }
}

/// Builds an initialised test service with the same wiring as `main`.
#[cfg(test)]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($state.store.clone())
                .app_data($state.renderer.clone())
                .app_data($state.jobs.clone())
                .app_data($state.config.clone())
                .configure($crate::services::configure),
        )
        .await
    };
}

#[cfg(test)]
pub(crate) use test_app;

#[cfg(test)]
pub(crate) mod test_support {
    use actix_web::web;
    use tokio::sync::mpsc;

    use crate::certificates::{test_support, CertificateRenderer};
    use crate::config::Config;
    use crate::job_controller::state::{start_job_updater, JobsState};
    use crate::session::SessionStore;

    pub(crate) struct TestState {
        pub store: web::Data<SessionStore>,
        pub renderer: web::Data<CertificateRenderer>,
        pub jobs: web::Data<JobsState>,
        pub config: web::Data<Config>,
    }

    /// Fresh in-memory state; the job updater runs on the current test runtime.
    pub(crate) fn state() -> TestState {
        let renderer = test_support::renderer().clone();
        let (tx, rx) = mpsc::channel(100);
        let jobs = JobsState::new(tx);
        tokio::spawn(start_job_updater(jobs.clone(), rx));
        TestState {
            store: web::Data::new(SessionStore::open(":memory:").unwrap()),
            renderer: web::Data::new(renderer),
            jobs: web::Data::new(jobs),
            config: web::Data::new(Config {
                workers: 2,
                max_template_bytes: 64 * 1024,
                max_spreadsheet_bytes: 64 * 1024,
                ..Config::default()
            }),
        }
    }

    /// A `multipart/form-data` body with a single `file` part.
    pub(crate) fn multipart_file(
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> (String, Vec<u8>) {
        let boundary = "certgen-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        (format!("multipart/form-data; boundary={boundary}"), body)
    }
}
