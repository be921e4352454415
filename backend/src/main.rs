mod certificates;
mod config;
mod job_controller;
mod services;
mod session;

use crate::certificates::CertificateRenderer;
use crate::config::Config;
use crate::job_controller::state::JobsState;
use crate::session::SessionStore;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::{info, warn};
use tokio::sync::mpsc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = Config::from_env();
    let url = format!("http://{}:{}", config.host, config.port);

    let store = SessionStore::open(&config.database)
        .map_err(|e| std::io::Error::other(format!("cannot open session store: {}", e)))?;
    let store = web::Data::new(store);

    let renderer = CertificateRenderer::with_system_fonts(Some(&config.fonts_dir));
    if !renderer.has_fonts() {
        warn!("no fonts found; certificates cannot be rendered until fonts are installed");
    }
    let renderer = web::Data::new(renderer);

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(tx);

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    // Finished jobs and undownloaded archives are forgotten after the TTL
    let janitor_state = jobs_state.clone();
    let archive_ttl = config.archive_ttl;
    tokio::spawn(async move {
        job_controller::state::start_job_janitor(janitor_state, archive_ttl).await;
    });

    info!("Server running at {}", url);

    let bind = (config.host.clone(), config.port);
    let config = web::Data::new(config);
    let jobs_state = web::Data::new(jobs_state);
    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .app_data(store.clone())
            .app_data(renderer.clone())
            .app_data(jobs_state.clone())
            .app_data(config.clone())
            .configure(services::configure)
    })
        .bind(bind)?
        .run()
        .await
}
