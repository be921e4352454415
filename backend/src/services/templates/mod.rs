//! # Template Service Module
//!
//! Routes for wizard steps 1 and 2, all under `/api/templates/{session_id}`:
//! - `upload`: stores the certificate template (an image, or a PDF rendered as a blank page).
//! - `style`: reads and updates the name placement, size, font and colour.
//! - `preview`: renders one certificate with the current settings.

mod preview;
mod style;
mod upload;

use actix_web::web::{get, post, put, scope};
use actix_web::Scope;

/// The base path for all template-related API endpoints.
const API_PATH: &str = "/api/templates";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/{session_id}/upload", post().to(upload::process))
        .route("/{session_id}/style", put().to(style::update))
        .route("/{session_id}/style", get().to(style::get))
        .route("/{session_id}/preview", get().to(preview::process))
}
