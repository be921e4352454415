//! # Text Style Service
//!
//! `GET` and `PUT /api/templates/{session_id}/style`. The stored style always renders:
//! positions are clamped into the canvas, and sizes or colours the renderer cannot use
//! are refused with `400 Bad Request`.

use std::ops::RangeInclusive;

use actix_web::{web, HttpResponse, Responder};
use common::model::certificate::TextStyle;

use crate::certificates::render::parse_hex_color;
use crate::services::session_error_response;
use crate::session::SessionStore;

/// Font sizes offered by the preview slider.
pub(crate) const FONT_SIZE_RANGE: RangeInclusive<u32> = 12..=48;

pub(crate) async fn get(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
) -> impl Responder {
    match store.load_style(&path.into_inner()) {
        Ok(style) => HttpResponse::Ok().json(style),
        Err(err) => session_error_response(&err),
    }
}

pub(crate) async fn update(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
    payload: web::Json<TextStyle>,
) -> impl Responder {
    let session_id = path.into_inner();
    let style = match validate(payload.into_inner()) {
        Ok(style) => style,
        Err(msg) => {
            log::warn!("session {}: rejected style: {}", session_id, msg);
            return HttpResponse::BadRequest().body(msg);
        }
    };

    match store.save_style(&session_id, &style) {
        Ok(()) => HttpResponse::Ok().json(style),
        Err(err) => session_error_response(&err),
    }
}

fn validate(mut style: TextStyle) -> Result<TextStyle, String> {
    if !FONT_SIZE_RANGE.contains(&style.font_size) {
        return Err(format!(
            "font size must be between {} and {}",
            FONT_SIZE_RANGE.start(),
            FONT_SIZE_RANGE.end()
        ));
    }
    if parse_hex_color(&style.text_color).is_none() {
        return Err(format!("'{}' is not a hex colour", style.text_color));
    }
    style.name_position = style.name_position.clamped();
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::model::certificate::{FontFamily, NamePosition};

    use crate::services::test_app;
    use crate::services::test_support::state;

    #[::core::prelude::v1::test]
    fn positions_are_clamped_and_bad_values_refused() {
        let style = validate(TextStyle {
            name_position: NamePosition { x: -5.0, y: 140.0 },
            ..TextStyle::default()
        })
        .unwrap();
        assert_eq!(style.name_position, NamePosition { x: 0.0, y: 100.0 });

        for font_size in [11, 49] {
            assert!(validate(TextStyle {
                font_size,
                ..TextStyle::default()
            })
            .is_err());
        }
        assert!(validate(TextStyle {
            text_color: "navy".into(),
            ..TextStyle::default()
        })
        .is_err());
    }

    #[actix_web::test]
    async fn style_round_trips_through_the_session() {
        let state = state();
        let app = test_app!(state);
        let session_id = state.store.create_session().unwrap();
        let uri = format!("/api/templates/{}/style", session_id);

        let req = test::TestRequest::get().uri(&uri).to_request();
        let style: TextStyle = test::call_and_read_body_json(&app, req).await;
        assert_eq!(style, TextStyle::default());

        let req = test::TestRequest::put()
            .uri(&uri)
            .set_json(serde_json::json!({
                "namePosition": { "x": 25, "y": 75 },
                "fontSize": 40,
                "fontFamily": "display",
                "textColor": "#c0ffee"
            }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri(&uri).to_request();
        let style: TextStyle = test::call_and_read_body_json(&app, req).await;
        assert_eq!(style.font_size, 40);
        assert_eq!(style.font_family, FontFamily::Display);
        assert_eq!(style.name_position, NamePosition { x: 25.0, y: 75.0 });

        let req = test::TestRequest::put()
            .uri(&uri)
            .set_json(serde_json::json!({ "fontSize": 100 }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
