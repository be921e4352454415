use actix_web::{web, HttpResponse, Responder};
use common::model::recipients::RecipientsResponse;

use super::recipients_response;
use crate::services::session_error_response;
use crate::session::{SessionError, SessionStore};

pub(crate) async fn process(
    store: web::Data<SessionStore>,
    path: web::Path<String>,
) -> impl Responder {
    match store.load_spreadsheet(&path.into_inner()) {
        Ok(sheet) => HttpResponse::Ok().json(recipients_response(&sheet)),
        Err(SessionError::MissingSpreadsheet) => {
            HttpResponse::Ok().json(RecipientsResponse::missing())
        }
        Err(err) => session_error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test;
    use common::model::recipients::{RecipientsResponse, RecipientsState};

    use crate::services::test_app;
    use crate::services::test_support::state;

    #[actix_web::test]
    async fn recipients_reflect_the_stored_spreadsheet() {
        let state = state();
        let app = test_app!(state);
        let session_id = state.store.create_session().unwrap();
        let uri = format!("/api/data_sources/spreadsheet/{}/recipients", session_id);

        let req = test::TestRequest::get().uri(&uri).to_request();
        let response: RecipientsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.state, RecipientsState::Missing);

        state
            .store
            .save_spreadsheet(&session_id, "names.csv", b"Name;Email\n Ada ;a@x\n;b@x\n")
            .unwrap();
        let req = test::TestRequest::get().uri(&uri).to_request();
        let response: RecipientsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.state, RecipientsState::Ready);
        assert_eq!(response.names, vec!["Ada"]);

        state
            .store
            .save_spreadsheet(&session_id, "names.csv", b"Name\n")
            .unwrap();
        let req = test::TestRequest::get().uri(&uri).to_request();
        let response: RecipientsResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(response.state, RecipientsState::NoRecipients);

        let req = test::TestRequest::get()
            .uri("/api/data_sources/spreadsheet/unknown/recipients")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
