use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use encounter_cell::models::{BookHomeVisitRequest, EncounterError, UpdateHomeVisitRequest};
use encounter_cell::services::home_visit::HomeVisitService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn booking_request(service_type: &str, assigned_doctor_id: Option<i64>) -> BookHomeVisitRequest {
    BookHomeVisitRequest {
        patient_id: 7,
        assigned_doctor_id,
        service_type: service_type.to_string(),
        visit_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        visit_time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
        address: "12 Abbey Street, Dublin".to_string(),
    }
}

async fn service_for(mock_server: &MockServer) -> HomeVisitService {
    let config = TestConfig::with_endpoints(&mock_server.uri(), "http://localhost:9925").to_app_config();
    HomeVisitService::new(&config)
}

async fn mount_patient(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(7, Some("aoife@example.com"), "Aoife")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn doctor_visits_keep_the_assignment_and_bill_the_doctor_rate() {
    let mock_server = MockServer::start().await;
    mount_patient(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(4, "Nora", "General Medicine")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/home_visits"))
        .and(body_partial_json(json!({"service_type": "Doctor", "assigned_doctor_id": 4, "status": "pending"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::home_visit_response(9, 7, "Doctor", Some(4))
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/billings"))
        .and(body_partial_json(json!({"total_amount": 500.0, "status": "unpaid"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::billing_response(60, 7, 500.0, "unpaid")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let (visit, billing_id) = service.book_home_visit(booking_request("Doctor", Some(4)), "token").await.unwrap();

    assert_eq!(visit.assigned_doctor_id, Some(4));
    assert_eq!(billing_id, 60);
}

#[tokio::test]
async fn non_doctor_visits_never_retain_an_assigned_doctor() {
    let mock_server = MockServer::start().await;
    mount_patient(&mock_server).await;

    // The insert must carry a null assignment even though one was supplied,
    // and the nurse flat fee applies
    Mock::given(method("POST"))
        .and(path("/rest/v1/home_visits"))
        .and(body_partial_json(json!({"service_type": "Nurse", "assigned_doctor_id": null})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::home_visit_response(10, 7, "Nurse", None)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/billings"))
        .and(body_partial_json(json!({"total_amount": 300.0})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::billing_response(61, 7, 300.0, "unpaid")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let (visit, _) = service.book_home_visit(booking_request("Nurse", Some(7)), "token").await.unwrap();

    assert_eq!(visit.assigned_doctor_id, None);
}

#[tokio::test]
async fn unrecognized_service_types_bill_the_default_fee() {
    let mock_server = MockServer::start().await;
    mount_patient(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/home_visits"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::home_visit_response(11, 7, "Chiropractor", None)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/billings"))
        .and(body_partial_json(json!({"total_amount": 300.0})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::billing_response(62, 7, 300.0, "unpaid")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let (visit, _) = service.book_home_visit(booking_request("Chiropractor", None), "token").await.unwrap();

    assert_eq!(visit.service_type, "Chiropractor");
}

#[tokio::test]
async fn status_patches_are_free_form_strings() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/home_visits"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::home_visit_response(9, 7, "Doctor", Some(4))
        ])))
        .mount(&mock_server)
        .await;

    let mut updated = MockSupabaseResponses::home_visit_response(9, 7, "Doctor", Some(4));
    updated["status"] = json!("en-route");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/home_visits"))
        .and(query_param("id", "eq.9"))
        .and(body_partial_json(json!({"status": "en-route"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let request = UpdateHomeVisitRequest {
        status: Some("en-route".to_string()),
        assigned_doctor_id: None,
    };

    let visit = service.update_home_visit(9, request, "token").await.unwrap();
    assert_eq!(visit.status, "en-route");
}

#[tokio::test]
async fn assignment_patch_on_a_nurse_visit_is_ignored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/home_visits"))
        .and(query_param("id", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::home_visit_response(10, 7, "Nurse", None)
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let request = UpdateHomeVisitRequest {
        status: None,
        assigned_doctor_id: Some(Some(4)),
    };

    // Nothing to write once the assignment is dropped, so the row comes
    // back unchanged and no PATCH is issued
    let visit = service.update_home_visit(10, request, "token").await.unwrap();
    assert_eq!(visit.assigned_doctor_id, None);

    let patches: Vec<_> = mock_server.received_requests().await.unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .collect();
    assert!(patches.is_empty());
}

#[tokio::test]
async fn booking_requires_an_address() {
    let mock_server = MockServer::start().await;
    let service = service_for(&mock_server).await;

    let mut request = booking_request("Nurse", None);
    request.address = "  ".to_string();

    let result = service.book_home_visit(request, "token").await;
    assert_matches!(result, Err(EncounterError::ValidationError(_)));
}
