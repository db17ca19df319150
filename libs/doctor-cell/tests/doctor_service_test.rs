use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use doctor_cell::models::{CreateDoctorRequest, DoctorError, DoctorSearchQuery};
use doctor_cell::services::doctor::DoctorService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

async fn service_for(mock_server: &MockServer) -> DoctorService {
    let config = TestConfig::with_endpoints(&mock_server.uri(), "http://localhost:9925").to_app_config();
    DoctorService::new(&config)
}

#[tokio::test]
async fn new_doctors_start_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::doctor_response(4, "Nora", "Cardiology")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let doctor = service.create_doctor(CreateDoctorRequest {
        first_name: "Nora".to_string(),
        last_name: "Keane".to_string(),
        email: "nora.keane@example.com".to_string(),
        specialty: "Cardiology".to_string(),
        department_id: 3,
        consultation_fee: 150.0,
    }, "token").await.unwrap();

    assert!(doctor.is_available);
}

#[tokio::test]
async fn negative_consultation_fee_is_rejected() {
    let mock_server = MockServer::start().await;
    let service = service_for(&mock_server).await;

    let result = service.create_doctor(CreateDoctorRequest {
        first_name: "Nora".to_string(),
        last_name: "Keane".to_string(),
        email: "nora.keane@example.com".to_string(),
        specialty: "Cardiology".to_string(),
        department_id: 3,
        consultation_fee: -5.0,
    }, "token").await;

    assert_matches!(result, Err(DoctorError::ValidationError(_)));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn search_filters_by_availability() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("is_available", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(4, "Nora", "Cardiology")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let doctors = service.search_doctors(DoctorSearchQuery {
        specialty: None,
        department_id: None,
        available_only: Some(true),
        limit: None,
        offset: None,
    }, "token").await.unwrap();

    assert_eq!(doctors.len(), 1);
}
