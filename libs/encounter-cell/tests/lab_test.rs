use assert_matches::assert_matches;
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use encounter_cell::models::{EncounterError, SubmitLabResultRequest};
use encounter_cell::services::lab::LabService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn result_request() -> SubmitLabResultRequest {
    SubmitLabResultRequest {
        result_value: "5.4".to_string(),
        unit: "mmol/L".to_string(),
    }
}

fn completed_test() -> serde_json::Value {
    let mut test = MockSupabaseResponses::lab_test_response(3, 7, 4, "completed");
    test["result_value"] = json!("5.4");
    test["unit"] = json!("mmol/L");
    test["technician_id"] = json!(12);
    test["completed_at"] = json!("2024-06-01T11:00:00Z");
    test
}

async fn service_pair(store: &MockServer, mail: &MockServer) -> LabService {
    let config = TestConfig::with_endpoints(&store.uri(), &mail.uri()).to_app_config();
    LabService::new(&config)
}

#[tokio::test]
async fn submitting_a_result_completes_the_test_and_notifies_the_patient() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lab_test_response(3, 7, 4, "pending")
        ])))
        .mount(&store)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", "eq.3"))
        .and(query_param("status", "eq.pending"))
        .and(body_partial_json(json!({
            "status": "completed",
            "result_value": "5.4",
            "unit": "mmol/L",
            "technician_id": 12
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed_test()])))
        .expect(1)
        .mount(&store)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "aoife@example.com", "first_name": "Aoife"}
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mail)
        .await;

    let service = service_pair(&store, &mail).await;
    let test = service.submit_result(3, result_request(), 12, "token").await.unwrap();

    assert_eq!(test.status.to_string(), "completed");
    assert_eq!(test.result_value.as_deref(), Some("5.4"));
    assert_eq!(test.technician_id, Some(12));
}

#[tokio::test]
async fn a_completed_test_is_immutable() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed_test()])))
        .mount(&store)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/lab_tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&store)
        .await;

    let service = service_pair(&store, &mail).await;
    let result = service.submit_result(3, result_request(), 12, "token").await;

    assert_matches!(result, Err(EncounterError::AlreadyProcessed(_)));
}

#[tokio::test]
async fn results_require_a_value_and_a_unit() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;
    let service = service_pair(&store, &mail).await;

    let missing_value = SubmitLabResultRequest {
        result_value: "".to_string(),
        unit: "mmol/L".to_string(),
    };
    assert_matches!(
        service.submit_result(3, missing_value, 12, "token").await,
        Err(EncounterError::ValidationError(_))
    );

    let missing_unit = SubmitLabResultRequest {
        result_value: "5.4".to_string(),
        unit: "  ".to_string(),
    };
    assert_matches!(
        service.submit_result(3, missing_unit, 12, "token").await,
        Err(EncounterError::ValidationError(_))
    );

    assert!(store.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_patient_email_skips_the_notification_but_not_the_completion() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lab_test_response(3, 7, 4, "pending")
        ])))
        .mount(&store)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/lab_tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed_test()])))
        .mount(&store)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": null, "first_name": "Aoife"}
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mail)
        .await;

    let service = service_pair(&store, &mail).await;
    let test = service.submit_result(3, result_request(), 12, "token").await.unwrap();

    assert_eq!(test.status.to_string(), "completed");
}

#[tokio::test]
async fn a_mailer_failure_does_not_fail_the_completion() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/lab_tests"))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::lab_test_response(3, 7, 4, "pending")
        ])))
        .mount(&store)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/lab_tests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([completed_test()])))
        .mount(&store)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"email": "aoife@example.com", "first_name": "Aoife"}
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(502).set_body_string("mail gateway down"))
        .mount(&mail)
        .await;

    let service = service_pair(&store, &mail).await;
    let test = service.submit_result(3, result_request(), 12, "token").await.unwrap();

    assert_eq!(test.status.to_string(), "completed");
}
