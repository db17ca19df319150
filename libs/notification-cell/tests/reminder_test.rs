use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param};

use notification_cell::services::reminder::ReminderScannerService;
use shared_utils::test_utils::TestConfig;

// A fixed "now" so rows can be placed inside or outside the 1h window
fn fixed_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn due_appointment(id: i64, email: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "patient_id": 7,
        "doctor_id": 4,
        "appointment_date": "2024-06-01",
        "appointment_time": "10:00:00",
        "reason": "Check-up",
        "status": "scheduled",
        "dispense_status": "pending",
        "reminder_sent": false,
        "patients": {"email": email, "first_name": "Aoife"},
        "doctors": {"first_name": "Nora", "last_name": "Keane"}
    })
}

async fn scanner_for(store: &MockServer, mail: &MockServer) -> ReminderScannerService {
    let config = TestConfig::with_endpoints(&store.uri(), &mail.uri()).to_app_config();
    ReminderScannerService::new(&config)
}

#[tokio::test]
async fn reminder_flag_is_written_only_after_a_successful_send() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            due_appointment(1, Some("aoife@example.com"))
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mail)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "reminder_sent": true}])))
        .expect(1)
        .mount(&store)
        .await;

    let scanner = scanner_for(&store, &mail).await;
    let sent = scanner.scan_appointments(fixed_now()).await.unwrap();

    assert_eq!(sent, 1);
}

#[tokio::test]
async fn failed_send_leaves_the_flag_unset_for_retry() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            due_appointment(1, Some("aoife@example.com"))
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(500).set_body_string("mail transport down"))
        .mount(&mail)
        .await;

    // The flag write must not happen when the send fails
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&store)
        .await;

    let scanner = scanner_for(&store, &mail).await;
    let sent = scanner.scan_appointments(fixed_now()).await.unwrap();

    assert_eq!(sent, 0);
}

#[tokio::test]
async fn missing_email_is_skipped_without_aborting_the_pass() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    // First row has no contact address, second does — the pass must reach it
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            due_appointment(1, None),
            due_appointment(2, Some("second@example.com"))
        ])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mail)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "reminder_sent": true}])))
        .expect(1)
        .mount(&store)
        .await;

    let scanner = scanner_for(&store, &mail).await;
    let sent = scanner.scan_appointments(fixed_now()).await.unwrap();

    assert_eq!(sent, 1);
}

#[tokio::test]
async fn appointments_outside_the_lookahead_window_are_not_reminded() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    let mut too_late = due_appointment(1, Some("aoife@example.com"));
    too_late["appointment_time"] = json!("14:00:00"); // hours past the window

    let mut already_started = due_appointment(2, Some("aoife@example.com"));
    already_started["appointment_time"] = json!("09:00:00"); // before now

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([too_late, already_started])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(0)
        .mount(&mail)
        .await;

    let scanner = scanner_for(&store, &mail).await;
    let sent = scanner.scan_appointments(fixed_now()).await.unwrap();

    assert_eq!(sent, 0);
}

#[tokio::test]
async fn home_visit_sweep_handles_array_shaped_patient_join() {
    let store = MockServer::start().await;
    let mail = MockServer::start().await;

    // The store client sometimes hands the embedded patient back as a
    // one-element list; the sweep must read it all the same
    Mock::given(method("GET"))
        .and(path("/rest/v1/home_visits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 9,
            "patient_id": 7,
            "service_type": "Nurse",
            "visit_date": "2024-06-01",
            "visit_time": "10:15:00",
            "address": "12 Abbey Street, Dublin",
            "status": "pending",
            "reminder_sent": false,
            "patients": [{"email": "aoife@example.com", "first_name": "Aoife"}]
        }])))
        .mount(&store)
        .await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "email_1"})))
        .expect(1)
        .mount(&mail)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/home_visits"))
        .and(query_param("id", "eq.9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 9, "reminder_sent": true}])))
        .expect(1)
        .mount(&store)
        .await;

    let scanner = scanner_for(&store, &mail).await;
    let sent = scanner.scan_home_visits(fixed_now()).await.unwrap();

    assert_eq!(sent, 1);
}
