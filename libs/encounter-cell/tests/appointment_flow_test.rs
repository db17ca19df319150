use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{body_partial_json, method, path, query_param};

use encounter_cell::models::{
    BookAppointmentRequest, DispenseRequest, EncounterError, MedicineLineItem,
};
use encounter_cell::services::appointment::AppointmentService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn booking_request(payment_reference: Option<&str>) -> BookAppointmentRequest {
    BookAppointmentRequest {
        patient_id: 7,
        doctor_id: 4,
        appointment_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        reason: "Check-up".to_string(),
        payment_reference: payment_reference.map(|s| s.to_string()),
    }
}

fn dispense_request() -> DispenseRequest {
    DispenseRequest {
        patient_id: 7,
        medicines: vec![
            MedicineLineItem { name: "Amoxicillin".to_string(), quantity: 2, unit_price: 12.5 },
            MedicineLineItem { name: "Paracetamol".to_string(), quantity: 1, unit_price: 4.0 },
        ],
        medicine_costs: 29.0,
        total_bill_amount: 29.0,
    }
}

async fn service_for(mock_server: &MockServer) -> AppointmentService {
    let config = TestConfig::with_endpoints(&mock_server.uri(), "http://localhost:9925").to_app_config();
    AppointmentService::new(&config)
}

async fn mount_patient_and_doctor(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .and(query_param("id", "eq.7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(7, Some("aoife@example.com"), "Aoife")
        ])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::doctor_response(4, "Nora", "General Medicine")
        ])))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn patient_booking_requires_a_payment_reference() {
    let mock_server = MockServer::start().await;
    let service = service_for(&mock_server).await;

    let result = service.book_appointment(booking_request(None), true, "token").await;
    assert_matches!(result, Err(EncounterError::ValidationError(_)));

    // Nothing was written
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn staff_booking_goes_through_without_payment_reference() {
    let mock_server = MockServer::start().await;
    mount_patient_and_doctor(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({"status": "scheduled", "dispense_status": "pending", "reminder_sent": false})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "scheduled")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let appointment = service.book_appointment(booking_request(None), false, "token").await.unwrap();

    assert_eq!(appointment.id, 1);
    assert!(!appointment.reminder_sent);
}

#[tokio::test]
async fn booking_rejects_unknown_doctor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::patient_response(7, Some("aoife@example.com"), "Aoife")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let result = service.book_appointment(booking_request(Some("pay_123")), true, "token").await;

    assert_matches!(result, Err(EncounterError::DoctorNotFound));
}

#[tokio::test]
async fn losing_the_completion_race_reports_a_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "scheduled")
        ])))
        .mount(&mock_server)
        .await;

    // The stale read said "scheduled" but a concurrent caller got there
    // first, so the filtered update matches nothing
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.scheduled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let result = service.complete_appointment(1, "token").await;

    assert_matches!(result, Err(EncounterError::AlreadyProcessed(_)));
}

#[tokio::test]
async fn completing_a_canceled_appointment_is_rejected_before_any_write() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "canceled")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let result = service.complete_appointment(1, "token").await;

    assert_matches!(result, Err(EncounterError::InvalidTransition(_)));
}

#[tokio::test]
async fn dispensing_creates_the_bill_and_flips_the_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "completed")
        ])))
        .mount(&mock_server)
        .await;

    // The bill is created first, referencing the appointment
    Mock::given(method("POST"))
        .and(path("/rest/v1/billings"))
        .and(body_partial_json(json!({
            "appointment_id": 1,
            "medicine_costs": 29.0,
            "total_amount": 29.0,
            "status": "unpaid"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::billing_response(30, 7, 29.0, "unpaid")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dispensed = MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "completed");
    dispensed["dispense_status"] = json!("dispensed");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .and(query_param("dispense_status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([dispensed])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let (appointment, billing_id) = service.dispense_appointment(1, dispense_request(), "token").await.unwrap();

    assert_eq!(billing_id, 30);
    assert_eq!(appointment.dispense_status.to_string(), "dispensed");
}

#[tokio::test]
async fn losing_the_dispense_race_deletes_the_orphan_bill() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 7, 4, "2024-06-01", "10:00:00", "completed")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/billings"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::billing_response(30, 7, 29.0, "unpaid")
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("dispense_status", "eq.pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Compensation: the bill that was just created must be removed
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/billings"))
        .and(query_param("id", "eq.30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::billing_response(30, 7, 29.0, "unpaid")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let result = service.dispense_appointment(1, dispense_request(), "token").await;

    assert_matches!(result, Err(EncounterError::AlreadyProcessed(_)));
}

#[tokio::test]
async fn dispensing_validates_line_items_before_any_write() {
    let mock_server = MockServer::start().await;
    let service = service_for(&mock_server).await;

    let empty_lines = DispenseRequest {
        patient_id: 7,
        medicines: vec![],
        medicine_costs: 0.0,
        total_bill_amount: 10.0,
    };
    assert_matches!(
        service.dispense_appointment(1, empty_lines, "token").await,
        Err(EncounterError::ValidationError(_))
    );

    let negative_quantity = DispenseRequest {
        patient_id: 7,
        medicines: vec![MedicineLineItem { name: "Ibuprofen".to_string(), quantity: -1, unit_price: 3.0 }],
        medicine_costs: 3.0,
        total_bill_amount: 3.0,
    };
    assert_matches!(
        service.dispense_appointment(1, negative_quantity, "token").await,
        Err(EncounterError::ValidationError(_))
    );

    let zero_total = DispenseRequest {
        patient_id: 7,
        medicines: vec![MedicineLineItem { name: "Ibuprofen".to_string(), quantity: 1, unit_price: 3.0 }],
        medicine_costs: 0.0,
        total_bill_amount: 0.0,
    };
    assert_matches!(
        service.dispense_appointment(1, zero_total, "token").await,
        Err(EncounterError::ValidationError(_))
    );

    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn dispensing_rejects_a_mismatched_patient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(1, 8, 4, "2024-06-01", "10:00:00", "completed")
        ])))
        .mount(&mock_server)
        .await;

    let service = service_for(&mock_server).await;
    let result = service.dispense_appointment(1, dispense_request(), "token").await;

    assert_matches!(result, Err(EncounterError::ValidationError(_)));
}
