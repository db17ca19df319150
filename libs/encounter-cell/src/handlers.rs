// libs/encounter-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    AdmitPatientRequest, BookAppointmentRequest, BookHomeVisitRequest,
    BookOutpatientVisitRequest, DischargeRequest, DispenseRequest, EncounterError,
    EncounterListQuery, OrderLabTestRequest, SubmitLabResultRequest,
    UpdateHomeVisitRequest,
};
use crate::services::admission::AdmissionService;
use crate::services::appointment::AppointmentService;
use crate::services::home_visit::HomeVisitService;
use crate::services::lab::LabService;
use crate::services::outpatient::OutpatientService;

fn map_encounter_error(e: EncounterError) -> AppError {
    match e {
        EncounterError::AppointmentNotFound
        | EncounterError::StayNotFound
        | EncounterError::LabTestNotFound
        | EncounterError::CatalogEntryNotFound
        | EncounterError::VisitNotFound
        | EncounterError::HomeVisitNotFound
        | EncounterError::PatientNotFound
        | EncounterError::DoctorNotFound => AppError::NotFound(e.to_string()),
        EncounterError::InvalidTransition(msg) => AppError::Conflict(msg),
        EncounterError::AlreadyProcessed(msg) => AppError::Conflict(msg),
        EncounterError::ValidationError(msg) => AppError::ValidationError(msg),
        EncounterError::Unauthorized => AppError::Forbidden("Not authorized for this encounter".to_string()),
        EncounterError::PartialWrite(msg) => AppError::Internal(msg),
        EncounterError::DatabaseError(msg) => AppError::Database(msg),
    }
}

fn principal_id(user: &User) -> Result<i64, AppError> {
    user.id.parse::<i64>()
        .map_err(|_| AppError::Auth("Invalid principal id".to_string()))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = user.has_role("patient");
    if is_patient && !user.owns_id(request.patient_id) {
        return Err(AppError::Forbidden("Patients can only book their own appointments".to_string()));
    }
    if !is_patient && !user.is_staff() && !user.has_role("doctor") {
        return Err(AppError::Forbidden("Not authorized to book appointments".to_string()));
    }

    let service = AppointmentService::new(&state);
    let appointment = service.book_appointment(request, is_patient, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentService::new(&state);

    let appointment = service.get_appointment(appointment_id, token).await
        .map_err(map_encounter_error)?;

    let allowed = user.is_staff()
        || user.has_role("pharmacist")
        || (user.has_role("patient") && user.owns_id(appointment.patient_id))
        || (user.has_role("doctor") && user.owns_id(appointment.doctor_id));
    if !allowed {
        return Err(AppError::Forbidden("Not authorized for this appointment".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// Only the doctor the appointment belongs to may complete it.
#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentService::new(&state);

    let appointment = service.get_appointment(appointment_id, token).await
        .map_err(map_encounter_error)?;

    let is_owning_doctor = user.has_role("doctor") && user.owns_id(appointment.doctor_id);
    if !is_owning_doctor && !user.is_admin() {
        return Err(AppError::Forbidden("Only the attending doctor may complete this appointment".to_string()));
    }

    let completed = service.complete_appointment(appointment_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": completed,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AppointmentService::new(&state);

    let appointment = service.get_appointment(appointment_id, token).await
        .map_err(map_encounter_error)?;

    let is_owning_patient = user.has_role("patient") && user.owns_id(appointment.patient_id);
    if !is_owning_patient && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to cancel this appointment".to_string()));
    }

    let canceled = service.cancel_appointment(appointment_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": canceled,
        "message": "Appointment canceled"
    })))
}

/// Pharmacy releases the prescribed medicines and bills them in one step.
#[axum::debug_handler]
pub async fn dispense_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<DispenseRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.has_role("pharmacist") && !user.is_admin() {
        return Err(AppError::Forbidden("Only pharmacy staff may dispense".to_string()));
    }

    let service = AppointmentService::new(&state);
    let (appointment, billing_id) = service.dispense_appointment(appointment_id, request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "billing_id": billing_id,
        "message": "Medicines dispensed and billed"
    })))
}

#[axum::debug_handler]
pub async fn get_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("patient") && !user.owns_id(patient_id) {
        return Err(AppError::Forbidden("Patients can only view their own appointments".to_string()));
    }

    let service = AppointmentService::new(&state);
    let appointments = service.list_patient_appointments(patient_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("doctor") && !user.owns_id(doctor_id) {
        return Err(AppError::Forbidden("Doctors can only view their own schedule".to_string()));
    }
    if user.has_role("patient") {
        return Err(AppError::Forbidden("Not authorized to view doctor schedules".to_string()));
    }

    let service = AppointmentService::new(&state);
    let appointments = service.list_doctor_appointments(doctor_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": appointments.len(),
        "appointments": appointments
    })))
}

// ==============================================================================
// INPATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn admit_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<AdmitPatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() && !user.has_role("doctor") {
        return Err(AppError::Forbidden("Not authorized to admit patients".to_string()));
    }

    let service = AdmissionService::new(&state);
    let stay = service.admit_patient(request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "stay": stay,
        "message": "Patient admitted"
    })))
}

#[axum::debug_handler]
pub async fn get_stay(
    State(state): State<Arc<AppConfig>>,
    Path(stay_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AdmissionService::new(&state);

    let stay = service.get_stay(stay_id, token).await
        .map_err(map_encounter_error)?;

    let allowed = user.is_staff()
        || (user.has_role("patient") && user.owns_id(stay.patient_id))
        || (user.has_role("doctor") && user.owns_id(stay.doctor_id));
    if !allowed {
        return Err(AppError::Forbidden("Not authorized for this stay".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "stay": stay
    })))
}

/// Discharge closes the stay, derives the stay bill and writes the EMR
/// discharge summary.
#[axum::debug_handler]
pub async fn discharge_patient(
    State(state): State<Arc<AppConfig>>,
    Path(stay_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<DischargeRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = AdmissionService::new(&state);

    let stay = service.get_stay(stay_id, token).await
        .map_err(map_encounter_error)?;

    let is_attending = user.has_role("doctor") && user.owns_id(stay.doctor_id);
    if !is_attending && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to discharge this patient".to_string()));
    }

    let summary = service.discharge_patient(stay_id, request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "discharge": summary,
        "message": "Patient discharged"
    })))
}

#[axum::debug_handler]
pub async fn list_admitted(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() && !user.has_role("doctor") {
        return Err(AppError::Forbidden("Not authorized to view the admissions roster".to_string()));
    }

    let service = AdmissionService::new(&state);
    let stays = service.list_admitted(&query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": stays.len(),
        "stays": stays
    })))
}

#[axum::debug_handler]
pub async fn get_patient_stays(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("patient") && !user.owns_id(patient_id) {
        return Err(AppError::Forbidden("Patients can only view their own stays".to_string()));
    }

    let service = AdmissionService::new(&state);
    let stays = service.list_patient_stays(patient_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": stays.len(),
        "stays": stays
    })))
}

// ==============================================================================
// LAB HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn order_lab_test(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<OrderLabTestRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.has_role("doctor") {
        return Err(AppError::Forbidden("Only doctors may order lab tests".to_string()));
    }
    let doctor_id = principal_id(&user)?;

    let service = LabService::new(&state);
    let test = service.order_test(request, doctor_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "lab_test": test,
        "message": "Lab test ordered"
    })))
}

#[axum::debug_handler]
pub async fn get_lab_test(
    State(state): State<Arc<AppConfig>>,
    Path(test_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = LabService::new(&state);

    let test = service.get_test(test_id, token).await
        .map_err(map_encounter_error)?;

    let allowed = user.is_staff()
        || user.has_role("technician")
        || (user.has_role("patient") && user.owns_id(test.patient_id))
        || (user.has_role("doctor") && user.owns_id(test.doctor_id));
    if !allowed {
        return Err(AppError::Forbidden("Not authorized for this lab test".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "lab_test": test
    })))
}

/// Technician submits the result; the patient is notified when they have a
/// registered email address.
#[axum::debug_handler]
pub async fn submit_lab_result(
    State(state): State<Arc<AppConfig>>,
    Path(test_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SubmitLabResultRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.has_role("technician") && !user.is_admin() {
        return Err(AppError::Forbidden("Only lab technicians may submit results".to_string()));
    }
    let technician_id = principal_id(&user)?;

    let service = LabService::new(&state);
    let test = service.submit_result(test_id, request, technician_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "lab_test": test,
        "message": "Result recorded"
    })))
}

#[axum::debug_handler]
pub async fn list_pending_lab_tests(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.has_role("technician") && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to view the lab queue".to_string()));
    }

    let service = LabService::new(&state);
    let tests = service.list_pending_tests(&query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": tests.len(),
        "lab_tests": tests
    })))
}

#[axum::debug_handler]
pub async fn get_patient_lab_tests(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("patient") && !user.owns_id(patient_id) {
        return Err(AppError::Forbidden("Patients can only view their own lab tests".to_string()));
    }

    let service = LabService::new(&state);
    let tests = service.list_patient_tests(patient_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": tests.len(),
        "lab_tests": tests
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_lab_tests(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("doctor") && !user.owns_id(doctor_id) {
        return Err(AppError::Forbidden("Doctors can only view their own orders".to_string()));
    }
    if user.has_role("patient") {
        return Err(AppError::Forbidden("Not authorized to view doctor orders".to_string()));
    }

    let service = LabService::new(&state);
    let tests = service.list_doctor_tests(doctor_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": tests.len(),
        "lab_tests": tests
    })))
}

// ==============================================================================
// OUTPATIENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_outpatient_visit(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookOutpatientVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = user.has_role("patient");
    if is_patient && !user.owns_id(request.patient_id) {
        return Err(AppError::Forbidden("Patients can only book their own visits".to_string()));
    }
    if !is_patient && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to book outpatient visits".to_string()));
    }

    let service = OutpatientService::new(&state);
    let visit = service.book_visit(request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "visit": visit,
        "message": "Outpatient visit booked"
    })))
}

#[axum::debug_handler]
pub async fn get_outpatient_visit(
    State(state): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = OutpatientService::new(&state);

    let visit = service.get_visit(visit_id, token).await
        .map_err(map_encounter_error)?;

    let allowed = user.is_staff()
        || (user.has_role("patient") && user.owns_id(visit.patient_id))
        || (user.has_role("doctor") && user.owns_id(visit.doctor_id));
    if !allowed {
        return Err(AppError::Forbidden("Not authorized for this visit".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "visit": visit
    })))
}

#[axum::debug_handler]
pub async fn pay_outpatient_visit(
    State(state): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = OutpatientService::new(&state);

    let visit = service.get_visit(visit_id, token).await
        .map_err(map_encounter_error)?;

    let is_owner = user.has_role("patient") && user.owns_id(visit.patient_id);
    if !is_owner && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to pay for this visit".to_string()));
    }

    let paid = service.mark_paid(visit_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "visit": paid,
        "message": "Visit payment recorded"
    })))
}

#[axum::debug_handler]
pub async fn get_patient_outpatient_visits(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("patient") && !user.owns_id(patient_id) {
        return Err(AppError::Forbidden("Patients can only view their own visits".to_string()));
    }

    let service = OutpatientService::new(&state);
    let visits = service.list_patient_visits(patient_id, &query, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": visits.len(),
        "visits": visits
    })))
}

// ==============================================================================
// HOME VISIT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_home_visit(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookHomeVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_patient = user.has_role("patient");
    if is_patient && !user.owns_id(request.patient_id) {
        return Err(AppError::Forbidden("Patients can only book their own home visits".to_string()));
    }
    if !is_patient && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to book home visits".to_string()));
    }

    let service = HomeVisitService::new(&state);
    let (visit, billing_id) = service.book_home_visit(request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "home_visit": visit,
        "billing_id": billing_id,
        "message": "Home visit booked"
    })))
}

#[axum::debug_handler]
pub async fn get_home_visit(
    State(state): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = HomeVisitService::new(&state);

    let visit = service.get_home_visit(visit_id, token).await
        .map_err(map_encounter_error)?;

    let allowed = user.is_staff()
        || (user.has_role("patient") && user.owns_id(visit.patient_id))
        || (user.has_role("doctor") && visit.assigned_doctor_id.is_some_and(|id| user.owns_id(id)));
    if !allowed {
        return Err(AppError::Forbidden("Not authorized for this home visit".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "home_visit": visit
    })))
}

#[axum::debug_handler]
pub async fn update_home_visit(
    State(state): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateHomeVisitRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff may update home visits".to_string()));
    }

    let service = HomeVisitService::new(&state);
    let visit = service.update_home_visit(visit_id, request, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "home_visit": visit,
        "message": "Home visit updated"
    })))
}

/// Staff recovery path: bill a visit whose bill was not created at booking.
#[axum::debug_handler]
pub async fn create_home_visit_bill(
    State(state): State<Arc<AppConfig>>,
    Path(visit_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff may create home visit bills".to_string()));
    }

    let service = HomeVisitService::new(&state);
    let billing_id = service.create_visit_bill(visit_id, token).await
        .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "billing_id": billing_id,
        "message": "Home visit billed"
    })))
}

#[axum::debug_handler]
pub async fn list_home_visits(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<EncounterListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let service = HomeVisitService::new(&state);

    // Staff see everything; patients and doctors see their own
    let visits = if user.is_staff() {
        service.list_all(&query, token).await
    } else if user.has_role("patient") {
        service.list_patient_visits(principal_id(&user)?, &query, token).await
    } else if user.has_role("doctor") {
        service.list_doctor_visits(principal_id(&user)?, &query, token).await
    } else {
        return Err(AppError::Forbidden("Not authorized to view home visits".to_string()));
    }
    .map_err(map_encounter_error)?;

    Ok(Json(json!({
        "success": true,
        "count": visits.len(),
        "home_visits": visits
    })))
}
