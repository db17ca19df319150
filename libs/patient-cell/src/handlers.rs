// libs/patient-cell/src/handlers.rs
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

use crate::models::{CreatePatientRequest, PatientError, PatientSearchQuery, UpdatePatientRequest};
use crate::services::patient::PatientService;

fn map_patient_error(e: PatientError) -> AppError {
    match e {
        PatientError::NotFound => AppError::NotFound("Patient not found".to_string()),
        PatientError::DuplicateEmail(email) => AppError::Conflict(format!("Patient with email {} already exists", email)),
        PatientError::ValidationError(msg) => AppError::ValidationError(msg),
        PatientError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() {
        return Err(AppError::Forbidden("Only staff may register patients".to_string()));
    }

    let service = PatientService::new(&state);
    let patient = service.create_patient(request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient registered"
    })))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.has_role("patient") && !user.owns_id(patient_id) {
        return Err(AppError::Forbidden("Patients can only view their own record".to_string()));
    }

    let service = PatientService::new(&state);
    let patient = service.get_patient(patient_id, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient
    })))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_own_record = user.has_role("patient") && user.owns_id(patient_id);
    if !is_own_record && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to update this record".to_string()));
    }

    let service = PatientService::new(&state);
    let patient = service.update_patient(patient_id, request, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "patient": patient,
        "message": "Patient record updated"
    })))
}

#[axum::debug_handler]
pub async fn search_patients(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<PatientSearchQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_staff() && !user.has_role("doctor") {
        return Err(AppError::Forbidden("Not authorized to search patients".to_string()));
    }

    let service = PatientService::new(&state);
    let patients = service.search_patients(query, token).await
        .map_err(map_patient_error)?;

    Ok(Json(json!({
        "success": true,
        "count": patients.len(),
        "patients": patients
    })))
}
