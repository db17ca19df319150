// libs/encounter-cell/src/services/lookup.rs
//
// Referenced-entity checks shared by the encounter services.
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use shared_database::supabase::SupabaseClient;

use crate::models::EncounterError;

pub(crate) async fn verify_patient_exists(
    supabase: &SupabaseClient,
    patient_id: i64,
    auth_token: &str,
) -> Result<(), EncounterError> {
    debug!("Verifying patient {} exists", patient_id);

    let path = format!("/rest/v1/patients?id=eq.{}&select=id", patient_id);
    let result: Vec<Value> = supabase.request(Method::GET, &path, Some(auth_token), None)
        .await
        .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

    if result.is_empty() {
        return Err(EncounterError::PatientNotFound);
    }
    Ok(())
}

pub(crate) async fn verify_doctor_exists(
    supabase: &SupabaseClient,
    doctor_id: i64,
    auth_token: &str,
) -> Result<(), EncounterError> {
    debug!("Verifying doctor {} exists", doctor_id);

    let path = format!("/rest/v1/doctors?id=eq.{}&select=id", doctor_id);
    let result: Vec<Value> = supabase.request(Method::GET, &path, Some(auth_token), None)
        .await
        .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

    if result.is_empty() {
        return Err(EncounterError::DoctorNotFound);
    }
    Ok(())
}

/// Registered contact address, when the patient has one.
pub(crate) async fn fetch_patient_email(
    supabase: &SupabaseClient,
    patient_id: i64,
    auth_token: &str,
) -> Result<Option<String>, EncounterError> {
    let path = format!("/rest/v1/patients?id=eq.{}&select=email,first_name", patient_id);
    let result: Vec<Value> = supabase.request(Method::GET, &path, Some(auth_token), None)
        .await
        .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

    Ok(result.first()
        .and_then(|row| row.get("email"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string()))
}
