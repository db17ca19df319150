// libs/doctor-cell/src/services/doctor.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{CreateDoctorRequest, Doctor, DoctorError, DoctorSearchQuery, SetAvailabilityRequest};

pub struct DoctorService {
    supabase: SupabaseClient,
}

impl DoctorService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_doctor(
        &self,
        request: CreateDoctorRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Adding doctor {} {} to the directory", request.first_name, request.last_name);

        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(DoctorError::ValidationError(
                "First and last name are required".to_string(),
            ));
        }
        if request.specialty.trim().is_empty() {
            return Err(DoctorError::ValidationError(
                "Specialty is required".to_string(),
            ));
        }
        if request.consultation_fee < 0.0 {
            return Err(DoctorError::ValidationError(
                "Consultation fee cannot be negative".to_string(),
            ));
        }

        let doctor_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "specialty": request.specialty,
            "department_id": request.department_id,
            "consultation_fee": request.consultation_fee,
            "is_available": true,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctors",
            Some(auth_token),
            Some(doctor_data),
            Some(return_representation()),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctor = result.into_iter().next()
            .ok_or_else(|| DoctorError::DatabaseError("Doctor insert returned no row".to_string()))?;

        info!("Doctor {} added to the directory", doctor.id);
        Ok(doctor)
    }

    pub async fn get_doctor(&self, doctor_id: i64, auth_token: &str) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(DoctorError::NotFound)
    }

    pub async fn search_doctors(
        &self,
        query: DoctorSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Doctor>, DoctorError> {
        let mut query_parts = vec![];

        if let Some(specialty) = query.specialty {
            query_parts.push(format!("specialty=ilike.%{}%", specialty));
        }
        if let Some(department_id) = query.department_id {
            query_parts.push(format!("department_id=eq.{}", department_id));
        }
        if query.available_only.unwrap_or(false) {
            query_parts.push("is_available=eq.true".to_string());
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        query_parts.push(format!("limit={}&offset={}", limit, offset));

        let path = format!("/rest/v1/doctors?{}", query_parts.join("&"));

        let result: Vec<Doctor> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        Ok(result)
    }

    pub async fn set_availability(
        &self,
        doctor_id: i64,
        request: SetAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Doctor, DoctorError> {
        let update_data = json!({
            "is_available": request.is_available,
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Doctor> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(DoctorError::NotFound)
    }
}
