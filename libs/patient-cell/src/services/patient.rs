// libs/patient-cell/src/services/patient.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{
    CreatePatientRequest, Patient, PatientError, PatientSearchQuery, UpdatePatientRequest,
};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Creating patient record for {} {}", request.first_name, request.last_name);

        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(PatientError::ValidationError(
                "First and last name are required".to_string(),
            ));
        }

        // Registered emails are unique across the registry
        if let Some(email) = &request.email {
            let existing_check_path = format!("/rest/v1/patients?email=eq.{}&select=id", email);
            let existing: Vec<Value> = self.supabase.request(
                Method::GET,
                &existing_check_path,
                Some(auth_token),
                None,
            ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

            if !existing.is_empty() {
                return Err(PatientError::DuplicateEmail(email.clone()));
            }
        }

        let patient_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone": request.phone,
            "address": request.address,
            "date_of_birth": request.date_of_birth.format("%Y-%m-%d").to_string(),
            "blood_group": request.blood_group,
            "emergency_contact": request.emergency_contact,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Patient> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(return_representation()),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        let patient = result.into_iter().next()
            .ok_or_else(|| PatientError::DatabaseError("Patient insert returned no row".to_string()))?;

        info!("Patient record {} created", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: i64, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient record: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn update_patient(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        debug!("Updating patient record: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = request.email {
            update_data.insert("email".to_string(), json!(email));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(address) = request.address {
            update_data.insert("address".to_string(), json!(address));
        }
        if let Some(blood_group) = request.blood_group {
            update_data.insert("blood_group".to_string(), json!(blood_group));
        }
        if let Some(emergency_contact) = request.emergency_contact {
            update_data.insert("emergency_contact".to_string(), json!(emergency_contact));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Patient> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(return_representation()),
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(PatientError::NotFound)
    }

    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        debug!("Searching patients with query: {:?}", query);

        let mut query_parts = vec![];

        if let Some(name) = query.name {
            query_parts.push(format!("or=(first_name.ilike.%{}%,last_name.ilike.%{}%)", name, name));
        }
        if let Some(email) = query.email {
            query_parts.push(format!("email=ilike.%{}%", email));
        }
        if let Some(phone) = query.phone {
            query_parts.push(format!("phone=ilike.%{}%", phone));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        query_parts.push(format!("limit={}&offset={}", limit, offset));

        let path = format!("/rest/v1/patients?{}", query_parts.join("&"));

        let result: Vec<Patient> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| PatientError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
