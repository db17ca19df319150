// libs/encounter-cell/src/services/outpatient.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{
    BookOutpatientVisitRequest, EncounterError, EncounterListQuery, OutpatientVisit,
};
use crate::services::lookup;

pub struct OutpatientService {
    supabase: Arc<SupabaseClient>,
}

impl OutpatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Visits are created at booking time with their consultation fee; the
    /// only lifecycle after that is the payment flag.
    pub async fn book_visit(
        &self,
        request: BookOutpatientVisitRequest,
        auth_token: &str,
    ) -> Result<OutpatientVisit, EncounterError> {
        info!("Booking outpatient visit for patient {} with doctor {}",
              request.patient_id, request.doctor_id);

        if request.symptoms.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Symptoms are required".to_string(),
            ));
        }
        if request.consultation_fee < 0.0 {
            return Err(EncounterError::ValidationError(
                "Consultation fee cannot be negative".to_string(),
            ));
        }

        lookup::verify_patient_exists(&self.supabase, request.patient_id, auth_token).await?;
        lookup::verify_doctor_exists(&self.supabase, request.doctor_id, auth_token).await?;

        let visit_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "department_id": request.department_id,
            "visit_date": request.visit_date.format("%Y-%m-%d").to_string(),
            "visit_time": request.visit_time.format("%H:%M:%S").to_string(),
            "symptoms": request.symptoms,
            "diagnosis": request.diagnosis,
            "prescription": request.prescription,
            "consultation_fee": request.consultation_fee,
            "payment_status": "pending",
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<OutpatientVisit> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/outpatient_visits",
            Some(auth_token),
            Some(visit_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let visit = result.into_iter().next()
            .ok_or_else(|| EncounterError::DatabaseError("Visit insert returned no row".to_string()))?;

        info!("Outpatient visit {} booked", visit.id);
        Ok(visit)
    }

    pub async fn get_visit(&self, visit_id: i64, auth_token: &str) -> Result<OutpatientVisit, EncounterError> {
        debug!("Fetching outpatient visit: {}", visit_id);

        let path = format!("/rest/v1/outpatient_visits?id=eq.{}", visit_id);
        let result: Vec<OutpatientVisit> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::VisitNotFound)
    }

    pub async fn mark_paid(&self, visit_id: i64, auth_token: &str) -> Result<OutpatientVisit, EncounterError> {
        let update_data = json!({
            "payment_status": "paid"
        });

        let path = format!(
            "/rest/v1/outpatient_visits?id=eq.{}&payment_status=eq.pending",
            visit_id
        );
        let result: Vec<OutpatientVisit> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(visit) => {
                info!("Outpatient visit {} marked paid", visit.id);
                Ok(visit)
            }
            None => {
                warn!("Payment flag for visit {} affected no rows", visit_id);
                // Distinguish a missing row from an already-paid one
                self.get_visit(visit_id, auth_token).await?;
                Err(EncounterError::AlreadyProcessed(
                    "visit has already been paid".to_string(),
                ))
            }
        }
    }

    pub async fn list_patient_visits(
        &self,
        patient_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<OutpatientVisit>, EncounterError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/outpatient_visits?patient_id=eq.{}&order=visit_date.desc&limit={}&offset={}",
            patient_id, limit, offset
        );

        let result: Vec<OutpatientVisit> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
