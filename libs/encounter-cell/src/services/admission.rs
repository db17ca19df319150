// libs/encounter-cell/src/services/admission.rs
use std::sync::Arc;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};
use billing_cell::models::NewBilling;
use billing_cell::services::billing::BillingService;
use billing_cell::services::derivation::{days_stayed, stay_total, ward_daily_rate};

use crate::models::{
    AdmitPatientRequest, DischargeRequest, DischargeSummary, EncounterError,
    EncounterListQuery, InpatientStay,
};
use crate::services::lifecycle::EncounterLifecycleService;
use crate::services::lookup;

pub struct AdmissionService {
    supabase: Arc<SupabaseClient>,
    lifecycle: EncounterLifecycleService,
    billing: BillingService,
}

impl AdmissionService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let billing = BillingService::with_client(Arc::clone(&supabase));

        Self {
            supabase,
            lifecycle: EncounterLifecycleService::new(),
            billing,
        }
    }

    pub async fn admit_patient(
        &self,
        request: AdmitPatientRequest,
        auth_token: &str,
    ) -> Result<InpatientStay, EncounterError> {
        info!("Admitting patient {} to ward {}", request.patient_id, request.ward_type);

        if request.room_number.trim().is_empty() || request.ward_type.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Room number and ward type are required".to_string(),
            ));
        }
        if request.diagnosis.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Admission diagnosis is required".to_string(),
            ));
        }

        lookup::verify_patient_exists(&self.supabase, request.patient_id, auth_token).await?;
        lookup::verify_doctor_exists(&self.supabase, request.doctor_id, auth_token).await?;

        let admission_date = request.admission_date.unwrap_or_else(Utc::now);

        let stay_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "department_id": request.department_id,
            "room_number": request.room_number,
            "ward_type": request.ward_type,
            "admission_date": admission_date.to_rfc3339(),
            "discharge_date": null,
            "diagnosis": request.diagnosis,
            "treatment_plan": request.treatment_plan,
            "status": "admitted",
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<InpatientStay> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/inpatient_stays",
            Some(auth_token),
            Some(stay_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let stay = result.into_iter().next()
            .ok_or_else(|| EncounterError::DatabaseError("Stay insert returned no row".to_string()))?;

        info!("Inpatient stay {} opened", stay.id);
        Ok(stay)
    }

    pub async fn get_stay(&self, stay_id: i64, auth_token: &str) -> Result<InpatientStay, EncounterError> {
        debug!("Fetching inpatient stay: {}", stay_id);

        let path = format!("/rest/v1/inpatient_stays?id=eq.{}", stay_id);
        let result: Vec<InpatientStay> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::StayNotFound)
    }

    /// Discharge: the one-way exit from a stay. The status flip commits
    /// first; the stay bill and the EMR entry are derived afterwards, and a
    /// failure there is surfaced as a partial write rather than silently
    /// dropped — the discharge itself stands.
    pub async fn discharge_patient(
        &self,
        stay_id: i64,
        request: DischargeRequest,
        auth_token: &str,
    ) -> Result<DischargeSummary, EncounterError> {
        let stay = self.get_stay(stay_id, auth_token).await?;
        self.lifecycle.validate_discharge(&stay.status)?;

        let discharge_date = request.discharge_date.unwrap_or_else(Utc::now);
        if discharge_date < stay.admission_date {
            return Err(EncounterError::ValidationError(
                "Discharge date cannot precede the admission date".to_string(),
            ));
        }

        let discharged = self.flip_to_discharged(stay_id, discharge_date, auth_token).await?;

        let days = days_stayed(discharged.admission_date, discharge_date);
        let rate = ward_daily_rate(&discharged.ward_type);
        let total = stay_total(days, rate);

        let new_billing = NewBilling {
            patient_id: discharged.patient_id,
            appointment_id: None,
            services: format!(
                "Inpatient stay ({}), {} day(s) in room {}",
                discharged.ward_type, days, discharged.room_number
            ),
            consultation_charges: total,
            medicine_costs: 0.0,
            total_amount: total,
        };

        let billing = self.billing.create_unpaid(&new_billing, auth_token).await
            .map_err(|e| {
                error!("Discharge {} recorded but billing creation failed: {}", stay_id, e);
                EncounterError::PartialWrite(
                    "discharge recorded but billing creation failed".to_string(),
                )
            })?;

        self.create_medical_record(&discharged, discharge_date, auth_token).await
            .map_err(|e| {
                error!("Discharge {} recorded but medical record creation failed: {}", stay_id, e);
                EncounterError::PartialWrite(
                    "discharge recorded but medical record creation failed".to_string(),
                )
            })?;

        info!("Stay {} discharged: {} day(s) at {:.2}/day, billing {}",
              stay_id, days, rate, billing.id);

        Ok(DischargeSummary {
            stay: discharged,
            days_stayed: days,
            daily_rate: rate,
            total_amount: total,
            billing_id: billing.id,
        })
    }

    async fn flip_to_discharged(
        &self,
        stay_id: i64,
        discharge_date: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<InpatientStay, EncounterError> {
        let update_data = json!({
            "status": "discharged",
            "discharge_date": discharge_date.to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/inpatient_stays?id=eq.{}&status=eq.admitted", stay_id);
        let result: Vec<InpatientStay> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or_else(|| {
            warn!("Discharge flip for stay {} affected no rows", stay_id);
            EncounterError::AlreadyProcessed(
                "patient has already been discharged".to_string(),
            )
        })
    }

    async fn create_medical_record(
        &self,
        stay: &InpatientStay,
        discharge_date: DateTime<Utc>,
        auth_token: &str,
    ) -> anyhow::Result<()> {
        let record_data = json!({
            "record_uid": Uuid::new_v4().to_string(),
            "patient_id": stay.patient_id,
            "doctor_id": stay.doctor_id,
            "stay_id": stay.id,
            "note": format!(
                "Discharge summary. Diagnosis: {}. Treatment: {}.",
                stay.diagnosis, stay.treatment_plan
            ),
            "ward_type": stay.ward_type,
            "room_number": stay.room_number,
            "admitted_on": stay.admission_date.to_rfc3339(),
            "discharged_on": discharge_date.to_rfc3339(),
            "created_at": Utc::now().to_rfc3339()
        });

        let _: Vec<serde_json::Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/medical_records",
            Some(auth_token),
            Some(record_data),
            Some(return_representation()),
        ).await?;

        Ok(())
    }

    pub async fn list_admitted(
        &self,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<InpatientStay>, EncounterError> {
        self.list_by("status=eq.admitted".to_string(), query, auth_token).await
    }

    pub async fn list_patient_stays(
        &self,
        patient_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<InpatientStay>, EncounterError> {
        self.list_by(format!("patient_id=eq.{}", patient_id), query, auth_token).await
    }

    async fn list_by(
        &self,
        filter: String,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<InpatientStay>, EncounterError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/inpatient_stays?{}&order=admission_date.desc&limit={}&offset={}",
            filter, limit, offset
        );

        let result: Vec<InpatientStay> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
