// libs/encounter-cell/src/services/home_visit.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};
use billing_cell::models::NewBilling;
use billing_cell::services::billing::BillingService;
use billing_cell::services::derivation::home_visit_fee;

use crate::models::{
    BookHomeVisitRequest, EncounterError, EncounterListQuery, HomeVisit,
    UpdateHomeVisitRequest,
};
use crate::services::lookup;

fn is_doctor_service(service_type: &str) -> bool {
    service_type.trim().eq_ignore_ascii_case("doctor")
}

pub struct HomeVisitService {
    supabase: Arc<SupabaseClient>,
    billing: BillingService,
}

impl HomeVisitService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let billing = BillingService::with_client(Arc::clone(&supabase));

        Self { supabase, billing }
    }

    /// Books a home visit at the flat fee for its service type and creates
    /// the unpaid bill. Only doctor visits carry an assigned doctor; for
    /// every other service type a supplied assignment is discarded.
    pub async fn book_home_visit(
        &self,
        request: BookHomeVisitRequest,
        auth_token: &str,
    ) -> Result<(HomeVisit, i64), EncounterError> {
        info!("Booking {} home visit for patient {}", request.service_type, request.patient_id);

        if request.service_type.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Service type is required".to_string(),
            ));
        }
        if request.address.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Visit address is required".to_string(),
            ));
        }

        lookup::verify_patient_exists(&self.supabase, request.patient_id, auth_token).await?;

        let assigned_doctor_id = if is_doctor_service(&request.service_type) {
            if let Some(doctor_id) = request.assigned_doctor_id {
                lookup::verify_doctor_exists(&self.supabase, doctor_id, auth_token).await?;
            }
            request.assigned_doctor_id
        } else {
            if request.assigned_doctor_id.is_some() {
                debug!("Dropping assigned doctor for non-doctor service type {}", request.service_type);
            }
            None
        };

        let visit_data = json!({
            "patient_id": request.patient_id,
            "assigned_doctor_id": assigned_doctor_id,
            "service_type": request.service_type,
            "visit_date": request.visit_date.format("%Y-%m-%d").to_string(),
            "visit_time": request.visit_time.format("%H:%M:%S").to_string(),
            "address": request.address,
            "status": "pending",
            "reminder_sent": false,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<HomeVisit> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/home_visits",
            Some(auth_token),
            Some(visit_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let visit = result.into_iter().next()
            .ok_or_else(|| EncounterError::DatabaseError("Home visit insert returned no row".to_string()))?;

        let fee = home_visit_fee(&visit.service_type);
        let new_billing = NewBilling {
            patient_id: visit.patient_id,
            appointment_id: None,
            services: format!("Home visit ({})", visit.service_type),
            consultation_charges: fee,
            medicine_costs: 0.0,
            total_amount: fee,
        };

        let billing = self.billing.create_unpaid(&new_billing, auth_token).await
            .map_err(|e| {
                error!("Home visit {} booked but billing creation failed: {}", visit.id, e);
                EncounterError::PartialWrite(
                    "home visit booked but billing creation failed".to_string(),
                )
            })?;

        info!("Home visit {} booked at flat fee {:.2}, billing {}", visit.id, fee, billing.id);
        Ok((visit, billing.id))
    }

    /// Bills an existing home visit at its flat fee. This is the staff
    /// recovery path for a visit whose bill creation failed at booking.
    pub async fn create_visit_bill(&self, visit_id: i64, auth_token: &str) -> Result<i64, EncounterError> {
        let visit = self.get_home_visit(visit_id, auth_token).await?;

        let fee = home_visit_fee(&visit.service_type);
        let new_billing = NewBilling {
            patient_id: visit.patient_id,
            appointment_id: None,
            services: format!("Home visit ({})", visit.service_type),
            consultation_charges: fee,
            medicine_costs: 0.0,
            total_amount: fee,
        };

        let billing = self.billing.create_unpaid(&new_billing, auth_token).await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        info!("Home visit {} billed at flat fee {:.2}, billing {}", visit.id, fee, billing.id);
        Ok(billing.id)
    }

    pub async fn get_home_visit(&self, visit_id: i64, auth_token: &str) -> Result<HomeVisit, EncounterError> {
        debug!("Fetching home visit: {}", visit_id);

        let path = format!("/rest/v1/home_visits?id=eq.{}", visit_id);
        let result: Vec<HomeVisit> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::HomeVisitNotFound)
    }

    /// Operational patch: staff choose status values freely, so there is no
    /// transition whitelist here. The doctor-only assignment rule still
    /// holds.
    pub async fn update_home_visit(
        &self,
        visit_id: i64,
        request: UpdateHomeVisitRequest,
        auth_token: &str,
    ) -> Result<HomeVisit, EncounterError> {
        let visit = self.get_home_visit(visit_id, auth_token).await?;

        let mut update_data = serde_json::Map::new();

        if let Some(status) = request.status {
            if status.trim().is_empty() {
                return Err(EncounterError::ValidationError(
                    "Status cannot be empty".to_string(),
                ));
            }
            update_data.insert("status".to_string(), json!(status));
        }

        if let Some(assignment) = request.assigned_doctor_id {
            if is_doctor_service(&visit.service_type) {
                if let Some(doctor_id) = assignment {
                    lookup::verify_doctor_exists(&self.supabase, doctor_id, auth_token).await?;
                }
                update_data.insert("assigned_doctor_id".to_string(), json!(assignment));
            } else {
                warn!("Ignoring doctor assignment on {} home visit {}", visit.service_type, visit.id);
            }
        }

        if update_data.is_empty() {
            return Ok(visit);
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/home_visits?id=eq.{}", visit_id);
        let result: Vec<HomeVisit> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(serde_json::Value::Object(update_data)),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::HomeVisitNotFound)
    }

    pub async fn list_patient_visits(
        &self,
        patient_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<HomeVisit>, EncounterError> {
        self.list_by(format!("patient_id=eq.{}", patient_id), query, auth_token).await
    }

    pub async fn list_doctor_visits(
        &self,
        doctor_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<HomeVisit>, EncounterError> {
        self.list_by(format!("assigned_doctor_id=eq.{}", doctor_id), query, auth_token).await
    }

    pub async fn list_all(
        &self,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<HomeVisit>, EncounterError> {
        self.list_by("order=visit_date.desc".to_string(), query, auth_token).await
    }

    async fn list_by(
        &self,
        filter: String,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<HomeVisit>, EncounterError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/home_visits?{}&limit={}&offset={}",
            filter, limit, offset
        );

        let result: Vec<HomeVisit> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
