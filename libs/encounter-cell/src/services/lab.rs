// libs/encounter-cell/src/services/lab.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};
use notification_cell::models::EmailMessage;
use notification_cell::services::mailer::MailerClient;

use crate::models::{
    EncounterError, EncounterListQuery, LabTest, LabTestCatalogEntry,
    OrderLabTestRequest, SubmitLabResultRequest,
};
use crate::services::lifecycle::EncounterLifecycleService;
use crate::services::lookup;

pub struct LabService {
    supabase: Arc<SupabaseClient>,
    lifecycle: EncounterLifecycleService,
    mailer: MailerClient,
}

impl LabService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            lifecycle: EncounterLifecycleService::new(),
            mailer: MailerClient::new(config),
        }
    }

    /// Doctor orders a test against a catalog entry.
    pub async fn order_test(
        &self,
        request: OrderLabTestRequest,
        doctor_id: i64,
        auth_token: &str,
    ) -> Result<LabTest, EncounterError> {
        info!("Doctor {} ordering catalog test {} for patient {}",
              doctor_id, request.catalog_id, request.patient_id);

        let catalog_entry = self.get_catalog_entry(request.catalog_id, auth_token).await?;
        lookup::verify_patient_exists(&self.supabase, request.patient_id, auth_token).await?;

        let test_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": doctor_id,
            "catalog_id": catalog_entry.id,
            "status": "pending",
            "result_value": null,
            "unit": null,
            "technician_id": null,
            "completed_at": null,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<LabTest> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/lab_tests",
            Some(auth_token),
            Some(test_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let test = result.into_iter().next()
            .ok_or_else(|| EncounterError::DatabaseError("Lab test insert returned no row".to_string()))?;

        info!("Lab test {} ordered ({})", test.id, catalog_entry.test_name);
        Ok(test)
    }

    pub async fn get_test(&self, test_id: i64, auth_token: &str) -> Result<LabTest, EncounterError> {
        debug!("Fetching lab test: {}", test_id);

        let path = format!("/rest/v1/lab_tests?id=eq.{}", test_id);
        let result: Vec<LabTest> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::LabTestNotFound)
    }

    pub async fn get_catalog_entry(
        &self,
        catalog_id: i64,
        auth_token: &str,
    ) -> Result<LabTestCatalogEntry, EncounterError> {
        let path = format!("/rest/v1/lab_test_catalog?id=eq.{}", catalog_id);
        let result: Vec<LabTestCatalogEntry> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::CatalogEntryNotFound)
    }

    /// Technician submits the result. Completion is one-way; a completed
    /// test is immutable, so the flip is filtered on `status=eq.pending`.
    /// The result-ready email is best effort — a patient without a
    /// registered address is skipped, a mailer failure is logged.
    pub async fn submit_result(
        &self,
        test_id: i64,
        request: SubmitLabResultRequest,
        technician_id: i64,
        auth_token: &str,
    ) -> Result<LabTest, EncounterError> {
        if request.result_value.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Result value is required".to_string(),
            ));
        }
        if request.unit.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Result unit is required".to_string(),
            ));
        }

        let test = self.get_test(test_id, auth_token).await?;
        self.lifecycle.validate_lab_completion(&test.status)?;

        let update_data = json!({
            "status": "completed",
            "result_value": request.result_value,
            "unit": request.unit,
            "technician_id": technician_id,
            "completed_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/lab_tests?id=eq.{}&status=eq.pending", test_id);
        let result: Vec<LabTest> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let completed = result.into_iter().next().ok_or_else(|| {
            warn!("Result submission for lab test {} affected no rows", test_id);
            EncounterError::AlreadyProcessed(
                "lab test result has already been submitted".to_string(),
            )
        })?;

        info!("Lab test {} completed by technician {}", completed.id, technician_id);

        self.notify_result_ready(&completed, auth_token).await;

        Ok(completed)
    }

    async fn notify_result_ready(&self, test: &LabTest, auth_token: &str) {
        let email = match lookup::fetch_patient_email(&self.supabase, test.patient_id, auth_token).await {
            Ok(Some(email)) => email,
            Ok(None) => {
                debug!("Patient {} has no registered email, skipping result notification", test.patient_id);
                return;
            }
            Err(e) => {
                warn!("Could not resolve patient {} email: {}", test.patient_id, e);
                return;
            }
        };

        let message = EmailMessage {
            to: email,
            subject: "Your lab results are ready".to_string(),
            html: format!(
                "<p>Your lab test result (reference #{}) is now available. \
                 Please log in to your patient portal to view it.</p>",
                test.id
            ),
        };

        if let Err(e) = self.mailer.send(&message).await {
            warn!("Result-ready notification for lab test {} failed: {}", test.id, e);
        }
    }

    pub async fn list_patient_tests(
        &self,
        patient_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<LabTest>, EncounterError> {
        self.list_by(format!("patient_id=eq.{}", patient_id), query, auth_token).await
    }

    pub async fn list_doctor_tests(
        &self,
        doctor_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<LabTest>, EncounterError> {
        self.list_by(format!("doctor_id=eq.{}", doctor_id), query, auth_token).await
    }

    /// The technician work queue.
    pub async fn list_pending_tests(
        &self,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<LabTest>, EncounterError> {
        self.list_by("status=eq.pending".to_string(), query, auth_token).await
    }

    async fn list_by(
        &self,
        filter: String,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<LabTest>, EncounterError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/lab_tests?{}&order=created_at.desc&limit={}&offset={}",
            filter, limit, offset
        );

        let result: Vec<LabTest> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
