// libs/encounter-cell/src/services/appointment.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};
use billing_cell::models::NewBilling;
use billing_cell::services::billing::BillingService;

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, DispenseRequest,
    EncounterError, EncounterListQuery,
};
use crate::services::lifecycle::EncounterLifecycleService;
use crate::services::lookup;

pub struct AppointmentService {
    supabase: Arc<SupabaseClient>,
    lifecycle: EncounterLifecycleService,
    billing: BillingService,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let billing = BillingService::with_client(Arc::clone(&supabase));

        Self {
            supabase,
            lifecycle: EncounterLifecycleService::new(),
            billing,
        }
    }

    /// Books an appointment. The patient-initiated flow requires an upfront
    /// payment reference; staff and doctors book directly.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        booked_by_patient: bool,
        auth_token: &str,
    ) -> Result<Appointment, EncounterError> {
        info!("Booking appointment for patient {} with doctor {}",
              request.patient_id, request.doctor_id);

        if request.reason.trim().is_empty() {
            return Err(EncounterError::ValidationError(
                "Appointment reason is required".to_string(),
            ));
        }

        if booked_by_patient
            && request.payment_reference.as_deref().map_or(true, |r| r.trim().is_empty())
        {
            return Err(EncounterError::ValidationError(
                "Payment confirmation is required to book an appointment".to_string(),
            ));
        }

        lookup::verify_patient_exists(&self.supabase, request.patient_id, auth_token).await?;
        lookup::verify_doctor_exists(&self.supabase, request.doctor_id, auth_token).await?;

        let appointment_data = json!({
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "appointment_date": request.appointment_date.format("%Y-%m-%d").to_string(),
            "appointment_time": request.appointment_time.format("%H:%M:%S").to_string(),
            "reason": request.reason,
            "status": "scheduled",
            "dispense_status": "pending",
            "reminder_sent": false,
            "payment_reference": request.payment_reference,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let appointment = result.into_iter().next()
            .ok_or_else(|| EncounterError::DatabaseError("Appointment insert returned no row".to_string()))?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, EncounterError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(EncounterError::AppointmentNotFound)
    }

    /// Consultation finished. Legal only from `scheduled`; the filtered
    /// update is the authoritative check under concurrency.
    pub async fn complete_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, EncounterError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_appointment_transition(&current.status, &AppointmentStatus::Completed)?;

        self.transition_status(appointment_id, AppointmentStatus::Completed, auth_token).await
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: i64,
        auth_token: &str,
    ) -> Result<Appointment, EncounterError> {
        let current = self.get_appointment(appointment_id, auth_token).await?;
        self.lifecycle.validate_appointment_transition(&current.status, &AppointmentStatus::Canceled)?;

        self.transition_status(appointment_id, AppointmentStatus::Canceled, auth_token).await
    }

    async fn transition_status(
        &self,
        appointment_id: i64,
        new_status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, EncounterError> {
        let update_data = json!({
            "status": new_status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        // Filter on the expected current status: of two concurrent callers
        // only one gets the row back.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&status=eq.{}",
            appointment_id,
            AppointmentStatus::Scheduled
        );
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(appointment) => {
                info!("Appointment {} moved to {}", appointment.id, new_status);
                Ok(appointment)
            }
            None => {
                warn!("Appointment {} transition to {} affected no rows", appointment_id, new_status);
                Err(EncounterError::AlreadyProcessed(
                    "appointment was updated by another caller".to_string(),
                ))
            }
        }
    }

    /// Pharmacy dispensing. The bill is created first so a dispensed
    /// appointment always has its billing row; if the dispense flip then
    /// loses to a concurrent caller, the bill is deleted again.
    pub async fn dispense_appointment(
        &self,
        appointment_id: i64,
        request: DispenseRequest,
        auth_token: &str,
    ) -> Result<(Appointment, i64), EncounterError> {
        info!("Dispensing appointment {} for patient {}", appointment_id, request.patient_id);

        self.validate_dispense_request(&request)?;

        let appointment = self.get_appointment(appointment_id, auth_token).await?;

        if appointment.patient_id != request.patient_id {
            return Err(EncounterError::ValidationError(
                "Patient does not match the appointment".to_string(),
            ));
        }
        self.lifecycle.validate_dispense(&appointment.dispense_status)?;

        let item_count: i32 = request.medicines.iter().map(|m| m.quantity).sum();
        let new_billing = NewBilling {
            patient_id: request.patient_id,
            appointment_id: Some(appointment_id),
            services: format!("Pharmacy dispensing ({} items)", item_count),
            consultation_charges: request.total_bill_amount - request.medicine_costs,
            medicine_costs: request.medicine_costs,
            total_amount: request.total_bill_amount,
        };

        let billing = self.billing.create_unpaid(&new_billing, auth_token).await
            .map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        let update_data = json!({
            "dispense_status": "dispensed",
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!(
            "/rest/v1/appointments?id=eq.{}&dispense_status=eq.pending",
            appointment_id
        );
        let result: Vec<Appointment> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(updated) => {
                info!("Appointment {} dispensed, billing {} created", updated.id, billing.id);
                Ok((updated, billing.id))
            }
            None => {
                // A concurrent dispense won; take the orphan bill back out.
                warn!("Dispense flip for appointment {} affected no rows, compensating", appointment_id);
                if let Err(e) = self.billing.delete_billing(billing.id, auth_token).await {
                    warn!("Failed to delete billing {} during compensation: {}", billing.id, e);
                }
                Err(EncounterError::AlreadyProcessed(
                    "appointment has already been dispensed".to_string(),
                ))
            }
        }
    }

    fn validate_dispense_request(&self, request: &DispenseRequest) -> Result<(), EncounterError> {
        if request.medicines.is_empty() {
            return Err(EncounterError::ValidationError(
                "At least one medicine line item is required".to_string(),
            ));
        }
        for item in &request.medicines {
            if item.name.trim().is_empty() {
                return Err(EncounterError::ValidationError(
                    "Medicine name is required".to_string(),
                ));
            }
            if item.quantity < 0 {
                return Err(EncounterError::ValidationError(
                    format!("Negative quantity for {}", item.name),
                ));
            }
            if item.unit_price < 0.0 {
                return Err(EncounterError::ValidationError(
                    format!("Negative unit price for {}", item.name),
                ));
            }
        }
        if request.total_bill_amount <= 0.0 {
            return Err(EncounterError::ValidationError(
                "Total bill amount must be greater than zero".to_string(),
            ));
        }
        if request.medicine_costs < 0.0 || request.medicine_costs > request.total_bill_amount {
            return Err(EncounterError::ValidationError(
                "Medicine costs must be between zero and the total bill amount".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn list_patient_appointments(
        &self,
        patient_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, EncounterError> {
        self.list_by(format!("patient_id=eq.{}", patient_id), query, auth_token).await
    }

    pub async fn list_doctor_appointments(
        &self,
        doctor_id: i64,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, EncounterError> {
        self.list_by(format!("doctor_id=eq.{}", doctor_id), query, auth_token).await
    }

    async fn list_by(
        &self,
        filter: String,
        query: &EncounterListQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, EncounterError> {
        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.desc&limit={}&offset={}",
            filter, limit, offset
        );

        let result: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| EncounterError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
