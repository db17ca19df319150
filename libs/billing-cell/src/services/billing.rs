// libs/billing-cell/src/services/billing.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{Billing, BillingError, BillingListQuery, NewBilling};

pub struct BillingService {
    supabase: Arc<SupabaseClient>,
}

impl BillingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// The single insertion path for billing rows. Every bill enters the
    /// system unpaid with its total fixed here; nothing later recomputes it.
    pub async fn create_unpaid(
        &self,
        new_billing: &NewBilling,
        auth_token: &str,
    ) -> Result<Billing, BillingError> {
        if new_billing.total_amount <= 0.0 {
            return Err(BillingError::ValidationError(
                "Billing total must be greater than zero".to_string(),
            ));
        }

        debug!("Creating unpaid billing for patient {}", new_billing.patient_id);

        let billing_data = json!({
            "patient_id": new_billing.patient_id,
            "appointment_id": new_billing.appointment_id,
            "services": new_billing.services,
            "consultation_charges": new_billing.consultation_charges,
            "medicine_costs": new_billing.medicine_costs,
            "total_amount": new_billing.total_amount,
            "status": "unpaid",
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Billing> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/billings",
            Some(auth_token),
            Some(billing_data),
            Some(return_representation()),
        ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        let billing = result.into_iter().next()
            .ok_or_else(|| BillingError::DatabaseError("Billing insert returned no row".to_string()))?;

        info!("Billing {} created unpaid, total {:.2}", billing.id, billing.total_amount);
        Ok(billing)
    }

    /// Compensation path for dispensing: removes a billing row whose
    /// companion status flip lost to a concurrent caller.
    pub async fn delete_billing(&self, billing_id: i64, auth_token: &str) -> Result<(), BillingError> {
        warn!("Deleting billing {} as a compensating action", billing_id);

        let path = format!("/rest/v1/billings?id=eq.{}", billing_id);
        let _: Vec<Value> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    pub async fn get_billing(&self, billing_id: i64, auth_token: &str) -> Result<Billing, BillingError> {
        debug!("Fetching billing record: {}", billing_id);

        let path = format!("/rest/v1/billings?id=eq.{}", billing_id);
        let result: Vec<Billing> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        result.into_iter().next().ok_or(BillingError::NotFound)
    }

    pub async fn list_billings(
        &self,
        query: &BillingListQuery,
        auth_token: &str,
    ) -> Result<Vec<Billing>, BillingError> {
        let mut query_parts = vec![];

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(status) = &query.status {
            query_parts.push(format!("status=eq.{}", status));
        }

        let limit = query.limit.unwrap_or(50);
        let offset = query.offset.unwrap_or(0);
        query_parts.push(format!("limit={}&offset={}", limit, offset));
        query_parts.push("order=created_at.desc".to_string());

        let path = format!("/rest/v1/billings?{}", query_parts.join("&"));

        let result: Vec<Billing> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        Ok(result)
    }
}
