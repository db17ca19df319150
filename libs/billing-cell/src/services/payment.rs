// libs/billing-cell/src/services/payment.rs
use std::sync::Arc;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_database::supabase::{SupabaseClient, return_representation};

use crate::models::{Billing, BillingError, ConfirmPaymentRequest};

pub struct PaymentService {
    supabase: Arc<SupabaseClient>,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub fn with_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Marks a bill paid exactly once. The update is filtered on
    /// `status=eq.unpaid`, so of two concurrent confirmations only one gets
    /// a row back; the loser is told the bill was already paid.
    pub async fn confirm_payment(
        &self,
        billing_id: i64,
        request: &ConfirmPaymentRequest,
        auth_token: &str,
    ) -> Result<Billing, BillingError> {
        if request.payment_method.trim().is_empty() {
            return Err(BillingError::ValidationError(
                "Payment method is required".to_string(),
            ));
        }
        if request.transaction_reference.trim().is_empty() {
            return Err(BillingError::ValidationError(
                "Transaction reference is required".to_string(),
            ));
        }

        debug!("Confirming payment for billing {}", billing_id);

        let update_data = json!({
            "status": "paid",
            "payment_method": request.payment_method,
            "transaction_reference": request.transaction_reference,
            "payment_date": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/billings?id=eq.{}&status=eq.unpaid", billing_id);
        let result: Vec<Billing> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(update_data),
            Some(return_representation()),
        ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

        match result.into_iter().next() {
            Some(billing) => {
                info!("Billing {} paid via {} (ref {})",
                      billing.id, request.payment_method, request.transaction_reference);
                Ok(billing)
            }
            None => {
                // Zero rows: either the bill does not exist or a concurrent
                // confirmation won. Distinguish for the caller.
                warn!("Payment confirmation for billing {} affected no rows", billing_id);

                let check_path = format!("/rest/v1/billings?id=eq.{}", billing_id);
                let existing: Vec<Billing> = self.supabase.request(
                    Method::GET,
                    &check_path,
                    Some(auth_token),
                    None,
                ).await.map_err(|e| BillingError::DatabaseError(e.to_string()))?;

                if existing.is_empty() {
                    Err(BillingError::NotFound)
                } else {
                    Err(BillingError::AlreadyPaid)
                }
            }
        }
    }
}
