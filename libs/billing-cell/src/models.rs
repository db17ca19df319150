// libs/billing-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

// ==============================================================================
// CORE BILLING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Billing {
    pub id: i64,
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub services: String,
    pub consultation_charges: f64,
    pub medicine_costs: f64,
    pub total_amount: f64,
    pub status: BillingStatus,
    pub payment_method: Option<String>,
    pub transaction_reference: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Unpaid,
    Paid,
}

impl fmt::Display for BillingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingStatus::Unpaid => write!(f, "unpaid"),
            BillingStatus::Paid => write!(f, "paid"),
        }
    }
}

/// Input to the single billing-creation path. Every deriving operation
/// (home-visit booking, inpatient discharge, pharmacy dispensing) builds one
/// of these; the row is always inserted unpaid and its total is never
/// recomputed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBilling {
    pub patient_id: i64,
    pub appointment_id: Option<i64>,
    pub services: String,
    pub consultation_charges: f64,
    pub medicine_costs: f64,
    pub total_amount: f64,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_method: String,
    pub transaction_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingListQuery {
    pub patient_id: Option<i64>,
    pub status: Option<BillingStatus>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BillingError {
    #[error("Billing record not found")]
    NotFound,

    #[error("Billing record is already paid")]
    AlreadyPaid,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to billing record")]
    Unauthorized,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
