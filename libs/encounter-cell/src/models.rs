// libs/encounter-cell/src/models.rs
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc, NaiveDate, NaiveTime};
use std::fmt;

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: String,
    pub status: AppointmentStatus,
    pub dispense_status: DispenseStatus,
    pub reminder_sent: bool,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Scheduled start in UTC, for reminder-window arithmetic.
    pub fn scheduled_start(&self) -> DateTime<Utc> {
        self.appointment_date.and_time(self.appointment_time).and_utc()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Canceled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DispenseStatus {
    Pending,
    Dispensed,
}

impl fmt::Display for DispenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispenseStatus::Pending => write!(f, "pending"),
            DispenseStatus::Dispensed => write!(f, "dispensed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: String,
    /// Payment confirmation from the booking screen. Required when the
    /// patient books for themselves; staff bookings go through without one.
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicineLineItem {
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
}

/// Pharmacy dispensing payload. The summed costs arrive from the pharmacy
/// screen and are trusted as given; the engine validates shape only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispenseRequest {
    pub patient_id: i64,
    pub medicines: Vec<MedicineLineItem>,
    pub medicine_costs: f64,
    pub total_bill_amount: f64,
}

// ==============================================================================
// INPATIENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InpatientStay {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department_id: i64,
    pub room_number: String,
    pub ward_type: String,
    pub admission_date: DateTime<Utc>,
    pub discharge_date: Option<DateTime<Utc>>,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub status: StayStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StayStatus {
    Admitted,
    Discharged,
}

impl fmt::Display for StayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StayStatus::Admitted => write!(f, "admitted"),
            StayStatus::Discharged => write!(f, "discharged"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmitPatientRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department_id: i64,
    pub room_number: String,
    pub ward_type: String,
    pub admission_date: Option<DateTime<Utc>>,
    pub diagnosis: String,
    pub treatment_plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeRequest {
    pub discharge_date: Option<DateTime<Utc>>,
}

/// What a completed discharge produced: the terminal stay, the derived
/// charges and the unpaid bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeSummary {
    pub stay: InpatientStay,
    pub days_stayed: i64,
    pub daily_rate: f64,
    pub total_amount: f64,
    pub billing_id: i64,
}

// ==============================================================================
// OUTPATIENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutpatientVisit {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department_id: i64,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub symptoms: String,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub consultation_fee: f64,
    pub payment_status: VisitPaymentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum VisitPaymentStatus {
    Pending,
    Paid,
}

impl fmt::Display for VisitPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitPaymentStatus::Pending => write!(f, "pending"),
            VisitPaymentStatus::Paid => write!(f, "paid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookOutpatientVisitRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub department_id: i64,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub symptoms: String,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub consultation_fee: f64,
}

// ==============================================================================
// LAB MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTest {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub catalog_id: i64,
    pub status: LabStatus,
    pub result_value: Option<String>,
    pub unit: Option<String>,
    pub technician_id: Option<i64>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LabStatus {
    Pending,
    Completed,
}

impl fmt::Display for LabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabStatus::Pending => write!(f, "pending"),
            LabStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTestCatalogEntry {
    pub id: i64,
    pub test_name: String,
    pub normal_range: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLabTestRequest {
    pub patient_id: i64,
    pub catalog_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitLabResultRequest {
    pub result_value: String,
    pub unit: String,
}

// ==============================================================================
// HOME VISIT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeVisit {
    pub id: i64,
    pub patient_id: i64,
    pub assigned_doctor_id: Option<i64>,
    pub service_type: String,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub address: String,
    /// Free-form operational status; created as "pending". Staff choose
    /// later values freely, so no enum and no transition whitelist here.
    pub status: String,
    pub reminder_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HomeVisit {
    pub fn scheduled_start(&self) -> DateTime<Utc> {
        self.visit_date.and_time(self.visit_time).and_utc()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookHomeVisitRequest {
    pub patient_id: i64,
    pub assigned_doctor_id: Option<i64>,
    pub service_type: String,
    pub visit_date: NaiveDate,
    pub visit_time: NaiveTime,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHomeVisitRequest {
    pub status: Option<String>,
    /// Present-as-null clears the assignment, absent leaves it alone.
    #[serde(default)]
    pub assigned_doctor_id: Option<Option<i64>>,
}

// ==============================================================================
// QUERY PARAMS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EncounterListQuery {
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum EncounterError {
    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Inpatient stay not found")]
    StayNotFound,

    #[error("Lab test not found")]
    LabTestNotFound,

    #[error("Lab test catalog entry not found")]
    CatalogEntryNotFound,

    #[error("Outpatient visit not found")]
    VisitNotFound,

    #[error("Home visit not found")]
    HomeVisitNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Transition not allowed: {0}")]
    InvalidTransition(String),

    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unauthorized access to encounter")]
    Unauthorized,

    #[error("Partial write: {0}")]
    PartialWrite(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
