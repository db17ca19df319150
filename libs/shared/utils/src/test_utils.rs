use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub mail_api_base_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            mail_api_base_url: "http://localhost:9925".to_string(),
        }
    }
}

impl TestConfig {
    /// Point the store and mailer at wiremock servers.
    pub fn with_endpoints(supabase_url: &str, mail_api_base_url: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            mail_api_base_url: mail_api_base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            mail_api_base_url: self.mail_api_base_url.clone(),
            mail_api_key: "test-mail-key".to_string(),
            mail_from_address: "no-reply@hospital.test".to_string(),
            appointment_reminder_interval_secs: 60,
            home_visit_reminder_interval_secs: 300,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl TestUser {
    pub fn new(id: i64, email: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn patient(id: i64) -> Self {
        Self::new(id, "patient@example.com", "patient")
    }

    pub fn doctor(id: i64) -> Self {
        Self::new(id, "doctor@example.com", "doctor")
    }

    pub fn admin(id: i64) -> Self {
        Self::new(id, "admin@example.com", "admin")
    }

    pub fn staff(id: i64) -> Self {
        Self::new(id, "staff@example.com", "staff")
    }

    pub fn pharmacist(id: i64) -> Self {
        Self::new(id, "pharmacist@example.com", "pharmacist")
    }

    pub fn technician(id: i64) -> Self {
        Self::new(id, "technician@example.com", "technician")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(id: i64, email: Option<&str>, first_name: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": "Byrne",
            "email": email,
            "phone": "+353 1 555 0100",
            "address": "12 Abbey Street, Dublin",
            "date_of_birth": "1988-03-14",
            "blood_group": "O+",
            "emergency_contact": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn doctor_response(id: i64, first_name: &str, specialty: &str) -> serde_json::Value {
        json!({
            "id": id,
            "first_name": first_name,
            "last_name": "Keane",
            "email": "doctor@example.com",
            "specialty": specialty,
            "department_id": 3,
            "consultation_fee": 150.0,
            "is_available": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        id: i64,
        patient_id: i64,
        doctor_id: i64,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": date,
            "appointment_time": time,
            "reason": "Check-up",
            "status": status,
            "dispense_status": "pending",
            "reminder_sent": false,
            "payment_reference": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn inpatient_stay_response(
        id: i64,
        patient_id: i64,
        doctor_id: i64,
        ward_type: &str,
        admission_date: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "department_id": 3,
            "room_number": "204B",
            "ward_type": ward_type,
            "admission_date": admission_date,
            "discharge_date": null,
            "diagnosis": "Pneumonia",
            "treatment_plan": "IV antibiotics",
            "status": status,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn lab_test_response(id: i64, patient_id: i64, doctor_id: i64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "catalog_id": 11,
            "status": status,
            "result_value": null,
            "unit": null,
            "technician_id": null,
            "completed_at": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn billing_response(id: i64, patient_id: i64, total_amount: f64, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "appointment_id": null,
            "services": "Consultation",
            "consultation_charges": total_amount,
            "medicine_costs": 0.0,
            "total_amount": total_amount,
            "status": status,
            "payment_method": null,
            "transaction_reference": null,
            "payment_date": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn home_visit_response(
        id: i64,
        patient_id: i64,
        service_type: &str,
        assigned_doctor_id: Option<i64>,
    ) -> serde_json::Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "assigned_doctor_id": assigned_doctor_id,
            "service_type": service_type,
            "visit_date": "2024-06-01",
            "visit_time": "10:30:00",
            "address": "12 Abbey Street, Dublin",
            "status": "pending",
            "reminder_sent": false,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::doctor(42);
        assert_eq!(user.id, "42");
        assert_eq!(user.role, "doctor");

        let user_model = user.to_user();
        assert_eq!(user_model.role, Some(user.role.clone()));
        assert!(user_model.owns_id(42));
        assert!(!user_model.owns_id(43));
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::patient(7);
        let secret = "test-secret";
        let token = JwtTestUtils::create_test_token(&user, secret, Some(1));

        assert!(token.contains('.'));
        assert_eq!(token.split('.').count(), 3);
    }
}
