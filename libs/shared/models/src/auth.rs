use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub app_metadata: Option<serde_json::Value>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Authenticated principal, resolved by the auth middleware before any
/// handler runs. `id` is the numeric user id as a string; `role` is one of
/// patient, doctor, staff, admin, pharmacist, technician.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    pub fn is_staff(&self) -> bool {
        self.has_role("staff") || self.has_role("admin")
    }

    /// Ownership check against a numeric entity key.
    pub fn owns_id(&self, entity_user_id: i64) -> bool {
        self.id == entity_user_id.to_string()
    }
}
