// libs/billing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BillingError, BillingListQuery, ConfirmPaymentRequest};
use crate::services::billing::BillingService;
use crate::services::payment::PaymentService;

fn map_billing_error(e: BillingError) -> AppError {
    match e {
        BillingError::NotFound => AppError::NotFound("Billing record not found".to_string()),
        BillingError::AlreadyPaid => AppError::Conflict("Billing record is already paid".to_string()),
        BillingError::ValidationError(msg) => AppError::ValidationError(msg),
        BillingError::Unauthorized => AppError::Forbidden("Not authorized for this billing record".to_string()),
        BillingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_billing(
    State(state): State<Arc<AppConfig>>,
    Path(billing_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let billing_service = BillingService::new(&state);

    let billing = billing_service.get_billing(billing_id, token).await
        .map_err(map_billing_error)?;

    // Patients may only see their own bills
    if user.has_role("patient") && !user.owns_id(billing.patient_id) {
        return Err(AppError::Forbidden("Not authorized for this billing record".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "billing": billing
    })))
}

#[axum::debug_handler]
pub async fn list_billings(
    State(state): State<Arc<AppConfig>>,
    Query(mut query): Query<BillingListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    // Patients are always scoped to their own bills, whatever they ask for
    if user.has_role("patient") {
        let own_id = user.id.parse::<i64>()
            .map_err(|_| AppError::Auth("Invalid principal id".to_string()))?;
        query.patient_id = Some(own_id);
    }

    let billing_service = BillingService::new(&state);
    let billings = billing_service.list_billings(&query, token).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "count": billings.len(),
        "billings": billings
    })))
}

/// Payment confirmation: the one operation that moves a bill to paid.
#[axum::debug_handler]
pub async fn pay_billing(
    State(state): State<Arc<AppConfig>>,
    Path(billing_id): Path<i64>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let billing_service = BillingService::new(&state);
    let billing = billing_service.get_billing(billing_id, token).await
        .map_err(map_billing_error)?;

    let is_owner = user.has_role("patient") && user.owns_id(billing.patient_id);
    if !is_owner && !user.is_staff() {
        return Err(AppError::Forbidden("Not authorized to pay this billing record".to_string()));
    }

    let payment_service = PaymentService::new(&state);
    let paid = payment_service.confirm_payment(billing_id, &request, token).await
        .map_err(map_billing_error)?;

    Ok(Json(json!({
        "success": true,
        "billing": paid,
        "message": "Payment recorded successfully"
    })))
}
