use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use billing_cell::router::billing_routes;
use doctor_cell::router::doctor_routes;
use encounter_cell::router::{
    appointment_routes, home_visit_routes, inpatient_routes, lab_routes, outpatient_routes,
};
use patient_cell::router::patient_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital API is running!" }))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/inpatients", inpatient_routes(state.clone()))
        .nest("/outpatients", outpatient_routes(state.clone()))
        .nest("/labs", lab_routes(state.clone()))
        .nest("/home-visits", home_visit_routes(state.clone()))
        .nest("/billing", billing_routes(state))
}
