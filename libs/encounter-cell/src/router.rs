// libs/encounter-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, patch},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}/complete", post(handlers::complete_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))
        .route("/{appointment_id}/dispense", post(handlers::dispense_appointment))
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn inpatient_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::admit_patient))
        .route("/admitted", get(handlers::list_admitted))
        .route("/{stay_id}", get(handlers::get_stay))
        .route("/{stay_id}/discharge", post(handlers::discharge_patient))
        .route("/patients/{patient_id}", get(handlers::get_patient_stays))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn lab_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::order_lab_test))
        .route("/pending", get(handlers::list_pending_lab_tests))
        .route("/{test_id}", get(handlers::get_lab_test))
        .route("/{test_id}/result", post(handlers::submit_lab_result))
        .route("/patients/{patient_id}", get(handlers::get_patient_lab_tests))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_lab_tests))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn outpatient_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_outpatient_visit))
        .route("/{visit_id}", get(handlers::get_outpatient_visit))
        .route("/{visit_id}/pay", post(handlers::pay_outpatient_visit))
        .route("/patients/{patient_id}", get(handlers::get_patient_outpatient_visits))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

pub fn home_visit_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_home_visit))
        .route("/", get(handlers::list_home_visits))
        .route("/{visit_id}", get(handlers::get_home_visit))
        .route("/{visit_id}", patch(handlers::update_home_visit))
        .route("/{visit_id}/bill", post(handlers::create_home_visit_bill))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
