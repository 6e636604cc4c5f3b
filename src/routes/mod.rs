use crate::models::AppState;
use axum::Router;

pub mod auth_routes;
pub mod booking_routes;
pub mod patient_routes;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1/auth", auth_routes::router())
        .nest("/api/v1", booking_routes::router())
        .nest("/api/v1", patient_routes::router())
        .with_state(state)
}
