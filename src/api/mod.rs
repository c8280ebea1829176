//! API endpoints
//!
//! Este módulo contiene los endpoints de la API.

pub mod itinerary;
pub mod monitoring;

use axum::Router;

use crate::state::AppState;

/// Crear el router principal de la API
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .merge(itinerary::create_itinerary_router())
        .merge(monitoring::create_monitoring_router())
}
